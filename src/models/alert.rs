use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: ObjectId,
    pub crop_id: ObjectId,
    pub market_id: ObjectId,

    pub target_price: f64,

    // unix seconds of the last successful target-reached SMS
    #[serde(default)]
    pub last_notified_at: Option<i64>,

    pub created_at: i64,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

impl Alert {
    pub fn new(user_id: ObjectId, crop_id: ObjectId, market_id: ObjectId, target_price: f64) -> Self {
        Self {
            id: ObjectId::new(),
            user_id,
            crop_id,
            market_id,
            target_price,
            last_notified_at: None,
            created_at: Utc::now().timestamp(),
            updated_at: None,
        }
    }

    pub fn pair(&self) -> (ObjectId, ObjectId) {
        (self.crop_id, self.market_id)
    }

    pub fn last_notified(&self) -> Option<DateTime<Utc>> {
        self.last_notified_at
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
    }
}
