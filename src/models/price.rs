use chrono::{NaiveDate, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// One dated price for a crop at a market. Immutable once stored; a
/// correction is a new observation on a later date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub crop_id: ObjectId,
    pub market_id: ObjectId,

    pub price: f64,

    // stored as "YYYY-MM-DD" so string order is date order
    pub date: NaiveDate,

    pub created_at: i64,
}

impl PriceObservation {
    pub fn new(crop_id: ObjectId, market_id: ObjectId, price: f64, date: NaiveDate) -> Self {
        Self {
            id: ObjectId::new(),
            crop_id,
            market_id,
            price,
            date,
            created_at: Utc::now().timestamp(),
        }
    }
}
