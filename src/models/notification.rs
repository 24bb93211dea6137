use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TargetReached,
    PriceChange,
}

/// Audit entry for an SMS that actually left the system. Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: ObjectId,

    // set for target-reached sends, absent for price-change broadcasts
    #[serde(default)]
    pub alert_id: Option<ObjectId>,

    pub kind: NotificationKind,
    pub message: String,
    pub sent_at: i64,
}

impl NotificationRecord {
    pub fn new(
        user_id: ObjectId,
        alert_id: Option<ObjectId>,
        kind: NotificationKind,
        message: String,
        sent_at: i64,
    ) -> Self {
        Self {
            id: ObjectId::new(),
            user_id,
            alert_id,
            kind,
            message,
            sent_at,
        }
    }
}
