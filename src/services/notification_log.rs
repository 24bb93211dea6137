use std::sync::Arc;

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;

use crate::{
    error::StoreError,
    models::{NotificationKind, NotificationRecord},
};

use super::store::Store;

/// Append-only audit trail of SMS messages that were actually sent.
#[derive(Clone)]
pub struct NotificationLog {
    store: Arc<dyn Store>,
}

impl NotificationLog {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn append(&self, record: &NotificationRecord) -> Result<(), StoreError> {
        self.store.append_notification(record).await
    }

    pub async fn list_for_user(
        &self,
        user_id: ObjectId,
        limit: usize,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        self.store.list_notifications(Some(user_id), limit).await
    }

    pub async fn list_recent(&self, limit: usize) -> Result<Vec<NotificationRecord>, StoreError> {
        self.store.list_notifications(None, limit).await
    }

    pub async fn latest_for_alert(
        &self,
        alert_id: ObjectId,
    ) -> Result<Option<NotificationRecord>, StoreError> {
        self.store.latest_notification_for_alert(alert_id).await
    }

    /// Whether a target-reached SMS for `alert_id` was logged on `now`'s UTC date.
    pub async fn sent_today(&self, alert_id: ObjectId, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let Some(last) = self.latest_for_alert(alert_id).await? else {
            return Ok(false);
        };

        Ok(last.kind == NotificationKind::TargetReached
            && DateTime::<Utc>::from_timestamp(last.sent_at, 0)
                .is_some_and(|ts| ts.date_naive() == now.date_naive()))
    }
}
