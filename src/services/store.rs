//! Record store seam.
//!
//! Everything the engine and the HTTP services read or write goes through
//! [`Store`]. Two backends exist: [`MongoStore`](super::mongo_store::MongoStore)
//! for deployments and [`MemoryStore`](super::memory_store::MemoryStore) for
//! local runs and tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use mongodb::bson::oid::ObjectId;

use crate::{
    error::StoreError,
    models::{Alert, Crop, Market, NotificationRecord, PriceObservation, User},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct AlertFilter {
    pub user_id: Option<ObjectId>,
    pub crop_id: Option<ObjectId>,
    pub market_id: Option<ObjectId>,
}

impl AlertFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: ObjectId) -> Self {
        Self { user_id: Some(user_id), ..Self::default() }
    }

    pub fn for_pair(crop_id: ObjectId, market_id: ObjectId) -> Self {
        Self {
            user_id: None,
            crop_id: Some(crop_id),
            market_id: Some(market_id),
        }
    }

    pub fn matches(&self, a: &Alert) -> bool {
        self.user_id.is_none_or(|id| id == a.user_id)
            && self.crop_id.is_none_or(|id| id == a.crop_id)
            && self.market_id.is_none_or(|id| id == a.market_id)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PriceFilter {
    pub crop_id: Option<ObjectId>,
    pub market_id: Option<ObjectId>,
    pub date: Option<NaiveDate>,
}

impl PriceFilter {
    pub fn matches(&self, p: &PriceObservation) -> bool {
        self.crop_id.is_none_or(|id| id == p.crop_id)
            && self.market_id.is_none_or(|id| id == p.market_id)
            && self.date.is_none_or(|d| d == p.date)
    }
}

/// Row counts for the operator dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordCounts {
    pub users: u64,
    pub crops: u64,
    pub markets: u64,
    pub alerts: u64,
    pub prices: u64,
    pub notifications: u64,
    /// Date of the newest price observation, if any.
    pub latest_price_date: Option<NaiveDate>,
}

/// Outcome of the conditional alert transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// `last_notified_at` was moved to `sent_at` and the record appended.
    Applied,
    /// The alert was already marked for `day_start`'s day (or is gone);
    /// nothing was written.
    Rejected,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn get_user(&self, id: ObjectId) -> Result<Option<User>, StoreError>;
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    async fn get_crop(&self, id: ObjectId) -> Result<Option<Crop>, StoreError>;
    async fn list_crops(&self) -> Result<Vec<Crop>, StoreError>;
    async fn insert_crop(&self, crop: &Crop) -> Result<(), StoreError>;

    async fn get_market(&self, id: ObjectId) -> Result<Option<Market>, StoreError>;
    async fn list_markets(&self) -> Result<Vec<Market>, StoreError>;
    /// Fails with [`StoreError::Duplicate`] when the (name, region) pair exists.
    async fn insert_market(&self, market: &Market) -> Result<(), StoreError>;

    async fn get_alert(&self, id: ObjectId) -> Result<Option<Alert>, StoreError>;
    /// Newest first.
    async fn list_alerts(&self, filter: AlertFilter) -> Result<Vec<Alert>, StoreError>;
    /// Fails with [`StoreError::Duplicate`] when the (user, crop, market) triple exists.
    async fn insert_alert(&self, alert: &Alert) -> Result<(), StoreError>;
    async fn delete_alert(&self, id: ObjectId) -> Result<bool, StoreError>;

    /// Newest date first, then by crop and market.
    async fn list_prices(&self, filter: PriceFilter) -> Result<Vec<PriceObservation>, StoreError>;
    /// Fails with [`StoreError::Duplicate`] when the (crop, market, date) triple exists.
    async fn insert_price(&self, price: &PriceObservation) -> Result<(), StoreError>;
    async fn latest_price(
        &self,
        crop_id: ObjectId,
        market_id: ObjectId,
    ) -> Result<Option<PriceObservation>, StoreError>;
    async fn price_as_of(
        &self,
        crop_id: ObjectId,
        market_id: ObjectId,
        cutoff: NaiveDate,
    ) -> Result<Option<PriceObservation>, StoreError>;

    async fn append_notification(&self, record: &NotificationRecord) -> Result<(), StoreError>;
    /// Newest first, optionally scoped to one recipient.
    async fn list_notifications(
        &self,
        user_id: Option<ObjectId>,
        limit: usize,
    ) -> Result<Vec<NotificationRecord>, StoreError>;
    async fn latest_notification_for_alert(
        &self,
        alert_id: ObjectId,
    ) -> Result<Option<NotificationRecord>, StoreError>;

    async fn counts(&self) -> Result<RecordCounts, StoreError>;

    /// Atomically sets `alert.last_notified_at = sent_at` and appends `record`,
    /// but only when the alert's current `last_notified_at` is null or earlier
    /// than `day_start`. Either both writes happen or neither does.
    async fn commit_notification(
        &self,
        alert_id: ObjectId,
        day_start: i64,
        sent_at: i64,
        record: &NotificationRecord,
    ) -> Result<Transition, StoreError>;
}
