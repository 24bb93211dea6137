use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use mongodb::bson::oid::ObjectId;

use crate::{
    error::StoreError,
    models::{Alert, Crop, Market, NotificationRecord, PriceObservation, User},
};

use super::store::{AlertFilter, PriceFilter, RecordCounts, Store, Transition};

#[derive(Default)]
struct Tables {
    users: HashMap<ObjectId, User>,
    crops: HashMap<ObjectId, Crop>,
    markets: HashMap<ObjectId, Market>,
    alerts: HashMap<ObjectId, Alert>,
    prices: Vec<PriceObservation>,
    notifications: Vec<NotificationRecord>,
}

/// Process-local store. A single mutex guards all tables, so the
/// alert-transition and the record insert in `commit_notification` are
/// applied under one lock hold.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_commits: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `commit_notification` fail with a database error.
    pub fn set_fail_commits(&self, on: bool) {
        self.fail_commits.store(on, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Database("memory store lock poisoned".to_string()))
    }
}

fn newest_first(mut v: Vec<PriceObservation>) -> Vec<PriceObservation> {
    v.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| a.crop_id.cmp(&b.crop_id))
            .then_with(|| a.market_id.cmp(&b.market_id))
    });
    v
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }

    async fn get_user(&self, id: ObjectId) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut t = self.lock()?;
        if t.users.values().any(|u| u.phone_number == user.phone_number) {
            return Err(StoreError::Duplicate(format!("phone_number {}", user.phone_number)));
        }
        t.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_crop(&self, id: ObjectId) -> Result<Option<Crop>, StoreError> {
        Ok(self.lock()?.crops.get(&id).cloned())
    }

    async fn list_crops(&self) -> Result<Vec<Crop>, StoreError> {
        let mut v: Vec<Crop> = self.lock()?.crops.values().cloned().collect();
        v.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(v)
    }

    async fn insert_crop(&self, crop: &Crop) -> Result<(), StoreError> {
        let mut t = self.lock()?;
        if t.crops.values().any(|c| c.name == crop.name) {
            return Err(StoreError::Duplicate(format!("crop {}", crop.name)));
        }
        t.crops.insert(crop.id, crop.clone());
        Ok(())
    }

    async fn get_market(&self, id: ObjectId) -> Result<Option<Market>, StoreError> {
        Ok(self.lock()?.markets.get(&id).cloned())
    }

    async fn list_markets(&self) -> Result<Vec<Market>, StoreError> {
        let mut v: Vec<Market> = self.lock()?.markets.values().cloned().collect();
        v.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(v)
    }

    async fn insert_market(&self, market: &Market) -> Result<(), StoreError> {
        let mut t = self.lock()?;
        if t.markets.values().any(|m| m.name == market.name && m.region == market.region) {
            return Err(StoreError::Duplicate(format!("market {} ({})", market.name, market.region)));
        }
        t.markets.insert(market.id, market.clone());
        Ok(())
    }

    async fn get_alert(&self, id: ObjectId) -> Result<Option<Alert>, StoreError> {
        Ok(self.lock()?.alerts.get(&id).cloned())
    }

    async fn list_alerts(&self, filter: AlertFilter) -> Result<Vec<Alert>, StoreError> {
        let mut v: Vec<Alert> = self
            .lock()?
            .alerts
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        v.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(v)
    }

    async fn insert_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        let mut t = self.lock()?;
        let dup = t.alerts.values().any(|a| {
            a.user_id == alert.user_id && a.crop_id == alert.crop_id && a.market_id == alert.market_id
        });
        if dup {
            return Err(StoreError::Duplicate("alert for (user, crop, market)".to_string()));
        }
        t.alerts.insert(alert.id, alert.clone());
        Ok(())
    }

    async fn delete_alert(&self, id: ObjectId) -> Result<bool, StoreError> {
        Ok(self.lock()?.alerts.remove(&id).is_some())
    }

    async fn list_prices(&self, filter: PriceFilter) -> Result<Vec<PriceObservation>, StoreError> {
        let v = self
            .lock()?
            .prices
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        Ok(newest_first(v))
    }

    async fn insert_price(&self, price: &PriceObservation) -> Result<(), StoreError> {
        let mut t = self.lock()?;
        let dup = t.prices.iter().any(|p| {
            p.crop_id == price.crop_id && p.market_id == price.market_id && p.date == price.date
        });
        if dup {
            return Err(StoreError::Duplicate(format!("price for {}", price.date)));
        }
        t.prices.push(price.clone());
        Ok(())
    }

    async fn latest_price(
        &self,
        crop_id: ObjectId,
        market_id: ObjectId,
    ) -> Result<Option<PriceObservation>, StoreError> {
        Ok(self
            .lock()?
            .prices
            .iter()
            .filter(|p| p.crop_id == crop_id && p.market_id == market_id)
            .max_by_key(|p| p.date)
            .cloned())
    }

    async fn price_as_of(
        &self,
        crop_id: ObjectId,
        market_id: ObjectId,
        cutoff: NaiveDate,
    ) -> Result<Option<PriceObservation>, StoreError> {
        Ok(self
            .lock()?
            .prices
            .iter()
            .filter(|p| p.crop_id == crop_id && p.market_id == market_id && p.date <= cutoff)
            .max_by_key(|p| p.date)
            .cloned())
    }

    async fn append_notification(&self, record: &NotificationRecord) -> Result<(), StoreError> {
        self.lock()?.notifications.push(record.clone());
        Ok(())
    }

    async fn list_notifications(
        &self,
        user_id: Option<ObjectId>,
        limit: usize,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        let t = self.lock()?;
        Ok(t.notifications
            .iter()
            .rev()
            .filter(|n| user_id.is_none_or(|id| id == n.user_id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn latest_notification_for_alert(
        &self,
        alert_id: ObjectId,
    ) -> Result<Option<NotificationRecord>, StoreError> {
        Ok(self
            .lock()?
            .notifications
            .iter()
            .filter(|n| n.alert_id == Some(alert_id))
            .max_by_key(|n| n.sent_at)
            .cloned())
    }

    async fn counts(&self) -> Result<RecordCounts, StoreError> {
        let t = self.lock()?;
        Ok(RecordCounts {
            users: t.users.len() as u64,
            crops: t.crops.len() as u64,
            markets: t.markets.len() as u64,
            alerts: t.alerts.len() as u64,
            prices: t.prices.len() as u64,
            notifications: t.notifications.len() as u64,
            latest_price_date: t.prices.iter().map(|p| p.date).max(),
        })
    }

    async fn commit_notification(
        &self,
        alert_id: ObjectId,
        day_start: i64,
        sent_at: i64,
        record: &NotificationRecord,
    ) -> Result<Transition, StoreError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Database("injected commit failure".to_string()));
        }

        let mut t = self.lock()?;
        let Some(alert) = t.alerts.get_mut(&alert_id) else {
            return Ok(Transition::Rejected);
        };
        if alert.last_notified_at.is_some_and(|ts| ts >= day_start) {
            return Ok(Transition::Rejected);
        }

        alert.last_notified_at = Some(sent_at);
        alert.updated_at = Some(sent_at);
        t.notifications.push(record.clone());
        Ok(Transition::Applied)
    }
}
