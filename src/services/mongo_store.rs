use async_trait::async_trait;
use chrono::NaiveDate;
use futures_util::StreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::options::{FindOneOptions, FindOptions};
use mongodb::{Client, Collection, Database};
use serde::de::DeserializeOwned;

use crate::{
    error::StoreError,
    models::{Alert, Crop, Market, NotificationRecord, PriceObservation, User},
};

use super::store::{AlertFilter, PriceFilter, RecordCounts, Store, Transition};

pub const USERS: &str = "users";
pub const CROPS: &str = "crops";
pub const MARKETS: &str = "markets";
pub const ALERTS: &str = "alerts";
pub const PRICES: &str = "prices";
pub const NOTIFICATIONS: &str = "notification_logs";

/// MongoDB-backed store. `commit_notification` runs in a multi-document
/// transaction, which needs a replica set (a single-node one is enough).
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(db_name);
        Ok(Self { client, db })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn col<T>(&self, name: &str) -> Collection<T> {
        self.db.collection::<T>(name)
    }
}

async fn collect<T>(col: &Collection<T>, filter: Document, opts: FindOptions) -> Result<Vec<T>, StoreError>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let mut cursor = col.find(filter, opts).await?;

    let mut items: Vec<T> = Vec::new();
    while let Some(res) = cursor.next().await {
        items.push(res?);
    }
    Ok(items)
}

fn alert_query(f: &AlertFilter) -> Document {
    let mut q = Document::new();
    if let Some(id) = f.user_id {
        q.insert("user_id", id);
    }
    if let Some(id) = f.crop_id {
        q.insert("crop_id", id);
    }
    if let Some(id) = f.market_id {
        q.insert("market_id", id);
    }
    q
}

fn price_query(f: &PriceFilter) -> Document {
    let mut q = Document::new();
    if let Some(id) = f.crop_id {
        q.insert("crop_id", id);
    }
    if let Some(id) = f.market_id {
        q.insert("market_id", id);
    }
    if let Some(d) = f.date {
        q.insert("date", d.to_string());
    }
    q
}

#[async_trait]
impl Store for MongoStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }

    async fn get_user(&self, id: ObjectId) -> Result<Option<User>, StoreError> {
        Ok(self.col::<User>(USERS).find_one(doc! { "_id": id }, None).await?)
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        self.col::<User>(USERS).insert_one(user, None).await?;
        Ok(())
    }

    async fn get_crop(&self, id: ObjectId) -> Result<Option<Crop>, StoreError> {
        Ok(self.col::<Crop>(CROPS).find_one(doc! { "_id": id }, None).await?)
    }

    async fn list_crops(&self) -> Result<Vec<Crop>, StoreError> {
        let opts = FindOptions::builder().sort(doc! { "name": 1 }).build();
        collect(&self.col::<Crop>(CROPS), doc! {}, opts).await
    }

    async fn insert_crop(&self, crop: &Crop) -> Result<(), StoreError> {
        self.col::<Crop>(CROPS).insert_one(crop, None).await?;
        Ok(())
    }

    async fn get_market(&self, id: ObjectId) -> Result<Option<Market>, StoreError> {
        Ok(self.col::<Market>(MARKETS).find_one(doc! { "_id": id }, None).await?)
    }

    async fn list_markets(&self) -> Result<Vec<Market>, StoreError> {
        let opts = FindOptions::builder().sort(doc! { "name": 1 }).build();
        collect(&self.col::<Market>(MARKETS), doc! {}, opts).await
    }

    async fn insert_market(&self, market: &Market) -> Result<(), StoreError> {
        self.col::<Market>(MARKETS).insert_one(market, None).await?;
        Ok(())
    }

    async fn get_alert(&self, id: ObjectId) -> Result<Option<Alert>, StoreError> {
        Ok(self.col::<Alert>(ALERTS).find_one(doc! { "_id": id }, None).await?)
    }

    async fn list_alerts(&self, filter: AlertFilter) -> Result<Vec<Alert>, StoreError> {
        let opts = FindOptions::builder()
            .sort(doc! { "created_at": -1, "_id": -1 })
            .build();
        collect(&self.col::<Alert>(ALERTS), alert_query(&filter), opts).await
    }

    async fn insert_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        self.col::<Alert>(ALERTS).insert_one(alert, None).await?;
        Ok(())
    }

    async fn delete_alert(&self, id: ObjectId) -> Result<bool, StoreError> {
        let res = self
            .col::<Alert>(ALERTS)
            .delete_one(doc! { "_id": id }, None)
            .await?;
        Ok(res.deleted_count > 0)
    }

    async fn list_prices(&self, filter: PriceFilter) -> Result<Vec<PriceObservation>, StoreError> {
        let opts = FindOptions::builder()
            .sort(doc! { "date": -1, "crop_id": 1, "market_id": 1 })
            .build();
        collect(&self.col::<PriceObservation>(PRICES), price_query(&filter), opts).await
    }

    async fn insert_price(&self, price: &PriceObservation) -> Result<(), StoreError> {
        self.col::<PriceObservation>(PRICES).insert_one(price, None).await?;
        Ok(())
    }

    async fn latest_price(
        &self,
        crop_id: ObjectId,
        market_id: ObjectId,
    ) -> Result<Option<PriceObservation>, StoreError> {
        let opts = FindOneOptions::builder().sort(doc! { "date": -1 }).build();
        Ok(self
            .col::<PriceObservation>(PRICES)
            .find_one(doc! { "crop_id": crop_id, "market_id": market_id }, opts)
            .await?)
    }

    async fn price_as_of(
        &self,
        crop_id: ObjectId,
        market_id: ObjectId,
        cutoff: NaiveDate,
    ) -> Result<Option<PriceObservation>, StoreError> {
        let opts = FindOneOptions::builder().sort(doc! { "date": -1 }).build();
        Ok(self
            .col::<PriceObservation>(PRICES)
            .find_one(
                doc! {
                    "crop_id": crop_id,
                    "market_id": market_id,
                    "date": { "$lte": cutoff.to_string() },
                },
                opts,
            )
            .await?)
    }

    async fn append_notification(&self, record: &NotificationRecord) -> Result<(), StoreError> {
        self.col::<NotificationRecord>(NOTIFICATIONS)
            .insert_one(record, None)
            .await?;
        Ok(())
    }

    async fn list_notifications(
        &self,
        user_id: Option<ObjectId>,
        limit: usize,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        let filter = match user_id {
            Some(id) => doc! { "user_id": id },
            None => doc! {},
        };
        let opts = FindOptions::builder()
            .sort(doc! { "sent_at": -1 })
            .limit(limit as i64)
            .build();
        collect(&self.col::<NotificationRecord>(NOTIFICATIONS), filter, opts).await
    }

    async fn latest_notification_for_alert(
        &self,
        alert_id: ObjectId,
    ) -> Result<Option<NotificationRecord>, StoreError> {
        let opts = FindOneOptions::builder().sort(doc! { "sent_at": -1 }).build();
        Ok(self
            .col::<NotificationRecord>(NOTIFICATIONS)
            .find_one(doc! { "alert_id": alert_id }, opts)
            .await?)
    }

    async fn counts(&self) -> Result<RecordCounts, StoreError> {
        let opts = FindOneOptions::builder().sort(doc! { "date": -1 }).build();
        let latest = self
            .col::<PriceObservation>(PRICES)
            .find_one(doc! {}, opts)
            .await?;

        Ok(RecordCounts {
            users: self.col::<Document>(USERS).count_documents(doc! {}, None).await?,
            crops: self.col::<Document>(CROPS).count_documents(doc! {}, None).await?,
            markets: self.col::<Document>(MARKETS).count_documents(doc! {}, None).await?,
            alerts: self.col::<Document>(ALERTS).count_documents(doc! {}, None).await?,
            prices: self.col::<Document>(PRICES).count_documents(doc! {}, None).await?,
            notifications: self.col::<Document>(NOTIFICATIONS).count_documents(doc! {}, None).await?,
            latest_price_date: latest.map(|p| p.date),
        })
    }

    async fn commit_notification(
        &self,
        alert_id: ObjectId,
        day_start: i64,
        sent_at: i64,
        record: &NotificationRecord,
    ) -> Result<Transition, StoreError> {
        let alerts = self.col::<Alert>(ALERTS);
        let logs = self.col::<NotificationRecord>(NOTIFICATIONS);

        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let res = alerts
            .update_one_with_session(
                doc! {
                    "_id": alert_id,
                    "$or": [
                        { "last_notified_at": null },
                        { "last_notified_at": { "$lt": day_start } },
                    ],
                },
                doc! { "$set": { "last_notified_at": sent_at, "updated_at": sent_at } },
                None,
                &mut session,
            )
            .await;

        let matched = match res {
            Ok(r) => r.matched_count > 0,
            Err(e) => {
                let _ = session.abort_transaction().await;
                return Err(e.into());
            }
        };

        if !matched {
            let _ = session.abort_transaction().await;
            return Ok(Transition::Rejected);
        }

        if let Err(e) = logs.insert_one_with_session(record, None, &mut session).await {
            let _ = session.abort_transaction().await;
            return Err(e.into());
        }

        session.commit_transaction().await?;
        Ok(Transition::Applied)
    }
}
