use mongodb::{
    bson::doc,
    options::IndexOptions,
    Database, IndexModel,
};

use super::mongo_store::{ALERTS, CROPS, MARKETS, NOTIFICATIONS, PRICES, USERS};

pub async fn ensure_indexes(db: &Database) -> Result<(), String> {
    // users: unique phone number
    {
        let col = db.collection::<mongodb::bson::Document>(USERS);
        let model = IndexModel::builder()
            .keys(doc! { "phone_number": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    // crops: unique name
    {
        let col = db.collection::<mongodb::bson::Document>(CROPS);
        let model = IndexModel::builder()
            .keys(doc! { "name": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    // markets: unique (name, region)
    {
        let col = db.collection::<mongodb::bson::Document>(MARKETS);
        let model = IndexModel::builder()
            .keys(doc! { "name": 1, "region": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    // alerts: one per (user, crop, market)
    {
        let col = db.collection::<mongodb::bson::Document>(ALERTS);
        let model = IndexModel::builder()
            .keys(doc! { "user_id": 1, "crop_id": 1, "market_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    // alerts: event path scans by pair
    {
        let col = db.collection::<mongodb::bson::Document>(ALERTS);
        let model = IndexModel::builder()
            .keys(doc! { "crop_id": 1, "market_id": 1 })
            .build();

        let _ = col.create_index(model, None).await;
    }

    // prices: one per (crop, market, date); also serves latest/as-of lookups
    {
        let col = db.collection::<mongodb::bson::Document>(PRICES);
        let model = IndexModel::builder()
            .keys(doc! { "crop_id": 1, "market_id": 1, "date": -1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    // notification_logs: per-user history and per-alert dedup fallback
    {
        let col = db.collection::<mongodb::bson::Document>(NOTIFICATIONS);
        for keys in [
            doc! { "user_id": 1, "sent_at": -1 },
            doc! { "alert_id": 1, "sent_at": -1 },
        ] {
            let model = IndexModel::builder().keys(keys).build();
            let _ = col.create_index(model, None).await;
        }
    }

    Ok(())
}
