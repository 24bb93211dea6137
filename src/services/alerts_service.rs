use mongodb::bson::oid::ObjectId;
use serde::Serialize;

use crate::{
    error::{ServiceError, StoreError},
    models::Alert,
    AppState,
};

use super::store::AlertFilter;

/// Alert row for the owner's dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct AlertDetails {
    pub id: String,
    pub crop_id: String,
    pub market_id: String,
    pub crop: String,
    pub market: String,
    pub market_region: String,
    pub target_price: f64,
    pub current_price: Option<f64>,
    pub is_met: bool,
    pub last_sent_at: Option<i64>,
    pub created_at: i64,
}

pub async fn list_user_alerts(state: &AppState, user_id: ObjectId) -> Result<Vec<Alert>, ServiceError> {
    Ok(state.store.list_alerts(AlertFilter::for_user(user_id)).await?)
}

pub async fn create_alert(
    state: &AppState,
    user_id: ObjectId,
    crop_id: ObjectId,
    market_id: ObjectId,
    target_price: f64,
) -> Result<Alert, ServiceError> {
    if !target_price.is_finite() || target_price <= 0.0 {
        return Err(ServiceError::Validation("Target price must be positive.".into()));
    }

    if state.store.get_crop(crop_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("Crop with ID {} not found", crop_id.to_hex())));
    }
    if state.store.get_market(market_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("Market with ID {} not found", market_id.to_hex())));
    }

    let existing = state
        .store
        .list_alerts(AlertFilter {
            user_id: Some(user_id),
            crop_id: Some(crop_id),
            market_id: Some(market_id),
        })
        .await?;
    if let Some(a) = existing.first() {
        return Err(ServiceError::Conflict(format!(
            "Alert already exists for this crop and market (ID: {}). Delete it first.",
            a.id.to_hex()
        )));
    }

    let alert = Alert::new(user_id, crop_id, market_id, target_price);
    match state.store.insert_alert(&alert).await {
        Ok(()) => {}
        Err(StoreError::Duplicate(_)) => {
            return Err(ServiceError::Conflict("Alert already exists for this crop and market.".into()));
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(alert_id = %alert.id, user_id = %user_id, target_price, "alert created");
    Ok(alert)
}

pub async fn delete_alert(state: &AppState, user_id: ObjectId, alert_id: ObjectId) -> Result<(), ServiceError> {
    let Some(alert) = state.store.get_alert(alert_id).await? else {
        return Err(ServiceError::NotFound("Alert not found".into()));
    };

    if alert.user_id != user_id {
        return Err(ServiceError::Forbidden(
            "You don't have permission to access this alert".into(),
        ));
    }

    state.store.delete_alert(alert_id).await?;
    tracing::info!(alert_id = %alert_id, user_id = %user_id, "alert deleted");
    Ok(())
}

pub async fn list_user_alerts_with_details(
    state: &AppState,
    user_id: ObjectId,
) -> Result<Vec<AlertDetails>, ServiceError> {
    let alerts = list_user_alerts(state, user_id).await?;
    let prices = state.dispatcher.prices();

    let mut items = Vec::with_capacity(alerts.len());
    for a in alerts {
        let crop = state.store.get_crop(a.crop_id).await?;
        let market = state.store.get_market(a.market_id).await?;
        let (Some(crop), Some(market)) = (crop, market) else {
            continue;
        };

        let current_price = prices.latest(a.crop_id, a.market_id).await?.map(|p| p.price);
        let is_met = current_price.is_some_and(|p| p >= a.target_price);

        items.push(AlertDetails {
            id: a.id.to_hex(),
            crop_id: a.crop_id.to_hex(),
            market_id: a.market_id.to_hex(),
            crop: crop.name,
            market: market.name,
            market_region: market.region,
            target_price: a.target_price,
            current_price,
            is_met,
            last_sent_at: a.last_notified_at,
            created_at: a.created_at,
        });
    }

    Ok(items)
}
