use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use mongodb::bson::oid::ObjectId;
use serde::Serialize;

use crate::{
    error::{ServiceError, StoreError},
    models::PriceObservation,
    AppState,
};

use super::{
    dispatcher::PairDispatchReport,
    store::PriceFilter,
    trend::{self, DISPLAY_TREND_DAYS},
};

/// Latest observation of one pair with its 7-day movement.
#[derive(Debug, Clone, Serialize)]
pub struct LatestPrice {
    pub id: String,
    pub crop_name: String,
    pub crop_type: String,
    pub market_name: String,
    pub market_region: String,
    pub price: f64,
    pub price_date: NaiveDate,
    // 0 when there is no observation a week back
    pub price_change_7d: f64,
    pub price_change_pct_7d: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct CreatedPrice {
    pub price: PriceObservation,
    // absent when dispatch could not run; the price is stored either way
    pub dispatch: Option<PairDispatchReport>,
}

/// Years 0001..=9999 only. Dates are stored as `YYYY-MM-DD` strings and
/// compared in text order, which holds only for four-digit years.
pub fn is_supported_date(date: &NaiveDate) -> bool {
    (1..=9999).contains(&date.year())
}

pub async fn list_prices(state: &AppState, filter: PriceFilter) -> Result<Vec<PriceObservation>, ServiceError> {
    Ok(state.store.list_prices(filter).await?)
}

/// Stores a new observation, then runs the event-triggered dispatch for its
/// pair. A dispatch failure is logged and never fails the write.
pub async fn create_price(
    state: &AppState,
    crop_id: ObjectId,
    market_id: ObjectId,
    price: f64,
    date: NaiveDate,
) -> Result<CreatedPrice, ServiceError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(ServiceError::Validation("Price must be positive.".into()));
    }
    if !is_supported_date(&date) {
        return Err(ServiceError::Validation("Price date must be between 0001-01-01 and 9999-12-31.".into()));
    }

    if state.store.get_crop(crop_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("Crop with ID {} not found", crop_id.to_hex())));
    }
    if state.store.get_market(market_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("Market with ID {} not found", market_id.to_hex())));
    }

    let obs = PriceObservation::new(crop_id, market_id, price, date);
    match state.store.insert_price(&obs).await {
        Ok(()) => {}
        Err(StoreError::Duplicate(_)) => {
            return Err(ServiceError::Conflict(
                "Price already exists for this crop, market, and date.".into(),
            ));
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(price_id = %obs.id, crop_id = %crop_id, market_id = %market_id, %date, price, "price recorded");

    let dispatch = match state
        .dispatcher
        .evaluate_and_dispatch_for_pair(crop_id, market_id, &obs)
        .await
    {
        Ok(report) => Some(report),
        Err(e) => {
            tracing::error!(price_id = %obs.id, error = %e, "price event dispatch failed");
            None
        }
    };

    Ok(CreatedPrice { price: obs, dispatch })
}

pub async fn latest_prices_with_details(state: &AppState, limit: usize) -> Result<Vec<LatestPrice>, ServiceError> {
    let all = state.store.list_prices(PriceFilter::default()).await?;
    let lookup = state.dispatcher.prices();

    let mut seen: HashSet<(ObjectId, ObjectId)> = HashSet::new();
    let mut out: Vec<LatestPrice> = Vec::new();

    for obs in all {
        if !seen.insert((obs.crop_id, obs.market_id)) {
            continue;
        }

        let crop = state.store.get_crop(obs.crop_id).await?;
        let market = state.store.get_market(obs.market_id).await?;
        let (Some(crop), Some(market)) = (crop, market) else {
            continue;
        };

        let t = trend::trend_for(lookup, &obs, DISPLAY_TREND_DAYS).await?;

        out.push(LatestPrice {
            id: obs.id.to_hex(),
            crop_name: crop.name,
            crop_type: crop.crop_type,
            market_name: market.name,
            market_region: market.region,
            price: obs.price,
            price_date: obs.date,
            price_change_7d: t.map(|t| t.delta).unwrap_or(0.0),
            price_change_pct_7d: t.map(|t| t.pct),
        });

        if out.len() >= limit {
            break;
        }
    }

    Ok(out)
}
