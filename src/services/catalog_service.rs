use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    error::{ServiceError, StoreError},
    models::{Crop, Market},
    AppState,
};

const MAX_NAME_LEN: usize = 100;
const MAX_CROP_TYPE_LEN: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct AdminStats {
    pub total_users: u64,
    pub active_alerts: u64,
    pub total_crops: u64,
    pub total_markets: u64,
    pub total_prices: u64,
    pub total_notifications: u64,
    pub recent_updates: String,
}

fn required(field: &str, value: &str, max: usize) -> Result<String, ServiceError> {
    let v = value.trim();
    if v.is_empty() || v.chars().count() > max {
        return Err(ServiceError::Validation(format!(
            "{field} must be between 1 and {max} characters."
        )));
    }
    Ok(v.to_string())
}

pub async fn list_crops(state: &AppState) -> Result<Vec<Crop>, ServiceError> {
    Ok(state.store.list_crops().await?)
}

pub async fn create_crop(state: &AppState, name: &str, crop_type: Option<&str>) -> Result<Crop, ServiceError> {
    let mut crop = Crop::new(&required("Crop name", name, MAX_NAME_LEN)?);
    if let Some(t) = crop_type {
        crop.crop_type = required("Crop type", t, MAX_CROP_TYPE_LEN)?;
    }

    match state.store.insert_crop(&crop).await {
        Ok(()) => {}
        Err(StoreError::Duplicate(_)) => {
            return Err(ServiceError::Conflict("Crop with this name already exists".into()));
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(crop_id = %crop.id, name = %crop.name, "crop created");
    Ok(crop)
}

pub async fn list_markets(state: &AppState) -> Result<Vec<Market>, ServiceError> {
    Ok(state.store.list_markets().await?)
}

pub async fn create_market(state: &AppState, name: &str, region: &str) -> Result<Market, ServiceError> {
    let name = required("Market name", name, MAX_NAME_LEN)?;
    let region = required("Region", region, MAX_NAME_LEN)?;
    let market = Market::new(&name, &region);

    match state.store.insert_market(&market).await {
        Ok(()) => {}
        Err(StoreError::Duplicate(_)) => {
            return Err(ServiceError::Conflict(
                "Market with this name and region already exists".into(),
            ));
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(market_id = %market.id, name = %market.name, region = %market.region, "market created");
    Ok(market)
}

/// "Today", "1 day", "N days" since the newest price, or "None".
pub fn recent_updates_label(latest: Option<NaiveDate>, today: NaiveDate) -> String {
    let Some(latest) = latest else {
        return "None".to_string();
    };

    match (today - latest).num_days() {
        d if d <= 0 => "Today".to_string(),
        1 => "1 day".to_string(),
        d => format!("{d} days"),
    }
}

pub async fn admin_stats(state: &AppState) -> Result<AdminStats, ServiceError> {
    let counts = state.store.counts().await?;
    let today = state.dispatcher.now().date_naive();

    Ok(AdminStats {
        total_users: counts.users,
        active_alerts: counts.alerts,
        total_crops: counts.crops,
        total_markets: counts.markets,
        total_prices: counts.prices,
        total_notifications: counts.notifications,
        recent_updates: recent_updates_label(counts.latest_price_date, today),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn recent_updates_wording() {
        let today = d(2025, 3, 10);
        assert_eq!(recent_updates_label(None, today), "None");
        assert_eq!(recent_updates_label(Some(today), today), "Today");
        assert_eq!(recent_updates_label(Some(d(2025, 3, 9)), today), "1 day");
        assert_eq!(recent_updates_label(Some(d(2025, 3, 1)), today), "9 days");
    }
}
