//! Price movement between an observation and an earlier reference.

use chrono::Days;
use serde::Serialize;

use crate::{error::StoreError, models::PriceObservation};

use super::price_lookup::PriceLookup;

/// Look-back for the "latest prices" read view.
pub const DISPLAY_TREND_DAYS: u64 = 7;
/// Look-back for the price-change broadcast.
pub const CHANGE_TREND_DAYS: u64 = 1;
/// Default minimum absolute percent move that is worth a broadcast.
pub const DEFAULT_CHANGE_THRESHOLD_PCT: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trend {
    pub reference_price: f64,
    pub delta: f64,
    pub pct: f64,
}

impl Trend {
    pub fn direction(&self) -> &'static str {
        if self.delta >= 0.0 { "increased" } else { "decreased" }
    }
}

/// `None` when there is no usable reference (absent, zero or non-finite).
pub fn compute(current: f64, reference: Option<f64>) -> Option<Trend> {
    let reference = reference?;
    if reference == 0.0 || !reference.is_finite() || !current.is_finite() {
        return None;
    }

    let delta = current - reference;
    Some(Trend {
        reference_price: reference,
        delta,
        pct: delta / reference * 100.0,
    })
}

/// Inclusive on the send side: exactly `threshold_pct` is significant.
pub fn is_significant(trend: &Trend, threshold_pct: f64) -> bool {
    trend.pct.abs() >= threshold_pct
}

/// Trend of `obs` against the pair's observation at or before `obs.date - days`.
pub async fn trend_for(
    lookup: &PriceLookup,
    obs: &PriceObservation,
    days: u64,
) -> Result<Option<Trend>, StoreError> {
    // no reference exists before the earliest representable date
    let Some(cutoff) = obs.date.checked_sub_days(Days::new(days)) else {
        return Ok(None);
    };
    let reference = lookup.as_of(obs.crop_id, obs.market_id, cutoff).await?;
    Ok(compute(obs.price, reference.map(|p| p.price)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_reference_no_trend() {
        assert_eq!(compute(120.0, None), None);
        assert_eq!(compute(120.0, Some(0.0)), None);
    }

    #[test]
    fn rise_and_drop() {
        let up = compute(110.0, Some(100.0)).unwrap();
        assert_eq!(up.delta, 10.0);
        assert_eq!(up.pct, 10.0);
        assert_eq!(up.direction(), "increased");

        let down = compute(94.0, Some(100.0)).unwrap();
        assert_eq!(down.delta, -6.0);
        assert_eq!(down.direction(), "decreased");
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        let below = compute(104.99, Some(100.0)).unwrap();
        assert!(!is_significant(&below, DEFAULT_CHANGE_THRESHOLD_PCT));

        let at = compute(105.0, Some(100.0)).unwrap();
        assert!(is_significant(&at, DEFAULT_CHANGE_THRESHOLD_PCT));

        let drop_at = compute(95.0, Some(100.0)).unwrap();
        assert!(is_significant(&drop_at, DEFAULT_CHANGE_THRESHOLD_PCT));
    }

    #[test]
    fn small_moves_are_suppressed() {
        let t = compute(97.0, Some(100.0)).unwrap();
        assert!(!is_significant(&t, DEFAULT_CHANGE_THRESHOLD_PCT));
        let t = compute(94.0, Some(100.0)).unwrap();
        assert!(is_significant(&t, DEFAULT_CHANGE_THRESHOLD_PCT));
    }

    #[tokio::test]
    async fn earliest_date_has_no_reference() {
        use std::sync::Arc;

        use chrono::NaiveDate;
        use mongodb::bson::oid::ObjectId;

        use crate::services::memory_store::MemoryStore;

        let lookup = PriceLookup::new(Arc::new(MemoryStore::new()));
        let obs = PriceObservation::new(ObjectId::new(), ObjectId::new(), 50.0, NaiveDate::MIN);

        let t = trend_for(&lookup, &obs, CHANGE_TREND_DAYS).await.unwrap();
        assert_eq!(t, None);
    }
}
