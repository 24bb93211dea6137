//! SEND / SKIP decision for a single alert. No I/O.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Alert, PriceObservation};

pub const CURRENCY: &str = "ETB";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoData,
    ThresholdNotMet,
    AlreadySentToday,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Skip(SkipReason),
    Send(String),
}

/// The decision before a message body is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Skip(SkipReason),
    Trigger { price: f64 },
}

/// Display names used in the message body.
#[derive(Debug, Clone)]
pub struct PairLabels {
    pub crop: String,
    pub market: String,
}

pub fn price_alert_message(labels: &PairLabels, current_price: f64, target_price: f64) -> String {
    format!(
        "Price Alert: {} at {} is now {:.2} {CURRENCY}. Your target: {:.2} {CURRENCY}",
        labels.crop, labels.market, current_price, target_price
    )
}

/// True when `last` falls on the same UTC calendar day as `now`.
pub fn sent_on_same_day(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    last.is_some_and(|ts| ts.date_naive() == now.date_naive())
}

/// Rules, in order:
/// 1. no observation -> skip (no data)
/// 2. price below target -> skip (threshold not met); reaching the target exactly counts
/// 3. already notified on today's UTC date -> skip
/// 4. otherwise trigger
pub fn check(alert: &Alert, latest: Option<&PriceObservation>, now: DateTime<Utc>) -> Verdict {
    let Some(price) = latest else {
        return Verdict::Skip(SkipReason::NoData);
    };

    if price.price < alert.target_price {
        return Verdict::Skip(SkipReason::ThresholdNotMet);
    }

    if sent_on_same_day(alert.last_notified(), now) {
        return Verdict::Skip(SkipReason::AlreadySentToday);
    }

    Verdict::Trigger { price: price.price }
}

impl Verdict {
    /// Attaches the message body to a trigger.
    pub fn into_decision(self, alert: &Alert, labels: &PairLabels) -> Decision {
        match self {
            Verdict::Skip(reason) => Decision::Skip(reason),
            Verdict::Trigger { price } => {
                Decision::Send(price_alert_message(labels, price, alert.target_price))
            }
        }
    }
}

/// [`check`] plus the message body for a trigger.
pub fn evaluate(
    alert: &Alert,
    latest: Option<&PriceObservation>,
    labels: &PairLabels,
    now: DateTime<Utc>,
) -> Decision {
    check(alert, latest, now).into_decision(alert, labels)
}
