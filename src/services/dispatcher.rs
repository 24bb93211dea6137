//! Alert dispatch: the event-triggered path run after a price write and the
//! daily sweep over every alert. Both share [`Dispatcher::process_alert`].
//!
//! A successful SMS is followed by one conditional store transition
//! (`last_notified_at` + audit record). A failed SMS writes nothing, so the
//! alert is retried by whichever trigger comes next.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use mongodb::bson::oid::ObjectId;
use serde::Serialize;

use crate::{
    error::{DispatchError, PersistenceError, SweepError},
    models::{Alert, NotificationKind, NotificationRecord, PriceObservation},
};

use super::{
    alert_evaluator::{self, Decision, PairLabels, SkipReason, Verdict},
    clock::{self, Clock},
    notification_log::NotificationLog,
    price_lookup::PriceLookup,
    sms_service::{self, SmsService},
    store::{AlertFilter, Store, Transition},
    trend::{self, Trend},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepTally {
    pub total: usize,
    pub evaluated: usize,
    pub sent: usize,
    pub skipped: usize,
    pub errored: usize,
}

/// Result of the price-change broadcast for one new observation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BroadcastReport {
    pub change_pct: Option<f64>,
    pub triggered: bool,
    pub recipients: usize,
    pub sent: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PairDispatchReport {
    pub alerts: SweepTally,
    pub broadcast: BroadcastReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Sent,
    Skipped(SkipReason),
    // another path holds this alert right now
    InFlight,
    // deleted between listing and processing
    Gone,
}

impl SweepTally {
    fn record(&mut self, alert_id: ObjectId, res: Result<Outcome, DispatchError>) {
        self.evaluated += 1;
        match res {
            Ok(Outcome::Sent) => self.sent += 1,
            Ok(Outcome::Skipped(reason)) => {
                tracing::debug!(alert_id = %alert_id, ?reason, "alert skipped");
                self.skipped += 1;
            }
            Ok(Outcome::InFlight) => {
                tracing::debug!(alert_id = %alert_id, "alert already being dispatched elsewhere");
                self.skipped += 1;
            }
            Ok(Outcome::Gone) => {
                tracing::debug!(alert_id = %alert_id, "alert deleted before dispatch");
                self.skipped += 1;
            }
            Err(DispatchError::Persistence(e)) => {
                tracing::error!(
                    alert_id = %alert_id,
                    error = %e,
                    "data integrity: SMS was sent but the alert transition was not recorded"
                );
                self.errored += 1;
            }
            Err(e) => {
                tracing::warn!(alert_id = %alert_id, error = %e, "alert dispatch failed");
                self.errored += 1;
            }
        }
    }
}

/// Removes the alert id from the in-flight set when dropped.
struct Claim<'a> {
    set: &'a Mutex<HashSet<ObjectId>>,
    id: ObjectId,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.id);
        }
    }
}

pub struct Dispatcher {
    store: Arc<dyn Store>,
    prices: PriceLookup,
    log: NotificationLog,
    sms: SmsService,
    clock: Arc<dyn Clock>,
    change_threshold_pct: f64,
    sweep_lock: tokio::sync::Mutex<()>,
    in_flight: Mutex<HashSet<ObjectId>>,
    abort: AtomicBool,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn Store>, sms: SmsService, clock: Arc<dyn Clock>) -> Self {
        Self {
            prices: PriceLookup::new(store.clone()),
            log: NotificationLog::new(store.clone()),
            store,
            sms,
            clock,
            change_threshold_pct: trend::DEFAULT_CHANGE_THRESHOLD_PCT,
            sweep_lock: tokio::sync::Mutex::new(()),
            in_flight: Mutex::new(HashSet::new()),
            abort: AtomicBool::new(false),
        }
    }

    pub fn with_change_threshold(mut self, pct: f64) -> Self {
        self.change_threshold_pct = pct;
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn prices(&self) -> &PriceLookup {
        &self.prices
    }

    pub fn log(&self) -> &NotificationLog {
        &self.log
    }

    /// Current time on the dispatcher's clock.
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    pub fn sms_enabled(&self) -> bool {
        self.sms.is_enabled()
    }

    /// Asks a running sweep to stop before its next alert.
    pub fn request_abort(&self) {
        self.abort.store(true, Ordering::SeqCst);
    }

    /// Event-triggered path, called right after `new_obs` is stored.
    ///
    /// Evaluates every alert of the (crop, market) pair against `new_obs`,
    /// then runs the price-change broadcast. Only a failure to list the
    /// pair's alerts is returned as an error.
    pub async fn evaluate_and_dispatch_for_pair(
        &self,
        crop_id: ObjectId,
        market_id: ObjectId,
        new_obs: &PriceObservation,
    ) -> Result<PairDispatchReport, DispatchError> {
        let alerts = self
            .store
            .list_alerts(AlertFilter::for_pair(crop_id, market_id))
            .await?;

        let mut report = PairDispatchReport::default();
        report.alerts.total = alerts.len();
        if alerts.is_empty() {
            return Ok(report);
        }

        let mut labels: Option<PairLabels> = None;
        for alert in &alerts {
            let res = self.process_alert(alert, Some(new_obs), &mut labels).await;
            report.alerts.record(alert.id, res);
        }

        report.broadcast = self.broadcast_price_change(&alerts, new_obs, &mut labels).await;

        tracing::info!(
            crop_id = %crop_id,
            market_id = %market_id,
            date = %new_obs.date,
            sent = report.alerts.sent,
            skipped = report.alerts.skipped,
            errored = report.alerts.errored,
            broadcast_sent = report.broadcast.sent,
            "price event dispatched"
        );

        Ok(report)
    }

    /// Full scan of every alert against its pair's latest observation.
    ///
    /// Overlapping invocations are refused with [`SweepError::AlreadyRunning`].
    pub async fn run_daily_sweep(&self) -> Result<SweepTally, SweepError> {
        let _running = self
            .sweep_lock
            .try_lock()
            .map_err(|_| SweepError::AlreadyRunning)?;
        self.abort.store(false, Ordering::SeqCst);

        let alerts = self
            .store
            .list_alerts(AlertFilter::all())
            .await
            .map_err(SweepError::LoadAlerts)?;

        let mut tally = SweepTally { total: alerts.len(), ..SweepTally::default() };
        tracing::info!(total = tally.total, "starting alert sweep");

        // one price lookup per pair
        let mut by_pair: HashMap<(ObjectId, ObjectId), Vec<Alert>> = HashMap::new();
        for a in alerts {
            by_pair.entry(a.pair()).or_default().push(a);
        }

        'pairs: for ((crop_id, market_id), group) in by_pair {
            let latest = match self.prices.latest(crop_id, market_id).await {
                Ok(obs) => obs,
                Err(e) => {
                    tracing::warn!(
                        crop_id = %crop_id,
                        market_id = %market_id,
                        error = %e,
                        "price lookup failed, pair skipped"
                    );
                    tally.evaluated += group.len();
                    tally.errored += group.len();
                    continue;
                }
            };
            let mut labels: Option<PairLabels> = None;

            for alert in &group {
                if self.abort.load(Ordering::SeqCst) {
                    tracing::warn!(evaluated = tally.evaluated, "alert sweep aborted");
                    break 'pairs;
                }

                let res = self.process_alert(alert, latest.as_ref(), &mut labels).await;
                tally.record(alert.id, res);
            }
        }

        tracing::info!(
            total = tally.total,
            evaluated = tally.evaluated,
            sent = tally.sent,
            skipped = tally.skipped,
            errored = tally.errored,
            "alert sweep completed"
        );

        Ok(tally)
    }

    fn claim(&self, id: ObjectId) -> Option<Claim<'_>> {
        let mut set = self.in_flight.lock().ok()?;
        if !set.insert(id) {
            return None;
        }
        Some(Claim { set: &self.in_flight, id })
    }

    async fn labels_for(
        &self,
        crop_id: ObjectId,
        market_id: ObjectId,
        cache: &mut Option<PairLabels>,
    ) -> Result<PairLabels, DispatchError> {
        if let Some(l) = cache {
            return Ok(l.clone());
        }

        let crop = self
            .store
            .get_crop(crop_id)
            .await?
            .ok_or(DispatchError::NotFound { entity: "crop", id: crop_id })?;
        let market = self
            .store
            .get_market(market_id)
            .await?
            .ok_or(DispatchError::NotFound { entity: "market", id: market_id })?;

        let labels = PairLabels { crop: crop.name, market: market.name };
        *cache = Some(labels.clone());
        Ok(labels)
    }

    /// Shared per-alert routine: evaluate, send, then record atomically.
    async fn process_alert(
        &self,
        listed: &Alert,
        latest: Option<&PriceObservation>,
        labels: &mut Option<PairLabels>,
    ) -> Result<Outcome, DispatchError> {
        let Some(_claim) = self.claim(listed.id) else {
            return Ok(Outcome::InFlight);
        };

        // re-read under the claim so a send recorded after listing is seen
        let Some(alert) = self.store.get_alert(listed.id).await? else {
            return Ok(Outcome::Gone);
        };

        let now = self.clock.now();

        // labels and recipient are only resolved for a trigger
        let verdict = alert_evaluator::check(&alert, latest, now);
        if let Verdict::Skip(reason) = verdict {
            return Ok(Outcome::Skipped(reason));
        }

        if alert.last_notified_at.is_none() && self.log.sent_today(alert.id, now).await? {
            return Ok(Outcome::Skipped(SkipReason::AlreadySentToday));
        }

        let labels = self.labels_for(alert.crop_id, alert.market_id, labels).await?;
        let user = self
            .store
            .get_user(alert.user_id)
            .await?
            .ok_or(DispatchError::NotFound { entity: "user", id: alert.user_id })?;

        let body = match verdict.into_decision(&alert, &labels) {
            Decision::Send(body) => body,
            Decision::Skip(reason) => return Ok(Outcome::Skipped(reason)),
        };
        self.sms.send(&user.phone_number, &body).await?;

        let record = NotificationRecord::new(
            user.id,
            Some(alert.id),
            NotificationKind::TargetReached,
            sms_service::format_message(&body, sms_service::MAX_SMS_LENGTH),
            now.timestamp(),
        );

        let day_start = clock::day_start(now.date_naive());
        match self
            .store
            .commit_notification(alert.id, day_start, now.timestamp(), &record)
            .await
        {
            Ok(Transition::Applied) => {
                tracing::info!(alert_id = %alert.id, user_id = %user.id, "price alert sent");
                Ok(Outcome::Sent)
            }
            Ok(Transition::Rejected) => Err(PersistenceError::Conflict(alert.id).into()),
            Err(e) => Err(PersistenceError::Store(e).into()),
        }
    }

    /// Price-moved SMS to every owner of an alert on the pair.
    ///
    /// There is no per-day guard here. At most one broadcast per pair per day
    /// holds only because prices are unique per (crop, market, date); if that
    /// write constraint is relaxed, this needs its own dedup.
    async fn broadcast_price_change(
        &self,
        alerts: &[Alert],
        new_obs: &PriceObservation,
        labels: &mut Option<PairLabels>,
    ) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        let change: Option<Trend> =
            match trend::trend_for(&self.prices, new_obs, trend::CHANGE_TREND_DAYS).await {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!(error = %e, "price change lookup failed");
                    return report;
                }
            };

        let Some(change) = change else {
            return report;
        };
        report.change_pct = Some(change.pct);

        if !trend::is_significant(&change, self.change_threshold_pct) {
            tracing::debug!(pct = change.pct, "price change below broadcast threshold");
            return report;
        }
        report.triggered = true;

        let labels = match self.labels_for(new_obs.crop_id, new_obs.market_id, labels).await {
            Ok(l) => l,
            Err(e) => {
                tracing::error!(error = %e, "cannot build price change message");
                return report;
            }
        };

        let message = format!(
            "Price Update: {} at {} has {} to {:.2} {}. Change: {:.1}%",
            labels.crop,
            labels.market,
            change.direction(),
            new_obs.price,
            alert_evaluator::CURRENCY,
            change.pct.abs()
        );

        for alert in alerts {
            report.recipients += 1;

            let user = match self.store.get_user(alert.user_id).await {
                Ok(Some(u)) => u,
                Ok(None) => {
                    tracing::warn!(user_id = %alert.user_id, "price change recipient not found");
                    report.failed += 1;
                    continue;
                }
                Err(e) => {
                    tracing::error!(user_id = %alert.user_id, error = %e, "price change recipient lookup failed");
                    report.failed += 1;
                    continue;
                }
            };

            if let Err(e) = self.sms.send(&user.phone_number, &message).await {
                tracing::error!(user_id = %user.id, error = %e, "failed to send price change notification");
                report.failed += 1;
                continue;
            }

            report.sent += 1;
            let record = NotificationRecord::new(
                user.id,
                None,
                NotificationKind::PriceChange,
                sms_service::format_message(&message, sms_service::MAX_SMS_LENGTH),
                self.clock.now().timestamp(),
            );
            if let Err(e) = self.log.append(&record).await {
                tracing::error!(user_id = %user.id, error = %e, "price change notification sent but not logged");
            }
        }

        report
    }
}
