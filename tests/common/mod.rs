#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use gebeyaalert::{
    config,
    error::TransportError,
    models::{Alert, Crop, Market, PriceObservation, User},
    services::{
        clock::FixedClock,
        dispatcher::Dispatcher,
        memory_store::MemoryStore,
        sms_service::SmsService,
        store::Store,
        twilio::TextSender,
    },
    AppState,
};

/// Records every message instead of sending it.
#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail: AtomicBool,
    pub delay: Mutex<Option<Duration>>,
}

impl RecordingSender {
    pub fn messages(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_fail(&self, on: bool) {
        self.fail.store(on, Ordering::SeqCst);
    }

    pub fn set_delay(&self, d: Duration) {
        *self.delay.lock().unwrap() = Some(d);
    }
}

#[async_trait]
impl TextSender for RecordingSender {
    async fn send_text(&self, to: &str, body: &str) -> Result<(), TransportError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(TransportError::Carrier { status: 503, message: "carrier down".into() });
        }
        self.sent.lock().unwrap().push((to.to_string(), body.to_string()));
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub sender: Arc<RecordingSender>,
    pub clock: Arc<FixedClock>,
    pub dispatcher: Arc<Dispatcher>,
    pub state: AppState,
    pub maize: Crop,
    pub adama: Market,
    pub farmer: User,
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

pub fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
}

pub async fn harness() -> Harness {
    harness_with(|sender| SmsService::new(sender, Duration::from_secs(5))).await
}

/// Same as [`harness`] with a caller-built SMS service around the recorder.
pub async fn harness_with(make_sms: impl FnOnce(Arc<RecordingSender>) -> SmsService) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let sender = Arc::new(RecordingSender::default());
    let clock = Arc::new(FixedClock::new(noon()));

    let dyn_store: Arc<dyn Store> = store.clone();
    let sms = make_sms(sender.clone());
    let dispatcher = Arc::new(Dispatcher::new(dyn_store, sms, clock.clone()));

    let mut settings = config::load();
    settings.jwt_secret = "test-secret".to_string();
    settings.jwt_cookie_name = "auth".to_string();
    let state = AppState::new(settings, dispatcher.clone());

    let maize = Crop::new("Maize");
    let adama = Market::new("Adama", "Oromia");
    let farmer = User::new("+251911234567");
    store.insert_crop(&maize).await.unwrap();
    store.insert_market(&adama).await.unwrap();
    store.insert_user(&farmer).await.unwrap();

    Harness { store, sender, clock, dispatcher, state, maize, adama, farmer }
}

impl Harness {
    pub async fn alert(&self, target: f64) -> Alert {
        let a = Alert::new(self.farmer.id, self.maize.id, self.adama.id, target);
        self.store.insert_alert(&a).await.unwrap();
        a
    }

    pub async fn price(&self, price: f64, date: NaiveDate) -> PriceObservation {
        let p = PriceObservation::new(self.maize.id, self.adama.id, price, date);
        self.store.insert_price(&p).await.unwrap();
        p
    }

    pub async fn reload(&self, alert: &Alert) -> Alert {
        self.store.get_alert(alert.id).await.unwrap().expect("alert exists")
    }

    pub async fn notification_count(&self) -> usize {
        self.store.list_notifications(None, 1000).await.unwrap().len()
    }
}
