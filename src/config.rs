use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub store_backend: StoreBackend,
    pub host: String,
    pub port: u16,

    pub jwt_secret: String,
    pub jwt_cookie_name: String,

    pub sms_enabled: bool,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_phone_number: String,
    pub sms_timeout_secs: u64,

    pub sweep_enabled: bool,
    pub sweep_hour_utc: u32,
    pub price_change_threshold_pct: f64,
    pub seed_reference_data: bool,
}

fn flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let mongodb_uri = env::var("MONGODB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

    let mongodb_db = env::var("MONGODB_DB")
        .unwrap_or_else(|_| "gebeyaalert".to_string());

    let store_backend = match env::var("STORE_BACKEND").as_deref() {
        Ok("memory") => StoreBackend::Memory,
        _ => StoreBackend::Mongo,
    };

    let host = env::var("HOST")
        .unwrap_or_else(|_| "127.0.0.1".to_string());

    let port = env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| "change-me-dev-secret".to_string());
    let jwt_cookie_name = env::var("JWT_COOKIE_NAME").unwrap_or_else(|_| "auth".to_string());

    let sms_enabled = flag("SMS_ENABLED", true);
    let twilio_account_sid = env::var("TWILIO_ACCOUNT_SID").unwrap_or_default();
    let twilio_auth_token = env::var("TWILIO_AUTH_TOKEN").unwrap_or_default();
    let twilio_phone_number = env::var("TWILIO_PHONE_NUMBER").unwrap_or_default();
    let sms_timeout_secs = env::var("SMS_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|s| *s > 0)
        .unwrap_or(5);

    let sweep_enabled = flag("SWEEP_ENABLED", true);
    let sweep_hour_utc = env::var("SWEEP_HOUR_UTC")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .filter(|h| *h < 24)
        .unwrap_or(9);

    let price_change_threshold_pct = env::var("PRICE_CHANGE_THRESHOLD_PCT")
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|p| p.is_finite() && *p > 0.0)
        .unwrap_or(crate::services::trend::DEFAULT_CHANGE_THRESHOLD_PCT);

    let seed_reference_data = flag("SEED_REFERENCE_DATA", true);

    Settings {
        mongodb_uri,
        mongodb_db,
        store_backend,
        host,
        port,
        jwt_secret,
        jwt_cookie_name,
        sms_enabled,
        twilio_account_sid,
        twilio_auth_token,
        twilio_phone_number,
        sms_timeout_secs,
        sweep_enabled,
        sweep_hour_utc,
        price_change_threshold_pct,
        seed_reference_data,
    }
}
