use mongodb::bson::oid::ObjectId;

/// Failures of the record store backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("duplicate record: {0}")]
    Duplicate(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(e: mongodb::error::Error) -> Self {
        let msg = e.to_string();
        if msg.contains("E11000") {
            StoreError::Duplicate(msg)
        } else {
            StoreError::Database(msg)
        }
    }
}

/// Outbound SMS failures. Every variant is treated as transient by the
/// dispatcher: nothing is persisted and the alert retries on the next trigger.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("SMS service is not enabled or not configured")]
    Disabled,

    #[error("message rejected before sending: {0}")]
    Rejected(String),

    #[error("SMS send timed out after {0}s")]
    Timeout(u64),

    #[error("SMS request failed: {0}")]
    Network(String),

    #[error("carrier returned HTTP {status}: {message}")]
    Carrier { status: u16, message: String },
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError::Network(e.to_string())
    }
}

/// The atomic alert-transition write failed after the SMS went out.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("alert {0} was already marked notified today by another dispatch")]
    Conflict(ObjectId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Per-alert failure inside a dispatch pass. Never aborts the pass.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: ObjectId },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("notification sent but not recorded: {0}")]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Whole-sweep failures. Only these are reported to the sweep's caller as errors.
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("a sweep is already running")]
    AlreadyRunning,

    #[error("failed to load alerts: {0}")]
    LoadAlerts(#[source] StoreError),
}

/// Errors surfaced by the request-facing services and mapped to HTTP statuses.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
