pub mod store;
pub mod mongo_store;
pub mod memory_store;
pub mod db_init;
pub mod seed;
pub mod clock;

pub mod price_lookup;
pub mod trend;
pub mod alert_evaluator;
pub mod notification_log;
pub mod phone;
pub mod twilio;
pub mod sms_service;
pub mod dispatcher;
pub mod alert_monitor;

pub mod alerts_service;
pub mod prices_service;
pub mod catalog_service;
