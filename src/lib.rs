//! Library entrypoint for GebeyaAlert.
//!
//! This file exists mainly to make controller and dispatch tests easy
//! (integration tests under `tests/` can import the app state, routers,
//! controllers, services).

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod models;

// Kept at crate root so handlers reference it as `crate::auth`.
#[path = "middleware/auth.rs"]
pub mod auth;

pub mod services;

pub mod controllers;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn services::store::Store>,
    pub settings: config::Settings,
    pub dispatcher: Arc<services::dispatcher::Dispatcher>,
}

impl AppState {
    pub fn new(settings: config::Settings, dispatcher: Arc<services::dispatcher::Dispatcher>) -> Self {
        Self {
            store: dispatcher.store().clone(),
            settings,
            dispatcher,
        }
    }
}
