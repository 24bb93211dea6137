use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use gebeyaalert::{
    config::{self, StoreBackend},
    routes,
    services::{
        alert_monitor,
        clock::SystemClock,
        db_init,
        dispatcher::Dispatcher,
        memory_store::MemoryStore,
        mongo_store::MongoStore,
        seed,
        sms_service::SmsService,
        store::Store,
    },
    AppState,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = config::load();

    let store: Arc<dyn Store> = match settings.store_backend {
        StoreBackend::Mongo => {
            let mongo = MongoStore::connect(&settings.mongodb_uri, &settings.mongodb_db)
                .await
                .expect("Failed to connect to MongoDB");
            db_init::ensure_indexes(mongo.database())
                .await
                .expect("Failed to create MongoDB indexes");
            Arc::new(mongo)
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    if settings.seed_reference_data {
        if let Err(e) = seed::seed_reference_data(store.as_ref()).await {
            tracing::error!(error = %e, "failed to seed reference data");
        }
    }

    let sms = SmsService::from_settings(&settings);
    let dispatcher = Arc::new(
        Dispatcher::new(store, sms, Arc::new(SystemClock))
            .with_change_threshold(settings.price_change_threshold_pct),
    );

    if settings.sweep_enabled {
        alert_monitor::spawn_daily_sweep(dispatcher.clone(), settings.sweep_hour_utc);
    } else {
        tracing::info!("daily alert sweep disabled");
    }

    let state = AppState::new(settings.clone(), dispatcher);
    let app = routes::app(state);

    let ip = settings
        .host
        .parse::<std::net::IpAddr>()
        .expect("HOST must be an IP address");
    let addr = SocketAddr::from((ip, settings.port));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("server error");
}
