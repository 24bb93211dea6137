use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth,
    models::{CurrentUser, Market},
    services::catalog_service,
    AppState,
};

use super::service_error;

fn market_json(m: &Market) -> serde_json::Value {
    json!({
        "id": m.id.to_hex(),
        "name": m.name,
        "region": m.region,
    })
}

pub async fn get_markets(State(state): State<AppState>) -> Response {
    match catalog_service::list_markets(&state).await {
        Ok(markets) => {
            let items: Vec<_> = markets.iter().map(market_json).collect();
            (StatusCode::OK, Json(json!(items))).into_response()
        }
        Err(e) => service_error(e),
    }
}

#[derive(Deserialize)]
pub struct CreateMarketBody {
    pub name: String,
    pub region: String,
}

pub async fn post_create_market(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Json(body): Json<CreateMarketBody>,
) -> Response {
    let Some(Extension(u)) = user else {
        return auth::unauthorized();
    };
    if !u.is_admin {
        return auth::forbidden();
    }

    match catalog_service::create_market(&state, &body.name, &body.region).await {
        Ok(market) => (StatusCode::CREATED, Json(market_json(&market))).into_response(),
        Err(e) => service_error(e),
    }
}
