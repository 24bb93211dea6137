use axum::{
    extract::{Extension, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth,
    models::{CurrentUser, PriceObservation},
    services::{prices_service, store::PriceFilter},
    AppState,
};

use super::{error_response, parse_id, service_error};

fn price_json(p: &PriceObservation) -> serde_json::Value {
    json!({
        "id": p.id.to_hex(),
        "crop_id": p.crop_id.to_hex(),
        "market_id": p.market_id.to_hex(),
        "price": p.price,
        "date": p.date,
        "created_at": p.created_at,
    })
}

fn parse_date(raw: &str) -> Result<NaiveDate, Response> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .ok()
        .filter(prices_service::is_supported_date)
        .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "date must be YYYY-MM-DD"))
}

#[derive(Deserialize)]
pub struct PricesQuery {
    pub crop_id: Option<String>,
    pub market_id: Option<String>,
    pub date: Option<String>,
}

pub async fn get_prices(State(state): State<AppState>, Query(q): Query<PricesQuery>) -> Response {
    let mut filter = PriceFilter::default();

    if let Some(raw) = q.crop_id.as_deref() {
        match parse_id(raw, "crop") {
            Ok(id) => filter.crop_id = Some(id),
            Err(res) => return res,
        }
    }
    if let Some(raw) = q.market_id.as_deref() {
        match parse_id(raw, "market") {
            Ok(id) => filter.market_id = Some(id),
            Err(res) => return res,
        }
    }
    if let Some(raw) = q.date.as_deref() {
        match parse_date(raw) {
            Ok(d) => filter.date = Some(d),
            Err(res) => return res,
        }
    }

    match prices_service::list_prices(&state, filter).await {
        Ok(items) => {
            let items: Vec<_> = items.iter().map(price_json).collect();
            (StatusCode::OK, Json(json!(items))).into_response()
        }
        Err(e) => service_error(e),
    }
}

#[derive(Deserialize)]
pub struct LatestQuery {
    pub limit: Option<usize>,
}

pub async fn get_latest_prices(State(state): State<AppState>, Query(q): Query<LatestQuery>) -> Response {
    let limit = q.limit.unwrap_or(10);
    if !(1..=100).contains(&limit) {
        return error_response(StatusCode::BAD_REQUEST, "limit must be between 1 and 100");
    }

    match prices_service::latest_prices_with_details(&state, limit).await {
        Ok(items) => (StatusCode::OK, Json(json!(items))).into_response(),
        Err(e) => service_error(e),
    }
}

#[derive(Deserialize)]
pub struct CreatePriceBody {
    pub crop_id: String,
    pub market_id: String,
    pub price: f64,
    pub date: String,
}

pub async fn post_create_price(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Json(body): Json<CreatePriceBody>,
) -> Response {
    let Some(Extension(u)) = user else {
        return auth::unauthorized();
    };
    if !u.is_admin {
        return auth::forbidden();
    }

    let crop_id = match parse_id(&body.crop_id, "crop") {
        Ok(id) => id,
        Err(res) => return res,
    };
    let market_id = match parse_id(&body.market_id, "market") {
        Ok(id) => id,
        Err(res) => return res,
    };
    let date = match parse_date(&body.date) {
        Ok(d) => d,
        Err(res) => return res,
    };

    match prices_service::create_price(&state, crop_id, market_id, body.price, date).await {
        Ok(created) => (
            StatusCode::CREATED,
            Json(json!({
                "price": price_json(&created.price),
                "dispatch": created.dispatch,
            })),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}
