use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::{auth, models::CurrentUser, services::alerts_service, AppState};

use super::{parse_id, service_error};

pub async fn get_alerts(State(state): State<AppState>, user: Option<Extension<CurrentUser>>) -> Response {
    let Some(Extension(u)) = user else {
        return auth::unauthorized();
    };

    match alerts_service::list_user_alerts_with_details(&state, u.id).await {
        Ok(items) => (StatusCode::OK, Json(json!(items))).into_response(),
        Err(e) => service_error(e),
    }
}

#[derive(Deserialize)]
pub struct CreateAlertBody {
    pub crop_id: String,
    pub market_id: String,
    pub target_price: f64,
}

pub async fn post_create_alert(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Json(body): Json<CreateAlertBody>,
) -> Response {
    let Some(Extension(u)) = user else {
        return auth::unauthorized();
    };

    let crop_id = match parse_id(&body.crop_id, "crop") {
        Ok(id) => id,
        Err(res) => return res,
    };
    let market_id = match parse_id(&body.market_id, "market") {
        Ok(id) => id,
        Err(res) => return res,
    };

    match alerts_service::create_alert(&state, u.id, crop_id, market_id, body.target_price).await {
        Ok(a) => (
            StatusCode::CREATED,
            Json(json!({
                "id": a.id.to_hex(),
                "crop_id": a.crop_id.to_hex(),
                "market_id": a.market_id.to_hex(),
                "target_price": a.target_price,
                "created_at": a.created_at,
            })),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}

pub async fn delete_alert(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Path(id): Path<String>,
) -> Response {
    let Some(Extension(u)) = user else {
        return auth::unauthorized();
    };

    let alert_id = match parse_id(&id, "alert") {
        Ok(id) => id,
        Err(res) => return res,
    };

    match alerts_service::delete_alert(&state, u.id, alert_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => service_error(e),
    }
}
