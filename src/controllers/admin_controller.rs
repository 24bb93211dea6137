use axum::{
    extract::{Extension, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::{auth, error::SweepError, models::CurrentUser, services::catalog_service, AppState};

use super::{error_response, parse_id, service_error};

fn admin(user: Option<Extension<CurrentUser>>) -> Result<CurrentUser, Response> {
    match user {
        Some(Extension(u)) if u.is_admin => Ok(u),
        Some(_) => Err(auth::forbidden()),
        None => Err(auth::unauthorized()),
    }
}

pub async fn post_run_sweep(State(state): State<AppState>, user: Option<Extension<CurrentUser>>) -> Response {
    let u = match admin(user) {
        Ok(u) => u,
        Err(res) => return res,
    };
    tracing::info!(user_id = %u.id, "manual alert sweep requested");

    match state.dispatcher.run_daily_sweep().await {
        Ok(tally) => (StatusCode::OK, Json(json!(tally))).into_response(),
        Err(SweepError::AlreadyRunning) => error_response(StatusCode::CONFLICT, "a sweep is already running"),
        Err(e) => {
            tracing::error!(error = %e, "manual alert sweep failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[derive(Deserialize)]
pub struct NotificationsQuery {
    pub user_id: Option<String>,
    pub limit: Option<usize>,
}

pub async fn get_notifications(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Query(q): Query<NotificationsQuery>,
) -> Response {
    if let Err(res) = admin(user) {
        return res;
    }

    let limit = q.limit.unwrap_or(50).clamp(1, 500);
    let log = state.dispatcher.log();

    let res = match q.user_id.as_deref() {
        Some(raw) => match parse_id(raw, "user") {
            Ok(id) => log.list_for_user(id, limit).await,
            Err(res) => return res,
        },
        None => log.list_recent(limit).await,
    };

    match res {
        Ok(records) => {
            let items: Vec<_> = records
                .iter()
                .map(|r| {
                    json!({
                        "id": r.id.to_hex(),
                        "user_id": r.user_id.to_hex(),
                        "alert_id": r.alert_id.map(|id| id.to_hex()),
                        "kind": r.kind,
                        "message": r.message,
                        "sent_at": r.sent_at,
                    })
                })
                .collect();
            (StatusCode::OK, Json(json!(items))).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to read notification log");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

pub async fn get_stats(State(state): State<AppState>, user: Option<Extension<CurrentUser>>) -> Response {
    if let Err(res) = admin(user) {
        return res;
    }

    match catalog_service::admin_stats(&state).await {
        Ok(stats) => (StatusCode::OK, Json(json!(stats))).into_response(),
        Err(e) => service_error(e),
    }
}
