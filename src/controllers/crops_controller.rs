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
    models::{Crop, CurrentUser},
    services::catalog_service,
    AppState,
};

use super::service_error;

fn crop_json(c: &Crop) -> serde_json::Value {
    json!({
        "id": c.id.to_hex(),
        "name": c.name,
        "crop_type": c.crop_type,
    })
}

pub async fn get_crops(State(state): State<AppState>) -> Response {
    match catalog_service::list_crops(&state).await {
        Ok(crops) => {
            let items: Vec<_> = crops.iter().map(crop_json).collect();
            (StatusCode::OK, Json(json!(items))).into_response()
        }
        Err(e) => service_error(e),
    }
}

#[derive(Deserialize)]
pub struct CreateCropBody {
    pub name: String,
    pub crop_type: Option<String>,
}

pub async fn post_create_crop(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Json(body): Json<CreateCropBody>,
) -> Response {
    let Some(Extension(u)) = user else {
        return auth::unauthorized();
    };
    if !u.is_admin {
        return auth::forbidden();
    }

    match catalog_service::create_crop(&state, &body.name, body.crop_type.as_deref()).await {
        Ok(crop) => (StatusCode::CREATED, Json(crop_json(&crop))).into_response(),
        Err(e) => service_error(e),
    }
}
