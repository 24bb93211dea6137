use axum::{Router, routing::get};
use crate::{AppState, controllers::{crops_controller, markets_controller}};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/crops", get(crops_controller::get_crops).post(crops_controller::post_create_crop))
        .route("/markets", get(markets_controller::get_markets).post(markets_controller::post_create_market))
}
