use axum::{Router, routing::{get, post}};
use crate::{AppState, controllers::admin_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/admin/sweep", post(admin_controller::post_run_sweep))
        .route("/admin/notifications", get(admin_controller::get_notifications))
        .route("/admin/stats", get(admin_controller::get_stats))
}
