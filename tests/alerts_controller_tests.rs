mod common;

use axum::{
    http::{header, Request, StatusCode},
    routing::{delete, get},
    Router,
};
use http_body_util::BodyExt;
use mongodb::bson::oid::ObjectId;
use gebeyaalert::{
    controllers::alerts_controller,
    models::{Alert, CurrentUser},
    services::store::Store,
};
use tower::ServiceExt;

use common::{harness, today, Harness};

async fn response_body_string(res: axum::response::Response) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).to_string()
}

fn app(h: &Harness) -> Router {
    Router::new()
        .route("/alerts", get(alerts_controller::get_alerts).post(alerts_controller::post_create_alert))
        .route("/alerts/:id", delete(alerts_controller::delete_alert))
        .with_state(h.state.clone())
}

fn as_farmer(h: &Harness) -> CurrentUser {
    CurrentUser { id: h.farmer.id, phone_number: h.farmer.phone_number.clone(), is_admin: false }
}

fn create_request(h: &Harness, body: String) -> Request<axum::body::Body> {
    let mut req = Request::builder()
        .method("POST")
        .uri("/alerts")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(body))
        .unwrap();
    req.extensions_mut().insert(as_farmer(h));
    req
}

#[tokio::test]
async fn get_alerts_unauthorized_returns_401() {
    let h = harness().await;
    let req = Request::builder().uri("/alerts").body(axum::body::Body::empty()).unwrap();

    let res = app(&h).oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body = response_body_string(res).await;
    assert!(body.to_lowercase().contains("unauthorized"));
}

#[tokio::test]
async fn create_alert_returns_201_and_rejects_duplicates() {
    let h = harness().await;
    let body = format!(
        r#"{{"crop_id":"{}","market_id":"{}","target_price":100.0}}"#,
        h.maize.id.to_hex(),
        h.adama.id.to_hex()
    );

    let res = app(&h).oneshot(create_request(&h, body.clone())).await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = app(&h).oneshot(create_request(&h, body)).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let text = response_body_string(res).await;
    assert!(text.contains("already exists"));

    let alerts = h.store.list_alerts(Default::default()).await.unwrap();
    assert_eq!(alerts.len(), 1);
}

#[tokio::test]
async fn create_alert_validates_target_and_references() {
    let h = harness().await;

    let negative = format!(
        r#"{{"crop_id":"{}","market_id":"{}","target_price":-5}}"#,
        h.maize.id.to_hex(),
        h.adama.id.to_hex()
    );
    let res = app(&h).oneshot(create_request(&h, negative)).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let unknown_crop = format!(
        r#"{{"crop_id":"{}","market_id":"{}","target_price":10}}"#,
        ObjectId::new().to_hex(),
        h.adama.id.to_hex()
    );
    let res = app(&h).oneshot(create_request(&h, unknown_crop)).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let bad_id = r#"{"crop_id":"nope","market_id":"nope","target_price":10}"#.to_string();
    let res = app(&h).oneshot(create_request(&h, bad_id)).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_alerts_lists_current_price_and_met_flag() {
    let h = harness().await;
    h.alert(100.0).await;
    h.price(120.0, today()).await;

    let mut req = Request::builder().uri("/alerts").body(axum::body::Body::empty()).unwrap();
    req.extensions_mut().insert(as_farmer(&h));

    let res = app(&h).oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: serde_json::Value = serde_json::from_str(&response_body_string(res).await).unwrap();
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["crop"], "Maize");
    assert_eq!(items[0]["market"], "Adama");
    assert_eq!(items[0]["current_price"], 120.0);
    assert_eq!(items[0]["is_met"], true);
}

#[tokio::test]
async fn delete_alert_checks_ownership() {
    let h = harness().await;
    let someone_else = ObjectId::new();
    let theirs = Alert::new(someone_else, h.maize.id, h.adama.id, 80.0);
    h.store.insert_alert(&theirs).await.unwrap();
    let mine = h.alert(100.0).await;

    let mut req = Request::builder()
        .method("DELETE")
        .uri(format!("/alerts/{}", theirs.id.to_hex()))
        .body(axum::body::Body::empty())
        .unwrap();
    req.extensions_mut().insert(as_farmer(&h));
    let res = app(&h).oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let mut req = Request::builder()
        .method("DELETE")
        .uri(format!("/alerts/{}", mine.id.to_hex()))
        .body(axum::body::Body::empty())
        .unwrap();
    req.extensions_mut().insert(as_farmer(&h));
    let res = app(&h).oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(h.store.get_alert(mine.id).await.unwrap().is_none());

    let mut req = Request::builder()
        .method("DELETE")
        .uri(format!("/alerts/{}", mine.id.to_hex()))
        .body(axum::body::Body::empty())
        .unwrap();
    req.extensions_mut().insert(as_farmer(&h));
    let res = app(&h).oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
