mod common;

use axum::http::{header, Request, StatusCode};
use chrono::Days;
use http_body_util::BodyExt;
use gebeyaalert::{auth, routes, services::store::Store};
use tower::ServiceExt;

use common::{harness, today, Harness};

async fn response_body_string(res: axum::response::Response) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).to_string()
}

async fn admin_token(h: &Harness) -> String {
    let mut admin = gebeyaalert::models::User::new("+251922000000");
    admin.is_admin = true;
    h.store.insert_user(&admin).await.unwrap();
    auth::issue_token(&h.state.settings.jwt_secret, admin.id, 3600).unwrap()
}

fn post_price(token: Option<&str>, body: String) -> Request<axum::body::Body> {
    let mut b = Request::builder()
        .method("POST")
        .uri("/prices")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(t) = token {
        b = b.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    b.body(axum::body::Body::from(body)).unwrap()
}

fn price_body(h: &Harness, price: f64, date: &str) -> String {
    format!(
        r#"{{"crop_id":"{}","market_id":"{}","price":{price},"date":"{date}"}}"#,
        h.maize.id.to_hex(),
        h.adama.id.to_hex()
    )
}

#[tokio::test]
async fn health_is_public() {
    let h = harness().await;
    let app = routes::app(h.state.clone());

    let req = Request::builder().uri("/health").body(axum::body::Body::empty()).unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(response_body_string(res).await.contains("ok"));
}

#[tokio::test]
async fn posting_price_requires_admin() {
    let h = harness().await;
    let app = routes::app(h.state.clone());

    let res = app.clone().oneshot(post_price(None, price_body(&h, 120.0, "2025-03-10"))).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let farmer_token = auth::issue_token(&h.state.settings.jwt_secret, h.farmer.id, 3600).unwrap();
    let res = app
        .oneshot(post_price(Some(&farmer_token), price_body(&h, 120.0, "2025-03-10")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    assert!(h.store.list_prices(Default::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn posting_price_dispatches_alerts_for_the_pair() {
    let h = harness().await;
    let alert = h.alert(100.0).await;
    let token = admin_token(&h).await;
    let app = routes::app(h.state.clone());

    let res = app
        .clone()
        .oneshot(post_price(Some(&token), price_body(&h, 120.0, "2025-03-10")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let body: serde_json::Value = serde_json::from_str(&response_body_string(res).await).unwrap();
    assert_eq!(body["price"]["price"], 120.0);
    assert_eq!(body["dispatch"]["alerts"]["sent"], 1);

    assert_eq!(h.sender.messages().len(), 1);
    assert!(h.reload(&alert).await.last_notified_at.is_some());

    // one observation per pair per day
    let res = app
        .oneshot(post_price(Some(&token), price_body(&h, 130.0, "2025-03-10")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(h.sender.messages().len(), 1);
}

#[tokio::test]
async fn posting_price_validates_input() {
    let h = harness().await;
    let token = admin_token(&h).await;
    let app = routes::app(h.state.clone());

    let res = app
        .clone()
        .oneshot(post_price(Some(&token), price_body(&h, 0.0, "2025-03-10")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .oneshot(post_price(Some(&token), price_body(&h, 10.0, "10/03/2025")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn latest_prices_include_weekly_change() {
    let h = harness().await;
    h.price(100.0, today().checked_sub_days(Days::new(7)).unwrap()).await;
    h.price(110.0, today()).await;
    let app = routes::app(h.state.clone());

    let req = Request::builder().uri("/prices/latest?limit=5").body(axum::body::Body::empty()).unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: serde_json::Value = serde_json::from_str(&response_body_string(res).await).unwrap();
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["crop_name"], "Maize");
    assert_eq!(items[0]["price"], 110.0);
    assert_eq!(items[0]["price_change_7d"], 10.0);

    let req = Request::builder().uri("/prices/latest?limit=0").body(axum::body::Body::empty()).unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn prices_can_be_filtered_by_date() {
    let h = harness().await;
    h.price(100.0, today().checked_sub_days(Days::new(1)).unwrap()).await;
    h.price(105.0, today()).await;
    let app = routes::app(h.state.clone());

    let req = Request::builder()
        .uri(format!("/prices?crop_id={}&date=2025-03-09", h.maize.id.to_hex()))
        .body(axum::body::Body::empty())
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: serde_json::Value = serde_json::from_str(&response_body_string(res).await).unwrap();
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["price"], 100.0);
    assert_eq!(items[0]["date"], "2025-03-09");
}

#[tokio::test]
async fn latest_prices_tolerate_earliest_representable_date() {
    let h = harness().await;
    h.price(80.0, chrono::NaiveDate::MIN).await;
    let app = routes::app(h.state.clone());

    let req = Request::builder().uri("/prices/latest").body(axum::body::Body::empty()).unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: serde_json::Value = serde_json::from_str(&response_body_string(res).await).unwrap();
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["price_change_7d"], 0.0);
}

#[tokio::test]
async fn posting_price_rejects_dates_outside_four_digit_years() {
    let h = harness().await;
    h.alert(100.0).await;
    let token = admin_token(&h).await;
    let app = routes::app(h.state.clone());

    for date in ["-262143-01-01", "10000-01-01", "0000-12-31"] {
        let res = app
            .clone()
            .oneshot(post_price(Some(&token), price_body(&h, 120.0, date)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "date {date}");
    }

    assert!(h.store.list_prices(Default::default()).await.unwrap().is_empty());
    assert!(h.sender.messages().is_empty());
}
