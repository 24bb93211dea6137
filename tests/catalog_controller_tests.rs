mod common;

use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use gebeyaalert::{auth, models::User, routes, services::store::Store};
use tower::ServiceExt;

use common::{harness, today, Harness};

async fn response_body_string(res: axum::response::Response) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).to_string()
}

async fn admin_token(h: &Harness) -> String {
    let mut admin = User::new("+251922000000");
    admin.is_admin = true;
    h.store.insert_user(&admin).await.unwrap();
    auth::issue_token(&h.state.settings.jwt_secret, admin.id, 3600).unwrap()
}

fn farmer_token(h: &Harness) -> String {
    auth::issue_token(&h.state.settings.jwt_secret, h.farmer.id, 3600).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<axum::body::Body> {
    let mut b = Request::builder().uri(uri);
    if let Some(t) = token {
        b = b.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    b.body(axum::body::Body::empty()).unwrap()
}

fn post_json(uri: &str, token: Option<&str>, body: &str) -> Request<axum::body::Body> {
    let mut b = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(t) = token {
        b = b.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    b.body(axum::body::Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn crops_and_markets_are_public_and_expose_ids() {
    let h = harness().await;
    let app = routes::app(h.state.clone());

    let res = app.clone().oneshot(get("/crops", None)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let crops: serde_json::Value = serde_json::from_str(&response_body_string(res).await).unwrap();
    assert_eq!(crops[0]["id"], h.maize.id.to_hex());
    assert_eq!(crops[0]["name"], "Maize");
    assert_eq!(crops[0]["crop_type"], "Grain");

    let res = app.oneshot(get("/markets", None)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let markets: serde_json::Value = serde_json::from_str(&response_body_string(res).await).unwrap();
    assert_eq!(markets[0]["id"], h.adama.id.to_hex());
    assert_eq!(markets[0]["region"], "Oromia");
}

#[tokio::test]
async fn creating_crops_requires_admin_and_unique_names() {
    let h = harness().await;
    let token = admin_token(&h).await;
    let app = routes::app(h.state.clone());
    let body = r#"{"name":"Teff","crop_type":"Grain"}"#;

    let res = app.clone().oneshot(post_json("/crops", None, body)).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app.clone().oneshot(post_json("/crops", Some(&farmer_token(&h)), body)).await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app.clone().oneshot(post_json("/crops", Some(&token), body)).await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = serde_json::from_str(&response_body_string(res).await).unwrap();
    assert_eq!(created["name"], "Teff");

    let res = app.clone().oneshot(post_json("/crops", Some(&token), body)).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(response_body_string(res).await.contains("already exists"));

    let res = app.oneshot(post_json("/crops", Some(&token), r#"{"name":"   "}"#)).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    assert_eq!(h.store.list_crops().await.unwrap().len(), 2);
}

#[tokio::test]
async fn markets_are_unique_per_name_and_region() {
    let h = harness().await;
    let token = admin_token(&h).await;
    let app = routes::app(h.state.clone());

    let res = app
        .clone()
        .oneshot(post_json("/markets", Some(&token), r#"{"name":"Adama","region":"Oromia"}"#))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .oneshot(post_json("/markets", Some(&token), r#"{"name":"Adama","region":"Amhara"}"#))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    assert_eq!(h.store.list_markets().await.unwrap().len(), 2);
}

#[tokio::test]
async fn admin_stats_count_records() {
    let h = harness().await;
    let token = admin_token(&h).await;
    h.alert(100.0).await;
    h.price(90.0, today()).await;
    let app = routes::app(h.state.clone());

    let res = app.clone().oneshot(get("/admin/stats", Some(&farmer_token(&h)))).await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app.oneshot(get("/admin/stats", Some(&token))).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let stats: serde_json::Value = serde_json::from_str(&response_body_string(res).await).unwrap();
    assert_eq!(stats["total_users"], 2);
    assert_eq!(stats["active_alerts"], 1);
    assert_eq!(stats["total_crops"], 1);
    assert_eq!(stats["total_markets"], 1);
    assert_eq!(stats["total_prices"], 1);
    assert_eq!(stats["total_notifications"], 0);
    assert_eq!(stats["recent_updates"], "Today");
}
