mod common;

use sea_orm::{ConnectionTrait, Statement};
use serde_json::{json, Value};
use uuid::Uuid;

async fn admin_token(app: &common::TestApp) -> String {
    let (id, token) = common::create_test_user(app, "admin", "buyer").await;
    common::make_admin(&app.db, id).await;
    token
}

#[tokio::test]
async fn test_create_car_missing_year_is_rejected() {
    let app = common::spawn_app().await;
    let (_, token) = common::create_test_user(&app, "seller", "seller").await;
    let brand = common::unique("NoYear");

    let resp = app
        .client
        .post(app.url("/cars"))
        .bearer_auth(&token)
        .json(&json!({ "brand": brand, "model": "Jazz", "price": 150_000_000 }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Brand, model, tahun, dan harga wajib diisi");

    let row = app
        .db
        .query_one(Statement::from_sql_and_values(
            sea_orm::DatabaseBackend::Postgres,
            "SELECT COUNT(*) AS n FROM cars WHERE brand = $1",
            vec![brand.into()],
        ))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.try_get::<i64>("", "n").unwrap(), 0);
}

#[tokio::test]
async fn test_new_car_starts_pending() {
    let app = common::spawn_app().await;
    let (token, car_id) = common::create_test_car(&app).await;

    let body: Value = app
        .client
        .get(app.url(&format!("/cars/{}", car_id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["isVerified"], false);
}

#[tokio::test]
async fn test_approve_then_views_are_counted() {
    let app = common::spawn_app().await;
    let (_, car_id) = common::create_test_car(&app).await;
    let admin = admin_token(&app).await;

    let resp = app
        .client
        .put(app.url(&format!("/cars/{}/approve", car_id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["status"], "available");
    assert_eq!(body["data"]["isVerified"], true);

    let mut last = Value::Null;
    for _ in 0..3 {
        last = app
            .client
            .get(app.url(&format!("/cars/{}", car_id)))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
    }
    assert_eq!(last["data"]["viewCount"], 3);
}

#[tokio::test]
async fn test_seller_cannot_approve_own_car() {
    let app = common::spawn_app().await;
    let (token, car_id) = common::create_test_car(&app).await;

    let resp = app
        .client
        .put(app.url(&format!("/cars/{}/approve", car_id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn test_update_by_other_seller_is_forbidden() {
    let app = common::spawn_app().await;
    let (_, car_id) = common::create_test_car(&app).await;
    let (_, other) = common::create_test_user(&app, "other", "seller").await;

    let resp = app
        .client
        .put(app.url(&format!("/cars/{}", car_id)))
        .bearer_auth(&other)
        .json(&json!({ "price": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn test_mark_sold_requires_available_listing() {
    let app = common::spawn_app().await;
    let (token, car_id) = common::create_test_car(&app).await;

    // Still pending
    let resp = app
        .client
        .put(app.url(&format!("/cars/{}/sold", car_id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let admin = admin_token(&app).await;
    app.client
        .put(app.url(&format!("/cars/{}/approve", car_id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();

    let resp = app
        .client
        .put(app.url(&format!("/cars/{}/sold", car_id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["status"], "sold");
}

#[tokio::test]
async fn test_list_filters_by_brand_and_defaults_to_available() {
    let app = common::spawn_app().await;
    let (_, seller) = common::create_test_user(&app, "lister", "seller").await;
    let admin = admin_token(&app).await;
    let brand = common::unique("Brand");

    let mut ids = Vec::new();
    for (model, year) in [("Alpha", 2019), ("Beta", 2022)] {
        let body: Value = app
            .client
            .post(app.url("/cars"))
            .bearer_auth(&seller)
            .json(&json!({ "brand": brand, "model": model, "year": year, "price": 100_000_000 }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        ids.push(Uuid::parse_str(body["data"]["id"].as_str().unwrap()).unwrap());
    }

    // Only the first one is approved; the second stays pending
    app.client
        .put(app.url(&format!("/cars/{}/approve", ids[0])))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();

    let body: Value = app
        .client
        .get(app.url(&format!("/cars?brand={}", brand)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], ids[0].to_string());
    assert_eq!(body["data"]["pagination"]["totalItems"], 1);

    let body: Value = app
        .client
        .get(app.url(&format!("/cars?brand={}&status=pending", brand)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["model"], "Beta");
}

#[tokio::test]
async fn test_unknown_transmission_filter_is_rejected() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .get(app.url("/cars?transmission=hover"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_huge_page_number_returns_empty_page() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .get(app.url("/cars?page=18446744073709551615&limit=100"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 0);
}
