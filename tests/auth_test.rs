mod common;

use sea_orm::{ConnectionTrait, Statement};
use serde_json::{json, Value};

async fn count_users_with_email(app: &common::TestApp, email: &str) -> i64 {
    let row = app
        .db
        .query_one(Statement::from_sql_and_values(
            sea_orm::DatabaseBackend::Postgres,
            "SELECT COUNT(*) AS n FROM users WHERE email = $1",
            vec![email.into()],
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get::<i64>("", "n").unwrap()
}

#[tokio::test]
async fn test_register_returns_tokens_and_buyer_role() {
    let app = common::spawn_app().await;
    let username = common::unique("reg");

    let resp = app
        .client
        .post(app.url("/auth/register"))
        .json(&json!({
            "username": username,
            "email": format!("{}@Test.COM", username),
            "password": common::PASSWORD,
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["role"], "buyer");
    assert_eq!(
        body["data"]["user"]["email"],
        format!("{}@test.com", username)
    );
    assert!(body["data"]["token"].as_str().is_some());
    assert!(body["data"]["refreshToken"].as_str().is_some());
}

#[tokio::test]
async fn test_register_duplicate_email_is_rejected() {
    let app = common::spawn_app().await;
    let username = common::unique("dup");
    let email = format!("{}@test.com", username);

    let first = app
        .client
        .post(app.url("/auth/register"))
        .json(&json!({ "username": username, "email": email, "password": common::PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 201);

    let second = app
        .client
        .post(app.url("/auth/register"))
        .json(&json!({
            "username": common::unique("dup"),
            "email": email,
            "password": common::PASSWORD,
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(second.status(), 400);
    let body: Value = second.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Email sudah terdaftar");
    assert_eq!(count_users_with_email(&app, &email).await, 1);
}

#[tokio::test]
async fn test_register_cannot_pick_admin_role() {
    let app = common::spawn_app().await;
    let username = common::unique("sneaky");

    let resp = app
        .client
        .post(app.url("/auth/register"))
        .json(&json!({
            "username": username,
            "email": format!("{}@test.com", username),
            "password": common::PASSWORD,
            "role": "admin",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_login_wrong_password_keeps_last_login() {
    let app = common::spawn_app().await;
    let (user_id, _) = common::create_test_user(&app, "login", "buyer").await;
    let email: String = app
        .db
        .query_one(Statement::from_sql_and_values(
            sea_orm::DatabaseBackend::Postgres,
            "SELECT email FROM users WHERE id = $1",
            vec![user_id.into()],
        ))
        .await
        .unwrap()
        .unwrap()
        .try_get("", "email")
        .unwrap();

    let resp = app
        .client
        .post(app.url("/auth/login"))
        .json(&json!({ "email": email, "password": "salah_sekali" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Email atau password salah");

    let last_login: Option<chrono::NaiveDateTime> = app
        .db
        .query_one(Statement::from_sql_and_values(
            sea_orm::DatabaseBackend::Postgres,
            "SELECT last_login FROM users WHERE id = $1",
            vec![user_id.into()],
        ))
        .await
        .unwrap()
        .unwrap()
        .try_get("", "last_login")
        .unwrap();
    assert!(last_login.is_none());

    let resp = app
        .client
        .post(app.url("/auth/login"))
        .json(&json!({ "email": email, "password": common::PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"]["user"]["lastLogin"].is_string());
}

#[tokio::test]
async fn test_profile_requires_token() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .get(app.url("/auth/profile"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let (user_id, token) = common::create_test_user(&app, "prof", "seller").await;
    let resp = app
        .client
        .get(app.url("/auth/profile"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["id"], user_id.to_string());
    assert_eq!(body["data"]["role"], "seller");
}

#[tokio::test]
async fn test_refresh_token_issues_new_pair() {
    let app = common::spawn_app().await;
    let username = common::unique("refresh");

    let body: Value = app
        .client
        .post(app.url("/auth/register"))
        .json(&json!({
            "username": username,
            "email": format!("{}@test.com", username),
            "password": common::PASSWORD,
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let access = body["data"]["token"].as_str().unwrap().to_string();
    let refresh = body["data"]["refreshToken"].as_str().unwrap().to_string();

    let resp = app
        .client
        .post(app.url("/auth/refresh-token"))
        .json(&json!({ "refreshToken": refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"]["token"].as_str().is_some());
    assert!(body["data"]["refreshToken"].as_str().is_some());

    // An access token is not accepted where a refresh token is expected
    let resp = app
        .client
        .post(app.url("/auth/refresh-token"))
        .json(&json!({ "refreshToken": access }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}
