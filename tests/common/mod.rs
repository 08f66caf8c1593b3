#![allow(dead_code)]

use reqwest::Client;
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use showroom::config::report::ReportWorkerConfig;
use showroom::services::email::EmailService;
use showroom::services::report_worker::{spawn_report_worker, ReportProcessor};
use std::net::SocketAddr;
use std::sync::Once;
use std::time::Duration;
use tokio::sync::OnceCell;
use uuid::Uuid;

static INIT: Once = Once::new();
static SCHEMA: OnceCell<()> = OnceCell::const_new();

pub const PASSWORD: &str = "rahasia_123";

fn init_env() {
    INIT.call_once(|| {
        dotenv::dotenv().ok();
        std::env::set_var(
            "JWT_SECRET",
            "integration_test_secret_that_is_at_least_32_characters_long",
        );
        std::env::set_var("RATE_LIMIT_ENABLED", "false");
        std::env::set_var("BCRYPT_COST", "4");
        std::env::remove_var("REDIS_URL");
        let config = showroom::config::jwt::JwtConfig::from_env().unwrap();
        let _ = showroom::utils::jwt::init_jwt_config(config);
    });
}

pub struct TestApp {
    pub addr: String,
    pub db: DatabaseConnection,
    pub client: Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.addr, path)
    }
}

pub async fn spawn_app() -> TestApp {
    init_env();

    let database_url = std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"));

    let db = sea_orm::Database::connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    // Migrate and wipe once per test binary; tests use unique names so they
    // can share the tables while running in parallel.
    SCHEMA
        .get_or_init(|| async {
            showroom::migration::Migrator::up(&db, None)
                .await
                .expect("Failed to run migrations");
            cleanup_tables(&db).await;
        })
        .await;

    let processor = ReportProcessor::new(db.clone(), EmailService::disabled(), None);
    let (queue, _worker) = spawn_report_worker(
        processor,
        ReportWorkerConfig {
            queue_capacity: 32,
            job_timeout: Duration::from_secs(30),
            cache_ttl_secs: 60,
        },
    );

    let app = axum::Router::new()
        .merge(showroom::routes::create_routes())
        .layer(axum::extract::Extension(db.clone()))
        .layer(axum::extract::Extension(
            None::<showroom::services::cache::CacheService>,
        ))
        .layer(axum::extract::Extension(queue));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        addr: format!("http://{}", addr),
        db,
        client: Client::new(),
    }
}

async fn cleanup_tables(db: &DatabaseConnection) {
    let tables = [
        "chatbot_conversations",
        "chat_rooms",
        "chatbot_knowledge_tags",
        "chatbot_tags",
        "chatbot_knowledge_base",
        "reviews",
        "report_distributions",
        "reports",
        "transactions",
        "cars",
        "users",
    ];

    for table in tables {
        let sql = format!("TRUNCATE TABLE {} CASCADE", table);
        let _ = db
            .execute(Statement::from_string(
                sea_orm::DatabaseBackend::Postgres,
                sql,
            ))
            .await;
    }
}

/// Short unique suffix so parallel tests never collide on username or email.
pub fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, &Uuid::new_v4().simple().to_string()[..8])
}

/// Register a buyer or seller and return (user_id, token).
pub async fn create_test_user(app: &TestApp, prefix: &str, role: &str) -> (Uuid, String) {
    let username = unique(prefix);

    let resp = app
        .client
        .post(app.url("/auth/register"))
        .json(&serde_json::json!({
            "username": username,
            "email": format!("{}@test.com", username),
            "password": PASSWORD,
            "role": role,
        }))
        .send()
        .await
        .expect("Failed to register user");

    let status = resp.status();
    let body: Value = resp.json().await.expect("Failed to parse register response");
    if !body["success"].as_bool().unwrap_or(false) {
        panic!(
            "Failed to register user '{}': status={}, body={}",
            username, status, body
        );
    }

    let user_id = body["data"]["user"]["id"]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(|| panic!("Response missing user id: {}", body));
    let token = body["data"]["token"]
        .as_str()
        .unwrap_or_else(|| panic!("Response missing token: {}", body))
        .to_string();
    (user_id, token)
}

/// Change a role directly in the database. The auth middleware reloads the
/// user on every request, so existing tokens pick the new role up.
pub async fn set_role(db: &DatabaseConnection, user_id: Uuid, role: &str) {
    db.execute(Statement::from_sql_and_values(
        sea_orm::DatabaseBackend::Postgres,
        "UPDATE users SET role = $1 WHERE id = $2",
        vec![role.into(), user_id.into()],
    ))
    .await
    .expect("Failed to change user role");
}

pub async fn make_admin(db: &DatabaseConnection, user_id: Uuid) {
    set_role(db, user_id, "admin").await;
}

/// A seller with one listing; returns (seller token, car id).
pub async fn create_test_car(app: &TestApp) -> (String, Uuid) {
    let (_, token) = create_test_user(app, "seller", "seller").await;
    let resp = app
        .client
        .post(app.url("/cars"))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "brand": "Toyota",
            "model": "Avanza",
            "year": 2021,
            "price": 210_000_000,
            "condition": "used",
            "transmission": "manual",
            "fuelType": "gasoline",
            "mileage": 25_000,
        }))
        .send()
        .await
        .expect("Failed to create car");
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    let id = Uuid::parse_str(body["data"]["id"].as_str().unwrap()).unwrap();
    (token, id)
}

/// Poll a report until the worker has moved it out of `generating`.
pub async fn wait_for_report(app: &TestApp, token: &str, id: &str) -> Value {
    for _ in 0..50 {
        let body: Value = app
            .client
            .get(app.url(&format!("/reports/{}", id)))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if body["data"]["status"] != "generating" {
            return body["data"].clone();
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("report {} still generating", id);
}
