use axum::{extract::Extension, response::IntoResponse, routing::get, Json, Router};
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;
use serde_json::json;
use showroom::{config, handlers, migration, routes, services, utils};
use services::cache::CacheService;
use services::report_worker::{spawn_report_worker, ReportProcessor};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        // Auth routes
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::get_profile,
        handlers::auth::refresh_token,
        handlers::auth::logout,
        // User routes
        handlers::user::list_users,
        handlers::user::get_user,
        handlers::user::update_profile,
        handlers::user::change_password,
        handlers::user::delete_account,
        handlers::user::profile_stats,
        // Car routes
        handlers::car::list_cars,
        handlers::car::search_cars,
        handlers::car::car_stats,
        handlers::car::seller_cars,
        handlers::car::get_car,
        handlers::car::create_car,
        handlers::car::update_car,
        handlers::car::delete_car,
        handlers::car::approve_car,
        handlers::car::reject_car,
        handlers::car::mark_car_sold,
        // Report routes
        handlers::report::generate_report,
        handlers::report::list_reports,
        handlers::report::report_statistics,
        handlers::report::get_report,
        handlers::report::distribute_report,
        handlers::report::archive_report,
        handlers::report::delete_report,
        handlers::report::download_report,
        // Review routes
        handlers::review::create_review,
        handlers::review::list_car_reviews,
        handlers::review::moderation_queue,
        handlers::review::moderate_review,
        handlers::review::set_review_status,
        // Chatbot routes
        handlers::chatbot::ask,
        handlers::chatbot::escalate,
        handlers::chatbot::transcript,
        handlers::chatbot::list_knowledge,
        handlers::chatbot::get_knowledge,
        handlers::chatbot::create_knowledge,
        handlers::chatbot::update_knowledge,
        handlers::chatbot::delete_knowledge,
        handlers::chatbot::set_validation_status,
        handlers::chatbot::set_training_status,
        handlers::chatbot::list_tags,
        handlers::chatbot::create_tag,
        handlers::chatbot::knowledge_tags,
        handlers::chatbot::attach_tag,
        handlers::chatbot::detach_tag,
    ),
    components(
        schemas(
            showroom::response::ApiResponse<serde_json::Value>,
            showroom::response::PaginatedResponse<serde_json::Value>,
            showroom::response::PaginationQuery,
            showroom::error::AppError,
            // Auth
            handlers::auth::RegisterRequest,
            handlers::auth::LoginRequest,
            handlers::auth::RefreshTokenRequest,
            handlers::auth::AuthResponse,
            handlers::auth::UserResponse,
            // User
            handlers::user::UpdateProfileRequest,
            handlers::user::ChangePasswordRequest,
            // Car
            handlers::car::CarResponse,
            handlers::car::CreateCarRequest,
            handlers::car::UpdateCarRequest,
            showroom::repository::CarStatusCounts,
            // Report
            handlers::report::GenerateReportRequest,
            handlers::report::DistributeReportRequest,
            handlers::report::RecipientRequest,
            handlers::report::ReportResponse,
            handlers::report::ReportSummaryResponse,
            handlers::report::ReportDetailResponse,
            handlers::report::DistributionResponse,
            handlers::report::ReportStatisticsResponse,
            // Review
            handlers::review::ReviewResponse,
            handlers::review::CarReviewsResponse,
            handlers::review::CreateReviewRequest,
            handlers::review::ModerateReviewRequest,
            handlers::review::ReviewStatusRequest,
            // Chatbot
            handlers::chatbot::AskRequest,
            handlers::chatbot::EscalateRequest,
            handlers::chatbot::ChatRoomResponse,
            handlers::chatbot::ConversationTurnResponse,
            handlers::chatbot::KnowledgeResponse,
            handlers::chatbot::CreateKnowledgeRequest,
            handlers::chatbot::UpdateKnowledgeRequest,
            handlers::chatbot::StatusRequest,
            handlers::chatbot::TagResponse,
            handlers::chatbot::CreateTagRequest,
            services::chatbot::ChatReply,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and tokens"),
        (name = "users", description = "Account and profile operations"),
        (name = "cars", description = "Car listings"),
        (name = "reports", description = "Report generation and distribution"),
        (name = "reviews", description = "Car reviews and moderation"),
        (name = "chatbot", description = "Visitor chatbot and knowledge base"),
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "jwt_token",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    // Validate configuration before doing anything else
    let jwt_config = validate_config()?;
    utils::jwt::init_jwt_config(jwt_config)?;

    tracing::info!(
        env = config::app::app_env().as_str(),
        "Starting Showroom API v{}...",
        env!("CARGO_PKG_VERSION")
    );

    let db = config::database::connect().await?;
    tracing::info!("Database connected successfully");

    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    services::bootstrap_admin::ensure_bootstrap_admin(&db).await?;

    // Redis is optional - graceful degradation if unavailable
    let cache = match config::redis::connect().await {
        Ok(Some(conn)) => {
            tracing::info!("Redis connected successfully");
            Some(CacheService::new(conn))
        }
        Ok(None) => {
            tracing::info!("REDIS_URL not set, report cache disabled");
            None
        }
        Err(e) => {
            tracing::warn!("Redis unavailable, running without cache: {}", e);
            None
        }
    };

    let email_service = services::email::EmailService::from_env();
    if email_service.is_configured() {
        tracing::info!("SMTP email service configured");
    } else {
        tracing::warn!("SMTP not configured, report emails will be skipped");
    }

    let worker_config = config::report::ReportWorkerConfig::from_env();
    let processor = ReportProcessor::new(db.clone(), email_service, cache.clone());
    let (queue, worker) = spawn_report_worker(processor, worker_config);
    tracing::info!(
        capacity = worker_config.queue_capacity,
        timeout_secs = worker_config.job_timeout.as_secs(),
        "report worker spawned"
    );

    let app = create_app()
        .layer(Extension(db))
        .layer(Extension(cache))
        .layer(Extension(queue));

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // The router held the last queue handle. The worker works through every job
    // still queued and exits once the channel is empty and closed.
    match tokio::time::timeout(worker_config.job_timeout + Duration::from_secs(5), worker).await {
        Ok(Ok(())) => tracing::info!("report worker drained"),
        Ok(Err(e)) => tracing::error!("report worker panicked: {}", e),
        Err(_) => tracing::warn!("report worker still busy at shutdown, abandoning"),
    }

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// `LOG_FORMAT=json` switches to one JSON object per line.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "showroom=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Validate all required configuration at startup (fail-fast).
fn validate_config() -> anyhow::Result<config::jwt::JwtConfig> {
    let jwt_config = config::jwt::JwtConfig::from_env()?;

    // Checked early; the connection itself is opened later
    if env::var("DATABASE_URL").is_err() {
        return Err(anyhow::anyhow!(
            "DATABASE_URL environment variable must be set"
        ));
    }

    Ok(jwt_config)
}

fn build_cors_layer() -> CorsLayer {
    use axum::http::{header, HeaderValue, Method};

    let origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([header::CONTENT_DISPOSITION]);

    if origins_str == "*" {
        cors.allow_origin(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = origins_str
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

fn create_app() -> Router {
    Router::new()
        .route("/", get(health_check))
        .merge(routes::create_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service is up; `database` reports reachability", body = serde_json::Value)
    )
)]
async fn health_check(Extension(db): Extension<DatabaseConnection>) -> impl IntoResponse {
    let db_ok = db
        .query_one(Statement::from_string(
            sea_orm::DatabaseBackend::Postgres,
            "SELECT 1".to_string(),
        ))
        .await
        .is_ok();

    let status = if db_ok { "ok" } else { "degraded" };

    Json(json!({
        "status": status,
        "service": "Showroom API",
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_ok,
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for CTRL+C, shutting down: {}", e);
    }
    tracing::info!("Shutdown signal received, gracefully shutting down...");
}
