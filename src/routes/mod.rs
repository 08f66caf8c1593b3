use crate::config::rate_limit::{RateLimitConfig, RateLimitRule, RouteGroup};
use crate::handlers;
use crate::middleware::auth::{auth_middleware, optional_auth_middleware};
use axum::{middleware, routing, Router};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

pub fn create_routes() -> Router {
    Router::new().nest("/api", api_routes())
}

fn api_routes() -> Router {
    let rate_limit_config = RateLimitConfig::from_env();

    let auth = auth_routes(&rate_limit_config);
    let public_read = public_read_routes(&rate_limit_config);
    let chatbot = chatbot_public_routes(&rate_limit_config)
        .layer(middleware::from_fn(optional_auth_middleware));
    let protected =
        protected_routes(&rate_limit_config).layer(middleware::from_fn(auth_middleware));
    let report_jobs =
        report_job_routes(&rate_limit_config).layer(middleware::from_fn(auth_middleware));

    auth.merge(public_read)
        .merge(chatbot)
        .merge(protected)
        .merge(report_jobs)
}

/// Auth routes: register, login, refresh-token.
fn auth_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route("/auth/register", routing::post(handlers::register))
        .route("/auth/login", routing::post(handlers::login))
        .route(
            "/auth/refresh-token",
            routing::post(handlers::auth::refresh_token),
        );

    with_optional_rate_limit(router, config.enabled, config.rule(RouteGroup::Auth))
}

/// Public read routes: catalogue browsing and published reviews.
fn public_read_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        // Cars
        .route("/cars", routing::get(handlers::car::list_cars))
        .route("/cars/search", routing::get(handlers::car::search_cars))
        .route("/cars/stats", routing::get(handlers::car::car_stats))
        .route(
            "/cars/seller/{seller_id}",
            routing::get(handlers::car::seller_cars),
        )
        .route("/cars/{id}", routing::get(handlers::car::get_car))
        // Reviews
        .route(
            "/cars/{id}/reviews",
            routing::get(handlers::review::list_car_reviews),
        )
        // Users
        .route("/users/{id}", routing::get(handlers::user::get_user));

    with_optional_rate_limit(router, config.enabled, config.rule(RouteGroup::PublicRead))
}

/// Visitor-facing chatbot; a valid bearer token attributes the session.
fn chatbot_public_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route("/chatbot/ask", routing::post(handlers::chatbot::ask))
        .route(
            "/chatbot/escalate",
            routing::post(handlers::chatbot::escalate),
        );

    with_optional_rate_limit(router, config.enabled, config.rule(RouteGroup::PublicRead))
}

/// Protected routes: everything that needs a signed-in caller.
fn protected_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        // Auth
        .route("/auth/profile", routing::get(handlers::get_profile))
        .route("/auth/logout", routing::post(handlers::auth::logout))
        // Users
        .route("/users", routing::get(handlers::user::list_users))
        .route(
            "/users/profile",
            routing::put(handlers::user::update_profile).delete(handlers::user::delete_account),
        )
        .route(
            "/users/profile/stats",
            routing::get(handlers::user::profile_stats),
        )
        .route(
            "/users/change-password",
            routing::put(handlers::user::change_password),
        )
        // Cars
        .route("/cars", routing::post(handlers::car::create_car))
        .route(
            "/cars/{id}",
            routing::put(handlers::car::update_car).delete(handlers::car::delete_car),
        )
        .route(
            "/cars/{id}/approve",
            routing::put(handlers::car::approve_car),
        )
        .route("/cars/{id}/reject", routing::put(handlers::car::reject_car))
        .route("/cars/{id}/sold", routing::put(handlers::car::mark_car_sold))
        // Reviews
        .route(
            "/cars/{id}/reviews",
            routing::post(handlers::review::create_review),
        )
        .route(
            "/reviews/moderation",
            routing::get(handlers::review::moderation_queue),
        )
        .route(
            "/reviews/{id}/moderate",
            routing::put(handlers::review::moderate_review),
        )
        .route(
            "/reviews/{id}/status",
            routing::put(handlers::review::set_review_status),
        )
        // Reports
        .route("/reports", routing::get(handlers::report::list_reports))
        .route(
            "/reports/statistics",
            routing::get(handlers::report::report_statistics),
        )
        .route(
            "/reports/{id}",
            routing::get(handlers::report::get_report).delete(handlers::report::delete_report),
        )
        .route(
            "/reports/{id}/archive",
            routing::put(handlers::report::archive_report),
        )
        .route(
            "/reports/{id}/download",
            routing::get(handlers::report::download_report),
        )
        // Chatbot (admin, checked in handler)
        .route(
            "/chatbot/conversations/{session_id}",
            routing::get(handlers::chatbot::transcript),
        )
        .route(
            "/chatbot/knowledge",
            routing::get(handlers::chatbot::list_knowledge)
                .post(handlers::chatbot::create_knowledge),
        )
        .route(
            "/chatbot/knowledge/{id}",
            routing::get(handlers::chatbot::get_knowledge)
                .put(handlers::chatbot::update_knowledge)
                .delete(handlers::chatbot::delete_knowledge),
        )
        .route(
            "/chatbot/knowledge/{id}/validation",
            routing::put(handlers::chatbot::set_validation_status),
        )
        .route(
            "/chatbot/knowledge/{id}/training",
            routing::put(handlers::chatbot::set_training_status),
        )
        .route(
            "/chatbot/knowledge/{id}/tags",
            routing::get(handlers::chatbot::knowledge_tags),
        )
        .route(
            "/chatbot/knowledge/{id}/tags/{tag_id}",
            routing::put(handlers::chatbot::attach_tag).delete(handlers::chatbot::detach_tag),
        )
        .route(
            "/chatbot/tags",
            routing::get(handlers::chatbot::list_tags).post(handlers::chatbot::create_tag),
        );

    with_optional_rate_limit(router, config.enabled, config.rule(RouteGroup::Protected))
}

/// Routes that enqueue background report work get a tighter budget.
fn report_job_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route("/reports", routing::post(handlers::report::generate_report))
        .route(
            "/reports/{id}/distribute",
            routing::post(handlers::report::distribute_report),
        );

    with_optional_rate_limit(router, config.enabled, config.rule(RouteGroup::ReportJobs))
}

fn with_optional_rate_limit(router: Router, enabled: bool, rule: RateLimitRule) -> Router {
    if !enabled {
        return router;
    }

    let Some(governor_conf) = GovernorConfigBuilder::default()
        .per_second(rule.per_second)
        .burst_size(rule.burst_size)
        .finish()
    else {
        tracing::warn!(?rule, "invalid rate limit rule, serving the group unthrottled");
        return router;
    };

    router.layer(GovernorLayer::new(governor_conf))
}
