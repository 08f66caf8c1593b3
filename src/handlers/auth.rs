use super::validate_payload;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{parse_optional_enum, user::UserRole, UserModel};
use crate::response::ApiResponse;
use crate::services::auth::{AuthService, AuthSession, NewAccount};
use axum::{response::IntoResponse, Extension, Json};
use chrono::NaiveDateTime;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Username (3-50 characters)
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    /// Email address
    #[validate(email)]
    pub email: String,
    /// Password (min 6 characters)
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    /// `buyer` (default) or `seller`
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Public view of an account. The password hash never leaves the service.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub profile_picture: Option<String>,
    pub is_verified: bool,
    pub is_active: bool,
    pub last_login: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<UserModel> for UserResponse {
    fn from(user: UserModel) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            full_name: user.full_name,
            phone_number: user.phone_number,
            address: user.address,
            profile_picture: user.profile_picture,
            is_verified: user.is_verified,
            is_active: user.is_active,
            last_login: user.last_login,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserResponse,
    /// JWT access token
    pub token: String,
    /// JWT refresh token
    pub refresh_token: String,
}

impl From<AuthSession> for AuthResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            user: session.user.into(),
            token: session.token,
            refresh_token: session.refresh_token,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Validation error or duplicate email/username", body = AppError),
    ),
    tag = "auth"
)]
pub async fn register(
    Extension(db): Extension<DatabaseConnection>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    validate_payload(&payload)?;
    let role = parse_optional_enum::<UserRole>(payload.role.as_deref(), "Role")?;

    let session = AuthService::new(db)
        .register(NewAccount {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            full_name: payload.full_name,
            phone_number: payload.phone_number,
            role,
        })
        .await?;

    Ok(ApiResponse::created(
        AuthResponse::from(session),
        "Registrasi berhasil",
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Wrong credentials or inactive account", body = AppError),
    ),
    tag = "auth"
)]
pub async fn login(
    Extension(db): Extension<DatabaseConnection>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    validate_payload(&payload)
        .map_err(|_| AppError::validation("Email dan password wajib diisi"))?;

    let session = AuthService::new(db)
        .login(&payload.email, &payload.password)
        .await?;

    Ok(ApiResponse::with_message(
        AuthResponse::from(session),
        "Login berhasil",
    ))
}

#[utoipa::path(
    get,
    path = "/api/auth/profile",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized", body = AppError),
        (status = 404, description = "User no longer exists", body = AppError),
    ),
    tag = "auth"
)]
pub async fn get_profile(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let user = AuthService::new(db).profile(auth_user.user_id).await?;
    Ok(ApiResponse::ok(UserResponse::from(user)))
}

#[utoipa::path(
    post,
    path = "/api/auth/refresh-token",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New token pair", body = AuthResponse),
        (status = 401, description = "Invalid refresh token", body = AppError),
    ),
    tag = "auth"
)]
pub async fn refresh_token(
    Extension(db): Extension<DatabaseConnection>,
    Json(payload): Json<RefreshTokenRequest>,
) -> AppResult<impl IntoResponse> {
    let session = AuthService::new(db).refresh(&payload.refresh_token).await?;
    Ok(ApiResponse::ok(AuthResponse::from(session)))
}

/// Tokens are stateless; the client simply discards them.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Logged out"),
    ),
    tag = "auth"
)]
pub async fn logout(auth_user: AuthUser) -> impl IntoResponse {
    tracing::debug!(user_id = %auth_user.user_id, "logout");
    ApiResponse::message_only("Logout berhasil")
}
