use super::{page_from, paginated, validate_payload};
use crate::error::{AppError, AppResult};
use crate::handlers::auth::UserResponse;
use crate::middleware::auth::{require_admin, AuthUser};
use crate::models::{parse_optional_enum, user::UserRole};
use crate::repository::CarStatusCounts;
use crate::response::{ApiResponse, PaginatedResponse};
use crate::services::cache::{invalidate_report, CacheService};
use crate::services::report::authored_report_ids;
use crate::services::user::{ProfileUpdate, UserService};
use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    Extension, Json,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, IntoParams)]
pub struct UserListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// buyer, seller, admin, owner or user
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: Option<String>,
    #[validate(length(max = 100))]
    pub full_name: Option<String>,
    #[validate(length(max = 20))]
    pub phone_number: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 500))]
    pub profile_picture: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

#[utoipa::path(
    get,
    path = "/api/users",
    security(("jwt_token" = [])),
    params(UserListQuery),
    responses(
        (status = 200, description = "Paginated users", body = PaginatedResponse<UserResponse>),
        (status = 403, description = "Admin only", body = AppError),
    ),
    tag = "users"
)]
pub async fn list_users(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Query(query): Query<UserListQuery>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    let role = parse_optional_enum::<UserRole>(query.role.as_deref(), "Role")?;
    let page = page_from(query.page, query.limit);

    let (users, total) = UserService::new(db).list(role, page).await?;
    Ok(ApiResponse::ok(paginated::<_, UserResponse>(users, total, page)))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 404, description = "User not found", body = AppError),
    ),
    tag = "users"
)]
pub async fn get_user(
    Extension(db): Extension<DatabaseConnection>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let user = UserService::new(db).get(id).await?;
    Ok(ApiResponse::ok(UserResponse::from(user)))
}

#[utoipa::path(
    put,
    path = "/api/users/profile",
    security(("jwt_token" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Validation error", body = AppError),
    ),
    tag = "users"
)]
pub async fn update_profile(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<impl IntoResponse> {
    validate_payload(&payload)?;

    let user = UserService::new(db)
        .update_profile(
            auth_user.user_id,
            ProfileUpdate {
                username: payload.username,
                full_name: payload.full_name,
                phone_number: payload.phone_number,
                address: payload.address,
                profile_picture: payload.profile_picture,
            },
        )
        .await?;
    Ok(ApiResponse::with_message(
        UserResponse::from(user),
        "Profil berhasil diperbarui",
    ))
}

#[utoipa::path(
    put,
    path = "/api/users/change-password",
    security(("jwt_token" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Current password is wrong", body = AppError),
    ),
    tag = "users"
)]
pub async fn change_password(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<impl IntoResponse> {
    if payload.new_password.len() < 6 && !payload.new_password.is_empty() {
        return Err(AppError::validation("Password baru minimal 6 karakter"));
    }
    UserService::new(db)
        .change_password(
            auth_user.user_id,
            &payload.current_password,
            &payload.new_password,
        )
        .await?;
    Ok(ApiResponse::message_only("Password berhasil diubah"))
}

#[utoipa::path(
    delete,
    path = "/api/users/profile",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Account deleted"),
    ),
    tag = "users"
)]
pub async fn delete_account(
    Extension(db): Extension<DatabaseConnection>,
    Extension(cache): Extension<Option<CacheService>>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    // Reports and their distributions go with the account by cascade
    let authored = authored_report_ids(&db, auth_user.user_id).await?;
    UserService::new(db).delete(auth_user.user_id).await?;
    for id in authored {
        invalidate_report(cache.as_ref(), id).await;
    }
    Ok(ApiResponse::message_only("Akun berhasil dihapus"))
}

#[utoipa::path(
    get,
    path = "/api/users/profile/stats",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "The caller's listings by status", body = CarStatusCounts),
    ),
    tag = "users"
)]
pub async fn profile_stats(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let stats = UserService::new(db).stats(auth_user.user_id).await?;
    Ok(ApiResponse::ok(stats))
}
