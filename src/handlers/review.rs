use super::{page_from, paginated, validate_payload};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{require_admin, AuthUser};
use crate::models::{
    parse_enum, parse_optional_enum,
    review::{ModerationStatus, ReviewStatus},
    ReviewModel,
};
use crate::response::{ApiResponse, PaginatedResponse, Pagination};
use crate::services::review::{ModerationAction, NewReview, RatingSummary, ReviewService};
use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    Extension, Json,
};
use chrono::NaiveDateTime;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub id: Uuid,
    pub car_id: Uuid,
    pub reviewer_id: Uuid,
    pub rating: i32,
    pub condition_rating: Option<i32>,
    pub seller_rating: Option<i32>,
    pub value_rating: Option<i32>,
    pub title: Option<String>,
    pub review_text: String,
    pub pros: Option<String>,
    pub cons: Option<String>,
    pub moderation_status: ModerationStatus,
    pub status: ReviewStatus,
    pub moderation_reason: Option<String>,
    pub moderated_by: Option<Uuid>,
    pub moderated_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<ReviewModel> for ReviewResponse {
    fn from(r: ReviewModel) -> Self {
        Self {
            id: r.id,
            car_id: r.car_id,
            reviewer_id: r.reviewer_id,
            rating: r.rating,
            condition_rating: r.condition_rating,
            seller_rating: r.seller_rating,
            value_rating: r.value_rating,
            title: r.title,
            review_text: r.review_text,
            pros: r.pros,
            cons: r.cons,
            moderation_status: r.moderation_status,
            status: r.status,
            moderation_reason: r.moderation_reason,
            moderated_by: r.moderated_by,
            moderated_at: r.moderated_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Car reviews page with the rating summary alongside.
#[derive(Debug, Serialize, ToSchema)]
pub struct CarReviewsResponse {
    pub items: Vec<ReviewResponse>,
    pub pagination: Pagination,
    pub summary: RatingSummary,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    /// 1 to 5
    pub rating: i32,
    pub condition_rating: Option<i32>,
    pub seller_rating: Option<i32>,
    pub value_rating: Option<i32>,
    #[validate(length(max = 200))]
    pub title: Option<String>,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub review_text: String,
    #[validate(length(max = 2000))]
    pub pros: Option<String>,
    #[validate(length(max = 2000))]
    pub cons: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReviewPageQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ModerationQueueQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// draft, pending, approved, rejected or flagged
    pub moderation_status: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ModerateReviewRequest {
    /// approve, reject or flag
    pub action: String,
    /// Required for reject and flag
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewStatusRequest {
    /// active, hidden or deleted
    pub status: String,
}

#[utoipa::path(
    post,
    path = "/api/cars/{id}/reviews",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Car ID")),
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Review submitted for moderation", body = ReviewResponse),
        (status = 400, description = "Rating out of range", body = AppError),
        (status = 404, description = "Car not found", body = AppError),
        (status = 409, description = "Caller already reviewed this car", body = AppError),
    ),
    tag = "reviews"
)]
pub async fn create_review(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(car_id): Path<Uuid>,
    Json(payload): Json<CreateReviewRequest>,
) -> AppResult<impl IntoResponse> {
    validate_payload(&payload)?;
    let review = ReviewService::new(db)
        .create(
            car_id,
            auth_user.user_id,
            NewReview {
                rating: payload.rating,
                condition_rating: payload.condition_rating,
                seller_rating: payload.seller_rating,
                value_rating: payload.value_rating,
                title: payload.title,
                review_text: payload.review_text,
                pros: payload.pros,
                cons: payload.cons,
            },
        )
        .await?;
    Ok(ApiResponse::created(
        ReviewResponse::from(review),
        "Ulasan berhasil dikirim dan menunggu moderasi",
    ))
}

#[utoipa::path(
    get,
    path = "/api/cars/{id}/reviews",
    params(("id" = Uuid, Path, description = "Car ID"), ReviewPageQuery),
    responses(
        (status = 200, description = "Published reviews and rating summary", body = CarReviewsResponse),
    ),
    tag = "reviews"
)]
pub async fn list_car_reviews(
    Extension(db): Extension<DatabaseConnection>,
    Path(car_id): Path<Uuid>,
    Query(query): Query<ReviewPageQuery>,
) -> AppResult<impl IntoResponse> {
    let page = page_from(query.page, query.limit);
    let (reviews, total, summary) = ReviewService::new(db)
        .list_car_reviews(car_id, page)
        .await?;
    let PaginatedResponse { items, pagination } =
        paginated::<_, ReviewResponse>(reviews, total, page);
    Ok(ApiResponse::ok(CarReviewsResponse {
        items,
        pagination,
        summary,
    }))
}

#[utoipa::path(
    get,
    path = "/api/reviews/moderation",
    security(("jwt_token" = [])),
    params(ModerationQueueQuery),
    responses(
        (status = 200, description = "Reviews oldest first", body = PaginatedResponse<ReviewResponse>),
        (status = 403, description = "Admin only", body = AppError),
    ),
    tag = "reviews"
)]
pub async fn moderation_queue(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Query(query): Query<ModerationQueueQuery>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    let status = parse_optional_enum::<ModerationStatus>(
        query.moderation_status.as_deref(),
        "Status moderasi",
    )?;
    let page = page_from(query.page, query.limit);
    let (reviews, total) = ReviewService::new(db)
        .list_for_moderation(status, page)
        .await?;
    Ok(ApiResponse::ok(paginated::<_, ReviewResponse>(
        reviews, total, page,
    )))
}

#[utoipa::path(
    put,
    path = "/api/reviews/{id}/moderate",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Review ID")),
    request_body = ModerateReviewRequest,
    responses(
        (status = 200, description = "Moderation recorded", body = ReviewResponse),
        (status = 400, description = "Unknown action or missing reason", body = AppError),
        (status = 403, description = "Admin only", body = AppError),
    ),
    tag = "reviews"
)]
pub async fn moderate_review(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ModerateReviewRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    let action = ModerationAction::parse(&payload.action)?;
    let review = ReviewService::new(db)
        .moderate(id, &auth_user, action, payload.reason)
        .await?;
    Ok(ApiResponse::with_message(
        ReviewResponse::from(review),
        "Ulasan berhasil dimoderasi",
    ))
}

#[utoipa::path(
    put,
    path = "/api/reviews/{id}/status",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Review ID")),
    request_body = ReviewStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = ReviewResponse),
        (status = 403, description = "Not the reviewer or an admin", body = AppError),
    ),
    tag = "reviews"
)]
pub async fn set_review_status(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewStatusRequest>,
) -> AppResult<impl IntoResponse> {
    let status = parse_enum::<ReviewStatus>(&payload.status, "Status ulasan")?;
    let review = ReviewService::new(db)
        .set_status(id, &auth_user, status)
        .await?;
    Ok(ApiResponse::with_message(
        ReviewResponse::from(review),
        "Status ulasan diperbarui",
    ))
}
