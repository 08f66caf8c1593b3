use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{
        review::{self, ModerationStatus, ReviewStatus},
        Car, Review, ReviewModel,
    },
    repository::Page,
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbBackend, EntityTrait,
    FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, Statement,
};
use serde::Serialize;
use uuid::Uuid;

pub const MSG_REVIEW_NOT_FOUND: &str = "Ulasan tidak ditemukan";
pub const MSG_ALREADY_REVIEWED: &str = "Anda sudah memberikan ulasan untuk mobil ini";
const MSG_CAR_NOT_FOUND: &str = super::car::MSG_CAR_NOT_FOUND;

#[derive(Debug, Clone, Default)]
pub struct NewReview {
    pub rating: i32,
    pub condition_rating: Option<i32>,
    pub seller_rating: Option<i32>,
    pub value_rating: Option<i32>,
    pub title: Option<String>,
    pub review_text: String,
    pub pros: Option<String>,
    pub cons: Option<String>,
}

impl NewReview {
    fn check(&self) -> AppResult<()> {
        check_rating(Some(self.rating), "Rating")?;
        check_rating(self.condition_rating, "Rating kondisi")?;
        check_rating(self.seller_rating, "Rating penjual")?;
        check_rating(self.value_rating, "Rating harga")?;
        if self.review_text.trim().is_empty() {
            return Err(AppError::validation("Isi ulasan wajib diisi"));
        }
        Ok(())
    }
}

fn check_rating(rating: Option<i32>, label: &str) -> AppResult<()> {
    match rating {
        Some(r) if !(1..=5).contains(&r) => Err(AppError::validation(format!(
            "{label} harus antara 1 dan 5"
        ))),
        _ => Ok(()),
    }
}

/// What an admin decided about a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationAction {
    Approve,
    Reject,
    Flag,
}

impl ModerationAction {
    pub fn parse(raw: &str) -> AppResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "approve" | "approved" => Ok(Self::Approve),
            "reject" | "rejected" => Ok(Self::Reject),
            "flag" | "flagged" => Ok(Self::Flag),
            other => Err(AppError::validation(format!(
                "Aksi moderasi tidak valid: '{other}'. Pilihan: approve, reject, flag"
            ))),
        }
    }

    fn status(self) -> ModerationStatus {
        match self {
            Self::Approve => ModerationStatus::Approved,
            Self::Reject => ModerationStatus::Rejected,
            Self::Flag => ModerationStatus::Flagged,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, FromQueryResult, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub average_rating: f64,
    pub total_reviews: i64,
}

pub struct ReviewService {
    db: DatabaseConnection,
}

impl ReviewService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        car_id: Uuid,
        reviewer_id: Uuid,
        input: NewReview,
    ) -> AppResult<ReviewModel> {
        input.check()?;

        if Car::find_by_id(car_id).one(&self.db).await?.is_none() {
            return Err(AppError::NotFound(MSG_CAR_NOT_FOUND));
        }
        let existing = Review::find()
            .filter(review::Column::CarId.eq(car_id))
            .filter(review::Column::ReviewerId.eq(reviewer_id))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict(MSG_ALREADY_REVIEWED.to_string()));
        }

        let now = chrono::Utc::now().naive_utc();
        let created = review::ActiveModel {
            id: Set(Uuid::new_v4()),
            car_id: Set(car_id),
            reviewer_id: Set(reviewer_id),
            rating: Set(input.rating),
            condition_rating: Set(input.condition_rating),
            seller_rating: Set(input.seller_rating),
            value_rating: Set(input.value_rating),
            title: Set(input.title),
            review_text: Set(input.review_text.trim().to_string()),
            pros: Set(input.pros),
            cons: Set(input.cons),
            moderation_status: Set(ModerationStatus::Pending),
            status: Set(ReviewStatus::Active),
            moderation_reason: Set(None),
            moderated_by: Set(None),
            moderated_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        tracing::info!(review_id = %created.id, car_id = %car_id, "review submitted for moderation");
        Ok(created)
    }

    /// Approved, active reviews of one car plus the rating summary over all of them.
    pub async fn list_car_reviews(
        &self,
        car_id: Uuid,
        page: Page,
    ) -> AppResult<(Vec<ReviewModel>, u64, RatingSummary)> {
        let paginator = Review::find()
            .filter(review::Column::CarId.eq(car_id))
            .filter(review::Column::ModerationStatus.eq(ModerationStatus::Approved))
            .filter(review::Column::Status.eq(ReviewStatus::Active))
            .order_by_desc(review::Column::CreatedAt)
            .paginate(&self.db, page.limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.index()).await?;

        let summary = RatingSummary::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT COALESCE(AVG(rating), 0)::float8 AS average_rating,
                   COUNT(*)::bigint AS total_reviews
            FROM reviews
            WHERE car_id = $1 AND moderation_status = 'approved' AND status = 'active'
            "#,
            [car_id.into()],
        ))
        .one(&self.db)
        .await?
        .unwrap_or_default();

        Ok((items, total, summary))
    }

    pub async fn list_for_moderation(
        &self,
        status: Option<ModerationStatus>,
        page: Page,
    ) -> AppResult<(Vec<ReviewModel>, u64)> {
        let mut query = Review::find();
        if let Some(status) = status {
            query = query.filter(review::Column::ModerationStatus.eq(status));
        }
        let paginator = query
            .order_by_asc(review::Column::CreatedAt)
            .paginate(&self.db, page.limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.index()).await?;
        Ok((items, total))
    }

    /// Rejecting or flagging needs a reason.
    pub async fn moderate(
        &self,
        id: Uuid,
        moderator: &AuthUser,
        action: ModerationAction,
        reason: Option<String>,
    ) -> AppResult<ReviewModel> {
        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        if action != ModerationAction::Approve && reason.is_none() {
            return Err(AppError::validation("Alasan moderasi wajib diisi"));
        }

        let review = self.get(id).await?;
        let now = chrono::Utc::now().naive_utc();
        let mut active: review::ActiveModel = review.into();
        active.moderation_status = Set(action.status());
        active.moderation_reason = Set(reason);
        active.moderated_by = Set(Some(moderator.user_id));
        active.moderated_at = Set(Some(now));
        active.updated_at = Set(now);
        let updated = active.update(&self.db).await?;

        tracing::info!(review_id = %id, moderator = %moderator.user_id, action = ?action, "review moderated");
        Ok(updated)
    }

    pub async fn set_status(
        &self,
        id: Uuid,
        actor: &AuthUser,
        status: ReviewStatus,
    ) -> AppResult<ReviewModel> {
        let review = self.get(id).await?;
        if review.reviewer_id != actor.user_id && !actor.is_admin() {
            return Err(AppError::Forbidden(
                "Anda tidak memiliki akses untuk mengubah ulasan ini",
            ));
        }

        let mut active: review::ActiveModel = review.into();
        active.status = Set(status);
        active.updated_at = Set(chrono::Utc::now().naive_utc());
        Ok(active.update(&self.db).await?)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<ReviewModel> {
        Review::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound(MSG_REVIEW_NOT_FOUND))
    }
}
