use super::aggregate::{ActivityCounts, Period, SaleRow};
use crate::error::AppResult;
use crate::models::{
    car::{self, CarStatus},
    transaction, Car, CarModel,
};
use chrono::{Duration, NaiveDateTime};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbBackend, EntityTrait, FromQueryResult, QueryFilter,
    QueryOrder, Statement,
};

/// Users seen within this window count as active.
const ACTIVE_WINDOW_DAYS: i64 = 30;

/// Loads the raw rows a report is aggregated from.
#[derive(Clone)]
pub struct ReportSource {
    db: DatabaseConnection,
}

impl ReportSource {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Half-open timestamp window covering both boundary days completely.
    pub fn window(period: Period) -> (NaiveDateTime, NaiveDateTime) {
        let start = period.start.and_hms_opt(0, 0, 0).unwrap_or_default();
        let end = (period.end + Duration::days(1))
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default();
        (start, end)
    }

    pub async fn completed_sales(&self, period: Period) -> AppResult<Vec<SaleRow>> {
        let (from, to) = Self::window(period);
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT t.id, t.created_at, t.total_amount, t.payment_method, t.buyer_id,
                   u.full_name AS customer_name, c.category, c.brand
            FROM transactions t
            LEFT JOIN users u ON u.id = t.buyer_id
            LEFT JOIN cars c ON c.id = t.car_id
            WHERE t.status = $1 AND t.created_at >= $2 AND t.created_at < $3
            ORDER BY t.created_at ASC
            "#,
            [transaction::STATUS_COMPLETED.into(), from.into(), to.into()],
        );
        Ok(SaleRow::find_by_statement(stmt).all(&self.db).await?)
    }

    /// Listed stock: cars currently `available`.
    pub async fn available_inventory(&self) -> AppResult<Vec<CarModel>> {
        Ok(Car::find()
            .filter(car::Column::Status.eq(CarStatus::Available))
            .order_by_desc(car::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn activity_counts(
        &self,
        period: Period,
        now: NaiveDateTime,
    ) -> AppResult<ActivityCounts> {
        let (from, to) = Self::window(period);
        let active_since = now - Duration::days(ACTIVE_WINDOW_DAYS);
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT
                (SELECT COUNT(*) FROM users)::bigint AS total_users,
                (SELECT COUNT(*) FROM users WHERE last_login > $3)::bigint AS active_users,
                (SELECT COUNT(*) FROM users
                    WHERE created_at >= $1 AND created_at < $2)::bigint AS new_users,
                (SELECT COUNT(*) FROM transactions
                    WHERE created_at >= $1 AND created_at < $2)::bigint AS total_transactions,
                (SELECT COUNT(DISTINCT buyer_id) FROM transactions
                    WHERE created_at >= $1 AND created_at < $2)::bigint AS users_with_transactions,
                (SELECT COUNT(*) FROM reviews
                    WHERE created_at >= $1 AND created_at < $2)::bigint AS total_reviews
            "#,
            [from.into(), to.into(), active_since.into()],
        );
        Ok(ActivityCounts::find_by_statement(stmt)
            .one(&self.db)
            .await?
            .unwrap_or_default())
    }
}
