use super::query::{contains_ci, contains_ci_str, Page, SortOrder};
use crate::error::AppResult;
use crate::models::{
    car::{self, CarStatus, FuelType, Transmission},
    Car, CarModel,
};
use async_trait::async_trait;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue, ColumnTrait, Condition, DatabaseConnection,
    DbBackend, EntityTrait, FromQueryResult, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, Statement,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Listing filter. Every field is optional and fields combine with AND.
#[derive(Debug, Clone, Default)]
pub struct CarFilter {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    pub transmission: Option<Transmission>,
    pub fuel_type: Option<FuelType>,
    pub status: Option<CarStatus>,
    pub seller_id: Option<Uuid>,
    pub verified: Option<bool>,
    /// Free text matched against brand, model and description.
    pub text: Option<String>,
}

impl CarFilter {
    pub fn to_condition(&self) -> Condition {
        let mut cond = Condition::all();
        if let Some(brand) = non_blank(&self.brand) {
            cond = cond.add(contains_ci(car::Column::Brand, brand));
        }
        if let Some(model) = non_blank(&self.model) {
            cond = cond.add(contains_ci(car::Column::ModelName, model));
        }
        if let Some(min) = self.min_price {
            cond = cond.add(car::Column::Price.gte(min));
        }
        if let Some(max) = self.max_price {
            cond = cond.add(car::Column::Price.lte(max));
        }
        if let Some(min) = self.min_year {
            cond = cond.add(car::Column::Year.gte(min));
        }
        if let Some(max) = self.max_year {
            cond = cond.add(car::Column::Year.lte(max));
        }
        if let Some(t) = self.transmission {
            cond = cond.add(car::Column::Transmission.eq(t));
        }
        if let Some(f) = self.fuel_type {
            cond = cond.add(car::Column::FuelType.eq(f));
        }
        if let Some(status) = self.status {
            cond = cond.add(car::Column::Status.eq(status));
        }
        if let Some(seller) = self.seller_id {
            cond = cond.add(car::Column::SellerId.eq(seller));
        }
        if let Some(verified) = self.verified {
            cond = cond.add(car::Column::IsVerified.eq(verified));
        }
        if let Some(text) = non_blank(&self.text) {
            cond = cond.add(
                Condition::any()
                    .add(contains_ci(car::Column::Brand, text))
                    .add(contains_ci(car::Column::ModelName, text))
                    .add(contains_ci(car::Column::Description, text)),
            );
        }
        cond
    }

    /// In-process evaluation with the same semantics as [`CarFilter::to_condition`].
    pub fn matches(&self, car: &CarModel) -> bool {
        let text_hit = |needle: &str| {
            contains_ci_str(&car.brand, needle)
                || contains_ci_str(&car.model_name, needle)
                || car
                    .description
                    .as_deref()
                    .is_some_and(|d| contains_ci_str(d, needle))
        };

        non_blank(&self.brand).is_none_or(|b| contains_ci_str(&car.brand, b))
            && non_blank(&self.model).is_none_or(|m| contains_ci_str(&car.model_name, m))
            && self.min_price.is_none_or(|p| car.price >= p)
            && self.max_price.is_none_or(|p| car.price <= p)
            && self.min_year.is_none_or(|y| car.year >= y)
            && self.max_year.is_none_or(|y| car.year <= y)
            && self.transmission.is_none_or(|t| car.transmission == Some(t))
            && self.fuel_type.is_none_or(|f| car.fuel_type == Some(f))
            && self.status.is_none_or(|s| car.status == s)
            && self.seller_id.is_none_or(|s| car.seller_id == s)
            && self.verified.is_none_or(|v| car.is_verified == v)
            && non_blank(&self.text).is_none_or(text_hit)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CarSort {
    #[default]
    CreatedAt,
    Price,
    Year,
    Mileage,
    ViewCount,
}

impl CarSort {
    /// Accepts both column names and their camelCase spellings.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("price") => CarSort::Price,
            Some("year") => CarSort::Year,
            Some("mileage") => CarSort::Mileage,
            Some("view_count") | Some("viewCount") => CarSort::ViewCount,
            _ => CarSort::CreatedAt,
        }
    }

    fn column(self) -> car::Column {
        match self {
            CarSort::CreatedAt => car::Column::CreatedAt,
            CarSort::Price => car::Column::Price,
            CarSort::Year => car::Column::Year,
            CarSort::Mileage => car::Column::Mileage,
            CarSort::ViewCount => car::Column::ViewCount,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CarStatusCounts {
    pub total_cars: u64,
    pub available_cars: u64,
    pub sold_cars: u64,
    pub pending_cars: u64,
    pub rejected_cars: u64,
    pub reserved_cars: u64,
    pub approved_cars: u64,
    pub total_views: i64,
}

impl CarStatusCounts {
    pub(crate) fn add(&mut self, status: CarStatus, count: u64, verified: u64, views: i64) {
        self.total_cars += count;
        self.approved_cars += verified;
        self.total_views += views;
        match status {
            CarStatus::Available => self.available_cars += count,
            CarStatus::Sold => self.sold_cars += count,
            CarStatus::Pending => self.pending_cars += count,
            CarStatus::Rejected => self.rejected_cars += count,
            CarStatus::Reserved => self.reserved_cars += count,
        }
    }
}

#[async_trait]
pub trait CarRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> AppResult<Option<CarModel>>;
    async fn list(
        &self,
        filter: &CarFilter,
        sort: CarSort,
        order: SortOrder,
        page: Page,
    ) -> AppResult<(Vec<CarModel>, u64)>;
    async fn insert(&self, car: CarModel) -> AppResult<CarModel>;
    async fn save(&self, car: CarModel) -> AppResult<CarModel>;
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
    /// Atomically bumps the counter and returns the updated row.
    async fn increment_view_count(&self, id: Uuid) -> AppResult<Option<CarModel>>;
    /// Counts grouped by status, optionally for a single seller.
    async fn status_counts(&self, seller_id: Option<Uuid>) -> AppResult<CarStatusCounts>;
}

#[derive(Clone)]
pub struct SeaCarRepository {
    db: DatabaseConnection,
}

impl SeaCarRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[derive(Debug, FromQueryResult)]
struct StatusRow {
    status: String,
    count: i64,
    verified: i64,
    views: i64,
}

#[async_trait]
impl CarRepository for SeaCarRepository {
    async fn find(&self, id: Uuid) -> AppResult<Option<CarModel>> {
        Ok(Car::find_by_id(id).one(&self.db).await?)
    }

    async fn list(
        &self,
        filter: &CarFilter,
        sort: CarSort,
        order: SortOrder,
        page: Page,
    ) -> AppResult<(Vec<CarModel>, u64)> {
        let paginator = Car::find()
            .filter(filter.to_condition())
            .order_by(sort.column(), order.to_order())
            .order_by_desc(car::Column::Id)
            .paginate(&self.db, page.limit);
        let total = paginator.num_items().await?;
        let cars = paginator.fetch_page(page.index()).await?;
        Ok((cars, total))
    }

    async fn insert(&self, car: CarModel) -> AppResult<CarModel> {
        let active = car.into_active_model().reset_all();
        Ok(active.insert(&self.db).await?)
    }

    async fn save(&self, car: CarModel) -> AppResult<CarModel> {
        let mut active = car.into_active_model().reset_all();
        active.created_at = ActiveValue::NotSet;
        active.view_count = ActiveValue::NotSet;
        active.updated_at = ActiveValue::Set(chrono::Utc::now().naive_utc());
        Ok(active.update(&self.db).await?)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let res = Car::delete_by_id(id).exec(&self.db).await?;
        Ok(res.rows_affected > 0)
    }

    async fn increment_view_count(&self, id: Uuid) -> AppResult<Option<CarModel>> {
        let res = Car::update_many()
            .col_expr(
                car::Column::ViewCount,
                Expr::col(car::Column::ViewCount).add(1),
            )
            .filter(car::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        if res.rows_affected == 0 {
            return Ok(None);
        }
        self.find(id).await
    }

    async fn status_counts(&self, seller_id: Option<Uuid>) -> AppResult<CarStatusCounts> {
        let base = "SELECT status, COUNT(*)::bigint AS count, \
                    COUNT(*) FILTER (WHERE is_verified)::bigint AS verified, \
                    COALESCE(SUM(view_count), 0)::bigint AS views FROM cars";
        let stmt = match seller_id {
            Some(seller) => Statement::from_sql_and_values(
                DbBackend::Postgres,
                format!("{base} WHERE seller_id = $1 GROUP BY status"),
                [seller.into()],
            ),
            None => Statement::from_string(DbBackend::Postgres, format!("{base} GROUP BY status")),
        };

        let rows = StatusRow::find_by_statement(stmt).all(&self.db).await?;
        let mut counts = CarStatusCounts::default();
        for row in rows {
            match <CarStatus as sea_orm::ActiveEnum>::try_from_value(&row.status) {
                Ok(status) => counts.add(
                    status,
                    row.count.max(0) as u64,
                    row.verified.max(0) as u64,
                    row.views,
                ),
                Err(_) => tracing::warn!(status = %row.status, "unknown car status in stats"),
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::car::CarCondition;

    fn sample(brand: &str, model: &str, price: i64, year: i32) -> CarModel {
        let now = chrono::Utc::now().naive_utc();
        CarModel {
            id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            brand: brand.into(),
            model_name: model.into(),
            year,
            price,
            condition: CarCondition::Used,
            mileage: None,
            color: None,
            transmission: Some(Transmission::Automatic),
            fuel_type: Some(FuelType::Gasoline),
            engine_capacity: None,
            description: Some("Kondisi istimewa".into()),
            features: serde_json::json!([]),
            location: None,
            category: None,
            status: CarStatus::Available,
            is_verified: true,
            view_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn filter_matches_ranges_and_text() {
        let car = sample("Toyota", "Avanza", 200_000_000, 2020);
        let filter = CarFilter {
            brand: Some("toy".into()),
            min_price: Some(150_000_000),
            max_year: Some(2021),
            ..Default::default()
        };
        assert!(filter.matches(&car));

        let filter = CarFilter {
            text: Some("ISTIMEWA".into()),
            ..Default::default()
        };
        assert!(filter.matches(&car));

        let filter = CarFilter {
            transmission: Some(Transmission::Manual),
            ..Default::default()
        };
        assert!(!filter.matches(&car));
    }

    #[test]
    fn sort_parse_accepts_camel_case() {
        assert_eq!(CarSort::parse(Some("viewCount")), CarSort::ViewCount);
        assert_eq!(CarSort::parse(Some("created_at")), CarSort::CreatedAt);
        assert_eq!(CarSort::parse(Some("bogus")), CarSort::CreatedAt);
    }

    #[test]
    fn status_counts_accumulate() {
        let mut counts = CarStatusCounts::default();
        counts.add(CarStatus::Available, 3, 3, 10);
        counts.add(CarStatus::Pending, 2, 0, 1);
        assert_eq!(counts.total_cars, 5);
        assert_eq!(counts.available_cars, 3);
        assert_eq!(counts.pending_cars, 2);
        assert_eq!(counts.approved_cars, 3);
        assert_eq!(counts.total_views, 11);
    }
}
