use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{
        car::{CarCondition, CarStatus, FuelType, Transmission},
        CarModel,
    },
    repository::{
        CarFilter, CarRepository, CarSort, CarStatusCounts, Page, SeaCarRepository, SortOrder,
    },
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use uuid::Uuid;

pub const MSG_CAR_NOT_FOUND: &str = "Mobil tidak ditemukan";
pub const MSG_CAR_REQUIRED: &str = "Brand, model, tahun, dan harga wajib diisi";
const MSG_UPDATE_FORBIDDEN: &str = "Anda tidak memiliki akses untuk mengubah mobil ini";
const MSG_DELETE_FORBIDDEN: &str = "Anda tidak memiliki akses untuk menghapus mobil ini";

/// A new listing. Enum fields are already parsed from their wire strings.
#[derive(Debug, Clone, Default)]
pub struct NewCar {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub price: Option<i64>,
    pub condition: Option<CarCondition>,
    pub mileage: Option<i32>,
    pub color: Option<String>,
    pub transmission: Option<Transmission>,
    pub fuel_type: Option<FuelType>,
    pub engine_capacity: Option<i32>,
    pub description: Option<String>,
    pub features: Option<Vec<String>>,
    pub location: Option<String>,
    pub category: Option<String>,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct CarChanges {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub price: Option<i64>,
    pub condition: Option<CarCondition>,
    pub mileage: Option<i32>,
    pub color: Option<String>,
    pub transmission: Option<Transmission>,
    pub fuel_type: Option<FuelType>,
    pub engine_capacity: Option<i32>,
    pub description: Option<String>,
    pub features: Option<Vec<String>>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub status: Option<CarStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct CarQuery {
    pub filter: CarFilter,
    pub sort: CarSort,
    pub order: SortOrder,
}

pub struct CarService {
    cars: Arc<dyn CarRepository>,
}

impl CarService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self::with_repository(Arc::new(SeaCarRepository::new(db)))
    }

    pub fn with_repository(cars: Arc<dyn CarRepository>) -> Self {
        Self { cars }
    }

    pub async fn list(&self, query: &CarQuery, page: Page) -> AppResult<(Vec<CarModel>, u64)> {
        self.cars
            .list(&query.filter, query.sort, query.order, page)
            .await
    }

    /// Text search over available, verified listings.
    pub async fn search(
        &self,
        text: &str,
        sort: CarSort,
        order: SortOrder,
        page: Page,
    ) -> AppResult<(Vec<CarModel>, u64)> {
        if text.trim().is_empty() {
            return Err(AppError::validation("Query pencarian diperlukan"));
        }
        let filter = CarFilter {
            text: Some(text.to_string()),
            status: Some(CarStatus::Available),
            verified: Some(true),
            ..Default::default()
        };
        self.cars.list(&filter, sort, order, page).await
    }

    pub async fn by_seller(
        &self,
        seller_id: Uuid,
        status: Option<CarStatus>,
        sort: CarSort,
        order: SortOrder,
        page: Page,
    ) -> AppResult<(Vec<CarModel>, u64)> {
        let filter = CarFilter {
            seller_id: Some(seller_id),
            status,
            ..Default::default()
        };
        self.cars.list(&filter, sort, order, page).await
    }

    pub async fn stats(&self) -> AppResult<CarStatusCounts> {
        self.cars.status_counts(None).await
    }

    /// Fetch a listing, counting the visit.
    pub async fn view(&self, id: Uuid) -> AppResult<CarModel> {
        self.cars
            .increment_view_count(id)
            .await?
            .ok_or(AppError::NotFound(MSG_CAR_NOT_FOUND))
    }

    pub async fn get(&self, id: Uuid) -> AppResult<CarModel> {
        self.cars
            .find(id)
            .await?
            .ok_or(AppError::NotFound(MSG_CAR_NOT_FOUND))
    }

    /// New listings start `pending` and unverified; nothing is written when
    /// a required field is missing.
    pub async fn create(&self, seller_id: Uuid, input: NewCar) -> AppResult<CarModel> {
        let brand = required_text(input.brand);
        let model = required_text(input.model);
        let (Some(brand), Some(model), Some(year), Some(price)) =
            (brand, model, input.year.filter(|y| *y > 0), input.price.filter(|p| *p > 0))
        else {
            return Err(AppError::validation(MSG_CAR_REQUIRED));
        };
        validate_year(year)?;

        let now = chrono::Utc::now().naive_utc();
        let car = self
            .cars
            .insert(CarModel {
                id: Uuid::new_v4(),
                seller_id,
                brand,
                model_name: model,
                year,
                price,
                condition: input.condition.unwrap_or(CarCondition::Used),
                mileage: input.mileage,
                color: input.color,
                transmission: input.transmission,
                fuel_type: input.fuel_type,
                engine_capacity: input.engine_capacity,
                description: input.description,
                features: serde_json::json!(input.features.unwrap_or_default()),
                location: input.location,
                category: input.category,
                status: CarStatus::Pending,
                is_verified: false,
                view_count: 0,
                created_at: now,
                updated_at: now,
            })
            .await?;

        tracing::info!(car_id = %car.id, seller_id = %seller_id, "car listed");
        Ok(car)
    }

    pub async fn update(&self, actor: &AuthUser, id: Uuid, changes: CarChanges) -> AppResult<CarModel> {
        let mut car = self.get(id).await?;
        if !car.is_owned_by(actor.user_id) {
            return Err(AppError::Forbidden(MSG_UPDATE_FORBIDDEN));
        }

        if let Some(brand) = required_text(changes.brand) {
            car.brand = brand;
        }
        if let Some(model) = required_text(changes.model) {
            car.model_name = model;
        }
        if let Some(year) = changes.year {
            validate_year(year)?;
            car.year = year;
        }
        if let Some(price) = changes.price {
            if price <= 0 {
                return Err(AppError::validation("Harga harus lebih dari 0"));
            }
            car.price = price;
        }
        if let Some(status) = changes.status {
            if !status.seller_may_set(car.status) {
                return Err(AppError::Forbidden(
                    "Status ini hanya dapat diubah oleh admin",
                ));
            }
            car.status = status;
        }
        car.condition = changes.condition.unwrap_or(car.condition);
        car.mileage = changes.mileage.or(car.mileage);
        car.color = changes.color.or(car.color);
        car.transmission = changes.transmission.or(car.transmission);
        car.fuel_type = changes.fuel_type.or(car.fuel_type);
        car.engine_capacity = changes.engine_capacity.or(car.engine_capacity);
        car.description = changes.description.or(car.description);
        car.location = changes.location.or(car.location);
        car.category = changes.category.or(car.category);
        if let Some(features) = changes.features {
            car.features = serde_json::json!(features);
        }

        self.cars.save(car).await
    }

    pub async fn delete(&self, actor: &AuthUser, id: Uuid) -> AppResult<()> {
        let car = self.get(id).await?;
        if !car.is_owned_by(actor.user_id) {
            return Err(AppError::Forbidden(MSG_DELETE_FORBIDDEN));
        }
        self.cars.delete(id).await?;
        tracing::info!(car_id = %id, "car deleted");
        Ok(())
    }

    pub async fn approve(&self, id: Uuid) -> AppResult<CarModel> {
        let mut car = self.get(id).await?;
        car.approve();
        let car = self.cars.save(car).await?;
        tracing::info!(car_id = %id, "car approved");
        Ok(car)
    }

    pub async fn reject(&self, id: Uuid) -> AppResult<CarModel> {
        let mut car = self.get(id).await?;
        car.reject();
        let car = self.cars.save(car).await?;
        tracing::info!(car_id = %id, "car rejected");
        Ok(car)
    }

    pub async fn mark_as_sold(&self, actor: &AuthUser, id: Uuid) -> AppResult<CarModel> {
        let mut car = self.get(id).await?;
        if !car.is_owned_by(actor.user_id) {
            return Err(AppError::Forbidden(MSG_UPDATE_FORBIDDEN));
        }
        if car.status != CarStatus::Available && car.status != CarStatus::Reserved {
            return Err(AppError::validation(
                "Hanya mobil yang tersedia yang dapat ditandai terjual",
            ));
        }
        car.mark_as_sold();
        self.cars.save(car).await
    }
}

fn required_text(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn validate_year(year: i32) -> AppResult<()> {
    let max = chrono::Datelike::year(&chrono::Utc::now()) + 1;
    if !(1900..=max).contains(&year) {
        return Err(AppError::validation(format!(
            "Tahun harus antara 1900 dan {max}"
        )));
    }
    Ok(())
}
