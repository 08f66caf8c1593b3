use super::{page_from, paginated, validate_payload};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{require_staff, AuthUser};
use crate::models::{
    car::{CarCondition, CarStatus, FuelType, Transmission},
    parse_optional_enum, CarModel,
};
use crate::repository::{CarFilter, CarSort, CarStatusCounts, SortOrder};
use crate::response::{ApiResponse, PaginatedResponse};
use crate::services::car::{CarChanges, CarQuery, CarService, NewCar};
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
pub struct CarResponse {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub brand: String,
    pub model: String,
    pub year: i32,
    /// Rupiah
    pub price: i64,
    pub condition: CarCondition,
    pub mileage: Option<i32>,
    pub color: Option<String>,
    pub transmission: Option<Transmission>,
    pub fuel_type: Option<FuelType>,
    pub engine_capacity: Option<i32>,
    pub description: Option<String>,
    pub features: Vec<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub status: CarStatus,
    pub is_verified: bool,
    pub view_count: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<CarModel> for CarResponse {
    fn from(car: CarModel) -> Self {
        let features = serde_json::from_value(car.features).unwrap_or_default();
        Self {
            id: car.id,
            seller_id: car.seller_id,
            brand: car.brand,
            model: car.model_name,
            year: car.year,
            price: car.price,
            condition: car.condition,
            mileage: car.mileage,
            color: car.color,
            transmission: car.transmission,
            fuel_type: car.fuel_type,
            engine_capacity: car.engine_capacity,
            description: car.description,
            features,
            location: car.location,
            category: car.category,
            status: car.status,
            is_verified: car.is_verified,
            view_count: car.view_count,
            created_at: car.created_at,
            updated_at: car.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct CarListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    pub transmission: Option<String>,
    pub fuel_type: Option<String>,
    /// Defaults to `available`
    pub status: Option<String>,
    /// created_at, price, year, mileage or view_count
    pub sort_by: Option<String>,
    /// asc or desc
    pub sort_order: Option<String>,
}

impl CarListQuery {
    fn to_query(&self) -> AppResult<CarQuery> {
        let status = parse_optional_enum(self.status.as_deref(), "Status")?
            .unwrap_or(CarStatus::Available);
        Ok(CarQuery {
            filter: CarFilter {
                brand: self.brand.clone(),
                model: self.model.clone(),
                min_price: self.min_price,
                max_price: self.max_price,
                min_year: self.min_year,
                max_year: self.max_year,
                transmission: parse_optional_enum(self.transmission.as_deref(), "Transmisi")?,
                fuel_type: parse_optional_enum(self.fuel_type.as_deref(), "Bahan bakar")?,
                status: Some(status),
                ..Default::default()
            },
            sort: CarSort::parse(self.sort_by.as_deref()),
            order: SortOrder::parse(self.sort_order.as_deref()),
        })
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct CarSearchQuery {
    pub q: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct SellerCarsQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Any status when omitted
    pub status: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCarRequest {
    #[validate(length(max = 100))]
    pub brand: Option<String>,
    #[validate(length(max = 100))]
    pub model: Option<String>,
    pub year: Option<i32>,
    pub price: Option<i64>,
    /// new or used
    pub condition: Option<String>,
    #[validate(range(min = 0))]
    pub mileage: Option<i32>,
    pub color: Option<String>,
    /// manual, automatic or cvt
    pub transmission: Option<String>,
    /// gasoline, diesel, electric or hybrid
    pub fuel_type: Option<String>,
    #[validate(range(min = 0))]
    pub engine_capacity: Option<i32>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub features: Option<Vec<String>>,
    pub location: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCarRequest {
    #[validate(length(min = 1, max = 100))]
    pub brand: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub model: Option<String>,
    pub year: Option<i32>,
    pub price: Option<i64>,
    pub condition: Option<String>,
    #[validate(range(min = 0))]
    pub mileage: Option<i32>,
    pub color: Option<String>,
    pub transmission: Option<String>,
    pub fuel_type: Option<String>,
    #[validate(range(min = 0))]
    pub engine_capacity: Option<i32>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub features: Option<Vec<String>>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/cars",
    params(CarListQuery),
    responses(
        (status = 200, description = "Paginated listings", body = PaginatedResponse<CarResponse>),
        (status = 400, description = "Invalid filter value", body = AppError),
    ),
    tag = "cars"
)]
pub async fn list_cars(
    Extension(db): Extension<DatabaseConnection>,
    Query(query): Query<CarListQuery>,
) -> AppResult<impl IntoResponse> {
    let car_query = query.to_query()?;
    let page = page_from(query.page, query.limit);
    let (cars, total) = CarService::new(db).list(&car_query, page).await?;
    Ok(ApiResponse::ok(paginated::<_, CarResponse>(cars, total, page)))
}

#[utoipa::path(
    get,
    path = "/api/cars/search",
    params(CarSearchQuery),
    responses(
        (status = 200, description = "Matching available listings", body = PaginatedResponse<CarResponse>),
        (status = 400, description = "Missing query", body = AppError),
    ),
    tag = "cars"
)]
pub async fn search_cars(
    Extension(db): Extension<DatabaseConnection>,
    Query(query): Query<CarSearchQuery>,
) -> AppResult<impl IntoResponse> {
    let page = page_from(query.page, query.limit);
    let (cars, total) = CarService::new(db)
        .search(
            query.q.as_deref().unwrap_or_default(),
            CarSort::parse(query.sort_by.as_deref()),
            SortOrder::parse(query.sort_order.as_deref()),
            page,
        )
        .await?;
    Ok(ApiResponse::ok(paginated::<_, CarResponse>(cars, total, page)))
}

#[utoipa::path(
    get,
    path = "/api/cars/stats",
    responses(
        (status = 200, description = "Listing counts by status", body = CarStatusCounts),
    ),
    tag = "cars"
)]
pub async fn car_stats(Extension(db): Extension<DatabaseConnection>) -> AppResult<impl IntoResponse> {
    Ok(ApiResponse::ok(CarService::new(db).stats().await?))
}

#[utoipa::path(
    get,
    path = "/api/cars/seller/{seller_id}",
    params(("seller_id" = Uuid, Path, description = "Seller ID"), SellerCarsQuery),
    responses(
        (status = 200, description = "The seller's listings", body = PaginatedResponse<CarResponse>),
    ),
    tag = "cars"
)]
pub async fn seller_cars(
    Extension(db): Extension<DatabaseConnection>,
    Path(seller_id): Path<Uuid>,
    Query(query): Query<SellerCarsQuery>,
) -> AppResult<impl IntoResponse> {
    let status = parse_optional_enum(query.status.as_deref(), "Status")?;
    let page = page_from(query.page, query.limit);
    let (cars, total) = CarService::new(db)
        .by_seller(
            seller_id,
            status,
            CarSort::parse(query.sort_by.as_deref()),
            SortOrder::parse(query.sort_order.as_deref()),
            page,
        )
        .await?;
    Ok(ApiResponse::ok(paginated::<_, CarResponse>(cars, total, page)))
}

#[utoipa::path(
    get,
    path = "/api/cars/{id}",
    params(("id" = Uuid, Path, description = "Car ID")),
    responses(
        (status = 200, description = "Listing; the view is counted", body = CarResponse),
        (status = 404, description = "Car not found", body = AppError),
    ),
    tag = "cars"
)]
pub async fn get_car(
    Extension(db): Extension<DatabaseConnection>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let car = CarService::new(db).view(id).await?;
    Ok(ApiResponse::ok(CarResponse::from(car)))
}

#[utoipa::path(
    post,
    path = "/api/cars",
    security(("jwt_token" = [])),
    request_body = CreateCarRequest,
    responses(
        (status = 201, description = "Listing created as pending", body = CarResponse),
        (status = 400, description = "Missing required field", body = AppError),
    ),
    tag = "cars"
)]
pub async fn create_car(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Json(payload): Json<CreateCarRequest>,
) -> AppResult<impl IntoResponse> {
    validate_payload(&payload)?;
    let input = NewCar {
        condition: parse_optional_enum(payload.condition.as_deref(), "Kondisi")?,
        transmission: parse_optional_enum(payload.transmission.as_deref(), "Transmisi")?,
        fuel_type: parse_optional_enum(payload.fuel_type.as_deref(), "Bahan bakar")?,
        brand: payload.brand,
        model: payload.model,
        year: payload.year,
        price: payload.price,
        mileage: payload.mileage,
        color: payload.color,
        engine_capacity: payload.engine_capacity,
        description: payload.description,
        features: payload.features,
        location: payload.location,
        category: payload.category,
    };

    let car = CarService::new(db).create(auth_user.user_id, input).await?;
    Ok(ApiResponse::created(
        CarResponse::from(car),
        "Mobil berhasil ditambahkan",
    ))
}

#[utoipa::path(
    put,
    path = "/api/cars/{id}",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Car ID")),
    request_body = UpdateCarRequest,
    responses(
        (status = 200, description = "Listing updated", body = CarResponse),
        (status = 403, description = "Not the seller", body = AppError),
        (status = 404, description = "Car not found", body = AppError),
    ),
    tag = "cars"
)]
pub async fn update_car(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCarRequest>,
) -> AppResult<impl IntoResponse> {
    validate_payload(&payload)?;
    let changes = CarChanges {
        condition: parse_optional_enum(payload.condition.as_deref(), "Kondisi")?,
        transmission: parse_optional_enum(payload.transmission.as_deref(), "Transmisi")?,
        fuel_type: parse_optional_enum(payload.fuel_type.as_deref(), "Bahan bakar")?,
        status: parse_optional_enum(payload.status.as_deref(), "Status")?,
        brand: payload.brand,
        model: payload.model,
        year: payload.year,
        price: payload.price,
        mileage: payload.mileage,
        color: payload.color,
        engine_capacity: payload.engine_capacity,
        description: payload.description,
        features: payload.features,
        location: payload.location,
        category: payload.category,
    };

    let car = CarService::new(db).update(&auth_user, id, changes).await?;
    Ok(ApiResponse::with_message(
        CarResponse::from(car),
        "Mobil berhasil diperbarui",
    ))
}

#[utoipa::path(
    delete,
    path = "/api/cars/{id}",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Car ID")),
    responses(
        (status = 200, description = "Listing deleted"),
        (status = 403, description = "Not the seller", body = AppError),
    ),
    tag = "cars"
)]
pub async fn delete_car(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    CarService::new(db).delete(&auth_user, id).await?;
    Ok(ApiResponse::message_only("Mobil berhasil dihapus"))
}

#[utoipa::path(
    put,
    path = "/api/cars/{id}/approve",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Car ID")),
    responses(
        (status = 200, description = "Listing is available and verified", body = CarResponse),
        (status = 403, description = "Staff only", body = AppError),
    ),
    tag = "cars"
)]
pub async fn approve_car(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    require_staff(&auth_user)?;
    let car = CarService::new(db).approve(id).await?;
    Ok(ApiResponse::with_message(
        CarResponse::from(car),
        "Mobil berhasil disetujui",
    ))
}

#[utoipa::path(
    put,
    path = "/api/cars/{id}/reject",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Car ID")),
    responses(
        (status = 200, description = "Listing rejected", body = CarResponse),
        (status = 403, description = "Staff only", body = AppError),
    ),
    tag = "cars"
)]
pub async fn reject_car(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    require_staff(&auth_user)?;
    let car = CarService::new(db).reject(id).await?;
    Ok(ApiResponse::with_message(
        CarResponse::from(car),
        "Mobil ditolak",
    ))
}

#[utoipa::path(
    put,
    path = "/api/cars/{id}/sold",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Car ID")),
    responses(
        (status = 200, description = "Listing marked as sold", body = CarResponse),
        (status = 400, description = "Listing is not on sale", body = AppError),
        (status = 403, description = "Not the seller", body = AppError),
    ),
    tag = "cars"
)]
pub async fn mark_car_sold(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let car = CarService::new(db).mark_as_sold(&auth_user, id).await?;
    Ok(ApiResponse::with_message(
        CarResponse::from(car),
        "Mobil ditandai terjual",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_defaults_to_available_newest_first() {
        let q = CarListQuery::default().to_query().unwrap();
        assert_eq!(q.filter.status, Some(CarStatus::Available));
        assert_eq!(q.sort, CarSort::CreatedAt);
        assert_eq!(q.order, SortOrder::Desc);
    }

    #[test]
    fn list_rejects_unknown_transmission() {
        let q = CarListQuery {
            transmission: Some("tiptronic".into()),
            ..Default::default()
        };
        let err = q.to_query().unwrap_err();
        assert!(err.public_message().starts_with("Transmisi tidak valid"));
    }

    #[test]
    fn response_exposes_model_and_features() {
        let now = chrono::Utc::now().naive_utc();
        let car = CarModel {
            id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            brand: "Toyota".into(),
            model_name: "Avanza".into(),
            year: 2021,
            price: 210_000_000,
            condition: CarCondition::Used,
            mileage: Some(30_000),
            color: None,
            transmission: Some(Transmission::Manual),
            fuel_type: Some(FuelType::Gasoline),
            engine_capacity: Some(1300),
            description: None,
            features: serde_json::json!(["ABS", "Airbag"]),
            location: None,
            category: Some("MPV".into()),
            status: CarStatus::Available,
            is_verified: true,
            view_count: 3,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(CarResponse::from(car)).unwrap();
        assert_eq!(json["model"], "Avanza");
        assert_eq!(json["fuelType"], "gasoline");
        assert_eq!(json["features"][1], "Airbag");
        assert_eq!(json["viewCount"], 3);
    }
}
