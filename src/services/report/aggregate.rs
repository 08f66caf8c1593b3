//! Pure reductions from loaded rows to report payloads.
//!
//! Nothing in here touches the database; [`super::source`] loads the rows.

use crate::models::{car::CarStatus, report::ReportType, CarModel};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

/// Sales rows kept in a sales payload.
pub const MAX_SALES_ROWS: usize = 100;
/// Vehicles kept in an inventory payload.
pub const MAX_INVENTORY_ROWS: usize = 50;
/// Entries in a top-N ranking.
pub const TOP_N: usize = 10;

const UNKNOWN: &str = "Unknown";

/// A completed transaction joined with its buyer and car.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct SaleRow {
    pub id: Uuid,
    pub created_at: NaiveDateTime,
    pub total_amount: i64,
    pub payment_method: Option<String>,
    pub buyer_id: Uuid,
    pub customer_name: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRow {
    pub id: Uuid,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub price: i64,
    pub category: Option<String>,
    pub status: CarStatus,
    pub view_count: i64,
}

impl From<&CarModel> for VehicleRow {
    fn from(car: &CarModel) -> Self {
        Self {
            id: car.id,
            brand: car.brand.clone(),
            model: car.model_name.clone(),
            year: car.year,
            price: car.price,
            category: car.category.clone(),
            status: car.status,
            view_count: car.view_count,
        }
    }
}

/// Counters for the user activity report, computed in SQL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromQueryResult)]
pub struct ActivityCounts {
    pub total_users: i64,
    pub active_users: i64,
    pub new_users: i64,
    pub total_transactions: i64,
    pub users_with_transactions: i64,
    pub total_reviews: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub total_revenue: i64,
    pub total_transactions: u64,
    pub average_transaction_value: f64,
    pub unique_customers: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesReport {
    pub period: Period,
    pub summary: SalesSummary,
    pub sales_by_category: BTreeMap<String, u64>,
    pub sales_by_month: BTreeMap<String, i64>,
    pub transactions: Vec<SaleRow>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSummary {
    pub total_revenue: i64,
    pub total_transactions: u64,
    pub average_transaction_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialReport {
    pub period: Period,
    pub summary: FinancialSummary,
    pub revenue_by_payment_method: BTreeMap<String, i64>,
    pub monthly_revenue: BTreeMap<String, i64>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    pub total_vehicles: u64,
    pub total_inventory_value: i64,
    pub average_vehicle_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryReport {
    pub summary: InventorySummary,
    pub inventory_by_category: BTreeMap<String, u64>,
    pub inventory_by_brand: BTreeMap<String, u64>,
    pub vehicles: Vec<VehicleRow>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    pub total_users: i64,
    pub active_users: i64,
    pub total_transactions: i64,
    pub total_reviews: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub new_users_this_period: i64,
    pub users_with_transactions: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActivityReport {
    pub period: Period,
    pub summary: ActivitySummary,
    pub user_stats: UserStats,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub total_revenue: i64,
    pub total_transactions: u64,
    pub conversion_rate: f64,
    pub average_transaction_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub period: Period,
    pub kpis: Kpis,
    pub sales_performance: SalesReport,
    pub financial_performance: FinancialReport,
    pub inventory_performance: InventoryReport,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandCount {
    pub brand: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketTrends {
    pub top_categories: Vec<CategoryCount>,
    pub top_brands: Vec<BrandCount>,
    pub average_price_by_category: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandAnalytics {
    pub total_demand: u64,
    pub average_transaction_value: f64,
    pub demand_by_category: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryAnalytics {
    pub total_inventory: u64,
    pub average_price: f64,
    pub inventory_by_category: Vec<CategoryCount>,
    pub inventory_by_brand: Vec<BrandCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub market_trends: MarketTrends,
    pub demand_analytics: DemandAnalytics,
    pub inventory_analytics: InventoryAnalytics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub period: Period,
    pub analytics: Analytics,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomMetrics {
    pub overview: SalesReport,
    pub financial: FinancialReport,
    pub inventory: InventoryReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomReport {
    pub period: Period,
    pub custom_metrics: CustomMetrics,
    pub generated_at: DateTime<Utc>,
}

/// One generated payload per report type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportData {
    Sales(SalesReport),
    Financial(FinancialReport),
    Inventory(InventoryReport),
    UserActivity(UserActivityReport),
    Performance(Box<PerformanceReport>),
    Analytics(AnalyticsReport),
    Custom(Box<CustomReport>),
}

impl ReportData {
    pub fn report_type(&self) -> ReportType {
        match self {
            ReportData::Sales(_) => ReportType::Sales,
            ReportData::Financial(_) => ReportType::Financial,
            ReportData::Inventory(_) => ReportType::Inventory,
            ReportData::UserActivity(_) => ReportType::UserActivity,
            ReportData::Performance(_) => ReportType::Performance,
            ReportData::Analytics(_) => ReportType::Analytics,
            ReportData::Custom(_) => ReportType::Custom,
        }
    }

    /// The headline numbers copied into `summary_data.keyMetrics`.
    pub fn key_metrics(&self) -> serde_json::Value {
        let value = match self {
            ReportData::Sales(r) => serde_json::to_value(&r.summary),
            ReportData::Financial(r) => serde_json::to_value(&r.summary),
            ReportData::Inventory(r) => serde_json::to_value(&r.summary),
            ReportData::UserActivity(r) => serde_json::to_value(&r.summary),
            ReportData::Performance(r) => serde_json::to_value(&r.kpis),
            ReportData::Analytics(_) | ReportData::Custom(_) => Ok(serde_json::json!({})),
        };
        value.unwrap_or_else(|_| serde_json::json!({}))
    }
}

/// `YYYY-MM` bucket for monthly grouping.
pub fn month_key(at: NaiveDateTime) -> String {
    at.format("%Y-%m").to_string()
}

fn label(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN)
        .to_string()
}

fn average(total: i64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

fn tally<'a>(keys: impl Iterator<Item = Option<&'a str>>) -> BTreeMap<String, u64> {
    let mut out = BTreeMap::new();
    for key in keys {
        *out.entry(label(key)).or_insert(0) += 1;
    }
    out
}

/// Highest counts first; ties broken by name so output is stable.
fn top(counts: BTreeMap<String, u64>) -> Vec<(String, u64)> {
    let mut ranked: Vec<(String, u64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(TOP_N);
    ranked
}

fn top_categories<'a>(keys: impl Iterator<Item = Option<&'a str>>) -> Vec<CategoryCount> {
    top(tally(keys))
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect()
}

fn top_brands<'a>(keys: impl Iterator<Item = Option<&'a str>>) -> Vec<BrandCount> {
    top(tally(keys))
        .into_iter()
        .map(|(brand, count)| BrandCount { brand, count })
        .collect()
}

pub fn sales(period: Period, rows: &[SaleRow], now: DateTime<Utc>) -> SalesReport {
    let total_revenue: i64 = rows.iter().map(|r| r.total_amount).sum();
    let unique: HashSet<Uuid> = rows.iter().map(|r| r.buyer_id).collect();

    let mut by_month = BTreeMap::new();
    for row in rows {
        *by_month.entry(month_key(row.created_at)).or_insert(0) += row.total_amount;
    }

    SalesReport {
        period,
        summary: SalesSummary {
            total_revenue,
            total_transactions: rows.len() as u64,
            average_transaction_value: average(total_revenue, rows.len()),
            unique_customers: unique.len() as u64,
        },
        sales_by_category: tally(rows.iter().map(|r| r.category.as_deref())),
        sales_by_month: by_month,
        transactions: rows.iter().take(MAX_SALES_ROWS).cloned().collect(),
        generated_at: now,
    }
}

pub fn financial(period: Period, rows: &[SaleRow], now: DateTime<Utc>) -> FinancialReport {
    let total_revenue: i64 = rows.iter().map(|r| r.total_amount).sum();

    let mut by_method = BTreeMap::new();
    let mut by_month = BTreeMap::new();
    for row in rows {
        *by_method
            .entry(label(row.payment_method.as_deref()))
            .or_insert(0) += row.total_amount;
        *by_month.entry(month_key(row.created_at)).or_insert(0) += row.total_amount;
    }

    FinancialReport {
        period,
        summary: FinancialSummary {
            total_revenue,
            total_transactions: rows.len() as u64,
            average_transaction_value: average(total_revenue, rows.len()),
        },
        revenue_by_payment_method: by_method,
        monthly_revenue: by_month,
        generated_at: now,
    }
}

pub fn inventory(cars: &[CarModel], now: DateTime<Utc>) -> InventoryReport {
    let total_value: i64 = cars.iter().map(|c| c.price).sum();
    InventoryReport {
        summary: InventorySummary {
            total_vehicles: cars.len() as u64,
            total_inventory_value: total_value,
            average_vehicle_price: average(total_value, cars.len()),
        },
        inventory_by_category: tally(cars.iter().map(|c| c.category.as_deref())),
        inventory_by_brand: tally(cars.iter().map(|c| Some(c.brand.as_str()))),
        vehicles: cars.iter().take(MAX_INVENTORY_ROWS).map(VehicleRow::from).collect(),
        generated_at: now,
    }
}

pub fn user_activity(period: Period, counts: ActivityCounts, now: DateTime<Utc>) -> UserActivityReport {
    UserActivityReport {
        period,
        summary: ActivitySummary {
            total_users: counts.total_users,
            active_users: counts.active_users,
            total_transactions: counts.total_transactions,
            total_reviews: counts.total_reviews,
        },
        user_stats: UserStats {
            new_users_this_period: counts.new_users,
            users_with_transactions: counts.users_with_transactions,
        },
        generated_at: now,
    }
}

/// Transactions per available vehicle, as a percentage. Zero when there is
/// no stock to compare against.
pub fn conversion_rate(transactions: u64, vehicles: u64) -> f64 {
    if transactions == 0 || vehicles == 0 {
        0.0
    } else {
        transactions as f64 / vehicles as f64 * 100.0
    }
}

pub fn performance(
    period: Period,
    rows: &[SaleRow],
    cars: &[CarModel],
    now: DateTime<Utc>,
) -> PerformanceReport {
    let sales = sales(period, rows, now);
    let financial = financial(period, rows, now);
    let inventory = inventory(cars, now);

    PerformanceReport {
        period,
        kpis: Kpis {
            total_revenue: sales.summary.total_revenue,
            total_transactions: sales.summary.total_transactions,
            conversion_rate: conversion_rate(
                sales.summary.total_transactions,
                inventory.summary.total_vehicles,
            ),
            average_transaction_value: sales.summary.average_transaction_value,
        },
        sales_performance: sales,
        financial_performance: financial,
        inventory_performance: inventory,
        generated_at: now,
    }
}

pub fn analytics(
    period: Period,
    rows: &[SaleRow],
    cars: &[CarModel],
    now: DateTime<Utc>,
) -> AnalyticsReport {
    let mut price_totals: BTreeMap<String, (i64, usize)> = BTreeMap::new();
    for car in cars {
        let entry = price_totals
            .entry(label(car.category.as_deref()))
            .or_insert((0, 0));
        entry.0 += car.price;
        entry.1 += 1;
    }
    let average_price_by_category = price_totals
        .into_iter()
        .map(|(category, (total, count))| (category, average(total, count)))
        .collect();

    let demand_total: i64 = rows.iter().map(|r| r.total_amount).sum();
    let stock_total: i64 = cars.iter().map(|c| c.price).sum();

    AnalyticsReport {
        period,
        analytics: Analytics {
            market_trends: MarketTrends {
                top_categories: top_categories(cars.iter().map(|c| c.category.as_deref())),
                top_brands: top_brands(cars.iter().map(|c| Some(c.brand.as_str()))),
                average_price_by_category,
            },
            demand_analytics: DemandAnalytics {
                total_demand: rows.len() as u64,
                average_transaction_value: average(demand_total, rows.len()),
                demand_by_category: tally(rows.iter().map(|r| r.category.as_deref())),
            },
            inventory_analytics: InventoryAnalytics {
                total_inventory: cars.len() as u64,
                average_price: average(stock_total, cars.len()),
                inventory_by_category: top_categories(cars.iter().map(|c| c.category.as_deref())),
                inventory_by_brand: top_brands(cars.iter().map(|c| Some(c.brand.as_str()))),
            },
        },
        generated_at: now,
    }
}

pub fn custom(
    period: Period,
    rows: &[SaleRow],
    cars: &[CarModel],
    now: DateTime<Utc>,
) -> CustomReport {
    CustomReport {
        period,
        custom_metrics: CustomMetrics {
            overview: sales(period, rows, now),
            financial: financial(period, rows, now),
            inventory: inventory(cars, now),
        },
        generated_at: now,
    }
}

/// Leaf count of a JSON tree: arrays count their elements, objects sum
/// their members, `null` counts nothing and any other scalar counts one.
pub fn count_data_points(value: &serde_json::Value) -> u64 {
    use serde_json::Value;
    match value {
        Value::Null => 0,
        Value::Array(items) => items.len() as u64,
        Value::Object(map) => map.values().map(count_data_points).sum(),
        _ => 1,
    }
}

/// Nominal stored size: ten bytes per JSON character, at least 50 000.
pub fn estimated_file_size(report_json: &str) -> i64 {
    (report_json.len() as i64 * 10).max(50_000)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::models::car::CarCondition;

    pub fn sale(amount: i64, day: &str, category: Option<&str>, method: Option<&str>) -> SaleRow {
        SaleRow {
            id: Uuid::new_v4(),
            created_at: NaiveDateTime::parse_from_str(&format!("{day} 10:00:00"), "%Y-%m-%d %H:%M:%S")
                .unwrap(),
            total_amount: amount,
            payment_method: method.map(str::to_string),
            buyer_id: Uuid::new_v4(),
            customer_name: Some("Budi".into()),
            category: category.map(str::to_string),
            brand: Some("Toyota".into()),
        }
    }

    pub fn car(brand: &str, category: Option<&str>, price: i64) -> CarModel {
        let now = Utc::now().naive_utc();
        CarModel {
            id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            brand: brand.into(),
            model_name: "X".into(),
            year: 2021,
            price,
            condition: CarCondition::Used,
            mileage: None,
            color: None,
            transmission: None,
            fuel_type: None,
            engine_capacity: None,
            description: None,
            features: serde_json::json!([]),
            location: None,
            category: category.map(str::to_string),
            status: CarStatus::Available,
            is_verified: true,
            view_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn period() -> Period {
        Period {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        }
    }
}
