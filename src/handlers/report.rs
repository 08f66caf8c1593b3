use super::{page_from, paginated};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::models::{
    parse_enum, parse_optional_enum,
    report::{FileFormat, PeriodType, ReportStatus, ReportType, Visibility},
    report_distribution::{DistributionMethod, DistributionStatus},
    ReportDistributionModel, ReportModel,
};
use crate::response::{ApiResponse, PaginatedResponse};
use crate::services::cache::CacheService;
use crate::services::report::{
    Recipient, ReportDetail, ReportFilter, ReportRequest, ReportService, ReportStatistics,
};
use crate::services::report_worker::ReportQueue;
use axum::{
    extract::{Path, Query},
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{NaiveDate, NaiveDateTime};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

fn service(
    db: DatabaseConnection,
    queue: ReportQueue,
    cache: Option<CacheService>,
) -> ReportService {
    ReportService::new(db, queue, cache)
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReportRequest {
    /// sales, financial, inventory, user_activity, performance, analytics or custom
    #[serde(default)]
    pub report_type: String,
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    /// daily, weekly, monthly, quarterly, yearly or custom
    #[serde(default)]
    pub period_type: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    /// pdf (default), excel, csv or json
    pub file_format: Option<String>,
    /// private (default) or public
    pub visibility: Option<String>,
    #[serde(default)]
    pub is_scheduled: bool,
    pub schedule_cron: Option<String>,
    pub notes: Option<String>,
}

impl From<GenerateReportRequest> for ReportRequest {
    fn from(req: GenerateReportRequest) -> Self {
        Self {
            report_type: req.report_type,
            title: req.title,
            description: req.description,
            period_type: req.period_type,
            period_start: req.period_start,
            period_end: req.period_end,
            file_format: req.file_format,
            visibility: req.visibility,
            is_scheduled: req.is_scheduled,
            schedule_cron: req.schedule_cron,
            notes: req.notes,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ReportListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub report_type: Option<String>,
    pub status: Option<String>,
    pub period_type: Option<String>,
    pub visibility: Option<String>,
    pub created_by: Option<Uuid>,
    /// Reports whose period starts on or after this date
    pub date_from: Option<NaiveDate>,
    /// Reports whose period ends on or before this date
    pub date_to: Option<NaiveDate>,
    /// Case-insensitive match on title or description
    pub search: Option<String>,
}

impl ReportListQuery {
    fn to_filter(&self) -> AppResult<ReportFilter> {
        Ok(ReportFilter {
            report_type: parse_optional_enum::<ReportType>(self.report_type.as_deref(), "Tipe laporan")?,
            status: parse_optional_enum::<ReportStatus>(self.status.as_deref(), "Status")?,
            period_type: parse_optional_enum::<PeriodType>(self.period_type.as_deref(), "Periode")?,
            visibility: parse_optional_enum::<Visibility>(self.visibility.as_deref(), "Visibilitas")?,
            created_by: self.created_by,
            date_from: self.date_from,
            date_to: self.date_to,
            search: self.search.clone().filter(|s| !s.trim().is_empty()),
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipientRequest {
    pub email: Option<String>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DistributeReportRequest {
    #[serde(default)]
    pub recipients: Vec<RecipientRequest>,
    /// email (default), download, notification or auto
    pub method: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub id: Uuid,
    pub report_type: ReportType,
    pub title: String,
    pub description: Option<String>,
    pub period_type: PeriodType,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub file_format: FileFormat,
    pub status: ReportStatus,
    #[schema(value_type = Option<Object>)]
    pub report_data: Option<serde_json::Value>,
    #[schema(value_type = Option<Object>)]
    pub summary_data: Option<serde_json::Value>,
    pub file_size: Option<i64>,
    pub has_file: bool,
    pub visibility: Visibility,
    pub is_scheduled: bool,
    pub schedule_cron: Option<String>,
    pub error_message: Option<String>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub generated_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<ReportModel> for ReportResponse {
    fn from(r: ReportModel) -> Self {
        Self {
            id: r.id,
            report_type: r.report_type,
            title: r.title,
            description: r.description,
            period_type: r.period_type,
            period_start: r.period_start,
            period_end: r.period_end,
            file_format: r.file_format,
            status: r.status,
            report_data: r.report_data,
            summary_data: r.summary_data,
            file_size: r.file_size,
            has_file: r.file_url.as_deref().is_some_and(|u| !u.is_empty()),
            visibility: r.visibility,
            is_scheduled: r.is_scheduled,
            schedule_cron: r.schedule_cron,
            error_message: r.error_message,
            notes: r.notes,
            created_by: r.created_by,
            generated_at: r.generated_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Listing rows leave out the (potentially large) aggregated data.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummaryResponse {
    pub id: Uuid,
    pub report_type: ReportType,
    pub title: String,
    pub period_type: PeriodType,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub file_format: FileFormat,
    pub status: ReportStatus,
    pub visibility: Visibility,
    pub file_size: Option<i64>,
    pub created_by: Uuid,
    pub generated_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl From<ReportModel> for ReportSummaryResponse {
    fn from(r: ReportModel) -> Self {
        Self {
            id: r.id,
            report_type: r.report_type,
            title: r.title,
            period_type: r.period_type,
            period_start: r.period_start,
            period_end: r.period_end,
            file_format: r.file_format,
            status: r.status,
            visibility: r.visibility,
            file_size: r.file_size,
            created_by: r.created_by,
            generated_at: r.generated_at,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DistributionResponse {
    pub id: Uuid,
    pub report_id: Uuid,
    pub recipient_email: Option<String>,
    pub recipient_user_id: Option<Uuid>,
    pub method: DistributionMethod,
    pub status: DistributionStatus,
    pub sent_at: Option<NaiveDateTime>,
    pub delivered_at: Option<NaiveDateTime>,
    pub error_message: Option<String>,
    pub created_at: NaiveDateTime,
}

impl From<ReportDistributionModel> for DistributionResponse {
    fn from(d: ReportDistributionModel) -> Self {
        Self {
            id: d.id,
            report_id: d.report_id,
            recipient_email: d.recipient_email,
            recipient_user_id: d.recipient_user_id,
            method: d.method,
            status: d.status,
            sent_at: d.sent_at,
            delivered_at: d.delivered_at,
            error_message: d.error_message,
            created_at: d.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportDetailResponse {
    #[serde(flatten)]
    pub report: ReportResponse,
    pub distributions: Vec<DistributionResponse>,
}

impl From<ReportDetail> for ReportDetailResponse {
    fn from(detail: ReportDetail) -> Self {
        Self {
            report: detail.report.into(),
            distributions: detail.distributions.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportStatisticsResponse {
    #[serde(flatten)]
    pub counts: ReportStatistics,
    pub recent_reports: Vec<ReportSummaryResponse>,
}

impl From<ReportStatistics> for ReportStatisticsResponse {
    fn from(mut stats: ReportStatistics) -> Self {
        let recent = std::mem::take(&mut stats.recent);
        Self {
            counts: stats,
            recent_reports: recent.into_iter().map(Into::into).collect(),
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/reports",
    security(("jwt_token" = [])),
    request_body = GenerateReportRequest,
    responses(
        (status = 201, description = "Report queued; status is `generating`", body = ReportResponse),
        (status = 400, description = "Invalid type, period or format", body = AppError),
        (status = 403, description = "Admin or owner only", body = AppError),
    ),
    tag = "reports"
)]
pub async fn generate_report(
    Extension(db): Extension<DatabaseConnection>,
    Extension(queue): Extension<ReportQueue>,
    Extension(cache): Extension<Option<CacheService>>,
    auth_user: AuthUser,
    Json(payload): Json<GenerateReportRequest>,
) -> AppResult<impl IntoResponse> {
    let report = service(db, queue, cache)
        .generate_report(payload.into(), &auth_user)
        .await?;
    Ok(ApiResponse::created(
        ReportResponse::from(report),
        "Laporan sedang dibuat",
    ))
}

#[utoipa::path(
    get,
    path = "/api/reports",
    security(("jwt_token" = [])),
    params(ReportListQuery),
    responses(
        (status = 200, description = "Reports visible to the caller", body = PaginatedResponse<ReportSummaryResponse>),
    ),
    tag = "reports"
)]
pub async fn list_reports(
    Extension(db): Extension<DatabaseConnection>,
    Extension(queue): Extension<ReportQueue>,
    Extension(cache): Extension<Option<CacheService>>,
    auth_user: AuthUser,
    Query(query): Query<ReportListQuery>,
) -> AppResult<impl IntoResponse> {
    let filter = query.to_filter()?;
    let page = page_from(query.page, query.limit);
    let (reports, total) = service(db, queue, cache)
        .get_reports(&filter, &auth_user, page)
        .await?;
    Ok(ApiResponse::ok(paginated::<_, ReportSummaryResponse>(
        reports, total, page,
    )))
}

#[utoipa::path(
    get,
    path = "/api/reports/statistics",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Counts by status and type plus recent reports", body = ReportStatisticsResponse),
    ),
    tag = "reports"
)]
pub async fn report_statistics(
    Extension(db): Extension<DatabaseConnection>,
    Extension(queue): Extension<ReportQueue>,
    Extension(cache): Extension<Option<CacheService>>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let stats = service(db, queue, cache)
        .get_report_statistics(&auth_user)
        .await?;
    Ok(ApiResponse::ok(ReportStatisticsResponse::from(stats)))
}

#[utoipa::path(
    get,
    path = "/api/reports/{id}",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Report ID")),
    responses(
        (status = 200, description = "Report with its distributions", body = ReportDetailResponse),
        (status = 404, description = "Missing or not visible to the caller", body = AppError),
    ),
    tag = "reports"
)]
pub async fn get_report(
    Extension(db): Extension<DatabaseConnection>,
    Extension(queue): Extension<ReportQueue>,
    Extension(cache): Extension<Option<CacheService>>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let detail = service(db, queue, cache)
        .get_report_by_id(id, &auth_user)
        .await?;
    Ok(ApiResponse::ok(ReportDetailResponse::from(detail)))
}

#[utoipa::path(
    post,
    path = "/api/reports/{id}/distribute",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Report ID")),
    request_body = DistributeReportRequest,
    responses(
        (status = 200, description = "Distribution rows queued", body = [DistributionResponse]),
        (status = 400, description = "Report not completed or no recipients", body = AppError),
    ),
    tag = "reports"
)]
pub async fn distribute_report(
    Extension(db): Extension<DatabaseConnection>,
    Extension(queue): Extension<ReportQueue>,
    Extension(cache): Extension<Option<CacheService>>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<DistributeReportRequest>,
) -> AppResult<impl IntoResponse> {
    let method = match payload.method.as_deref().filter(|m| !m.trim().is_empty()) {
        Some(raw) => parse_enum::<DistributionMethod>(raw, "Metode distribusi")?,
        None => DistributionMethod::Email,
    };
    let recipients = payload
        .recipients
        .into_iter()
        .map(|r| Recipient {
            email: r.email,
            user_id: r.user_id,
        })
        .collect();

    let rows = service(db, queue, cache)
        .distribute_report(id, recipients, method, &auth_user)
        .await?;
    let rows: Vec<DistributionResponse> = rows.into_iter().map(Into::into).collect();
    Ok(ApiResponse::with_message(
        rows,
        "Laporan sedang didistribusikan",
    ))
}

#[utoipa::path(
    put,
    path = "/api/reports/{id}/archive",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Report ID")),
    responses(
        (status = 200, description = "Report archived", body = ReportResponse),
        (status = 403, description = "Not the author or an admin", body = AppError),
    ),
    tag = "reports"
)]
pub async fn archive_report(
    Extension(db): Extension<DatabaseConnection>,
    Extension(queue): Extension<ReportQueue>,
    Extension(cache): Extension<Option<CacheService>>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let report = service(db, queue, cache)
        .archive_report(id, &auth_user)
        .await?;
    Ok(ApiResponse::with_message(
        ReportResponse::from(report),
        "Laporan berhasil diarsipkan",
    ))
}

#[utoipa::path(
    delete,
    path = "/api/reports/{id}",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Report ID")),
    responses(
        (status = 200, description = "Report and its distributions deleted"),
        (status = 403, description = "Not the author or an admin", body = AppError),
        (status = 404, description = "Report not found", body = AppError),
    ),
    tag = "reports"
)]
pub async fn delete_report(
    Extension(db): Extension<DatabaseConnection>,
    Extension(queue): Extension<ReportQueue>,
    Extension(cache): Extension<Option<CacheService>>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    service(db, queue, cache)
        .delete_report(id, &auth_user)
        .await?;
    Ok(ApiResponse::message_only("Laporan berhasil dihapus"))
}

#[utoipa::path(
    get,
    path = "/api/reports/{id}/download",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Report ID")),
    responses(
        (status = 200, description = "Rendered report file", content_type = "application/octet-stream"),
        (status = 404, description = "No file for this report", body = AppError),
    ),
    tag = "reports"
)]
pub async fn download_report(
    Extension(db): Extension<DatabaseConnection>,
    Extension(queue): Extension<ReportQueue>,
    Extension(cache): Extension<Option<CacheService>>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let file = service(db, queue, cache)
        .download_report(id, &auth_user)
        .await?;

    let disposition = format!("attachment; filename=\"{}\"", file.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, file.mime),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_parses_typed_filters() {
        let q = ReportListQuery {
            report_type: Some("Sales".into()),
            status: Some("completed".into()),
            search: Some("   ".into()),
            ..Default::default()
        };
        let filter = q.to_filter().unwrap();
        assert_eq!(filter.report_type, Some(ReportType::Sales));
        assert_eq!(filter.status, Some(ReportStatus::Completed));
        assert!(filter.search.is_none());
    }

    #[test]
    fn list_query_rejects_unknown_type() {
        let q = ReportListQuery {
            report_type: Some("weekly_digest".into()),
            ..Default::default()
        };
        assert!(q.to_filter().is_err());
    }

    #[test]
    fn generate_request_deserializes_camel_case() {
        let req: GenerateReportRequest = serde_json::from_value(serde_json::json!({
            "reportType": "inventory",
            "title": "Stok Oktober",
            "periodType": "monthly",
            "periodStart": "2026-10-01",
            "periodEnd": "2026-10-31",
            "fileFormat": "csv"
        }))
        .unwrap();
        let req = ReportRequest::from(req);
        assert_eq!(req.report_type, "inventory");
        assert_eq!(req.file_format.as_deref(), Some("csv"));
        assert!(req.visibility.is_none());
        assert!(!req.is_scheduled);
    }

    #[test]
    fn statistics_response_lists_recent_alongside_counts() {
        let stats = ReportStatistics {
            total_reports: 2,
            completed_reports: 1,
            ..Default::default()
        };
        let json = serde_json::to_value(ReportStatisticsResponse::from(stats)).unwrap();
        assert_eq!(json["totalReports"], 2);
        assert_eq!(json["completedReports"], 1);
        assert!(json["recentReports"].as_array().unwrap().is_empty());
    }
}
