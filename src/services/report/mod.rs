//! Report lifecycle: request validation, role-scoped reads, distribution
//! bookkeeping and downloads. Generation itself runs on the report worker.

pub mod aggregate;
pub mod render;
pub mod source;
pub mod visibility;

use crate::{
    config::report::ReportWorkerConfig,
    error::{AppError, AppResult},
    middleware::auth::{require_staff, AuthUser},
    models::{
        parse_enum, parse_optional_enum,
        report::{self, FileFormat, PeriodType, ReportStatus, ReportType, Visibility},
        report_distribution::{self, DistributionMethod, DistributionStatus},
        Report, ReportDistribution, ReportDistributionModel, ReportModel,
    },
    repository::{query::contains_ci, Page},
    services::{
        cache::{invalidate_report, CacheService},
        report_worker::{ReportJob, ReportQueue},
    },
    utils::{data_uri, format::file_stem},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection,
    EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;
use visibility::ReportScope;

pub const MSG_REPORT_NOT_FOUND: &str = "Laporan tidak ditemukan";
pub const MSG_TITLE_REQUIRED: &str = "Judul laporan harus diisi";
pub const MSG_PERIOD_INVERTED: &str = "Tanggal mulai tidak boleh lebih besar dari tanggal selesai";
pub const MSG_NOT_COMPLETED: &str = "Laporan belum selesai dibuat";
pub const MSG_FILE_MISSING: &str = "File laporan tidak tersedia";
pub const MSG_RECIPIENTS_REQUIRED: &str = "Penerima laporan harus diisi";

const RECENT_LIMIT: u64 = 5;

/// A generation request as it arrives from the client.
#[derive(Debug, Clone, Default)]
pub struct ReportRequest {
    pub report_type: String,
    pub title: String,
    pub description: Option<String>,
    pub period_type: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub file_format: Option<String>,
    pub visibility: Option<String>,
    pub is_scheduled: bool,
    pub schedule_cron: Option<String>,
    pub notes: Option<String>,
}

/// A request that passed every allow-list and date check.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidReport {
    pub report_type: ReportType,
    pub title: String,
    pub description: Option<String>,
    pub period_type: PeriodType,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub file_format: FileFormat,
    pub visibility: Visibility,
    pub is_scheduled: bool,
    pub schedule_cron: Option<String>,
    pub notes: Option<String>,
}

impl ReportRequest {
    pub fn validate(self) -> AppResult<ValidReport> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::validation(MSG_TITLE_REQUIRED));
        }
        let report_type = parse_enum(&self.report_type, "Tipe laporan")?;
        let period_type = parse_enum(&self.period_type, "Tipe periode")?;
        if self.period_start > self.period_end {
            return Err(AppError::validation(MSG_PERIOD_INVERTED));
        }
        let file_format =
            parse_optional_enum(self.file_format.as_deref(), "Format file")?.unwrap_or(FileFormat::Pdf);
        let visibility = parse_optional_enum(self.visibility.as_deref(), "Visibilitas")?
            .unwrap_or(Visibility::Private);

        Ok(ValidReport {
            report_type,
            title,
            description: self.description,
            period_type,
            period_start: self.period_start,
            period_end: self.period_end,
            file_format,
            visibility,
            is_scheduled: self.is_scheduled,
            schedule_cron: self.schedule_cron,
            notes: self.notes,
        })
    }
}

/// Optional list filters, combined with the viewer's scope.
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub report_type: Option<ReportType>,
    pub status: Option<ReportStatus>,
    pub period_type: Option<PeriodType>,
    pub visibility: Option<Visibility>,
    pub created_by: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub search: Option<String>,
}

impl ReportFilter {
    pub fn condition(&self) -> Condition {
        let mut cond = Condition::all();
        if let Some(t) = self.report_type {
            cond = cond.add(report::Column::ReportType.eq(t));
        }
        if let Some(s) = self.status {
            cond = cond.add(report::Column::Status.eq(s));
        }
        if let Some(p) = self.period_type {
            cond = cond.add(report::Column::PeriodType.eq(p));
        }
        if let Some(v) = self.visibility {
            cond = cond.add(report::Column::Visibility.eq(v));
        }
        if let Some(id) = self.created_by {
            cond = cond.add(report::Column::CreatedBy.eq(id));
        }
        if let Some(from) = self.date_from {
            cond = cond.add(report::Column::PeriodStart.gte(from));
        }
        if let Some(to) = self.date_to {
            cond = cond.add(report::Column::PeriodEnd.lte(to));
        }
        if let Some(q) = self.search.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            cond = cond.add(
                Condition::any()
                    .add(contains_ci(report::Column::Title, q))
                    .add(contains_ci(report::Column::Description, q)),
            );
        }
        cond
    }
}

/// A single recipient: an address, a user, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipient {
    pub email: Option<String>,
    pub user_id: Option<Uuid>,
}

/// A report with its distribution history. This is the cached shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDetail {
    pub report: ReportModel,
    pub distributions: Vec<ReportDistributionModel>,
}

impl ReportDetail {
    /// True once the worker has nothing left to write for this report.
    /// Only settled details go into the cache.
    pub fn is_settled(&self) -> bool {
        self.report.status != ReportStatus::Generating
            && self
                .distributions
                .iter()
                .all(|d| d.status != DistributionStatus::Pending)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportStatistics {
    pub total_reports: u64,
    pub completed_reports: u64,
    pub failed_reports: u64,
    pub generating_reports: u64,
    pub archived_reports: u64,
    pub reports_by_type: BTreeMap<String, u64>,
    pub reports_by_status: BTreeMap<String, u64>,
    #[serde(skip)]
    pub recent: Vec<ReportModel>,
}

impl ReportStatistics {
    fn add(&mut self, report_type: ReportType, status: ReportStatus, count: u64) {
        use sea_orm::ActiveEnum;
        self.total_reports += count;
        match status {
            ReportStatus::Completed => self.completed_reports += count,
            ReportStatus::Failed => self.failed_reports += count,
            ReportStatus::Generating => self.generating_reports += count,
            ReportStatus::Archived => self.archived_reports += count,
        }
        *self.reports_by_type.entry(report_type.to_value()).or_default() += count;
        *self.reports_by_status.entry(status.to_value()).or_default() += count;
    }
}

#[derive(Debug, FromQueryResult)]
struct TypeStatusCount {
    report_type: ReportType,
    status: ReportStatus,
    count: i64,
}

/// Decoded report file ready to stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFile {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

pub struct ReportService {
    db: DatabaseConnection,
    queue: ReportQueue,
    cache: Option<CacheService>,
    cache_ttl_secs: u64,
}

impl ReportService {
    pub fn new(db: DatabaseConnection, queue: ReportQueue, cache: Option<CacheService>) -> Self {
        Self {
            db,
            queue,
            cache,
            cache_ttl_secs: ReportWorkerConfig::from_env().cache_ttl_secs,
        }
    }

    pub async fn generate_report(
        &self,
        request: ReportRequest,
        actor: &AuthUser,
    ) -> AppResult<ReportModel> {
        require_staff(actor)?;
        let valid = request.validate()?;

        let now = Utc::now().naive_utc();
        let report = report::ActiveModel {
            id: Set(Uuid::new_v4()),
            report_type: Set(valid.report_type),
            title: Set(valid.title),
            description: Set(valid.description),
            period_type: Set(valid.period_type),
            period_start: Set(valid.period_start),
            period_end: Set(valid.period_end),
            file_format: Set(valid.file_format),
            status: Set(ReportStatus::Generating),
            report_data: Set(None),
            summary_data: Set(None),
            file_url: Set(None),
            file_size: Set(None),
            visibility: Set(valid.visibility),
            is_scheduled: Set(valid.is_scheduled),
            schedule_cron: Set(valid.schedule_cron),
            error_message: Set(None),
            notes: Set(valid.notes),
            created_by: Set(actor.user_id),
            generated_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        tracing::info!(
            report_id = %report.id,
            report_type = ?report.report_type,
            created_by = %actor.user_id,
            "report queued for generation"
        );
        self.queue
            .enqueue(ReportJob::Generate {
                report_id: report.id,
            })
            .await;

        Ok(report)
    }

    pub async fn get_reports(
        &self,
        filter: &ReportFilter,
        viewer: &AuthUser,
        page: Page,
    ) -> AppResult<(Vec<ReportModel>, u64)> {
        let scope = ReportScope::for_viewer(viewer);
        let paginator = Report::find()
            .filter(scope.condition())
            .filter(filter.condition())
            .order_by_desc(report::Column::CreatedAt)
            .paginate(&self.db, page.limit);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.index()).await?;
        Ok((items, total))
    }

    /// Served from cache when possible; scope is checked on every read.
    pub async fn get_report_by_id(&self, id: Uuid, viewer: &AuthUser) -> AppResult<ReportDetail> {
        let scope = ReportScope::for_viewer(viewer);
        let key = CacheService::report_key(id);

        if let Some(cache) = &self.cache {
            if let Some(detail) = cache.get::<ReportDetail>(&key).await {
                tracing::debug!(report_id = %id, "report cache hit");
                return if scope.allows(&detail.report) {
                    Ok(detail)
                } else {
                    Err(AppError::NotFound(MSG_REPORT_NOT_FOUND))
                };
            }
        }

        let report = self.find_visible(id, &scope).await?;
        let distributions = ReportDistribution::find()
            .filter(report_distribution::Column::ReportId.eq(id))
            .order_by_desc(report_distribution::Column::CreatedAt)
            .all(&self.db)
            .await?;
        let detail = ReportDetail {
            report,
            distributions,
        };

        if let Some(cache) = self.cache.as_ref().filter(|_| detail.is_settled()) {
            cache.set(&key, &detail, self.cache_ttl_secs).await;
        }
        Ok(detail)
    }

    pub async fn distribute_report(
        &self,
        id: Uuid,
        recipients: Vec<Recipient>,
        method: DistributionMethod,
        actor: &AuthUser,
    ) -> AppResult<Vec<ReportDistributionModel>> {
        require_staff(actor)?;
        let recipients: Vec<Recipient> = recipients
            .into_iter()
            .map(|r| Recipient {
                email: r
                    .email
                    .map(|e| e.trim().to_lowercase())
                    .filter(|e| !e.is_empty()),
                user_id: r.user_id,
            })
            .filter(|r| r.email.is_some() || r.user_id.is_some())
            .collect();
        if recipients.is_empty() {
            return Err(AppError::validation(MSG_RECIPIENTS_REQUIRED));
        }

        let report = self
            .find_visible(id, &ReportScope::for_viewer(actor))
            .await?;
        if report.status != ReportStatus::Completed {
            return Err(AppError::validation(MSG_NOT_COMPLETED));
        }

        let now = Utc::now().naive_utc();
        let txn = self.db.begin().await?;
        let mut rows = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            let row = report_distribution::ActiveModel {
                id: Set(Uuid::new_v4()),
                report_id: Set(id),
                recipient_email: Set(recipient.email),
                recipient_user_id: Set(recipient.user_id),
                method: Set(method),
                status: Set(DistributionStatus::Pending),
                sent_at: Set(None),
                delivered_at: Set(None),
                error_message: Set(None),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
            rows.push(row);
        }
        txn.commit().await?;

        invalidate_report(self.cache.as_ref(), id).await;
        tracing::info!(report_id = %id, recipients = rows.len(), method = ?method, "report distribution queued");
        self.queue
            .enqueue(ReportJob::Distribute { report_id: id })
            .await;

        Ok(rows)
    }

    /// Only the author or an admin may delete.
    pub async fn delete_report(&self, id: Uuid, actor: &AuthUser) -> AppResult<()> {
        let report = self
            .find_visible(id, &ReportScope::for_viewer(actor))
            .await?;
        ensure_manager(&report, actor, "Anda tidak memiliki akses untuk menghapus laporan ini")?;

        let txn = self.db.begin().await?;
        ReportDistribution::delete_many()
            .filter(report_distribution::Column::ReportId.eq(id))
            .exec(&txn)
            .await?;
        Report::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        invalidate_report(self.cache.as_ref(), id).await;
        tracing::info!(report_id = %id, deleted_by = %actor.user_id, "report deleted");
        Ok(())
    }

    pub async fn archive_report(&self, id: Uuid, actor: &AuthUser) -> AppResult<ReportModel> {
        let report = self
            .find_visible(id, &ReportScope::for_viewer(actor))
            .await?;
        ensure_manager(&report, actor, "Anda tidak memiliki akses untuk mengarsipkan laporan ini")?;

        let mut active: report::ActiveModel = report.into();
        active.status = Set(ReportStatus::Archived);
        active.updated_at = Set(Utc::now().naive_utc());
        let archived = active.update(&self.db).await?;

        invalidate_report(self.cache.as_ref(), id).await;
        Ok(archived)
    }

    pub async fn get_report_statistics(&self, viewer: &AuthUser) -> AppResult<ReportStatistics> {
        let scope = ReportScope::for_viewer(viewer);

        let counts = Report::find()
            .select_only()
            .column(report::Column::ReportType)
            .column(report::Column::Status)
            .column_as(report::Column::Id.count(), "count")
            .filter(scope.condition())
            .group_by(report::Column::ReportType)
            .group_by(report::Column::Status)
            .into_model::<TypeStatusCount>()
            .all(&self.db)
            .await?;

        let mut stats = ReportStatistics::default();
        for row in counts {
            stats.add(row.report_type, row.status, row.count.max(0) as u64);
        }

        stats.recent = Report::find()
            .filter(scope.condition())
            .order_by_desc(report::Column::CreatedAt)
            .limit(RECENT_LIMIT)
            .all(&self.db)
            .await?;
        Ok(stats)
    }

    pub async fn download_report(&self, id: Uuid, viewer: &AuthUser) -> AppResult<ReportFile> {
        let report = self
            .find_visible(id, &ReportScope::for_viewer(viewer))
            .await?;
        let uri = report
            .file_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or(AppError::NotFound(MSG_FILE_MISSING))?;
        let decoded = data_uri::decode(uri).ok_or(AppError::NotFound(MSG_FILE_MISSING))?;

        Ok(ReportFile {
            file_name: format!("{}.{}", file_stem(&report.title), report.file_format.extension()),
            mime: decoded.mime,
            bytes: decoded.bytes,
        })
    }

    async fn find_visible(&self, id: Uuid, scope: &ReportScope) -> AppResult<ReportModel> {
        Report::find_by_id(id)
            .filter(scope.condition())
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound(MSG_REPORT_NOT_FOUND))
    }
}

/// Ids of every report `author` created; used to drop their cache entries
/// before the account (and, by cascade, the reports) is deleted.
pub async fn authored_report_ids(db: &DatabaseConnection, author: Uuid) -> AppResult<Vec<Uuid>> {
    Ok(Report::find()
        .select_only()
        .column(report::Column::Id)
        .filter(report::Column::CreatedBy.eq(author))
        .into_tuple()
        .all(db)
        .await?)
}

fn ensure_manager(report: &ReportModel, actor: &AuthUser, denied: &'static str) -> AppResult<()> {
    if report.created_by == actor.user_id || actor.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(denied))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ReportRequest {
        ReportRequest {
            report_type: "sales".into(),
            title: "Penjualan Januari".into(),
            period_type: "monthly".into(),
            period_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            period_end: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            file_format: Some("csv".into()),
            ..Default::default()
        }
    }

    #[test]
    fn valid_request_fills_defaults() {
        let valid = ReportRequest {
            file_format: None,
            ..request()
        }
        .validate()
        .unwrap();
        assert_eq!(valid.report_type, ReportType::Sales);
        assert_eq!(valid.file_format, FileFormat::Pdf);
        assert_eq!(valid.visibility, Visibility::Private);
    }

    #[test]
    fn blank_title_is_rejected() {
        let err = ReportRequest {
            title: "   ".into(),
            ..request()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.public_message(), MSG_TITLE_REQUIRED);
    }

    #[test]
    fn inverted_period_is_rejected() {
        let err = ReportRequest {
            period_start: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            ..request()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.public_message(), MSG_PERIOD_INVERTED);
    }

    #[test]
    fn unknown_enums_list_the_allowed_values() {
        let err = ReportRequest {
            report_type: "weather".into(),
            ..request()
        }
        .validate()
        .unwrap_err();
        assert!(err.public_message().contains("user_activity"));

        let err = ReportRequest {
            file_format: Some("docx".into()),
            ..request()
        }
        .validate()
        .unwrap_err();
        assert!(err.public_message().contains("Format file tidak valid"));
    }

    #[test]
    fn statistics_tally_by_type_and_status() {
        let mut stats = ReportStatistics::default();
        stats.add(ReportType::Sales, ReportStatus::Completed, 3);
        stats.add(ReportType::Sales, ReportStatus::Failed, 1);
        stats.add(ReportType::Inventory, ReportStatus::Generating, 2);

        assert_eq!(stats.total_reports, 6);
        assert_eq!(stats.completed_reports, 3);
        assert_eq!(stats.failed_reports, 1);
        assert_eq!(stats.generating_reports, 2);
        assert_eq!(stats.reports_by_type["sales"], 4);
        assert_eq!(stats.reports_by_status["generating"], 2);
    }

    #[test]
    fn only_author_or_admin_manage_reports() {
        use crate::models::user::UserRole;
        let author = Uuid::new_v4();
        let report = aggregate_report(author);
        let owner = AuthUser {
            user_id: Uuid::new_v4(),
            username: "owner".into(),
            role: UserRole::Owner,
        };
        assert!(ensure_manager(&report, &owner, "x").is_err());
        let admin = AuthUser {
            role: UserRole::Admin,
            ..owner.clone()
        };
        assert!(ensure_manager(&report, &admin, "x").is_ok());
        let me = AuthUser {
            user_id: author,
            ..owner
        };
        assert!(ensure_manager(&report, &me, "x").is_ok());
    }

    fn aggregate_report(created_by: Uuid) -> ReportModel {
        let now = Utc::now().naive_utc();
        ReportModel {
            id: Uuid::new_v4(),
            report_type: ReportType::Sales,
            title: "t".into(),
            description: None,
            period_type: PeriodType::Monthly,
            period_start: now.date(),
            period_end: now.date(),
            file_format: FileFormat::Json,
            status: ReportStatus::Completed,
            report_data: None,
            summary_data: None,
            file_url: None,
            file_size: None,
            visibility: Visibility::Private,
            is_scheduled: false,
            schedule_cron: None,
            error_message: None,
            notes: None,
            created_by,
            generated_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn distribution(report_id: Uuid, status: DistributionStatus) -> ReportDistributionModel {
        ReportDistributionModel {
            id: Uuid::new_v4(),
            report_id,
            recipient_email: Some("direksi@showroom.test".into()),
            recipient_user_id: None,
            method: DistributionMethod::Email,
            status,
            sent_at: None,
            delivered_at: None,
            error_message: None,
            created_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn only_settled_details_are_cacheable() {
        let completed = aggregate_report(Uuid::new_v4());
        let generating = ReportModel {
            status: ReportStatus::Generating,
            ..completed.clone()
        };

        let detail = |report: ReportModel, statuses: &[DistributionStatus]| ReportDetail {
            distributions: statuses
                .iter()
                .map(|s| distribution(report.id, *s))
                .collect(),
            report,
        };

        assert!(!detail(generating, &[]).is_settled());
        assert!(detail(completed.clone(), &[]).is_settled());
        assert!(!detail(
            completed.clone(),
            &[DistributionStatus::Sent, DistributionStatus::Pending]
        )
        .is_settled());
        assert!(detail(completed, &[DistributionStatus::Sent, DistributionStatus::Failed]).is_settled());
    }
}
