//! Background generation and distribution of reports.
//!
//! Jobs carry only a report id. Every state change is a conditional update
//! (`status = 'generating'` for reports, `status = 'pending'` for
//! distributions) so a job delivered twice does no harm. On startup the
//! worker first replays whatever the database says is unfinished.

use crate::{
    config::report::ReportWorkerConfig,
    error::{AppError, AppResult},
    models::{
        report::{self, ReportStatus, ReportType},
        report_distribution::{self, DistributionMethod, DistributionStatus},
        Report, ReportDistribution, ReportDistributionModel, ReportModel, User,
    },
    services::{
        cache::{invalidate_report, CacheService},
        email::{Delivery, EmailService},
        report::{
            aggregate::{self, Period, ReportData},
            render,
            source::ReportSource,
        },
    },
};
use chrono::Utc;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect,
};
use std::time::{Duration, Instant};
use tokio::{sync::mpsc, task::JoinHandle};
use uuid::Uuid;

pub const MSG_TIMED_OUT: &str = "Waktu pembuatan laporan habis";
const MSG_NO_ADDRESS: &str = "Alamat email penerima tidak tersedia";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportJob {
    Generate { report_id: Uuid },
    Distribute { report_id: Uuid },
}

impl ReportJob {
    pub fn report_id(&self) -> Uuid {
        match *self {
            ReportJob::Generate { report_id } | ReportJob::Distribute { report_id } => report_id,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ReportJob::Generate { .. } => "generate",
            ReportJob::Distribute { .. } => "distribute",
        }
    }
}

/// Producer side of the job queue, shared with request handlers.
#[derive(Clone)]
pub struct ReportQueue {
    tx: mpsc::Sender<ReportJob>,
}

impl ReportQueue {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ReportJob>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// A job that cannot be queued stays recorded in the database and is
    /// picked up by the next startup replay.
    pub async fn enqueue(&self, job: ReportJob) {
        if let Err(e) = self.tx.send(job).await {
            tracing::error!(
                job = job.kind(),
                report_id = %job.report_id(),
                "report queue closed, job left for replay: {e}"
            );
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    Completed,
    Failed,
    /// Row missing or no longer `generating`.
    Skipped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DistributionOutcome {
    pub sent: usize,
    pub failed: usize,
}

struct Artifacts {
    report_data: serde_json::Value,
    summary_data: serde_json::Value,
    file_url: String,
    file_size: i64,
}

/// Consumer side: does the actual work for each job.
#[derive(Clone)]
pub struct ReportProcessor {
    db: DatabaseConnection,
    source: ReportSource,
    email: EmailService,
    cache: Option<CacheService>,
}

impl ReportProcessor {
    pub fn new(db: DatabaseConnection, email: EmailService, cache: Option<CacheService>) -> Self {
        Self {
            source: ReportSource::new(db.clone()),
            db,
            email,
            cache,
        }
    }

    pub async fn process(&self, job: ReportJob) -> AppResult<()> {
        match job {
            ReportJob::Generate { report_id } => {
                let outcome = self.process_report_generation(report_id).await?;
                tracing::info!(report_id = %report_id, outcome = ?outcome, "report generation finished");
            }
            ReportJob::Distribute { report_id } => {
                let outcome = self.process_distribution(report_id).await?;
                tracing::info!(
                    report_id = %report_id,
                    sent = outcome.sent,
                    failed = outcome.failed,
                    "report distribution finished"
                );
            }
        }
        Ok(())
    }

    pub async fn process_report_generation(&self, report_id: Uuid) -> AppResult<GenerationOutcome> {
        let Some(report) = Report::find_by_id(report_id).one(&self.db).await? else {
            return Ok(GenerationOutcome::Skipped);
        };
        if report.status != ReportStatus::Generating {
            tracing::debug!(report_id = %report_id, status = ?report.status, "skipping report that is not generating");
            return Ok(GenerationOutcome::Skipped);
        }

        let outcome = match self.build(&report).await {
            Ok(artifacts) => {
                let now = Utc::now().naive_utc();
                let patch = report::ActiveModel {
                    status: Set(ReportStatus::Completed),
                    report_data: Set(Some(artifacts.report_data)),
                    summary_data: Set(Some(artifacts.summary_data)),
                    file_url: Set(Some(artifacts.file_url)),
                    file_size: Set(Some(artifacts.file_size)),
                    error_message: Set(None),
                    generated_at: Set(Some(now)),
                    updated_at: Set(now),
                    ..Default::default()
                };
                if self.finish_generation(report_id, patch).await? {
                    GenerationOutcome::Completed
                } else {
                    GenerationOutcome::Skipped
                }
            }
            Err(e) => {
                tracing::warn!(report_id = %report_id, "report generation failed: {e}");
                if self.mark_generation_failed(report_id, &e.to_string()).await? {
                    GenerationOutcome::Failed
                } else {
                    GenerationOutcome::Skipped
                }
            }
        };
        Ok(outcome)
    }

    /// Flips a `generating` report to `failed`. Returns false when the row
    /// had already left `generating`.
    pub async fn mark_generation_failed(&self, report_id: Uuid, message: &str) -> AppResult<bool> {
        let patch = report::ActiveModel {
            status: Set(ReportStatus::Failed),
            error_message: Set(Some(message.to_string())),
            updated_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        };
        self.finish_generation(report_id, patch).await
    }

    async fn finish_generation(&self, report_id: Uuid, patch: report::ActiveModel) -> AppResult<bool> {
        let result = Report::update_many()
            .set(patch)
            .filter(report::Column::Id.eq(report_id))
            .filter(report::Column::Status.eq(ReportStatus::Generating))
            .exec(&self.db)
            .await?;
        invalidate_report(self.cache.as_ref(), report_id).await;
        Ok(result.rows_affected > 0)
    }

    async fn build(&self, report: &ReportModel) -> AppResult<Artifacts> {
        let now = Utc::now();
        let period = Period {
            start: report.period_start,
            end: report.period_end,
        };
        let data = self.collect(report.report_type, period, now).await?;
        let data_json = serde_json::to_value(&data).map_err(anyhow::Error::from)?;
        let summary_data = render::summary(&data, &data_json, now);
        let file = render::render(report.file_format, &data, &data_json, now);
        let file_size = aggregate::estimated_file_size(&data_json.to_string());

        Ok(Artifacts {
            report_data: data_json,
            summary_data,
            file_url: file.to_data_uri(),
            file_size,
        })
    }

    async fn collect(
        &self,
        report_type: ReportType,
        period: Period,
        now: chrono::DateTime<Utc>,
    ) -> AppResult<ReportData> {
        let data = match report_type {
            ReportType::Sales => {
                let rows = self.source.completed_sales(period).await?;
                ReportData::Sales(aggregate::sales(period, &rows, now))
            }
            ReportType::Financial => {
                let rows = self.source.completed_sales(period).await?;
                ReportData::Financial(aggregate::financial(period, &rows, now))
            }
            ReportType::Inventory => {
                let cars = self.source.available_inventory().await?;
                ReportData::Inventory(aggregate::inventory(&cars, now))
            }
            ReportType::UserActivity => {
                let counts = self.source.activity_counts(period, now.naive_utc()).await?;
                ReportData::UserActivity(aggregate::user_activity(period, counts, now))
            }
            ReportType::Performance => {
                let rows = self.source.completed_sales(period).await?;
                let cars = self.source.available_inventory().await?;
                ReportData::Performance(Box::new(aggregate::performance(period, &rows, &cars, now)))
            }
            ReportType::Analytics => {
                let rows = self.source.completed_sales(period).await?;
                let cars = self.source.available_inventory().await?;
                ReportData::Analytics(aggregate::analytics(period, &rows, &cars, now))
            }
            ReportType::Custom => {
                let rows = self.source.completed_sales(period).await?;
                let cars = self.source.available_inventory().await?;
                ReportData::Custom(Box::new(aggregate::custom(period, &rows, &cars, now)))
            }
        };
        Ok(data)
    }

    pub async fn process_distribution(&self, report_id: Uuid) -> AppResult<DistributionOutcome> {
        let mut outcome = DistributionOutcome::default();
        let Some(report) = Report::find_by_id(report_id).one(&self.db).await? else {
            return Ok(outcome);
        };

        let pending = ReportDistribution::find()
            .filter(report_distribution::Column::ReportId.eq(report_id))
            .filter(report_distribution::Column::Status.eq(DistributionStatus::Pending))
            .all(&self.db)
            .await?;

        for row in pending {
            let now = Utc::now().naive_utc();
            let patch = match self.deliver(&report, &row).await {
                Ok(_) => {
                    outcome.sent += 1;
                    report_distribution::ActiveModel {
                        status: Set(DistributionStatus::Sent),
                        sent_at: Set(Some(now)),
                        delivered_at: Set(Some(now)),
                        error_message: Set(None),
                        ..Default::default()
                    }
                }
                Err(e) => {
                    outcome.failed += 1;
                    tracing::warn!(report_id = %report_id, distribution_id = %row.id, "report delivery failed: {e}");
                    report_distribution::ActiveModel {
                        status: Set(DistributionStatus::Failed),
                        error_message: Set(Some(e.to_string())),
                        ..Default::default()
                    }
                }
            };
            ReportDistribution::update_many()
                .set(patch)
                .filter(report_distribution::Column::Id.eq(row.id))
                .filter(report_distribution::Column::Status.eq(DistributionStatus::Pending))
                .exec(&self.db)
                .await?;
        }

        invalidate_report(self.cache.as_ref(), report_id).await;
        Ok(outcome)
    }

    async fn deliver(&self, report: &ReportModel, row: &ReportDistributionModel) -> AppResult<Delivery> {
        match row.method {
            DistributionMethod::Email | DistributionMethod::Auto => {
                let address = self.recipient_address(row).await?;
                let delivery = self.email.send_report_email(&address, report).await?;
                if delivery == Delivery::Skipped {
                    tracing::debug!(distribution_id = %row.id, "smtp not configured, email skipped");
                }
                Ok(delivery)
            }
            // Both are served from the dashboard; nothing to push.
            DistributionMethod::Download | DistributionMethod::Notification => Ok(Delivery::Skipped),
        }
    }

    async fn recipient_address(&self, row: &ReportDistributionModel) -> AppResult<String> {
        if let Some(email) = row.recipient_email.as_deref().filter(|e| !e.is_empty()) {
            return Ok(email.to_string());
        }
        let Some(user_id) = row.recipient_user_id else {
            return Err(AppError::validation(MSG_NO_ADDRESS));
        };
        User::find_by_id(user_id)
            .one(&self.db)
            .await?
            .map(|u| u.email)
            .ok_or_else(|| AppError::validation(MSG_NO_ADDRESS))
    }

    /// Work left unfinished by a previous process.
    pub async fn unfinished_jobs(&self) -> AppResult<Vec<ReportJob>> {
        let generating: Vec<Uuid> = Report::find()
            .select_only()
            .column(report::Column::Id)
            .filter(report::Column::Status.eq(ReportStatus::Generating))
            .into_tuple()
            .all(&self.db)
            .await?;
        let distributing: Vec<Uuid> = ReportDistribution::find()
            .select_only()
            .column(report_distribution::Column::ReportId)
            .distinct()
            .filter(report_distribution::Column::Status.eq(DistributionStatus::Pending))
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(generating
            .into_iter()
            .map(|report_id| ReportJob::Generate { report_id })
            .chain(
                distributing
                    .into_iter()
                    .map(|report_id| ReportJob::Distribute { report_id }),
            )
            .collect())
    }

    /// Runs one job under `limit`; a generation that errors or runs out of
    /// time leaves its report `failed`.
    pub async fn run_with_timeout(&self, job: ReportJob, limit: Duration) {
        let started = Instant::now();
        match tokio::time::timeout(limit, self.process(job)).await {
            Ok(Ok(())) => {
                tracing::debug!(job = job.kind(), report_id = %job.report_id(), elapsed_ms = started.elapsed().as_millis() as u64, "report job done");
            }
            Ok(Err(e)) => {
                tracing::error!(job = job.kind(), report_id = %job.report_id(), "report job errored: {e}");
                if let ReportJob::Generate { report_id } = job {
                    self.fail_quietly(report_id, &e.to_string()).await;
                }
            }
            Err(_) => {
                tracing::error!(job = job.kind(), report_id = %job.report_id(), timeout_secs = limit.as_secs(), "report job timed out");
                if let ReportJob::Generate { report_id } = job {
                    self.fail_quietly(report_id, MSG_TIMED_OUT).await;
                }
            }
        }
    }

    async fn fail_quietly(&self, report_id: Uuid, message: &str) {
        if let Err(e) = self.mark_generation_failed(report_id, message).await {
            tracing::error!(report_id = %report_id, "could not mark report failed: {e}");
        }
    }
}

/// Starts the worker task. The returned queue is the only producer handle;
/// once every clone is dropped the worker drains and exits.
pub fn spawn_report_worker(
    processor: ReportProcessor,
    config: ReportWorkerConfig,
) -> (ReportQueue, JoinHandle<()>) {
    let (queue, rx) = ReportQueue::channel(config.queue_capacity);
    let handle = tokio::spawn(run(processor, rx, config.job_timeout));
    (queue, handle)
}

async fn run(processor: ReportProcessor, mut rx: mpsc::Receiver<ReportJob>, job_timeout: Duration) {
    match processor.unfinished_jobs().await {
        Ok(jobs) if !jobs.is_empty() => {
            tracing::info!(count = jobs.len(), "replaying unfinished report jobs");
            for job in jobs {
                processor.run_with_timeout(job, job_timeout).await;
            }
        }
        Ok(_) => {}
        Err(e) => tracing::error!("could not load unfinished report jobs: {e}"),
    }

    tracing::info!("report worker started");
    while let Some(job) = rx.recv().await {
        processor.run_with_timeout(job, job_timeout).await;
    }
    tracing::info!("report worker stopped");
}
