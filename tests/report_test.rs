mod common;

use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectionTrait, EntityTrait, Statement};
use serde_json::{json, Value};
use showroom::config::report::ReportWorkerConfig;
use showroom::models::report::{self, FileFormat, PeriodType, ReportStatus, ReportType, Visibility};
use showroom::models::report_distribution::{self, DistributionMethod, DistributionStatus};
use showroom::models::{Report, ReportDistribution};
use showroom::services::email::EmailService;
use showroom::services::report_worker::{
    spawn_report_worker, GenerationOutcome, ReportJob, ReportProcessor, MSG_TIMED_OUT,
};
use std::time::Duration;
use uuid::Uuid;

async fn admin(app: &common::TestApp) -> String {
    let (id, token) = common::create_test_user(app, "radmin", "buyer").await;
    common::make_admin(&app.db, id).await;
    token
}

async fn count(app: &common::TestApp, sql: &str, value: sea_orm::Value) -> i64 {
    app.db
        .query_one(Statement::from_sql_and_values(
            sea_orm::DatabaseBackend::Postgres,
            sql,
            vec![value],
        ))
        .await
        .unwrap()
        .unwrap()
        .try_get::<i64>("", "n")
        .unwrap()
}

async fn generate(app: &common::TestApp, token: &str, payload: Value) -> reqwest::Response {
    app.client
        .post(app.url("/reports"))
        .bearer_auth(token)
        .json(&payload)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_inverted_period_is_rejected_before_insert() {
    let app = common::spawn_app().await;
    let token = admin(&app).await;
    let title = common::unique("Terbalik");

    let resp = generate(
        &app,
        &token,
        json!({
            "reportType": "sales",
            "title": title,
            "periodType": "monthly",
            "periodStart": "2024-02-01",
            "periodEnd": "2024-01-01",
        }),
    )
    .await;

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["message"],
        "Tanggal mulai tidak boleh lebih besar dari tanggal selesai"
    );
    assert_eq!(
        count(
            &app,
            "SELECT COUNT(*) AS n FROM reports WHERE title = $1",
            title.into()
        )
        .await,
        0
    );
}

#[tokio::test]
async fn test_unknown_report_type_is_rejected() {
    let app = common::spawn_app().await;
    let token = admin(&app).await;

    let resp = generate(
        &app,
        &token,
        json!({
            "reportType": "gossip",
            "title": "Apa saja",
            "periodType": "monthly",
            "periodStart": "2024-01-01",
            "periodEnd": "2024-01-31",
        }),
    )
    .await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_buyer_cannot_generate_reports() {
    let app = common::spawn_app().await;
    let (_, token) = common::create_test_user(&app, "rbuyer", "buyer").await;

    let resp = generate(
        &app,
        &token,
        json!({
            "reportType": "sales",
            "title": "Tidak boleh",
            "periodType": "monthly",
            "periodStart": "2024-01-01",
            "periodEnd": "2024-01-31",
        }),
    )
    .await;
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn test_csv_report_completes_and_downloads() {
    let app = common::spawn_app().await;
    let token = admin(&app).await;

    let resp = generate(
        &app,
        &token,
        json!({
            "reportType": "sales",
            "title": "Penjualan Januari",
            "periodType": "monthly",
            "periodStart": "2024-01-01",
            "periodEnd": "2024-01-31",
            "fileFormat": "csv",
        }),
    )
    .await;
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["status"], "generating");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let report = common::wait_for_report(&app, &token, &id).await;
    assert_eq!(report["status"], "completed");
    assert_eq!(report["fileFormat"], "csv");
    assert_eq!(report["hasFile"], true);
    assert!(report["fileSize"].as_i64().unwrap() >= 50_000);
    assert_eq!(report["summaryData"]["reportType"], "sales");

    let resp = app
        .client
        .get(app.url(&format!("/reports/{}/download", id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "text/plain"
    );
    assert!(resp.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .ends_with(".csv\""));
}

#[tokio::test]
async fn test_distribute_then_delete_removes_distributions() {
    let app = common::spawn_app().await;
    let token = admin(&app).await;

    let body: Value = generate(
        &app,
        &token,
        json!({
            "reportType": "inventory",
            "title": "Stok Bulanan",
            "periodType": "monthly",
            "periodStart": "2024-03-01",
            "periodEnd": "2024-03-31",
            "fileFormat": "json",
        }),
    )
    .await
    .json()
    .await
    .unwrap();
    let id = body["data"]["id"].as_str().unwrap().to_string();
    let report = common::wait_for_report(&app, &token, &id).await;
    assert_eq!(report["status"], "completed");

    // Blank recipients are dropped, leaving nothing to send to
    let resp = app
        .client
        .post(app.url(&format!("/reports/{}/distribute", id)))
        .bearer_auth(&token)
        .json(&json!({ "recipients": [{ "email": "   " }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = app
        .client
        .post(app.url(&format!("/reports/{}/distribute", id)))
        .bearer_auth(&token)
        .json(&json!({ "recipients": [{ "email": "Direksi@Showroom.test" }, { "email": "" }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["recipientEmail"], "direksi@showroom.test");
    assert_eq!(rows[0]["method"], "email");

    let report_id = uuid::Uuid::parse_str(&id).unwrap();
    let detail: Value = app
        .client
        .get(app.url(&format!("/reports/{}", id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["data"]["distributions"].as_array().unwrap().len(), 1);

    let resp = app
        .client
        .delete(app.url(&format!("/reports/{}", id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    assert_eq!(
        count(
            &app,
            "SELECT COUNT(*) AS n FROM report_distributions WHERE report_id = $1",
            report_id.into()
        )
        .await,
        0
    );
    let resp = app
        .client
        .get(app.url(&format!("/reports/{}", id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_other_buyer_report_is_invisible() {
    let app = common::spawn_app().await;
    let token = admin(&app).await;
    let (_, outsider) = common::create_test_user(&app, "peek", "buyer").await;

    let body: Value = generate(
        &app,
        &token,
        json!({
            "reportType": "financial",
            "title": "Keuangan Rahasia",
            "periodType": "quarterly",
            "periodStart": "2024-01-01",
            "periodEnd": "2024-03-31",
        }),
    )
    .await
    .json()
    .await
    .unwrap();
    let id = body["data"]["id"].as_str().unwrap();

    let resp = app
        .client
        .get(app.url(&format!("/reports/{}", id)))
        .bearer_auth(&outsider)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

/// Writes a report row directly, the way a previous process would have left it.
async fn insert_report(
    app: &common::TestApp,
    created_by: Uuid,
    report_type: ReportType,
    status: ReportStatus,
) -> Uuid {
    let now = chrono::Utc::now().naive_utc();
    let id = Uuid::new_v4();
    report::ActiveModel {
        id: Set(id),
        report_type: Set(report_type),
        title: Set(common::unique("Laporan")),
        description: Set(None),
        period_type: Set(PeriodType::Monthly),
        period_start: Set(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
        period_end: Set(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()),
        file_format: Set(FileFormat::Csv),
        status: Set(status),
        report_data: Set(None),
        summary_data: Set(None),
        file_url: Set(None),
        file_size: Set(None),
        visibility: Set(Visibility::Private),
        is_scheduled: Set(false),
        schedule_cron: Set(None),
        error_message: Set(None),
        notes: Set(None),
        created_by: Set(created_by),
        generated_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&app.db)
    .await
    .unwrap();
    id
}

async fn insert_pending_distribution(app: &common::TestApp, report_id: Uuid) -> Uuid {
    let id = Uuid::new_v4();
    report_distribution::ActiveModel {
        id: Set(id),
        report_id: Set(report_id),
        recipient_email: Set(Some("direksi@showroom.test".into())),
        recipient_user_id: Set(None),
        method: Set(DistributionMethod::Email),
        status: Set(DistributionStatus::Pending),
        sent_at: Set(None),
        delivered_at: Set(None),
        error_message: Set(None),
        created_at: Set(chrono::Utc::now().naive_utc()),
    }
    .insert(&app.db)
    .await
    .unwrap();
    id
}

fn processor(app: &common::TestApp) -> ReportProcessor {
    ReportProcessor::new(app.db.clone(), EmailService::disabled(), None)
}

#[tokio::test]
async fn test_worker_replays_unfinished_jobs_on_startup() {
    let app = common::spawn_app().await;
    let (admin_id, _) = common::create_test_user(&app, "replay", "buyer").await;
    common::make_admin(&app.db, admin_id).await;

    let stuck = insert_report(&app, admin_id, ReportType::Sales, ReportStatus::Generating).await;
    let delivered =
        insert_report(&app, admin_id, ReportType::Inventory, ReportStatus::Completed).await;
    let distribution_id = insert_pending_distribution(&app, delivered).await;

    let processor = processor(&app);
    let jobs = processor.unfinished_jobs().await.unwrap();
    assert!(jobs.contains(&ReportJob::Generate { report_id: stuck }));
    assert!(jobs.contains(&ReportJob::Distribute { report_id: delivered }));

    // Nothing is ever enqueued: only the startup replay can finish the work
    let (queue, worker) = spawn_report_worker(
        processor,
        ReportWorkerConfig {
            queue_capacity: 4,
            job_timeout: Duration::from_secs(30),
            cache_ttl_secs: 60,
        },
    );
    drop(queue);
    tokio::time::timeout(Duration::from_secs(120), worker)
        .await
        .expect("worker did not drain")
        .unwrap();

    let report = Report::find_by_id(stuck).one(&app.db).await.unwrap().unwrap();
    assert_eq!(report.status, ReportStatus::Completed);
    assert!(report.file_url.unwrap().starts_with("data:text/plain"));
    assert!(report.generated_at.is_some());

    let row = ReportDistribution::find_by_id(distribution_id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, DistributionStatus::Sent);
    assert!(row.sent_at.is_some());
}

#[tokio::test]
async fn test_redelivered_generation_is_skipped() {
    let app = common::spawn_app().await;
    let (admin_id, _) = common::create_test_user(&app, "redeliver", "buyer").await;
    let id = insert_report(&app, admin_id, ReportType::Sales, ReportStatus::Generating).await;

    let processor = processor(&app);
    let first = processor.process_report_generation(id).await.unwrap();
    let report = Report::find_by_id(id).one(&app.db).await.unwrap().unwrap();
    assert_eq!(report.status, ReportStatus::Completed);
    // Another worker may have finished it first; either way it is done once
    assert!(matches!(
        first,
        GenerationOutcome::Completed | GenerationOutcome::Skipped
    ));

    let again = processor.process_report_generation(id).await.unwrap();
    assert_eq!(again, GenerationOutcome::Skipped);
    let unchanged = Report::find_by_id(id).one(&app.db).await.unwrap().unwrap();
    assert_eq!(unchanged.generated_at, report.generated_at);
    assert_eq!(unchanged.file_url, report.file_url);
}

#[tokio::test]
async fn test_generation_past_timeout_marks_report_failed() {
    let app = common::spawn_app().await;
    let (admin_id, _) = common::create_test_user(&app, "slow", "buyer").await;
    let id = insert_report(&app, admin_id, ReportType::Analytics, ReportStatus::Generating).await;

    processor(&app)
        .run_with_timeout(ReportJob::Generate { report_id: id }, Duration::from_nanos(1))
        .await;

    let report = Report::find_by_id(id).one(&app.db).await.unwrap().unwrap();
    assert_eq!(report.status, ReportStatus::Failed);
    assert_eq!(report.error_message.as_deref(), Some(MSG_TIMED_OUT));
    assert!(report.file_url.is_none());
}

#[tokio::test]
async fn test_archived_report_cannot_be_distributed() {
    let app = common::spawn_app().await;
    let token = admin(&app).await;

    let body: Value = generate(
        &app,
        &token,
        json!({
            "reportType": "user_activity",
            "title": "Aktivitas Pengguna",
            "periodType": "weekly",
            "periodStart": "2024-05-01",
            "periodEnd": "2024-05-07",
            "fileFormat": "json",
        }),
    )
    .await
    .json()
    .await
    .unwrap();
    let id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(common::wait_for_report(&app, &token, &id).await["status"], "completed");

    let resp = app
        .client
        .put(app.url(&format!("/reports/{}/archive", id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["status"], "archived");

    let resp = app
        .client
        .post(app.url(&format!("/reports/{}/distribute", id)))
        .bearer_auth(&token)
        .json(&json!({ "recipients": [{ "email": "direksi@showroom.test" }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_statistics_only_count_visible_reports() {
    let app = common::spawn_app().await;
    let (seller_id, seller) = common::create_test_user(&app, "stats", "seller").await;
    let (other_id, _) = common::create_test_user(&app, "other", "seller").await;

    insert_report(&app, seller_id, ReportType::Sales, ReportStatus::Completed).await;
    insert_report(&app, seller_id, ReportType::Inventory, ReportStatus::Failed).await;
    insert_report(&app, other_id, ReportType::Sales, ReportStatus::Completed).await;

    let resp = app
        .client
        .get(app.url("/reports/statistics"))
        .bearer_auth(&seller)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["totalReports"], 2);
    assert_eq!(body["data"]["completedReports"], 1);
    assert_eq!(body["data"]["failedReports"], 1);
    assert_eq!(body["data"]["reportsByType"]["sales"], 1);
    assert_eq!(body["data"]["recentReports"].as_array().unwrap().len(), 2);
}
