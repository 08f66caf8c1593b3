use super::m20250101_000001_create_users_table::Users;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Reports {
    Table,
    Id,
    ReportType,
    Title,
    Description,
    PeriodType,
    PeriodStart,
    PeriodEnd,
    FileFormat,
    Status,
    ReportData,
    SummaryData,
    FileUrl,
    FileSize,
    Visibility,
    IsScheduled,
    ScheduleCron,
    ErrorMessage,
    Notes,
    CreatedBy,
    GeneratedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ReportDistributions {
    Table,
    Id,
    ReportId,
    RecipientEmail,
    RecipientUserId,
    Method,
    Status,
    SentAt,
    DeliveredAt,
    ErrorMessage,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reports::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Reports::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Reports::ReportType).string_len(20).not_null())
                    .col(ColumnDef::new(Reports::Title).string_len(200).not_null())
                    .col(ColumnDef::new(Reports::Description).text().null())
                    .col(ColumnDef::new(Reports::PeriodType).string_len(20).not_null())
                    .col(ColumnDef::new(Reports::PeriodStart).date().not_null())
                    .col(ColumnDef::new(Reports::PeriodEnd).date().not_null())
                    .col(
                        ColumnDef::new(Reports::FileFormat)
                            .string_len(10)
                            .not_null()
                            .default("pdf"),
                    )
                    .col(
                        ColumnDef::new(Reports::Status)
                            .string_len(20)
                            .not_null()
                            .default("generating"),
                    )
                    .col(ColumnDef::new(Reports::ReportData).json_binary().null())
                    .col(ColumnDef::new(Reports::SummaryData).json_binary().null())
                    .col(ColumnDef::new(Reports::FileUrl).text().null())
                    .col(ColumnDef::new(Reports::FileSize).big_integer().null())
                    .col(
                        ColumnDef::new(Reports::Visibility)
                            .string_len(10)
                            .not_null()
                            .default("private"),
                    )
                    .col(
                        ColumnDef::new(Reports::IsScheduled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Reports::ScheduleCron).string_len(100).null())
                    .col(ColumnDef::new(Reports::ErrorMessage).text().null())
                    .col(ColumnDef::new(Reports::Notes).text().null())
                    .col(ColumnDef::new(Reports::CreatedBy).uuid().not_null())
                    .col(ColumnDef::new(Reports::GeneratedAt).timestamp().null())
                    .col(
                        ColumnDef::new(Reports::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Reports::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reports_created_by")
                            .from(Reports::Table, Reports::CreatedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reports_status")
                    .table(Reports::Table)
                    .col(Reports::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reports_created_by")
                    .table(Reports::Table)
                    .col(Reports::CreatedBy)
                    .col(Reports::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // No ON DELETE CASCADE: the service removes distributions explicitly
        // inside the same transaction as the report.
        manager
            .create_table(
                Table::create()
                    .table(ReportDistributions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReportDistributions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ReportDistributions::ReportId).uuid().not_null())
                    .col(
                        ColumnDef::new(ReportDistributions::RecipientEmail)
                            .string_len(255)
                            .null(),
                    )
                    .col(ColumnDef::new(ReportDistributions::RecipientUserId).uuid().null())
                    .col(
                        ColumnDef::new(ReportDistributions::Method)
                            .string_len(20)
                            .not_null()
                            .default("email"),
                    )
                    .col(
                        ColumnDef::new(ReportDistributions::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(ReportDistributions::SentAt).timestamp().null())
                    .col(ColumnDef::new(ReportDistributions::DeliveredAt).timestamp().null())
                    .col(ColumnDef::new(ReportDistributions::ErrorMessage).text().null())
                    .col(
                        ColumnDef::new(ReportDistributions::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_report_distributions_report_id")
                            .from(ReportDistributions::Table, ReportDistributions::ReportId)
                            .to(Reports::Table, Reports::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_report_distributions_recipient_user_id")
                            .from(
                                ReportDistributions::Table,
                                ReportDistributions::RecipientUserId,
                            )
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_report_distributions_report_status")
                    .table(ReportDistributions::Table)
                    .col(ReportDistributions::ReportId)
                    .col(ReportDistributions::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReportDistributions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Reports::Table).to_owned())
            .await
    }
}
