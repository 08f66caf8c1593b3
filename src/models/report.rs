use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub report_type: ReportType,
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub period_type: PeriodType,
    pub period_start: Date,
    pub period_end: Date,
    pub file_format: FileFormat,
    pub status: ReportStatus,
    pub report_data: Option<Json>,
    pub summary_data: Option<Json>,
    #[sea_orm(column_type = "Text", nullable)]
    pub file_url: Option<String>,
    pub file_size: Option<i64>,
    pub visibility: Visibility,
    pub is_scheduled: bool,
    pub schedule_cron: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub generated_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    #[sea_orm(string_value = "sales")]
    Sales,
    #[sea_orm(string_value = "financial")]
    Financial,
    #[sea_orm(string_value = "inventory")]
    Inventory,
    #[sea_orm(string_value = "user_activity")]
    UserActivity,
    #[sea_orm(string_value = "performance")]
    Performance,
    #[sea_orm(string_value = "analytics")]
    Analytics,
    #[sea_orm(string_value = "custom")]
    Custom,
}

impl ReportType {
    /// Operational reports an admin may see regardless of author.
    pub const ADMIN: [ReportType; 6] = [
        ReportType::Sales,
        ReportType::Inventory,
        ReportType::UserActivity,
        ReportType::Performance,
        ReportType::Analytics,
        ReportType::Custom,
    ];

    /// Everything, financial included, is visible to executives.
    pub const EXECUTIVE: [ReportType; 7] = [
        ReportType::Sales,
        ReportType::Financial,
        ReportType::Inventory,
        ReportType::UserActivity,
        ReportType::Performance,
        ReportType::Analytics,
        ReportType::Custom,
    ];
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum PeriodType {
    #[sea_orm(string_value = "daily")]
    Daily,
    #[sea_orm(string_value = "weekly")]
    Weekly,
    #[sea_orm(string_value = "monthly")]
    Monthly,
    #[sea_orm(string_value = "quarterly")]
    Quarterly,
    #[sea_orm(string_value = "yearly")]
    Yearly,
    #[sea_orm(string_value = "custom")]
    Custom,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum FileFormat {
    #[sea_orm(string_value = "pdf")]
    Pdf,
    #[sea_orm(string_value = "excel")]
    Excel,
    #[sea_orm(string_value = "csv")]
    Csv,
    #[sea_orm(string_value = "json")]
    Json,
}

impl FileFormat {
    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Pdf => "pdf",
            FileFormat::Excel => "xlsx",
            FileFormat::Csv => "csv",
            FileFormat::Json => "json",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    #[sea_orm(string_value = "generating")]
    Generating,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "archived")]
    Archived,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[sea_orm(string_value = "private")]
    Private,
    #[sea_orm(string_value = "public")]
    Public,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedBy",
        to = "super::user::Column::Id"
    )]
    Creator,
    #[sea_orm(has_many = "super::report_distribution::Entity")]
    Distributions,
}

impl Related<super::report_distribution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Distributions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
