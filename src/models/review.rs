use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reviews")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub car_id: Uuid,
    pub reviewer_id: Uuid,
    pub rating: i32,
    pub condition_rating: Option<i32>,
    pub seller_rating: Option<i32>,
    pub value_rating: Option<i32>,
    pub title: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub review_text: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub pros: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub cons: Option<String>,
    pub moderation_status: ModerationStatus,
    pub status: ReviewStatus,
    #[sea_orm(column_type = "Text", nullable)]
    pub moderation_reason: Option<String>,
    pub moderated_by: Option<Uuid>,
    pub moderated_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum ModerationStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "flagged")]
    Flagged,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "hidden")]
    Hidden,
    #[sea_orm(string_value = "deleted")]
    Deleted,
}

impl Model {
    pub fn is_public(&self) -> bool {
        self.moderation_status == ModerationStatus::Approved && self.status == ReviewStatus::Active
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::car::Entity",
        from = "Column::CarId",
        to = "super::car::Column::Id"
    )]
    Car,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ReviewerId",
        to = "super::user::Column::Id"
    )]
    Reviewer,
}

impl Related<super::car::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Car.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviewer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
