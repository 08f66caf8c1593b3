use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// FAQ entry. The table also carries a generated `search_vector` column over
/// `question`; it is only touched by raw SQL.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chatbot_knowledge_base")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub category: String,
    #[sea_orm(column_type = "Text")]
    pub question: String,
    #[sea_orm(column_type = "Text")]
    pub answer: String,
    pub priority: i32,
    pub keywords: Json,
    pub validation_status: ValidationStatus,
    pub training_status: TrainingStatus,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "validated")]
    Validated,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum TrainingStatus {
    #[sea_orm(string_value = "untrained")]
    Untrained,
    #[sea_orm(string_value = "training")]
    Training,
    #[sea_orm(string_value = "trained")]
    Trained,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::chatbot_knowledge_tag::Entity")]
    KnowledgeTags,
}

impl Related<super::chatbot_knowledge_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::KnowledgeTags.def()
    }
}

impl Related<super::chatbot_tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::chatbot_knowledge_tag::Relation::Tag.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::chatbot_knowledge_tag::Relation::Knowledge.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
