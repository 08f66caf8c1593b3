use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chatbot_conversations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub session_id: Uuid,
    pub user_id: Option<Uuid>,
    pub sender: ChatSender,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub knowledge_id: Option<Uuid>,
    pub match_source: Option<MatchSource>,
    pub created_at: DateTime,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum ChatSender {
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "bot")]
    Bot,
}

/// Where a bot reply came from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    #[sea_orm(string_value = "knowledge")]
    Knowledge,
    #[sea_orm(string_value = "keyword")]
    Keyword,
    #[sea_orm(string_value = "fallback")]
    Fallback,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
