use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chatbot_tags")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub created_at: DateTime,
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

impl ActiveModelBehavior for ActiveModel {}
