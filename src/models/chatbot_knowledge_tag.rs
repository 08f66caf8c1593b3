use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "chatbot_knowledge_tags")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub knowledge_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub tag_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::chatbot_knowledge::Entity",
        from = "Column::KnowledgeId",
        to = "super::chatbot_knowledge::Column::Id",
        on_delete = "Cascade"
    )]
    Knowledge,
    #[sea_orm(
        belongs_to = "super::chatbot_tag::Entity",
        from = "Column::TagId",
        to = "super::chatbot_tag::Column::Id",
        on_delete = "Cascade"
    )]
    Tag,
}

impl Related<super::chatbot_knowledge::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Knowledge.def()
    }
}

impl Related<super::chatbot_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tag.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
