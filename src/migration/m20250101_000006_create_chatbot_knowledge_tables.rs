use super::m20250101_000001_create_users_table::Users;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum ChatbotKnowledgeBase {
    Table,
    Id,
    Category,
    Question,
    Answer,
    Priority,
    Keywords,
    ValidationStatus,
    TrainingStatus,
    IsActive,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ChatbotTags {
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ChatbotKnowledgeTags {
    Table,
    KnowledgeId,
    TagId,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChatbotKnowledgeBase::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChatbotKnowledgeBase::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ChatbotKnowledgeBase::Category)
                            .string_len(50)
                            .not_null()
                            .default("umum"),
                    )
                    .col(ColumnDef::new(ChatbotKnowledgeBase::Question).text().not_null())
                    .col(ColumnDef::new(ChatbotKnowledgeBase::Answer).text().not_null())
                    .col(
                        ColumnDef::new(ChatbotKnowledgeBase::Priority)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ChatbotKnowledgeBase::Keywords)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(ChatbotKnowledgeBase::ValidationStatus)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(ChatbotKnowledgeBase::TrainingStatus)
                            .string_len(20)
                            .not_null()
                            .default("untrained"),
                    )
                    .col(
                        ColumnDef::new(ChatbotKnowledgeBase::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(ChatbotKnowledgeBase::CreatedBy).uuid().null())
                    .col(
                        ColumnDef::new(ChatbotKnowledgeBase::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ChatbotKnowledgeBase::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chatbot_knowledge_created_by")
                            .from(ChatbotKnowledgeBase::Table, ChatbotKnowledgeBase::CreatedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        let db = manager.get_connection();

        // 'simple' keeps matching predictable for mixed Indonesian/English text.
        db.execute_unprepared(
            "ALTER TABLE chatbot_knowledge_base ADD COLUMN search_vector tsvector \
             GENERATED ALWAYS AS (to_tsvector('simple', coalesce(question, ''))) STORED",
        )
        .await?;

        db.execute_unprepared(
            "CREATE INDEX idx_chatbot_knowledge_search ON chatbot_knowledge_base USING GIN (search_vector)",
        )
        .await?;

        manager
            .create_table(
                Table::create()
                    .table(ChatbotTags::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ChatbotTags::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(ChatbotTags::Name)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(ChatbotTags::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ChatbotKnowledgeTags::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ChatbotKnowledgeTags::KnowledgeId).uuid().not_null())
                    .col(ColumnDef::new(ChatbotKnowledgeTags::TagId).uuid().not_null())
                    .primary_key(
                        Index::create()
                            .col(ChatbotKnowledgeTags::KnowledgeId)
                            .col(ChatbotKnowledgeTags::TagId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chatbot_knowledge_tags_knowledge")
                            .from(ChatbotKnowledgeTags::Table, ChatbotKnowledgeTags::KnowledgeId)
                            .to(ChatbotKnowledgeBase::Table, ChatbotKnowledgeBase::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chatbot_knowledge_tags_tag")
                            .from(ChatbotKnowledgeTags::Table, ChatbotKnowledgeTags::TagId)
                            .to(ChatbotTags::Table, ChatbotTags::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChatbotKnowledgeTags::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChatbotTags::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChatbotKnowledgeBase::Table).to_owned())
            .await
    }
}
