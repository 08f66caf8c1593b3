use super::m20250101_000001_create_users_table::Users;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum ChatbotConversations {
    Table,
    Id,
    SessionId,
    UserId,
    Sender,
    Message,
    KnowledgeId,
    MatchSource,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ChatRooms {
    Table,
    Id,
    SessionId,
    UserId,
    IsEscalated,
    EscalationReason,
    EscalatedAt,
    CreatedAt,
    UpdatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChatbotConversations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChatbotConversations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChatbotConversations::SessionId).uuid().not_null())
                    .col(ColumnDef::new(ChatbotConversations::UserId).uuid().null())
                    .col(ColumnDef::new(ChatbotConversations::Sender).string_len(10).not_null())
                    .col(ColumnDef::new(ChatbotConversations::Message).text().not_null())
                    .col(ColumnDef::new(ChatbotConversations::KnowledgeId).uuid().null())
                    .col(ColumnDef::new(ChatbotConversations::MatchSource).string_len(20).null())
                    .col(
                        ColumnDef::new(ChatbotConversations::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chatbot_conversations_user_id")
                            .from(ChatbotConversations::Table, ChatbotConversations::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_chatbot_conversations_session")
                    .table(ChatbotConversations::Table)
                    .col(ChatbotConversations::SessionId)
                    .col(ChatbotConversations::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ChatRooms::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ChatRooms::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(ChatRooms::SessionId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(ChatRooms::UserId).uuid().null())
                    .col(
                        ColumnDef::new(ChatRooms::IsEscalated)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(ChatRooms::EscalationReason).text().null())
                    .col(ColumnDef::new(ChatRooms::EscalatedAt).timestamp().null())
                    .col(
                        ColumnDef::new(ChatRooms::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ChatRooms::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chat_rooms_user_id")
                            .from(ChatRooms::Table, ChatRooms::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChatRooms::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChatbotConversations::Table).to_owned())
            .await
    }
}
