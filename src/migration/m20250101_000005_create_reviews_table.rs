use super::m20250101_000001_create_users_table::Users;
use super::m20250101_000002_create_cars_table::Cars;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Reviews {
    Table,
    Id,
    CarId,
    ReviewerId,
    Rating,
    ConditionRating,
    SellerRating,
    ValueRating,
    Title,
    ReviewText,
    Pros,
    Cons,
    ModerationStatus,
    Status,
    ModerationReason,
    ModeratedBy,
    ModeratedAt,
    CreatedAt,
    UpdatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reviews::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Reviews::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Reviews::CarId).uuid().not_null())
                    .col(ColumnDef::new(Reviews::ReviewerId).uuid().not_null())
                    .col(
                        ColumnDef::new(Reviews::Rating)
                            .integer()
                            .not_null()
                            .check(Expr::col(Reviews::Rating).between(1, 5)),
                    )
                    .col(ColumnDef::new(Reviews::ConditionRating).integer().null())
                    .col(ColumnDef::new(Reviews::SellerRating).integer().null())
                    .col(ColumnDef::new(Reviews::ValueRating).integer().null())
                    .col(ColumnDef::new(Reviews::Title).string_len(150).null())
                    .col(ColumnDef::new(Reviews::ReviewText).text().not_null())
                    .col(ColumnDef::new(Reviews::Pros).text().null())
                    .col(ColumnDef::new(Reviews::Cons).text().null())
                    .col(
                        ColumnDef::new(Reviews::ModerationStatus)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Reviews::Status)
                            .string_len(20)
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(Reviews::ModerationReason).text().null())
                    .col(ColumnDef::new(Reviews::ModeratedBy).uuid().null())
                    .col(ColumnDef::new(Reviews::ModeratedAt).timestamp().null())
                    .col(
                        ColumnDef::new(Reviews::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Reviews::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reviews_car_id")
                            .from(Reviews::Table, Reviews::CarId)
                            .to(Cars::Table, Cars::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reviews_reviewer_id")
                            .from(Reviews::Table, Reviews::ReviewerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reviews_moderated_by")
                            .from(Reviews::Table, Reviews::ModeratedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reviews_car_reviewer")
                    .table(Reviews::Table)
                    .col(Reviews::CarId)
                    .col(Reviews::ReviewerId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reviews_moderation_status")
                    .table(Reviews::Table)
                    .col(Reviews::ModerationStatus)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reviews::Table).to_owned())
            .await
    }
}
