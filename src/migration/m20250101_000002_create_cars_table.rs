use super::m20250101_000001_create_users_table::Users;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
pub(super) enum Cars {
    Table,
    Id,
    SellerId,
    Brand,
    Model,
    Year,
    Price,
    Condition,
    Mileage,
    Color,
    Transmission,
    FuelType,
    EngineCapacity,
    Description,
    Features,
    Location,
    Category,
    Status,
    IsVerified,
    ViewCount,
    CreatedAt,
    UpdatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Cars::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Cars::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Cars::SellerId).uuid().not_null())
                    .col(ColumnDef::new(Cars::Brand).string_len(50).not_null())
                    .col(ColumnDef::new(Cars::Model).string_len(50).not_null())
                    .col(ColumnDef::new(Cars::Year).integer().not_null())
                    .col(ColumnDef::new(Cars::Price).big_integer().not_null())
                    .col(
                        ColumnDef::new(Cars::Condition)
                            .string_len(10)
                            .not_null()
                            .default("used"),
                    )
                    .col(ColumnDef::new(Cars::Mileage).integer().null())
                    .col(ColumnDef::new(Cars::Color).string_len(30).null())
                    .col(ColumnDef::new(Cars::Transmission).string_len(20).null())
                    .col(ColumnDef::new(Cars::FuelType).string_len(20).null())
                    .col(ColumnDef::new(Cars::EngineCapacity).integer().null())
                    .col(ColumnDef::new(Cars::Description).text().null())
                    .col(
                        ColumnDef::new(Cars::Features)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(ColumnDef::new(Cars::Location).string_len(100).null())
                    .col(ColumnDef::new(Cars::Category).string_len(50).null())
                    .col(
                        ColumnDef::new(Cars::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Cars::IsVerified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Cars::ViewCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Cars::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Cars::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cars_seller_id")
                            .from(Cars::Table, Cars::SellerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cars_seller_id")
                    .table(Cars::Table)
                    .col(Cars::SellerId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cars_status_created")
                    .table(Cars::Table)
                    .col(Cars::Status)
                    .col(Cars::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cars_brand_model")
                    .table(Cars::Table)
                    .col(Cars::Brand)
                    .col(Cars::Model)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Cars::Table).to_owned())
            .await
    }
}
