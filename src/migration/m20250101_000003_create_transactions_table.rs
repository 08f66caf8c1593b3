use super::m20250101_000001_create_users_table::Users;
use super::m20250101_000002_create_cars_table::Cars;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    BuyerId,
    SellerId,
    CarId,
    TotalAmount,
    PaymentMethod,
    Status,
    TransactionType,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(Transactions::BuyerId).uuid().not_null())
                    .col(ColumnDef::new(Transactions::SellerId).uuid().null())
                    .col(ColumnDef::new(Transactions::CarId).uuid().null())
                    .col(
                        ColumnDef::new(Transactions::TotalAmount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Transactions::PaymentMethod).string_len(30).null())
                    .col(
                        ColumnDef::new(Transactions::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Transactions::TransactionType).string_len(30).null())
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_buyer_id")
                            .from(Transactions::Table, Transactions::BuyerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_seller_id")
                            .from(Transactions::Table, Transactions::SellerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_car_id")
                            .from(Transactions::Table, Transactions::CarId)
                            .to(Cars::Table, Cars::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_status_created")
                    .table(Transactions::Table)
                    .col(Transactions::Status)
                    .col(Transactions::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await
    }
}
