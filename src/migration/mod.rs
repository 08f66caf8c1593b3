use sea_orm_migration::prelude::*;

mod m20250101_000001_create_users_table;
mod m20250101_000002_create_cars_table;
mod m20250101_000003_create_transactions_table;
mod m20250101_000004_create_reports_tables;
mod m20250101_000005_create_reviews_table;
mod m20250101_000006_create_chatbot_knowledge_tables;
mod m20250101_000007_create_chat_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_users_table::Migration),
            Box::new(m20250101_000002_create_cars_table::Migration),
            Box::new(m20250101_000003_create_transactions_table::Migration),
            Box::new(m20250101_000004_create_reports_tables::Migration),
            Box::new(m20250101_000005_create_reviews_table::Migration),
            Box::new(m20250101_000006_create_chatbot_knowledge_tables::Migration),
            Box::new(m20250101_000007_create_chat_tables::Migration),
        ]
    }
}
