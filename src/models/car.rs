use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cars")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub seller_id: Uuid,
    pub brand: String,
    #[sea_orm(column_name = "model")]
    pub model_name: String,
    pub year: i32,
    /// Rupiah, no fractional part.
    pub price: i64,
    pub condition: CarCondition,
    pub mileage: Option<i32>,
    pub color: Option<String>,
    pub transmission: Option<Transmission>,
    pub fuel_type: Option<FuelType>,
    /// Engine displacement in cc.
    pub engine_capacity: Option<i32>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub features: Json,
    pub location: Option<String>,
    pub category: Option<String>,
    pub status: CarStatus,
    pub is_verified: bool,
    pub view_count: i64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum CarStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "available")]
    Available,
    #[sea_orm(string_value = "sold")]
    Sold,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "reserved")]
    Reserved,
}

impl CarStatus {
    /// Statuses a seller may set on their own listing. Leaving `pending` or
    /// `rejected` requires a staff decision.
    pub fn seller_may_set(self, from: CarStatus) -> bool {
        match (from, self) {
            (a, b) if a == b => true,
            (CarStatus::Pending | CarStatus::Rejected, _) => false,
            (_, CarStatus::Available | CarStatus::Reserved | CarStatus::Sold) => true,
            _ => false,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum CarCondition {
    #[sea_orm(string_value = "new")]
    New,
    #[sea_orm(string_value = "used")]
    Used,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum Transmission {
    #[sea_orm(string_value = "manual")]
    Manual,
    #[sea_orm(string_value = "automatic")]
    Automatic,
    #[sea_orm(string_value = "cvt")]
    Cvt,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum FuelType {
    #[sea_orm(string_value = "gasoline")]
    Gasoline,
    #[sea_orm(string_value = "diesel")]
    Diesel,
    #[sea_orm(string_value = "electric")]
    Electric,
    #[sea_orm(string_value = "hybrid")]
    Hybrid,
}

impl Model {
    pub fn approve(&mut self) {
        self.status = CarStatus::Available;
        self.is_verified = true;
    }

    pub fn reject(&mut self) {
        self.status = CarStatus::Rejected;
        self.is_verified = false;
    }

    pub fn mark_as_sold(&mut self) {
        self.status = CarStatus::Sold;
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.seller_id == user_id
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::SellerId",
        to = "super::user::Column::Id"
    )]
    Seller,
    #[sea_orm(has_many = "super::review::Entity")]
    Reviews,
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seller.def()
    }
}

impl Related<super::review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviews.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seller_cannot_self_approve() {
        assert!(!CarStatus::Available.seller_may_set(CarStatus::Pending));
        assert!(!CarStatus::Available.seller_may_set(CarStatus::Rejected));
    }

    #[test]
    fn seller_can_move_between_listed_states() {
        assert!(CarStatus::Sold.seller_may_set(CarStatus::Available));
        assert!(CarStatus::Reserved.seller_may_set(CarStatus::Available));
        assert!(CarStatus::Available.seller_may_set(CarStatus::Reserved));
        assert!(!CarStatus::Pending.seller_may_set(CarStatus::Available));
    }
}
