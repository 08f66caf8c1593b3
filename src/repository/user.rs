use super::query::Page;
use crate::error::AppResult;
use crate::models::{
    user::{self, UserRole},
    User, UserModel,
};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> AppResult<Option<UserModel>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserModel>>;
    async fn find_by_username(&self, username: &str) -> AppResult<Option<UserModel>>;
    async fn list(&self, role: Option<UserRole>, page: Page) -> AppResult<(Vec<UserModel>, u64)>;
    /// Persists a new user including its password hash.
    async fn insert(&self, user: UserModel) -> AppResult<UserModel>;
    /// Writes every profile field. The password hash is never touched here;
    /// see [`UserRepository::set_password_hash`].
    async fn save(&self, user: UserModel) -> AppResult<UserModel>;
    async fn set_password_hash(&self, id: Uuid, password_hash: String) -> AppResult<()>;
    async fn record_login(&self, id: Uuid, at: NaiveDateTime) -> AppResult<()>;
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

#[derive(Clone)]
pub struct SeaUserRepository {
    db: DatabaseConnection,
}

impl SeaUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for SeaUserRepository {
    async fn find(&self, id: Uuid) -> AppResult<Option<UserModel>> {
        Ok(User::find_by_id(id).one(&self.db).await?)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserModel>> {
        Ok(User::find()
            .filter(user::Column::Email.eq(email.trim().to_lowercase()))
            .one(&self.db)
            .await?)
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<UserModel>> {
        Ok(User::find()
            .filter(user::Column::Username.eq(username.trim()))
            .one(&self.db)
            .await?)
    }

    async fn list(&self, role: Option<UserRole>, page: Page) -> AppResult<(Vec<UserModel>, u64)> {
        let mut query = User::find();
        if let Some(role) = role {
            query = query.filter(user::Column::Role.eq(role));
        }

        let paginator = query
            .order_by_desc(user::Column::CreatedAt)
            .paginate(&self.db, page.limit);
        let total = paginator.num_items().await?;
        let users = paginator.fetch_page(page.index()).await?;
        Ok((users, total))
    }

    async fn insert(&self, user: UserModel) -> AppResult<UserModel> {
        let active = user.into_active_model().reset_all();
        Ok(active.insert(&self.db).await?)
    }

    async fn save(&self, user: UserModel) -> AppResult<UserModel> {
        let mut active = user.into_active_model().reset_all();
        active.password_hash = ActiveValue::NotSet;
        active.created_at = ActiveValue::NotSet;
        active.updated_at = ActiveValue::Set(chrono::Utc::now().naive_utc());
        Ok(active.update(&self.db).await?)
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: String) -> AppResult<()> {
        user::ActiveModel {
            id: ActiveValue::Unchanged(id),
            password_hash: ActiveValue::Set(password_hash),
            updated_at: ActiveValue::Set(chrono::Utc::now().naive_utc()),
            ..Default::default()
        }
        .update(&self.db)
        .await?;
        Ok(())
    }

    async fn record_login(&self, id: Uuid, at: NaiveDateTime) -> AppResult<()> {
        user::ActiveModel {
            id: ActiveValue::Unchanged(id),
            last_login: ActiveValue::Set(Some(at)),
            ..Default::default()
        }
        .update(&self.db)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let res = User::delete_by_id(id).exec(&self.db).await?;
        Ok(res.rows_affected > 0)
    }
}
