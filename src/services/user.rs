use crate::{
    config::auth::AuthConfig,
    error::{AppError, AppResult},
    models::{user::UserRole, UserModel},
    repository::{
        CarRepository, CarStatusCounts, Page, SeaCarRepository, SeaUserRepository, UserRepository,
    },
    services::auth::MSG_USER_NOT_FOUND,
    utils::{hash_password, verify_password},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use uuid::Uuid;

/// Fields a user may change on their own profile. `None` leaves the value as is.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub profile_picture: Option<String>,
}

pub struct UserService {
    users: Arc<dyn UserRepository>,
    cars: Arc<dyn CarRepository>,
    config: AuthConfig,
}

impl UserService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self::with_repositories(
            Arc::new(SeaUserRepository::new(db.clone())),
            Arc::new(SeaCarRepository::new(db)),
            AuthConfig::from_env(),
        )
    }

    pub fn with_repositories(
        users: Arc<dyn UserRepository>,
        cars: Arc<dyn CarRepository>,
        config: AuthConfig,
    ) -> Self {
        Self {
            users,
            cars,
            config,
        }
    }

    pub async fn list(
        &self,
        role: Option<UserRole>,
        page: Page,
    ) -> AppResult<(Vec<UserModel>, u64)> {
        self.users.list(role, page).await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<UserModel> {
        self.users
            .find(id)
            .await?
            .ok_or(AppError::NotFound(MSG_USER_NOT_FOUND))
    }

    pub async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> AppResult<UserModel> {
        let mut user = self.get(id).await?;

        if let Some(username) = update.username.map(|u| u.trim().to_string()) {
            if username.is_empty() {
                return Err(AppError::validation("Username tidak boleh kosong"));
            }
            if username != user.username {
                if self.users.find_by_username(&username).await?.is_some() {
                    return Err(AppError::validation(super::auth::MSG_USERNAME_TAKEN));
                }
                user.username = username;
            }
        }
        if let Some(v) = update.full_name {
            user.full_name = Some(v);
        }
        if let Some(v) = update.phone_number {
            user.phone_number = Some(v);
        }
        if let Some(v) = update.address {
            user.address = Some(v);
        }
        if let Some(v) = update.profile_picture {
            user.profile_picture = Some(v);
        }

        self.users.save(user).await
    }

    /// The only path that writes a new password hash for an existing user.
    pub async fn change_password(
        &self,
        id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        if current_password.is_empty() || new_password.is_empty() {
            return Err(AppError::validation(
                "Password lama dan password baru wajib diisi",
            ));
        }

        let user = self.get(id).await?;
        if !verify_password(current_password, &user.password_hash)? {
            return Err(AppError::validation("Password lama tidak benar"));
        }

        let hash = hash_password(new_password, self.config.bcrypt_cost)?;
        self.users.set_password_hash(id, hash).await?;
        tracing::info!(user_id = %id, "password changed");
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !self.users.delete(id).await? {
            return Err(AppError::NotFound(MSG_USER_NOT_FOUND));
        }
        tracing::info!(user_id = %id, "account deleted");
        Ok(())
    }

    /// Listing counts for the caller's own cars.
    pub async fn stats(&self, id: Uuid) -> AppResult<CarStatusCounts> {
        self.cars.status_counts(Some(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::{InMemoryCarRepository, InMemoryUserRepository};

    async fn seeded() -> (UserService, Arc<InMemoryUserRepository>, Uuid, Uuid) {
        let users = Arc::new(InMemoryUserRepository::default());
        let cars = Arc::new(InMemoryCarRepository::default());
        let now = chrono::Utc::now().naive_utc();
        let mut ids = Vec::new();
        for name in ["ani", "budi"] {
            let id = Uuid::new_v4();
            users
                .insert(UserModel {
                    id,
                    username: name.into(),
                    email: format!("{name}@example.com"),
                    password_hash: hash_password("lama12345", 4).unwrap(),
                    role: UserRole::Buyer,
                    full_name: None,
                    phone_number: None,
                    address: None,
                    profile_picture: None,
                    is_verified: false,
                    is_active: true,
                    last_login: None,
                    created_at: now,
                    updated_at: now,
                })
                .await
                .unwrap();
            ids.push(id);
        }
        let config = AuthConfig {
            bcrypt_cost: 4,
            allow_seller_registration: true,
        };
        let svc = UserService::with_repositories(users.clone(), cars, config);
        (svc, users, ids[0], ids[1])
    }

    #[tokio::test]
    async fn profile_update_keeps_password_hash() {
        let (svc, users, ani, _) = seeded().await;
        let before = users.get(ani).unwrap().password_hash;
        let updated = svc
            .update_profile(
                ani,
                ProfileUpdate {
                    full_name: Some("Ani Wijaya".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.full_name.as_deref(), Some("Ani Wijaya"));
        assert_eq!(users.get(ani).unwrap().password_hash, before);
    }

    #[tokio::test]
    async fn username_must_stay_unique() {
        let (svc, _, ani, _) = seeded().await;
        let err = svc
            .update_profile(
                ani,
                ProfileUpdate {
                    username: Some("budi".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.public_message(), "Username sudah digunakan");
    }

    #[tokio::test]
    async fn change_password_checks_current_password() {
        let (svc, users, ani, _) = seeded().await;
        let err = svc
            .change_password(ani, "keliru", "baru12345")
            .await
            .unwrap_err();
        assert_eq!(err.public_message(), "Password lama tidak benar");

        svc.change_password(ani, "lama12345", "baru12345")
            .await
            .unwrap();
        let hash = users.get(ani).unwrap().password_hash;
        assert!(verify_password("baru12345", &hash).unwrap());
    }
}
