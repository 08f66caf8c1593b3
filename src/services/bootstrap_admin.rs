use crate::config::{auth::AuthConfig, env_flag};
use crate::error::AppResult;
use crate::models::{
    user::{self, UserRole},
    User,
};
use crate::utils::hash_password;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    QueryFilter,
};
use std::env;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct BootstrapAdminConfig {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl BootstrapAdminConfig {
    pub fn from_env() -> Option<Self> {
        if !env_flag("BOOTSTRAP_ADMIN_ENABLED", false) {
            return None;
        }

        Some(Self {
            username: env::var("BOOTSTRAP_ADMIN_USERNAME").ok()?,
            email: env::var("BOOTSTRAP_ADMIN_EMAIL").ok()?.trim().to_lowercase(),
            password: env::var("BOOTSTRAP_ADMIN_PASSWORD").ok()?,
        })
    }
}

/// Make sure an admin exists at startup:
/// - any admin already present: nothing happens
/// - the configured email/username exists: that account is promoted
/// - otherwise a verified admin account is created
pub async fn ensure_bootstrap_admin(db: &DatabaseConnection) -> AppResult<()> {
    let Some(cfg) = BootstrapAdminConfig::from_env() else {
        return Ok(());
    };

    let admin_exists = User::find()
        .filter(user::Column::Role.eq(UserRole::Admin))
        .one(db)
        .await?
        .is_some();
    if admin_exists {
        return Ok(());
    }

    let existing = User::find()
        .filter(
            Condition::any()
                .add(user::Column::Email.eq(cfg.email.as_str()))
                .add(user::Column::Username.eq(cfg.username.as_str())),
        )
        .one(db)
        .await?;

    let now = chrono::Utc::now().naive_utc();

    if let Some(existing) = existing {
        let id = existing.id;
        let mut active: user::ActiveModel = existing.into();
        active.role = Set(UserRole::Admin);
        active.is_active = Set(true);
        active.updated_at = Set(now);
        active.update(db).await?;
        tracing::info!(user_id = %id, "promoted existing account to admin");
        return Ok(());
    }

    let password_hash = hash_password(&cfg.password, AuthConfig::from_env().bcrypt_cost)?;
    let created = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(cfg.username),
        email: Set(cfg.email),
        password_hash: Set(password_hash),
        role: Set(UserRole::Admin),
        full_name: Set(None),
        phone_number: Set(None),
        address: Set(None),
        profile_picture: Set(None),
        is_verified: Set(true),
        is_active: Set(true),
        last_login: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    tracing::info!(user_id = %created.id, "bootstrap admin created");
    Ok(())
}
