use crate::{
    config::auth::AuthConfig,
    error::{AppError, AppResult},
    models::{user::UserRole, UserModel},
    repository::{SeaUserRepository, UserRepository},
    utils::{
        encode_access_token, encode_refresh_token, hash_password,
        jwt::{decode_jwt, TokenType},
        verify_password,
    },
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use uuid::Uuid;

pub const MSG_EMAIL_TAKEN: &str = "Email sudah terdaftar";
pub const MSG_USERNAME_TAKEN: &str = "Username sudah digunakan";
pub const MSG_BAD_CREDENTIALS: &str = "Email atau password salah";
pub const MSG_ACCOUNT_INACTIVE: &str = "Akun tidak aktif";
pub const MSG_USER_NOT_FOUND: &str = "Pengguna tidak ditemukan";
const MSG_REFRESH_INVALID: &str = "Refresh token tidak valid";

/// Registration input, already shape-validated by the handler.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub role: Option<UserRole>,
}

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: UserModel,
    pub token: String,
    pub refresh_token: String,
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self::with_repository(Arc::new(SeaUserRepository::new(db)), AuthConfig::from_env())
    }

    pub fn with_repository(users: Arc<dyn UserRepository>, config: AuthConfig) -> Self {
        Self { users, config }
    }

    /// Create a buyer (or seller, when requested and allowed) account.
    /// Duplicate checks run before anything is written.
    pub async fn register(&self, account: NewAccount) -> AppResult<AuthSession> {
        let email = account.email.trim().to_lowercase();
        let username = account.username.trim().to_string();

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::validation(MSG_EMAIL_TAKEN));
        }
        if self.users.find_by_username(&username).await?.is_some() {
            return Err(AppError::validation(MSG_USERNAME_TAKEN));
        }

        let role = self.registration_role(account.role)?;
        let password_hash = hash_password(&account.password, self.config.bcrypt_cost)?;
        let now = chrono::Utc::now().naive_utc();

        let user = self
            .users
            .insert(UserModel {
                id: Uuid::new_v4(),
                username,
                email,
                password_hash,
                role,
                full_name: account.full_name.filter(|s| !s.trim().is_empty()),
                phone_number: account.phone_number.filter(|s| !s.trim().is_empty()),
                address: None,
                profile_picture: None,
                is_verified: false,
                is_active: true,
                last_login: None,
                created_at: now,
                updated_at: now,
            })
            .await?;

        tracing::info!(user_id = %user.id, role = ?user.role, "user registered");
        self.issue(user)
    }

    fn registration_role(&self, requested: Option<UserRole>) -> AppResult<UserRole> {
        match requested {
            None | Some(UserRole::Buyer) => Ok(UserRole::Buyer),
            Some(UserRole::Seller) if self.config.allow_seller_registration => {
                Ok(UserRole::Seller)
            }
            Some(_) => Err(AppError::validation(
                "Role tidak dapat dipilih saat registrasi",
            )),
        }
    }

    /// Wrong email and wrong password are indistinguishable to the caller.
    /// `last_login` is only touched after a successful check.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthSession> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AppError::Unauthorized(MSG_BAD_CREDENTIALS))?;

        if !verify_password(password, &user.password_hash)? {
            tracing::debug!(user_id = %user.id, "login rejected: bad password");
            return Err(AppError::Unauthorized(MSG_BAD_CREDENTIALS));
        }
        if !user.is_active {
            return Err(AppError::Unauthorized(MSG_ACCOUNT_INACTIVE));
        }

        let now = chrono::Utc::now().naive_utc();
        self.users.record_login(user.id, now).await?;
        self.issue(UserModel {
            last_login: Some(now),
            ..user
        })
    }

    pub async fn profile(&self, user_id: Uuid) -> AppResult<UserModel> {
        self.users
            .find(user_id)
            .await?
            .ok_or(AppError::NotFound(MSG_USER_NOT_FOUND))
    }

    /// Exchange a refresh token for a fresh pair.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<AuthSession> {
        let claims =
            decode_jwt(refresh_token).map_err(|_| AppError::Unauthorized(MSG_REFRESH_INVALID))?;
        if claims.token_type != TokenType::Refresh {
            return Err(AppError::Unauthorized(MSG_REFRESH_INVALID));
        }

        let user = self
            .users
            .find(claims.sub)
            .await?
            .ok_or(AppError::Unauthorized(MSG_REFRESH_INVALID))?;
        if !user.is_active {
            return Err(AppError::Unauthorized(MSG_ACCOUNT_INACTIVE));
        }

        self.issue(user)
    }

    fn issue(&self, user: UserModel) -> AppResult<AuthSession> {
        let token = encode_access_token((&user).into())?;
        let refresh_token = encode_refresh_token((&user).into())?;
        Ok(AuthSession {
            user,
            token,
            refresh_token,
        })
    }
}
