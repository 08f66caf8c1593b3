use crate::{
    error::{AppError, AppResult},
    models::{user::UserRole, User},
    utils::jwt::{decode_jwt, TokenType},
};
use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response, Extension};
use sea_orm::{DatabaseConnection, EntityTrait};
use uuid::Uuid;

pub const MSG_TOKEN_MISSING: &str = "Token akses diperlukan";
pub const MSG_TOKEN_INVALID: &str = "Token tidak valid atau sudah kedaluwarsa";
pub const MSG_ACCOUNT_INACTIVE: &str = "Akun tidak aktif";

/// Caller identity, resolved against the database on every request so a role
/// change or deactivation takes effect without waiting for token expiry.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Bearer-token middleware for protected routes.
pub async fn auth_middleware(
    Extension(db): Extension<DatabaseConnection>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&headers).ok_or(AppError::Unauthorized(MSG_TOKEN_MISSING))?;
    let user = resolve_user(&db, &token).await?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Public routes that behave differently for signed-in callers. A missing or
/// unusable token leaves the request anonymous instead of rejecting it.
pub async fn optional_auth_middleware(
    Extension(db): Extension<DatabaseConnection>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_bearer_token(&headers) {
        match resolve_user(&db, &token).await {
            Ok(user) => {
                request.extensions_mut().insert(user);
            }
            Err(e) => tracing::debug!("ignoring bearer token on public route: {}", e),
        }
    }
    next.run(request).await
}

async fn resolve_user(db: &DatabaseConnection, token: &str) -> AppResult<AuthUser> {
    let claims = decode_jwt(token).map_err(|_| AppError::Unauthorized(MSG_TOKEN_INVALID))?;
    if claims.token_type != TokenType::Access {
        return Err(AppError::Unauthorized(MSG_TOKEN_INVALID));
    }

    let user = User::find_by_id(claims.sub)
        .one(db)
        .await?
        .ok_or(AppError::Unauthorized(MSG_TOKEN_INVALID))?;

    if !user.is_active {
        return Err(AppError::Unauthorized(MSG_ACCOUNT_INACTIVE));
    }

    Ok(AuthUser {
        user_id: user.id,
        username: user.username,
        role: user.role,
    })
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;

    let token = auth_header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

pub fn require_admin(auth_user: &AuthUser) -> AppResult<()> {
    if auth_user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Hanya admin yang dapat melakukan aksi ini"))
    }
}

/// Admin or showroom owner.
pub fn require_staff(auth_user: &AuthUser) -> AppResult<()> {
    if auth_user.role.is_staff() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Hanya admin atau pemilik showroom yang dapat melakukan aksi ini",
        ))
    }
}

use axum::extract::{FromRequestParts, OptionalFromRequestParts};

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AppError::Unauthorized(MSG_TOKEN_MISSING))
    }
}

impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AuthUser>().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn user(role: UserRole) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            username: "u".into(),
            role,
        }
    }

    #[test]
    fn bearer_token_is_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def"),
        );
        assert_eq!(extract_bearer_token(&headers).as_deref(), Some("abc.def"));
    }

    #[test]
    fn non_bearer_schemes_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Basic Zm9vOmJhcg=="),
        );
        assert!(extract_bearer_token(&headers).is_none());

        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer "),
        );
        assert!(extract_bearer_token(&headers).is_none());
    }

    #[test]
    fn role_guards() {
        assert!(require_admin(&user(UserRole::Admin)).is_ok());
        assert!(require_admin(&user(UserRole::Owner)).is_err());
        assert!(require_staff(&user(UserRole::Owner)).is_ok());
        assert!(require_staff(&user(UserRole::Seller)).is_err());
    }
}
