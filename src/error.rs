use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Authentication failed: {0}")]
    Unauthorized(&'static str),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Not found: {0}")]
    NotFound(&'static str),

    #[error("Forbidden: {0}")]
    Forbidden(&'static str),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized(_) | AppError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    /// The user-facing message. Server-side failures never leak their cause here.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Internal(_) => {
                "Terjadi kesalahan pada server".to_string()
            }
            AppError::Jwt(_) => "Token tidak valid".to_string(),
            AppError::Unauthorized(msg) | AppError::NotFound(msg) | AppError::Forbidden(msg) => {
                (*msg).to_string()
            }
            AppError::Validation(msg) | AppError::Conflict(msg) => msg.clone(),
        }
    }
}

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    /// Raw error, only present when APP_ENV=development.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl utoipa::ToSchema for AppError {
    fn name() -> std::borrow::Cow<'static, str> {
        "ErrorResponse".into()
    }
}

impl utoipa::PartialSchema for AppError {
    fn schema() -> utoipa::openapi::RefOr<utoipa::openapi::schema::Schema> {
        ErrorResponse::schema()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Database(e) => tracing::error!("Database error: {:?}", e),
            AppError::Internal(e) => tracing::error!("Internal error: {:?}", e),
            AppError::Jwt(e) => tracing::debug!("JWT rejected: {}", e),
            _ => {}
        }

        let body = ErrorResponse {
            success: false,
            message: self.public_message(),
            error: crate::config::app::expose_error_details().then(|| self.to_string()),
        };

        (self.status(), Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(
            AppError::validation("x").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Unauthorized("x").status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::Forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_errors_hide_their_cause() {
        let err = AppError::Internal(anyhow::anyhow!("connection refused on 10.0.0.5"));
        assert_eq!(err.public_message(), "Terjadi kesalahan pada server");
    }

    #[test]
    fn client_errors_keep_their_message() {
        let err = AppError::validation("Email sudah terdaftar");
        assert_eq!(err.public_message(), "Email sudah terdaftar");
    }
}
