pub mod auth;
pub mod car;
pub mod chatbot;
pub mod report;
pub mod review;
pub mod user;

pub use auth::*;

use crate::error::{AppError, AppResult};
use crate::repository::Page;
use crate::response::{PaginatedResponse, PaginationQuery};
use serde::Serialize;
use validator::Validate;

pub(crate) fn validate_payload<T: Validate>(payload: &T) -> AppResult<()> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(format!("Data tidak valid: {e}")))
}

/// Page/limit from query parameters, clamped the same way everywhere.
pub(crate) fn page_from(page: Option<u64>, limit: Option<u64>) -> Page {
    let (page, limit) = PaginationQuery { page, limit }.resolve();
    Page::new(page, limit)
}

pub(crate) fn paginated<M, R>(items: Vec<M>, total: u64, page: Page) -> PaginatedResponse<R>
where
    R: Serialize + From<M>,
{
    PaginatedResponse::new(
        items.into_iter().map(R::from).collect(),
        total,
        page.page,
        page.limit,
    )
}
