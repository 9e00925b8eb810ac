//! Inbound HTTP adapters: handlers, session extraction, error envelope.

pub mod auth;
pub mod billing;
pub mod certificates;
pub mod chat;
pub mod classroom;
pub mod courses;
pub mod enrollments;
pub mod error;
pub mod health;
pub mod users;

pub use self::auth::Principal;
pub use self::error::{ApiError, ApiResult};

use pagination::{Cursor, PageRequest};
use serde::Deserialize;
use utoipa::IntoParams;

/// Query parameters accepted by listing endpoints.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    /// Page size; clamped server-side.
    pub limit: Option<u32>,
    /// Opaque continuation token from a previous page.
    pub cursor: Option<String>,
}

impl PageQuery {
    /// Convert into a validated domain page request.
    pub fn into_request(self) -> PageRequest {
        PageRequest::new(self.limit, self.cursor.map(Cursor::from_token))
    }
}
