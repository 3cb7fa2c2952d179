//! HTTP client for the user-management API under test.

mod client;
pub mod model;


pub use client::UserApiClient;
pub use model::{CreateUserResponse, User, STATUS_NORMAL, USER_FIELDS};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid API root: {0}")]
    InvalidRoot(String),
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("server answered HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),
}

impl ApiError {
    /// True when the server answered, but with a non-2xx status.
    pub fn is_http_status(&self) -> bool {
        matches!(self, ApiError::Status { .. })
    }
}
