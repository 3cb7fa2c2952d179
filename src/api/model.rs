use std::collections::BTreeSet;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

/// Keys of a freshly created user, no more and no less.
pub const USER_FIELDS: [&str; 4] = ["username", "password", "status", "remark"];

/// `status` value of an active ("normal") account.
pub const STATUS_NORMAL: i64 = 1;

/// User record returned by `/create/<username>`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub username: String,
    pub password: String,
    pub status: i64,
    pub remark: String,
}

impl User {
    pub fn is_normal(&self) -> bool {
        self.status == STATUS_NORMAL
    }
}

/// Successful response of a create call, kept untyped so tests can check
/// the exact shape before decoding.
#[derive(Debug, Clone)]
pub struct CreateUserResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl CreateUserResponse {
    /// Top-level keys of the body; empty when it is not an object.
    pub fn field_names(&self) -> BTreeSet<&str> {
        self.body
            .as_object()
            .map(|obj| obj.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn has_exact_user_fields(&self) -> bool {
        self.field_names() == USER_FIELDS.into_iter().collect()
    }

    pub fn user(&self) -> Result<User, serde_json::Error> {
        User::deserialize(&self.body)
    }
}
