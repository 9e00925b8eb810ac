//! User identity and roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ids::UserId;

/// Role attached to an account.
///
/// Roles gate inbound operations only; the core pipeline trusts the
/// authenticated principal it is handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A learner who enrols in courses.
    Student,
    /// An author who owns and manages courses.
    Instructor,
    /// Platform administration.
    Admin,
}

impl Role {
    /// Stable lowercase name used in storage and on the wire.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Instructor => "instructor",
            Self::Admin => "admin",
        }
    }

    /// Parse a stored role name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "student" => Some(Self::Student),
            "instructor" => Some(Self::Instructor),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Primary identifier.
    pub id: UserId,
    /// Name shown to other participants.
    pub display_name: String,
    /// Login email, unique per account.
    pub email: String,
    /// Account role.
    pub role: Role,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
}

/// The authenticated principal acting on a request.
///
/// Supplied by the inbound session layer; the domain trusts it without
/// re-verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Acting user.
    pub id: UserId,
    /// Role attached to the session.
    pub role: Role,
}

impl Actor {
    /// Whether this actor holds the admin role.
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Whether this actor may manage a resource owned by `owner`.
    ///
    /// Owners manage their own resources; admins manage everything.
    pub fn can_manage(&self, owner: UserId) -> bool {
        self.id == owner || self.is_admin()
    }
}

/// Validation failures for user fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserValidationError {
    /// Display name is blank after trimming.
    #[error("display name must not be empty")]
    EmptyDisplayName,
    /// Display name exceeds the storage limit.
    #[error("display name must be at most {max} characters")]
    DisplayNameTooLong {
        /// Permitted maximum.
        max: usize,
    },
    /// Email has no `@` or surrounding whitespace.
    #[error("email address is malformed")]
    MalformedEmail,
}

const MAX_DISPLAY_NAME: usize = 64;

/// Validate a display name, returning the trimmed value.
pub fn validate_display_name(value: &str) -> Result<String, UserValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(UserValidationError::EmptyDisplayName);
    }
    if trimmed.chars().count() > MAX_DISPLAY_NAME {
        return Err(UserValidationError::DisplayNameTooLong {
            max: MAX_DISPLAY_NAME,
        });
    }
    Ok(trimmed.to_owned())
}

/// Validate an email address, returning it lowercased.
///
/// Deliberately shallow: the address is a login key here, not a delivery
/// target, so only the grossest malformations are rejected.
pub fn validate_email(value: &str) -> Result<String, UserValidationError> {
    let trimmed = value.trim();
    let mut parts = trimmed.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let host = parts.next().unwrap_or_default();
    if local.is_empty() || host.is_empty() || host.contains(char::is_whitespace) {
        return Err(UserValidationError::MalformedEmail);
    }
    Ok(trimmed.to_lowercase())
}
