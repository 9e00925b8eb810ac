//! Structured external payment references.
//!
//! The processor echoes an opaque reference string back in webhook
//! notifications. Historically this was a bare positional string split on
//! underscores; here the same wire shape carries a keyed-hash tag so the
//! webhook handler can verify the ids before trusting them:
//!
//! `course_{courseId}_user_{userId}_{tag}`

use sha2::{Digest, Sha256};

use crate::domain::ids::{CourseId, UserId};

/// Length of the hex tag appended to each reference.
const TAG_LEN: usize = 16;

/// A verified (course, user) pair recovered from a reference string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentReference {
    /// Course being purchased.
    pub course_id: CourseId,
    /// Paying user.
    pub user_id: UserId,
}

/// Failures when parsing an inbound reference.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    /// The string does not match the expected shape.
    #[error("payment reference is malformed")]
    Malformed,
    /// The embedded ids are not valid UUIDs.
    #[error("payment reference carries invalid identifiers")]
    InvalidIds,
    /// The tag does not match the embedded ids.
    #[error("payment reference failed verification")]
    BadTag,
}

impl PaymentReference {
    /// Pair a course and user for reference encoding.
    pub const fn new(course_id: CourseId, user_id: UserId) -> Self {
        Self { course_id, user_id }
    }

    /// Encode to the wire shape, tagged with `key`.
    pub fn encode(&self, key: &[u8]) -> String {
        let body = format!("course_{}_user_{}", self.course_id, self.user_id);
        let tag = reference_tag(key, &body);
        format!("{body}_{tag}")
    }

    /// Parse and verify a reference received from the processor.
    ///
    /// # Errors
    ///
    /// Rejects strings that do not match the wire shape, carry malformed
    /// UUIDs, or fail tag verification under `key`.
    pub fn decode(raw: &str, key: &[u8]) -> Result<Self, ReferenceError> {
        let (body, tag) = raw.rsplit_once('_').ok_or(ReferenceError::Malformed)?;
        let rest = body.strip_prefix("course_").ok_or(ReferenceError::Malformed)?;
        let (course_raw, user_raw) = rest
            .split_once("_user_")
            .ok_or(ReferenceError::Malformed)?;

        let course_id: CourseId = course_raw.parse().map_err(|_| ReferenceError::InvalidIds)?;
        let user_id: UserId = user_raw.parse().map_err(|_| ReferenceError::InvalidIds)?;

        if reference_tag(key, body) != tag {
            return Err(ReferenceError::BadTag);
        }
        Ok(Self { course_id, user_id })
    }
}

/// Keyed SHA-256 tag over the reference body, truncated to 16 hex chars.
fn reference_tag(key: &[u8], body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key);
    hasher.update(b"\x00");
    hasher.update(body.as_bytes());
    let digest = hasher.finalize();
    let mut tag = hex::encode(digest);
    tag.truncate(TAG_LEN);
    tag
}
