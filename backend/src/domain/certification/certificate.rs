//! Certificates and their verification codes.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::enrollment::CourseProgress;
use crate::domain::ids::{CertificateId, CourseId, UserId};

/// An issued course-completion certificate.
///
/// ## Invariants
/// - At most one certificate per (student, course); the storage layer
///   enforces this with a unique index, so issuance is idempotent.
/// - Certificates are never deleted; `valid` is a soft flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    /// Primary identifier.
    pub id: CertificateId,
    /// Certified student.
    pub student_id: UserId,
    /// Completed course.
    pub course_id: CourseId,
    /// Public verification code, unique across all certificates.
    pub code: String,
    /// Average graded-submission score at issue time, when any existed.
    #[schema(value_type = Option<String>, example = "87.5")]
    pub final_score: Option<Decimal>,
    /// Soft validity flag; revocation never deletes the row.
    pub valid: bool,
    /// Issue timestamp.
    pub issued_at: DateTime<Utc>,
    /// Public verification page for this certificate.
    pub verification_url: String,
    /// Rendered PDF/QR asset, when the rendering service produced one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_url: Option<String>,
}

/// Build a verification code for a new certificate.
///
/// Format: `CERT-{student}-{course}-{base36 millis}-{6 uppercase chars}`.
/// Collisions are statistically negligible and additionally rejected by
/// the unique index on the code column; there is no retry loop.
pub fn certificate_code(student_id: &UserId, course_id: &CourseId, issued_at: DateTime<Utc>) -> String {
    let timestamp = issued_at.timestamp_millis().max(0);
    let suffix: String = {
        let mut rng = rand::thread_rng();
        (0..6)
            .map(|_| char::from(b'A' + rng.gen_range(0..26)))
            .collect()
    };
    format!(
        "CERT-{student_id}-{course_id}-{}-{suffix}",
        base36(timestamp as u64)
    )
}

fn base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_owned();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Verdict returned by the eligibility evaluator.
///
/// A rejection is a value, not an error: handlers serialise it with a 200
/// status and let the client explain the reason to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityVerdict {
    /// Whether a certificate can be issued right now.
    pub eligible: bool,
    /// Human-readable rejection reason, absent when eligible.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Rounded completion percentage at evaluation time.
    pub completion_percentage: u8,
    /// Lessons the student has completed.
    pub completed_lessons: u32,
    /// Average of graded submissions, when any are graded.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "92.0")]
    pub final_score: Option<Decimal>,
    /// The already-issued certificate, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing: Option<Certificate>,
}

impl EligibilityVerdict {
    /// An eligible verdict for a fully-completed course.
    pub fn eligible(progress: CourseProgress, final_score: Option<Decimal>) -> Self {
        Self {
            eligible: true,
            reason: None,
            completion_percentage: progress.percentage,
            completed_lessons: progress.completed_lessons,
            final_score,
            existing: None,
        }
    }

    /// A rejection with the given reason.
    pub fn rejected(reason: impl Into<String>, progress: CourseProgress) -> Self {
        Self {
            eligible: false,
            reason: Some(reason.into()),
            completion_percentage: progress.percentage,
            completed_lessons: progress.completed_lessons,
            final_score: None,
            existing: None,
        }
    }

    /// Attach an already-issued certificate to the verdict.
    #[must_use]
    pub fn with_existing(mut self, certificate: Certificate) -> Self {
        self.existing = Some(certificate);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    fn code_embeds_ids_and_timestamp() {
        let student = UserId::new();
        let course = CourseId::new();
        let issued = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("ts");
        let code = certificate_code(&student, &course, issued);

        assert!(code.starts_with("CERT-"));
        assert!(code.contains(&student.to_string()));
        assert!(code.contains(&course.to_string()));
        let suffix = code.rsplit('-').next().expect("suffix");
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_uppercase()));
    }

    #[rstest]
    fn codes_differ_between_calls() {
        let student = UserId::new();
        let course = CourseId::new();
        let now = Utc::now();
        assert_ne!(
            certificate_code(&student, &course, now),
            certificate_code(&student, &course, now)
        );
    }

    #[rstest]
    #[case(0, "0")]
    #[case(35, "z")]
    #[case(36, "10")]
    #[case(1_700_000_000_000, "loyw3v28")]
    fn base36_encodes(#[case] value: u64, #[case] expected: &str) {
        assert_eq!(base36(value), expected);
    }
}
