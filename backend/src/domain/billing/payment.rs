//! Payment records and their guarded status transitions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ids::{CourseId, PaymentId, UserId};

/// Lifecycle state of a payment.
///
/// The processor reports free-form status strings; locally the state
/// machine is explicit: `Pending -> Approved | Rejected`, both terminal.
/// Out-of-order processor reports are ignored rather than applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Awaiting the processor's outcome.
    Pending,
    /// Charged successfully; triggers enrollment.
    Approved,
    /// Declined or cancelled by the processor.
    Rejected,
}

impl PaymentStatus {
    /// Stable lowercase name used in storage.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parse a stored or processor-reported status.
    ///
    /// Processor vocabularies vary; anything that is not recognisably
    /// approved or rejected maps to `Pending`.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "approved" | "accredited" | "paid" => Self::Approved,
            "rejected" | "cancelled" | "refunded" | "charged_back" => Self::Rejected,
            _ => Self::Pending,
        }
    }

    /// Whether a transition from `self` to `next` is permitted.
    ///
    /// Only `Pending` may move; `Approved` and `Rejected` are terminal.
    /// Self-transitions are permitted no-ops so webhook replays stay
    /// harmless.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, _)
                | (Self::Approved, Self::Approved)
                | (Self::Rejected, Self::Rejected)
        )
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payment transaction for a course enrollment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// Primary identifier.
    pub id: PaymentId,
    /// Paying user.
    pub user_id: UserId,
    /// Course being purchased.
    pub course_id: CourseId,
    /// Amount actually charged, after any discount.
    #[schema(value_type = String, example = "80.00")]
    pub amount: Decimal,
    /// Current lifecycle state.
    pub status: PaymentStatus,
    /// Identifier assigned by the external processor, once known.
    pub processor_payment_id: Option<String>,
    /// Structured reference echoed back by processor notifications.
    pub external_reference: String,
    /// Payment method detail reported by the processor.
    pub method_detail: Option<String>,
    /// When the processor approved the charge.
    pub approved_at: Option<DateTime<Utc>>,
    /// Record creation timestamp.
    pub created_at: DateTime<Utc>,
}
