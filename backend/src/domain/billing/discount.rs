//! Discount codes: validity rules and price arithmetic.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ids::{CourseId, DiscountCodeId};

/// How a discount value is applied to a price.
///
/// Unrecognised kinds read back from storage are preserved verbatim and
/// apply as a no-op, matching the historic behaviour of silently charging
/// full price rather than failing the purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// `value` is a percentage of the price, `0..=100` expected.
    Percentage,
    /// `value` is an absolute amount subtracted from the price.
    Fixed,
    /// Anything else found in storage; applies no discount.
    #[serde(untagged)]
    Other(String),
}

impl DiscountKind {
    /// Parse a stored kind string; never fails.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "percentage" => Self::Percentage,
            "fixed" => Self::Fixed,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Stable name used in storage.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
            Self::Other(raw) => raw.as_str(),
        }
    }
}

/// A redeemable discount code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiscountCode {
    /// Primary identifier.
    pub id: DiscountCodeId,
    /// The code itself, stored uppercase and matched case-insensitively.
    pub code: String,
    /// How `value` is applied.
    #[schema(value_type = String, example = "percentage")]
    pub kind: DiscountKind,
    /// Percentage or absolute amount, per `kind`.
    #[schema(value_type = String, example = "20")]
    pub value: Decimal,
    /// Global redemption cap.
    pub max_uses: i32,
    /// Redemptions so far; never exceeds `max_uses`.
    pub current_uses: i32,
    /// Start of the validity window.
    pub valid_from: DateTime<Utc>,
    /// End of the validity window; `None` means no expiry.
    pub valid_until: Option<DateTime<Utc>>,
    /// Restricts the code to one course when present; global otherwise.
    pub course_id: Option<CourseId>,
    /// Deactivated codes always fail validation.
    pub active: bool,
}

/// Why a discount code failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    /// No code with that name exists.
    UnknownCode,
    /// The code has been deactivated.
    Inactive,
    /// The global usage cap is exhausted.
    CapReached,
    /// Outside the validity window.
    OutsideWindow,
    /// Scoped to a different course.
    WrongCourse,
    /// This user already redeemed the code.
    AlreadyUsed,
}

impl RejectionReason {
    /// Client-facing message for the rejection.
    pub const fn message(self) -> &'static str {
        match self {
            Self::UnknownCode => "discount code not found",
            Self::Inactive => "discount code is no longer active",
            Self::CapReached => "discount code has reached its usage limit",
            Self::OutsideWindow => "discount code is not valid at this time",
            Self::WrongCourse => "discount code does not apply to this course",
            Self::AlreadyUsed => "discount code already used by this account",
        }
    }
}

impl DiscountCode {
    /// Evaluate the validity predicate against a course and instant.
    ///
    /// Per-user single use is checked separately by the caller, which has
    /// access to the usage rows.
    pub fn check(&self, course_id: CourseId, now: DateTime<Utc>) -> Result<(), RejectionReason> {
        if !self.active {
            return Err(RejectionReason::Inactive);
        }
        if self.current_uses >= self.max_uses {
            return Err(RejectionReason::CapReached);
        }
        if now < self.valid_from {
            return Err(RejectionReason::OutsideWindow);
        }
        if let Some(until) = self.valid_until {
            if now > until {
                return Err(RejectionReason::OutsideWindow);
            }
        }
        if let Some(scope) = self.course_id {
            if scope != course_id {
                return Err(RejectionReason::WrongCourse);
            }
        }
        Ok(())
    }

    /// Apply the discount to a price.
    ///
    /// `Percentage` subtracts `price * value / 100`; `Fixed` subtracts
    /// `value`, floored at zero; unknown kinds leave the price unchanged.
    pub fn apply(&self, price: Decimal) -> Decimal {
        match &self.kind {
            DiscountKind::Percentage => price - price * self.value / Decimal::ONE_HUNDRED,
            DiscountKind::Fixed => (price - self.value).max(Decimal::ZERO),
            DiscountKind::Other(_) => price,
        }
    }
}

/// Outcome of validating a discount code for a (user, course) pair.
///
/// A rejection is a value, never an error; `message` explains it to the
/// client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiscountVerdict {
    /// Whether the code applies.
    pub valid: bool,
    /// The matched discount code, present when valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<DiscountCode>,
    /// Course price after applying the discount, present when valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "80.00")]
    pub final_price: Option<Decimal>,
    /// Client-facing rejection message, present when invalid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DiscountVerdict {
    /// A verdict accepting the code at the given final price.
    pub fn accepted(discount: DiscountCode, final_price: Decimal) -> Self {
        Self {
            valid: true,
            discount: Some(discount),
            final_price: Some(final_price),
            message: None,
        }
    }

    /// Build a rejection verdict from a reason.
    pub fn rejected(reason: RejectionReason) -> Self {
        Self {
            valid: false,
            discount: None,
            final_price: None,
            message: Some(reason.message().to_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rstest::{fixture, rstest};

    #[fixture]
    fn code() -> DiscountCode {
        DiscountCode {
            id: DiscountCodeId::new(),
            code: "SPRING20".to_owned(),
            kind: DiscountKind::Percentage,
            value: Decimal::from(20),
            max_uses: 100,
            current_uses: 0,
            valid_from: Utc::now() - Duration::days(1),
            valid_until: Some(Utc::now() + Duration::days(30)),
            course_id: None,
            active: true,
        }
    }

    #[rstest]
    fn percentage_discount_arithmetic(code: DiscountCode) {
        let price = Decimal::new(10_000, 2); // 100.00
        assert_eq!(code.apply(price), Decimal::new(8_000, 2)); // 80.00
    }

    #[rstest]
    fn fixed_discount_floors_at_zero(mut code: DiscountCode) {
        code.kind = DiscountKind::Fixed;
        code.value = Decimal::new(3_000, 2); // 30.00
        let price = Decimal::new(2_000, 2); // 20.00
        assert_eq!(code.apply(price), Decimal::ZERO);
    }

    #[rstest]
    fn unknown_kind_leaves_price_unchanged(mut code: DiscountCode) {
        code.kind = DiscountKind::parse("loyalty_points");
        let price = Decimal::new(5_000, 2);
        assert_eq!(code.apply(price), price);
    }

    #[rstest]
    fn check_accepts_valid_global_code(code: DiscountCode) {
        assert_eq!(code.check(CourseId::new(), Utc::now()), Ok(()));
    }

    #[rstest]
    fn check_rejects_inactive(mut code: DiscountCode) {
        code.active = false;
        assert_eq!(
            code.check(CourseId::new(), Utc::now()),
            Err(RejectionReason::Inactive)
        );
    }

    #[rstest]
    fn check_rejects_exhausted_cap(mut code: DiscountCode) {
        code.current_uses = code.max_uses;
        assert_eq!(
            code.check(CourseId::new(), Utc::now()),
            Err(RejectionReason::CapReached)
        );
    }

    #[rstest]
    fn check_rejects_outside_window(mut code: DiscountCode) {
        let now = Utc::now();
        code.valid_from = now + Duration::days(1);
        assert_eq!(
            code.check(CourseId::new(), now),
            Err(RejectionReason::OutsideWindow)
        );

        code.valid_from = now - Duration::days(10);
        code.valid_until = Some(now - Duration::days(1));
        assert_eq!(
            code.check(CourseId::new(), now),
            Err(RejectionReason::OutsideWindow)
        );
    }

    #[rstest]
    fn check_without_expiry_never_lapses(mut code: DiscountCode) {
        code.valid_until = None;
        let far_future = Utc::now() + Duration::days(36_500);
        assert_eq!(code.check(CourseId::new(), far_future), Ok(()));
    }

    #[rstest]
    fn check_enforces_course_scope(mut code: DiscountCode) {
        let scoped = CourseId::new();
        code.course_id = Some(scoped);
        assert_eq!(code.check(scoped, Utc::now()), Ok(()));
        assert_eq!(
            code.check(CourseId::new(), Utc::now()),
            Err(RejectionReason::WrongCourse)
        );
    }

    #[rstest]
    fn kind_round_trips_unknown_values() {
        let kind = DiscountKind::parse("bogus");
        assert_eq!(kind, DiscountKind::Other("bogus".to_owned()));
        assert_eq!(kind.as_str(), "bogus");
        assert_eq!(DiscountKind::parse("percentage"), DiscountKind::Percentage);
    }
}
