//! Course aggregate root.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ids::{CourseId, UserId};

/// A course offered in the catalogue.
///
/// The price is a read-only input to the billing pipeline: nothing in this
/// crate mutates it after creation except an explicit instructor update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    /// Primary identifier.
    pub id: CourseId,
    /// Course title shown in the catalogue.
    pub title: String,
    /// Longer description, possibly empty.
    pub description: String,
    /// Price charged on enrollment; zero means the course is free.
    #[schema(value_type = String, example = "49.90")]
    pub price: Decimal,
    /// Owning instructor.
    pub instructor_id: UserId,
    /// Whether the course is visible in the public catalogue.
    pub published: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Course {
    /// Whether enrollment requires a payment.
    pub fn is_free(&self) -> bool {
        self.price <= Decimal::ZERO
    }
}

/// Validation failures for course fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CourseValidationError {
    /// Title is blank after trimming.
    #[error("course title must not be empty")]
    EmptyTitle,
    /// Price is negative.
    #[error("course price must not be negative")]
    NegativePrice,
}

/// Validate a new or updated course title, returning the trimmed value.
pub fn validate_title(value: &str) -> Result<String, CourseValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CourseValidationError::EmptyTitle);
    }
    Ok(trimmed.to_owned())
}

/// Validate a course price.
pub fn validate_price(value: Decimal) -> Result<Decimal, CourseValidationError> {
    if value < Decimal::ZERO {
        return Err(CourseValidationError::NegativePrice);
    }
    Ok(value)
}

/// Partial update applied to an existing course by its instructor.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseUpdate {
    /// New title, when present.
    pub title: Option<String>,
    /// New description, when present.
    pub description: Option<String>,
    /// New price, when present.
    #[schema(value_type = Option<String>, example = "19.90")]
    pub price: Option<Decimal>,
    /// New publish flag, when present.
    pub published: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn course(price: Decimal) -> Course {
        Course {
            id: CourseId::new(),
            title: "Rust for historians".to_owned(),
            description: String::new(),
            price,
            instructor_id: UserId::new(),
            published: true,
            created_at: Utc::now(),
        }
    }

    #[rstest]
    fn zero_price_is_free() {
        assert!(course(Decimal::ZERO).is_free());
        assert!(!course(Decimal::new(100, 2)).is_free());
    }

    #[rstest]
    fn title_rejects_blank() {
        assert_eq!(validate_title("  "), Err(CourseValidationError::EmptyTitle));
    }

    #[rstest]
    fn price_rejects_negative() {
        assert_eq!(
            validate_price(Decimal::new(-1, 2)),
            Err(CourseValidationError::NegativePrice)
        );
        assert!(validate_price(Decimal::ZERO).is_ok());
    }
}
