//! Billing: discount codes, checkout, and payment reconciliation.

pub mod discount;
pub mod payment;
pub mod reference;
pub mod service;

pub use self::discount::{DiscountCode, DiscountKind, DiscountVerdict, RejectionReason};
pub use self::payment::{Payment, PaymentStatus};
pub use self::reference::{PaymentReference, ReferenceError};
pub use self::service::{
    BillingApi, BillingService, CheckoutOutcome, NewDiscountRequest, ReconcileOutcome,
    WebhookNotification,
};
