//! Wire types for the payment processor's REST API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Request body for creating a checkout preference.
#[derive(Debug, Serialize)]
pub struct CreatePreferenceDto<'a> {
    /// Line item shown on the checkout page.
    pub title: &'a str,
    /// Amount to collect.
    pub unit_price: Decimal,
    /// Always 1; a checkout covers one course.
    pub quantity: u32,
    /// Payer email forwarded to the processor.
    pub payer_email: &'a str,
    /// Reference echoed back in webhook notifications.
    pub external_reference: &'a str,
}

/// Response body for a created preference.
#[derive(Debug, Deserialize)]
pub struct PreferenceDto {
    /// Processor-assigned preference identifier.
    pub id: String,
    /// Checkout redirect URL.
    pub init_point: String,
}

/// Response body for a payment status lookup.
#[derive(Debug, Deserialize)]
pub struct PaymentStatusDto {
    /// Raw processor status string.
    pub status: String,
    /// Amount recorded by the processor.
    #[serde(default)]
    pub transaction_amount: Option<Decimal>,
    /// Payment method identifier.
    #[serde(default)]
    pub payment_method_id: Option<String>,
    /// The external reference echoed back.
    #[serde(default)]
    pub external_reference: Option<String>,
}
