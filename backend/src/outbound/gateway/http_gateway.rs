//! Reqwest-backed payment processor adapter.
//!
//! Owns transport details only: request serialisation, timeout, HTTP
//! status mapping, and JSON decoding into port-level report types.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};

use crate::domain::ports::{
    CoursePaymentOrder, GatewayError, PaymentGateway, PaymentPreference, ProcessorPaymentReport,
};

use super::dto::{CreatePreferenceDto, PaymentStatusDto, PreferenceDto};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Payment processor adapter speaking JSON over HTTPS.
pub struct HttpPaymentGateway {
    client: Client,
    base_url: Url,
    access_token: String,
}

impl HttpPaymentGateway {
    /// Build an adapter with the default request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base_url: Url, access_token: impl Into<String>) -> Result<Self, reqwest::Error> {
        Self::with_timeout(base_url, access_token, DEFAULT_TIMEOUT)
    }

    /// Build an adapter with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn with_timeout(
        base_url: Url,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            access_token: access_token.into(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.base_url
            .join(path)
            .map_err(|e| GatewayError::decode(format!("invalid gateway path {path}: {e}")))
    }
}

fn map_transport_error(error: reqwest::Error) -> GatewayError {
    GatewayError::transport(error.to_string())
}

fn map_status_error(status: StatusCode, body: &[u8]) -> GatewayError {
    let excerpt = String::from_utf8_lossy(&body[..body.len().min(256)]).into_owned();
    GatewayError::status(status.as_u16(), excerpt)
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_course_payment(
        &self,
        order: &CoursePaymentOrder,
    ) -> Result<PaymentPreference, GatewayError> {
        let url = self.endpoint("checkout/preferences")?;
        let body = CreatePreferenceDto {
            title: &order.course_title,
            unit_price: order.amount,
            quantity: 1,
            payer_email: &order.payer_email,
            external_reference: &order.external_reference,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, bytes.as_ref()));
        }

        let decoded: PreferenceDto = serde_json::from_slice(bytes.as_ref())
            .map_err(|e| GatewayError::decode(format!("preference payload: {e}")))?;
        Ok(PaymentPreference {
            preference_id: decoded.id,
            redirect_url: decoded.init_point,
        })
    }

    async fn payment_status(
        &self,
        processor_payment_id: &str,
    ) -> Result<ProcessorPaymentReport, GatewayError> {
        let url = self.endpoint(&format!("v1/payments/{processor_payment_id}"))?;

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, bytes.as_ref()));
        }

        let decoded: PaymentStatusDto = serde_json::from_slice(bytes.as_ref())
            .map_err(|e| GatewayError::decode(format!("payment payload: {e}")))?;
        Ok(ProcessorPaymentReport {
            status: decoded.status,
            amount: decoded.transaction_amount,
            method: decoded.payment_method_id,
            external_reference: decoded.external_reference,
        })
    }
}
