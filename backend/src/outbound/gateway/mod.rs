//! HTTP adapters for external collaborators.
//!
//! Both collaborators are optional at deploy time: a disabled gateway
//! fails checkout loudly, while a disabled renderer degrades issuance to
//! certificates without a PDF asset.

pub mod dto;
pub mod http_gateway;
pub mod renderer;

use async_trait::async_trait;

use crate::domain::certification::Certificate;
use crate::domain::ports::{
    CertificateRenderer, CoursePaymentOrder, GatewayError, PaymentGateway, PaymentPreference,
    ProcessorPaymentReport, RenderError, RenderedAsset,
};

pub use self::http_gateway::HttpPaymentGateway;
pub use self::renderer::HttpCertificateRenderer;

/// Payment gateway adapter selected by configuration.
pub enum GatewayAdapter {
    /// Live HTTP adapter.
    Http(HttpPaymentGateway),
    /// No gateway configured; every call fails.
    Disabled,
}

#[async_trait]
impl PaymentGateway for GatewayAdapter {
    async fn create_course_payment(
        &self,
        order: &CoursePaymentOrder,
    ) -> Result<PaymentPreference, GatewayError> {
        match self {
            Self::Http(gateway) => gateway.create_course_payment(order).await,
            Self::Disabled => Err(GatewayError::transport("payment gateway not configured")),
        }
    }

    async fn payment_status(
        &self,
        processor_payment_id: &str,
    ) -> Result<ProcessorPaymentReport, GatewayError> {
        match self {
            Self::Http(gateway) => gateway.payment_status(processor_payment_id).await,
            Self::Disabled => Err(GatewayError::transport("payment gateway not configured")),
        }
    }
}

/// Certificate renderer adapter selected by configuration.
pub enum RendererAdapter {
    /// Live HTTP adapter.
    Http(HttpCertificateRenderer),
    /// No renderer configured; issuance proceeds without an asset.
    Disabled,
}

#[async_trait]
impl CertificateRenderer for RendererAdapter {
    async fn render(
        &self,
        certificate: &Certificate,
        student_name: &str,
        course_title: &str,
    ) -> Result<RenderedAsset, RenderError> {
        match self {
            Self::Http(renderer) => {
                renderer
                    .render(certificate, student_name, course_title)
                    .await
            }
            Self::Disabled => Err(RenderError::unavailable(
                "certificate renderer not configured",
            )),
        }
    }
}
