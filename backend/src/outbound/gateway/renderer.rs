//! Reqwest-backed certificate rendering adapter.
//!
//! The rendering service receives certificate fields and answers with the
//! public URL of the generated PDF/QR document. This crate never touches
//! the document itself.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::domain::certification::Certificate;
use crate::domain::ports::{CertificateRenderer, RenderError, RenderedAsset};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct RenderRequestDto<'a> {
    certificate_code: &'a str,
    student_name: &'a str,
    course_title: &'a str,
    issued_at: chrono::DateTime<chrono::Utc>,
    verification_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct RenderResponseDto {
    url: String,
}

/// Certificate renderer adapter speaking JSON over HTTPS.
pub struct HttpCertificateRenderer {
    client: Client,
    endpoint: Url,
}

impl HttpCertificateRenderer {
    /// Build an adapter against the renderer's endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(endpoint: Url) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl CertificateRenderer for HttpCertificateRenderer {
    async fn render(
        &self,
        certificate: &Certificate,
        student_name: &str,
        course_title: &str,
    ) -> Result<RenderedAsset, RenderError> {
        let body = RenderRequestDto {
            certificate_code: &certificate.code,
            student_name,
            course_title,
            issued_at: certificate.issued_at,
            verification_url: &certificate.verification_url,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| RenderError::unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::failed(format!(
                "renderer returned status {status}"
            )));
        }

        let decoded: RenderResponseDto = response
            .json()
            .await
            .map_err(|e| RenderError::failed(format!("renderer payload: {e}")))?;
        Ok(RenderedAsset {
            asset_url: decoded.url,
        })
    }
}
