//! Certificate eligibility and issuance.

pub mod certificate;
pub mod service;

pub use self::certificate::{Certificate, EligibilityVerdict, certificate_code};
pub use self::service::{CertificationApi, CertificationService, GradeRequest};
