//! Certification domain service: eligibility evaluation and issuance.
//!
//! Issuance re-checks eligibility and then defers to the storage layer's
//! unique (student, course) index, so two racing issue calls converge on
//! one certificate instead of relying on the advisory pre-check alone.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;
use url::Url;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::enrollment::CourseProgress;
use crate::domain::ids::{CertificateId, CourseId, UserId};
use crate::domain::ports::{
    CatalogueRepository, CertificateRenderer, CertificateRepository, EnrollmentRepository,
    SubmissionGrade, UserRepository, map_repository_error,
};
use crate::domain::user::Actor;

use super::certificate::{Certificate, EligibilityVerdict, certificate_code};

/// Rejection reason for a course with no lessons.
const NO_LESSONS: &str = "course has no lessons";
/// Rejection reason for incomplete progress.
const NOT_COMPLETED: &str = "course not completed";
/// Rejection reason when a certificate already exists.
const ALREADY_ISSUED: &str = "certificate already issued";

/// Request to record a graded submission.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GradeRequest {
    /// Graded student.
    pub student_id: UserId,
    /// Assignment label.
    pub assignment_title: String,
    /// Score awarded, `0..=100`.
    #[schema(value_type = String, example = "87.5")]
    pub score: Decimal,
}

/// Driving port for certification operations.
#[async_trait]
pub trait CertificationApi: Send + Sync {
    /// Evaluate eligibility without side effects.
    async fn evaluate(
        &self,
        student: UserId,
        course: CourseId,
    ) -> Result<EligibilityVerdict, Error>;

    /// Issue a certificate; idempotent per (student, course).
    async fn issue(&self, actor: Actor, course: CourseId) -> Result<Certificate, Error>;

    /// Public lookup by verification code.
    async fn verify(&self, code: &str) -> Result<Certificate, Error>;

    /// Soft-invalidate a certificate. Admin only.
    async fn invalidate(&self, actor: Actor, id: CertificateId) -> Result<(), Error>;

    /// Record a graded submission on a course the actor manages.
    async fn record_grade(
        &self,
        actor: Actor,
        course: CourseId,
        request: GradeRequest,
    ) -> Result<(), Error>;
}

/// Certification service over persistence and rendering ports.
#[derive(Clone)]
pub struct CertificationService<CR, E, C, U, R> {
    certificates: Arc<CR>,
    enrollments: Arc<E>,
    catalogue: Arc<C>,
    users: Arc<U>,
    renderer: Arc<R>,
    frontend_base: Url,
}

impl<CR, E, C, U, R> CertificationService<CR, E, C, U, R> {
    /// Create a new service.
    ///
    /// `frontend_base` is the public site root used to build verification
    /// URLs.
    pub fn new(
        certificates: Arc<CR>,
        enrollments: Arc<E>,
        catalogue: Arc<C>,
        users: Arc<U>,
        renderer: Arc<R>,
        frontend_base: Url,
    ) -> Self {
        Self {
            certificates,
            enrollments,
            catalogue,
            users,
            renderer,
            frontend_base,
        }
    }

    fn verification_url(&self, code: &str) -> String {
        let base = self.frontend_base.as_str().trim_end_matches('/');
        format!("{base}/certificates/verify/{code}")
    }
}

impl<CR, E, C, U, R> CertificationService<CR, E, C, U, R>
where
    CR: CertificateRepository,
    E: EnrollmentRepository,
    C: CatalogueRepository,
    U: UserRepository,
    R: CertificateRenderer,
{
    async fn progress_for(
        &self,
        student: UserId,
        course: CourseId,
    ) -> Result<CourseProgress, Error> {
        let counts = self
            .enrollments
            .lesson_counts(student, course)
            .await
            .map_err(map_repository_error)?;
        Ok(CourseProgress::from_counts(counts))
    }
}

#[async_trait]
impl<CR, E, C, U, R> CertificationApi for CertificationService<CR, E, C, U, R>
where
    CR: CertificateRepository,
    E: EnrollmentRepository,
    C: CatalogueRepository,
    U: UserRepository,
    R: CertificateRenderer,
{
    async fn evaluate(
        &self,
        student: UserId,
        course: CourseId,
    ) -> Result<EligibilityVerdict, Error> {
        self.catalogue
            .find_course(course)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("course not found"))?;

        let progress = self.progress_for(student, course).await?;

        if let Some(existing) = self
            .certificates
            .find_for(student, course)
            .await
            .map_err(map_repository_error)?
        {
            return Ok(EligibilityVerdict::rejected(ALREADY_ISSUED, progress)
                .with_existing(existing));
        }

        if progress.total_lessons == 0 {
            return Ok(EligibilityVerdict::rejected(NO_LESSONS, progress));
        }
        if !progress.is_complete() {
            return Ok(EligibilityVerdict::rejected(NOT_COMPLETED, progress));
        }

        let final_score = self
            .certificates
            .average_score(student, course)
            .await
            .map_err(map_repository_error)?;
        Ok(EligibilityVerdict::eligible(progress, final_score))
    }

    async fn issue(&self, actor: Actor, course: CourseId) -> Result<Certificate, Error> {
        let verdict = self.evaluate(actor.id, course).await?;
        if let Some(existing) = verdict.existing {
            return Ok(existing);
        }
        if !verdict.eligible {
            let reason = verdict
                .reason
                .unwrap_or_else(|| "not eligible".to_owned());
            return Err(Error::invalid_request(reason));
        }

        let course_row = self
            .catalogue
            .find_course(course)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("course not found"))?;
        let student = self
            .users
            .find_by_id(actor.id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("account not found"))?;

        let issued_at = Utc::now();
        let code = certificate_code(&actor.id, &course, issued_at);
        let mut certificate = Certificate {
            id: CertificateId::new(),
            student_id: actor.id,
            course_id: course,
            code: code.clone(),
            final_score: verdict.final_score,
            valid: true,
            issued_at,
            verification_url: self.verification_url(&code),
            asset_url: None,
        };

        // Rendering is best-effort; a certificate without its PDF is still
        // a certificate.
        match self
            .renderer
            .render(&certificate, &student.display_name, &course_row.title)
            .await
        {
            Ok(asset) => certificate.asset_url = Some(asset.asset_url),
            Err(error) => {
                warn!(%error, code = %certificate.code, "certificate rendering failed");
            }
        }

        self.certificates
            .insert_or_existing(&certificate)
            .await
            .map_err(map_repository_error)
    }

    async fn verify(&self, code: &str) -> Result<Certificate, Error> {
        self.certificates
            .find_by_code(code)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("certificate not found"))
    }

    async fn invalidate(&self, actor: Actor, id: CertificateId) -> Result<(), Error> {
        if !actor.is_admin() {
            return Err(Error::forbidden("admin role required"));
        }
        let updated = self
            .certificates
            .set_validity(id, false)
            .await
            .map_err(map_repository_error)?;
        if !updated {
            return Err(Error::not_found("certificate not found"));
        }
        Ok(())
    }

    async fn record_grade(
        &self,
        actor: Actor,
        course: CourseId,
        request: GradeRequest,
    ) -> Result<(), Error> {
        let course_row = self
            .catalogue
            .find_course(course)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("course not found"))?;
        if !actor.can_manage(course_row.instructor_id) {
            return Err(Error::forbidden("course belongs to another instructor"));
        }
        if request.score < Decimal::ZERO || request.score > Decimal::ONE_HUNDRED {
            return Err(Error::invalid_request("score must be between 0 and 100"));
        }

        self.certificates
            .record_grade(&SubmissionGrade {
                id: Uuid::new_v4(),
                student_id: request.student_id,
                course_id: course,
                assignment_title: request.assignment_title.trim().to_owned(),
                score: request.score,
                graded_at: Utc::now(),
            })
            .await
            .map_err(map_repository_error)
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod service_tests;
