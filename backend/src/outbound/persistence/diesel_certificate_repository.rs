//! PostgreSQL-backed `CertificateRepository` implementation.
//!
//! Issuance runs insert-or-ignore plus read-back in a single transaction
//! against the unique (student, course) index, so two racing issue calls
//! converge on one stored certificate.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::AsyncConnection;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use rust_decimal::Decimal;

use crate::domain::certification::Certificate;
use crate::domain::ids::{CertificateId, CourseId, UserId};
use crate::domain::ports::{CertificateRepository, RepositoryError, SubmissionGrade};
use crate::query_optional;

use super::diesel_helpers::{map_diesel_error, map_pool_error};
use super::models::{CertificateRow, NewCertificateRow, NewSubmissionGradeRow};
use super::pool::DbPool;
use super::schema::{certificates, submission_grades};

/// Diesel-backed implementation of the `CertificateRepository` port.
#[derive(Clone)]
pub struct DieselCertificateRepository {
    pool: DbPool,
}

impl DieselCertificateRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_certificate(row: CertificateRow) -> Result<Certificate, RepositoryError> {
    Ok(Certificate {
        id: CertificateId::from_uuid(row.id),
        student_id: UserId::from_uuid(row.student_id),
        course_id: CourseId::from_uuid(row.course_id),
        code: row.certificate_code,
        final_score: row.final_score,
        valid: row.valid,
        issued_at: row.issued_at,
        verification_url: row.verification_url,
        asset_url: row.asset_url,
    })
}

#[async_trait]
impl CertificateRepository for DieselCertificateRepository {
    async fn insert_or_existing(
        &self,
        certificate: &Certificate,
    ) -> Result<Certificate, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let student = certificate.student_id.into_uuid();
        let course = certificate.course_id.into_uuid();

        let stored: CertificateRow = conn
            .transaction(|conn| {
                async move {
                    diesel::insert_into(certificates::table)
                        .values(&NewCertificateRow {
                            id: certificate.id.into_uuid(),
                            student_id: student,
                            course_id: course,
                            certificate_code: &certificate.code,
                            final_score: certificate.final_score,
                            valid: certificate.valid,
                            issued_at: certificate.issued_at,
                            verification_url: &certificate.verification_url,
                            asset_url: certificate.asset_url.as_deref(),
                        })
                        .on_conflict((certificates::student_id, certificates::course_id))
                        .do_nothing()
                        .execute(conn)
                        .await?;

                    certificates::table
                        .filter(
                            certificates::student_id
                                .eq(student)
                                .and(certificates::course_id.eq(course)),
                        )
                        .select(CertificateRow::as_select())
                        .first(conn)
                        .await
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        row_to_certificate(stored)
    }

    async fn find_for(
        &self,
        student: UserId,
        course: CourseId,
    ) -> Result<Option<Certificate>, RepositoryError> {
        query_optional!(
            self,
            certificates::table,
            certificates::student_id
                .eq(student.into_uuid())
                .and(certificates::course_id.eq(course.into_uuid())),
            CertificateRow,
            row_to_certificate
        )
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Certificate>, RepositoryError> {
        query_optional!(
            self,
            certificates::table,
            certificates::certificate_code.eq(code),
            CertificateRow,
            row_to_certificate
        )
    }

    async fn set_validity(
        &self,
        id: CertificateId,
        valid: bool,
    ) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let updated =
            diesel::update(certificates::table.filter(certificates::id.eq(id.into_uuid())))
                .set(certificates::valid.eq(valid))
                .execute(&mut conn)
                .await
                .map_err(map_diesel_error)?;
        Ok(updated > 0)
    }

    async fn record_grade(&self, grade: &SubmissionGrade) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(submission_grades::table)
            .values(&NewSubmissionGradeRow {
                id: grade.id,
                student_id: grade.student_id.into_uuid(),
                course_id: grade.course_id.into_uuid(),
                assignment_title: &grade.assignment_title,
                score: grade.score,
                graded_at: grade.graded_at,
            })
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn average_score(
        &self,
        student: UserId,
        course: CourseId,
    ) -> Result<Option<Decimal>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        submission_grades::table
            .filter(
                submission_grades::student_id
                    .eq(student.into_uuid())
                    .and(submission_grades::course_id.eq(course.into_uuid())),
            )
            .select(diesel::dsl::avg(submission_grades::score))
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)
    }
}
