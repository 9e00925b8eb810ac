//! PostgreSQL-backed `EnrollmentRepository` implementation.
//!
//! Enrollment inserts rely on the primary key over (user, course) plus
//! `ON CONFLICT DO NOTHING`: duplicate enrolls are dropped by the storage
//! layer itself, which is what keeps webhook replays idempotent.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::AsyncConnection;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt as _;

use crate::domain::enrollment::{Enrollment, LessonCounts, LessonProgress};
use crate::domain::ids::{CourseId, UserId};
use crate::domain::ports::{EnrollmentRepository, RepositoryError};
use crate::{query_optional, query_vec};

use super::diesel_helpers::{map_diesel_error, map_pool_error};
use super::models::{EnrollmentRow, NewEnrollmentRow, NewLessonProgressRow};
use super::pool::DbPool;
use super::schema::{course_modules, enrollments, lesson_progress, lessons};

/// Diesel-backed implementation of the `EnrollmentRepository` port.
#[derive(Clone)]
pub struct DieselEnrollmentRepository {
    pool: DbPool,
}

impl DieselEnrollmentRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_enrollment(row: EnrollmentRow) -> Result<Enrollment, RepositoryError> {
    Ok(Enrollment {
        user_id: UserId::from_uuid(row.user_id),
        course_id: CourseId::from_uuid(row.course_id),
        progress: u8::try_from(row.progress.clamp(0, 100)).unwrap_or(100),
        completed: row.completed,
        enrolled_at: row.enrolled_at,
    })
}

#[async_trait]
impl EnrollmentRepository for DieselEnrollmentRepository {
    async fn insert_if_absent(&self, enrollment: &Enrollment) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let inserted = diesel::insert_into(enrollments::table)
            .values(&NewEnrollmentRow {
                user_id: enrollment.user_id.into_uuid(),
                course_id: enrollment.course_id.into_uuid(),
                progress: i16::from(enrollment.progress),
                completed: enrollment.completed,
                enrolled_at: enrollment.enrolled_at,
            })
            .on_conflict((enrollments::user_id, enrollments::course_id))
            .do_nothing()
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(inserted > 0)
    }

    async fn find(
        &self,
        user: UserId,
        course: CourseId,
    ) -> Result<Option<Enrollment>, RepositoryError> {
        query_optional!(
            self,
            enrollments::table,
            enrollments::user_id
                .eq(user.into_uuid())
                .and(enrollments::course_id.eq(course.into_uuid())),
            EnrollmentRow,
            row_to_enrollment
        )
    }

    async fn list_for_user(&self, user: UserId) -> Result<Vec<Enrollment>, RepositoryError> {
        query_vec!(
            self,
            enrollments::table,
            enrollments::user_id.eq(user.into_uuid()),
            enrollments::enrolled_at.desc(),
            EnrollmentRow,
            row_to_enrollment
        )
    }

    async fn set_progress(
        &self,
        user: UserId,
        course: CourseId,
        progress: u8,
        completed: bool,
    ) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let updated = diesel::update(
            enrollments::table.filter(
                enrollments::user_id
                    .eq(user.into_uuid())
                    .and(enrollments::course_id.eq(course.into_uuid())),
            ),
        )
        .set((
            enrollments::progress.eq(i16::from(progress)),
            enrollments::completed.eq(completed),
        ))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(updated > 0)
    }

    async fn upsert_lesson_progress(
        &self,
        progress: &LessonProgress,
    ) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(lesson_progress::table)
            .values(&NewLessonProgressRow {
                user_id: progress.user_id.into_uuid(),
                lesson_id: progress.lesson_id.into_uuid(),
                completed_at: progress.completed_at,
            })
            .on_conflict((lesson_progress::user_id, lesson_progress::lesson_id))
            .do_update()
            .set(lesson_progress::completed_at.eq(progress.completed_at))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn lesson_counts(
        &self,
        user: UserId,
        course: CourseId,
    ) -> Result<LessonCounts, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        // Both counts in one transaction so a concurrent lesson insert
        // cannot produce completed > total.
        let (total, completed): (i64, i64) = conn
            .transaction(|conn| {
                async move {
                    let total: i64 = lessons::table
                        .inner_join(course_modules::table)
                        .filter(course_modules::course_id.eq(course.into_uuid()))
                        .count()
                        .get_result(conn)
                        .await?;
                    let completed: i64 = lesson_progress::table
                        .inner_join(lessons::table.inner_join(course_modules::table))
                        .filter(course_modules::course_id.eq(course.into_uuid()))
                        .filter(lesson_progress::user_id.eq(user.into_uuid()))
                        .count()
                        .get_result(conn)
                        .await?;
                    Ok((total, completed))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        Ok(LessonCounts {
            total: u32::try_from(total).unwrap_or(u32::MAX),
            completed: u32::try_from(completed).unwrap_or(u32::MAX),
        })
    }
}
