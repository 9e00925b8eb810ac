//! Progress domain service: enrollment, lesson completion, aggregation.
//!
//! The aggregator is deliberately simple: every lesson weighs equally and
//! the percentage is `round(completed / total * 100)`. A course with no
//! lessons reports 0% instead of erroring.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::enrollment::{CourseProgress, Enrollment, LessonProgress};
use crate::domain::ids::{CourseId, LessonId, UserId};
use crate::domain::ports::{CatalogueRepository, EnrollmentRepository, map_repository_error};
use crate::domain::user::Actor;
use crate::domain::Error;

/// An enrollment joined with its course title for listings.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentView {
    /// The enrollment row.
    #[serde(flatten)]
    pub enrollment: Enrollment,
    /// Title of the enrolled course.
    pub course_title: String,
}

/// Driving port for enrollment and progress operations.
#[async_trait]
pub trait ProgressApi: Send + Sync {
    /// Enroll the actor in a free, published course.
    ///
    /// Idempotent: re-enrolling returns the existing enrollment.
    async fn enroll_free(&self, actor: Actor, course: CourseId) -> Result<Enrollment, Error>;

    /// The actor's enrollments with course titles, newest first.
    async fn my_enrollments(&self, actor: Actor) -> Result<Vec<EnrollmentView>, Error>;

    /// Aggregate progress for one (user, course) pair. Read-only.
    async fn course_progress(
        &self,
        user: UserId,
        course: CourseId,
    ) -> Result<CourseProgress, Error>;

    /// Record a lesson completion and refresh the enrollment row.
    async fn mark_lesson_complete(
        &self,
        actor: Actor,
        lesson: LessonId,
    ) -> Result<CourseProgress, Error>;
}

/// Progress service over enrollment and catalogue ports.
#[derive(Clone)]
pub struct ProgressService<E, C> {
    enrollments: Arc<E>,
    catalogue: Arc<C>,
}

impl<E, C> ProgressService<E, C> {
    /// Create a new service with the given repositories.
    pub fn new(enrollments: Arc<E>, catalogue: Arc<C>) -> Self {
        Self {
            enrollments,
            catalogue,
        }
    }
}

#[async_trait]
impl<E, C> ProgressApi for ProgressService<E, C>
where
    E: EnrollmentRepository,
    C: CatalogueRepository,
{
    async fn enroll_free(&self, actor: Actor, course: CourseId) -> Result<Enrollment, Error> {
        let found = self
            .catalogue
            .find_course(course)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("course not found"))?;
        if !found.published {
            return Err(Error::not_found("course not found"));
        }
        if !found.is_free() {
            return Err(Error::invalid_request(
                "course requires payment; use checkout",
            ));
        }

        let enrollment = Enrollment::new(actor.id, course);
        // Insert-or-ignore: the unique (user, course) index swallows the
        // duplicate and the stored row is returned either way.
        self.enrollments
            .insert_if_absent(&enrollment)
            .await
            .map_err(map_repository_error)?;
        self.enrollments
            .find(actor.id, course)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::internal("enrollment missing after insert"))
    }

    async fn my_enrollments(&self, actor: Actor) -> Result<Vec<EnrollmentView>, Error> {
        let enrollments = self
            .enrollments
            .list_for_user(actor.id)
            .await
            .map_err(map_repository_error)?;

        let mut views = Vec::with_capacity(enrollments.len());
        for enrollment in enrollments {
            let title = self
                .catalogue
                .find_course(enrollment.course_id)
                .await
                .map_err(map_repository_error)?
                .map(|c| c.title)
                .unwrap_or_else(|| "(removed course)".to_owned());
            views.push(EnrollmentView {
                enrollment,
                course_title: title,
            });
        }
        Ok(views)
    }

    async fn course_progress(
        &self,
        user: UserId,
        course: CourseId,
    ) -> Result<CourseProgress, Error> {
        self.catalogue
            .find_course(course)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("course not found"))?;

        let counts = self
            .enrollments
            .lesson_counts(user, course)
            .await
            .map_err(map_repository_error)?;
        Ok(CourseProgress::from_counts(counts))
    }

    async fn mark_lesson_complete(
        &self,
        actor: Actor,
        lesson: LessonId,
    ) -> Result<CourseProgress, Error> {
        let course = self
            .catalogue
            .course_of_lesson(lesson)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("lesson not found"))?;

        self.enrollments
            .find(actor.id, course)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::forbidden("not enrolled in this course"))?;

        self.enrollments
            .upsert_lesson_progress(&LessonProgress {
                user_id: actor.id,
                lesson_id: lesson,
                completed_at: Utc::now(),
            })
            .await
            .map_err(map_repository_error)?;

        let counts = self
            .enrollments
            .lesson_counts(actor.id, course)
            .await
            .map_err(map_repository_error)?;
        let progress = CourseProgress::from_counts(counts);

        self.enrollments
            .set_progress(actor.id, course, progress.percentage, progress.is_complete())
            .await
            .map_err(map_repository_error)?;
        Ok(progress)
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod service_tests;
