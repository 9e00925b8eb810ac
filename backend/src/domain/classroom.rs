//! Live-class session metadata and scheduling.
//!
//! The platform stores scheduling metadata only; the conferencing itself
//! happens on an external provider reachable through `join_url`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Error;
use super::ids::{CourseId, LiveSessionId, UserId};
use super::ports::{
    CatalogueRepository, ClassroomRepository, EnrollmentRepository, map_repository_error,
};
use super::user::Actor;

/// A scheduled live class for a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LiveClassSession {
    /// Primary identifier.
    pub id: LiveSessionId,
    /// Course the session belongs to.
    pub course_id: CourseId,
    /// Topic shown to attendees.
    pub topic: String,
    /// Scheduled start time.
    pub starts_at: DateTime<Utc>,
    /// Planned duration.
    pub duration_minutes: i32,
    /// Where attendees join; provider-specific URL.
    pub join_url: String,
    /// Hosting instructor.
    pub host_id: UserId,
    /// Soft cancellation flag; cancelled sessions stay listed as such.
    pub cancelled: bool,
}

/// Validation failures for session scheduling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionValidationError {
    /// Topic is blank after trimming.
    #[error("session topic must not be empty")]
    EmptyTopic,
    /// Duration must be positive.
    #[error("session duration must be positive")]
    NonPositiveDuration,
}

/// Validate a topic and duration pair for scheduling.
pub fn validate_session(
    topic: &str,
    duration_minutes: i32,
) -> Result<String, SessionValidationError> {
    let trimmed = topic.trim();
    if trimmed.is_empty() {
        return Err(SessionValidationError::EmptyTopic);
    }
    if duration_minutes <= 0 {
        return Err(SessionValidationError::NonPositiveDuration);
    }
    Ok(trimmed.to_owned())
}

/// Request to schedule a live class.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSessionRequest {
    /// Topic shown to attendees.
    pub topic: String,
    /// Scheduled start time.
    pub starts_at: DateTime<Utc>,
    /// Planned duration in minutes.
    pub duration_minutes: i32,
    /// Provider join URL.
    pub join_url: String,
}

/// Driving port for live-class scheduling.
#[async_trait]
pub trait ClassroomApi: Send + Sync {
    /// Schedule a session on a course the actor manages.
    async fn schedule(
        &self,
        actor: Actor,
        course: CourseId,
        request: ScheduleSessionRequest,
    ) -> Result<LiveClassSession, Error>;

    /// Soft-cancel a session the actor hosts (or any, as admin).
    async fn cancel(&self, actor: Actor, id: LiveSessionId) -> Result<(), Error>;

    /// Sessions of a course, visible to participants and managers.
    async fn list(&self, actor: Actor, course: CourseId)
        -> Result<Vec<LiveClassSession>, Error>;
}

/// Classroom service over persistence ports.
#[derive(Clone)]
pub struct ClassroomService<R, C, E> {
    sessions: Arc<R>,
    catalogue: Arc<C>,
    enrollments: Arc<E>,
}

impl<R, C, E> ClassroomService<R, C, E> {
    /// Create a new service.
    pub fn new(sessions: Arc<R>, catalogue: Arc<C>, enrollments: Arc<E>) -> Self {
        Self {
            sessions,
            catalogue,
            enrollments,
        }
    }
}

impl<R, C, E> ClassroomService<R, C, E>
where
    R: ClassroomRepository,
    C: CatalogueRepository,
    E: EnrollmentRepository,
{
    async fn require_participant(&self, actor: Actor, course: CourseId) -> Result<(), Error> {
        let course_row = self
            .catalogue
            .find_course(course)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("course not found"))?;
        if actor.can_manage(course_row.instructor_id) {
            return Ok(());
        }
        let enrolled = self
            .enrollments
            .find(actor.id, course)
            .await
            .map_err(map_repository_error)?
            .is_some();
        if enrolled {
            Ok(())
        } else {
            Err(Error::forbidden("not a participant of this course"))
        }
    }
}

#[async_trait]
impl<R, C, E> ClassroomApi for ClassroomService<R, C, E>
where
    R: ClassroomRepository,
    C: CatalogueRepository,
    E: EnrollmentRepository,
{
    async fn schedule(
        &self,
        actor: Actor,
        course: CourseId,
        request: ScheduleSessionRequest,
    ) -> Result<LiveClassSession, Error> {
        let course_row = self
            .catalogue
            .find_course(course)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("course not found"))?;
        if !actor.can_manage(course_row.instructor_id) {
            return Err(Error::forbidden("course belongs to another instructor"));
        }
        let topic = validate_session(&request.topic, request.duration_minutes)
            .map_err(|e| Error::invalid_request(e.to_string()))?;

        let session = LiveClassSession {
            id: LiveSessionId::new(),
            course_id: course,
            topic,
            starts_at: request.starts_at,
            duration_minutes: request.duration_minutes,
            join_url: request.join_url,
            host_id: actor.id,
            cancelled: false,
        };
        self.sessions
            .insert(&session)
            .await
            .map_err(map_repository_error)?;
        Ok(session)
    }

    async fn cancel(&self, actor: Actor, id: LiveSessionId) -> Result<(), Error> {
        let session = self
            .sessions
            .find(id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("session not found"))?;
        if !actor.can_manage(session.host_id) {
            return Err(Error::forbidden("session belongs to another host"));
        }
        self.sessions
            .set_cancelled(id)
            .await
            .map_err(map_repository_error)?;
        Ok(())
    }

    async fn list(
        &self,
        actor: Actor,
        course: CourseId,
    ) -> Result<Vec<LiveClassSession>, Error> {
        self.require_participant(actor, course).await?;
        self.sessions
            .list_for_course(course)
            .await
            .map_err(map_repository_error)
    }
}
