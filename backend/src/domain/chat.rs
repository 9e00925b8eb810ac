//! Course chat: a persisted message board per course.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagination::{Page, PageRequest};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Error;
use super::ids::{CourseId, MessageId, UserId};
use super::ports::{
    CatalogueRepository, ChatRepository, EnrollmentRepository, map_repository_error,
};
use super::user::Actor;

/// Maximum message body length accepted from clients.
pub const MAX_MESSAGE_LEN: usize = 2_000;

/// A message posted on a course's board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Primary identifier.
    pub id: MessageId,
    /// Course the message belongs to.
    pub course_id: CourseId,
    /// Posting user.
    pub author_id: UserId,
    /// Message text.
    pub body: String,
    /// When the message was posted.
    pub sent_at: DateTime<Utc>,
}

/// Validation failures for message bodies.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageValidationError {
    /// Body is blank after trimming.
    #[error("message body must not be empty")]
    Empty,
    /// Body exceeds [`MAX_MESSAGE_LEN`].
    #[error("message body must be at most {MAX_MESSAGE_LEN} characters")]
    TooLong,
}

/// Validate a message body, returning the trimmed text.
pub fn validate_body(body: &str) -> Result<String, MessageValidationError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(MessageValidationError::Empty);
    }
    if trimmed.chars().count() > MAX_MESSAGE_LEN {
        return Err(MessageValidationError::TooLong);
    }
    Ok(trimmed.to_owned())
}

/// Driving port for course chat.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Post a message to a course the actor participates in.
    async fn post(&self, actor: Actor, course: CourseId, body: &str)
        -> Result<ChatMessage, Error>;

    /// Page through a course's messages, oldest first.
    async fn list(
        &self,
        actor: Actor,
        course: CourseId,
        page: PageRequest,
    ) -> Result<Page<ChatMessage>, Error>;
}

/// Chat service over persistence ports.
#[derive(Clone)]
pub struct ChatService<R, C, E> {
    messages: Arc<R>,
    catalogue: Arc<C>,
    enrollments: Arc<E>,
}

impl<R, C, E> ChatService<R, C, E> {
    /// Create a new service.
    pub fn new(messages: Arc<R>, catalogue: Arc<C>, enrollments: Arc<E>) -> Self {
        Self {
            messages,
            catalogue,
            enrollments,
        }
    }
}

impl<R, C, E> ChatService<R, C, E>
where
    R: ChatRepository,
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
impl<R, C, E> ChatApi for ChatService<R, C, E>
where
    R: ChatRepository,
    C: CatalogueRepository,
    E: EnrollmentRepository,
{
    async fn post(
        &self,
        actor: Actor,
        course: CourseId,
        body: &str,
    ) -> Result<ChatMessage, Error> {
        self.require_participant(actor, course).await?;
        let body = validate_body(body).map_err(|e| Error::invalid_request(e.to_string()))?;

        let message = ChatMessage {
            id: MessageId::new(),
            course_id: course,
            author_id: actor.id,
            body,
            sent_at: Utc::now(),
        };
        self.messages
            .insert(&message)
            .await
            .map_err(map_repository_error)?;
        Ok(message)
    }

    async fn list(
        &self,
        actor: Actor,
        course: CourseId,
        page: PageRequest,
    ) -> Result<Page<ChatMessage>, Error> {
        self.require_participant(actor, course).await?;
        self.messages
            .list_for_course(course, &page)
            .await
            .map_err(map_repository_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::domain::catalogue::Course;
    use crate::domain::enrollment::Enrollment;
    use crate::domain::ErrorCode;
    use crate::testing::{InMemoryCatalogue, InMemoryChat, InMemoryEnrollments};
    use rstest::rstest;
    use rust_decimal::Decimal;

    #[rstest]
    fn body_is_trimmed() {
        assert_eq!(validate_body("  hello \n").expect("valid"), "hello");
    }

    #[rstest]
    fn blank_body_is_rejected() {
        assert_eq!(validate_body(" \n "), Err(MessageValidationError::Empty));
    }

    #[rstest]
    fn oversized_body_is_rejected() {
        let body = "x".repeat(MAX_MESSAGE_LEN + 1);
        assert_eq!(validate_body(&body), Err(MessageValidationError::TooLong));
    }

    struct Fixture {
        service: ChatService<InMemoryChat, InMemoryCatalogue, InMemoryEnrollments>,
        student: Actor,
        course: CourseId,
    }

    async fn fixture() -> Fixture {
        let catalogue = Arc::new(InMemoryCatalogue::default());
        let enrollments = Arc::new(InMemoryEnrollments::new(catalogue.clone()));
        let messages = Arc::new(InMemoryChat::default());

        let student = Actor {
            id: UserId::new(),
            role: Role::Student,
        };
        let course = CourseId::new();
        catalogue
            .insert_course(&Course {
                id: course,
                title: "Chatty".to_owned(),
                description: String::new(),
                price: Decimal::ZERO,
                instructor_id: UserId::new(),
                published: true,
                created_at: Utc::now(),
            })
            .await
            .expect("course");
        enrollments
            .insert_if_absent(&Enrollment::new(student.id, course))
            .await
            .expect("enroll");

        Fixture {
            service: ChatService::new(messages, catalogue, enrollments),
            student,
            course,
        }
    }

    #[tokio::test]
    async fn participants_post_and_list_in_order() {
        let fixture = fixture().await;
        fixture
            .service
            .post(fixture.student, fixture.course, "first")
            .await
            .expect("post");
        fixture
            .service
            .post(fixture.student, fixture.course, "second")
            .await
            .expect("post");

        let page = fixture
            .service
            .list(fixture.student, fixture.course, PageRequest::default())
            .await
            .expect("list");
        let bodies: Vec<&str> = page.items.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn outsiders_cannot_post() {
        let fixture = fixture().await;
        let outsider = Actor {
            id: UserId::new(),
            role: Role::Student,
        };
        let err = fixture
            .service
            .post(outsider, fixture.course, "hi")
            .await
            .expect_err("barred");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }
}
