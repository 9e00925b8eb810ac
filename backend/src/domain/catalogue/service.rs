//! Catalogue domain service: course, module and lesson management.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use pagination::{Page, PageRequest};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::domain::ids::{CourseId, LessonId, ModuleId};
use crate::domain::ports::{CatalogueRepository, CourseOutline, map_repository_error};
use crate::domain::user::Actor;
use crate::domain::{Error, Role};

use super::course::{self, Course, CourseUpdate};
use super::course_module::CourseModule;
use super::lesson::Lesson;

/// Request to create a course.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewCourseRequest {
    /// Course title.
    pub title: String,
    /// Course description; may be empty.
    #[serde(default)]
    pub description: String,
    /// Price; zero makes the course free.
    #[schema(value_type = String, example = "49.90")]
    pub price: Decimal,
}

/// Request to add a module to a course.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewModuleRequest {
    /// Module heading.
    pub title: String,
    /// Position within the course.
    pub position: i32,
}

/// Request to add a lesson to a module.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewLessonRequest {
    /// Lesson heading.
    pub title: String,
    /// Position within the module.
    pub position: i32,
    /// Expected viewing time in minutes.
    pub duration_minutes: i32,
}

/// Driving port for catalogue operations.
#[async_trait]
pub trait CatalogueApi: Send + Sync {
    /// Create a course owned by the acting instructor.
    async fn create_course(&self, actor: Actor, request: NewCourseRequest)
        -> Result<Course, Error>;

    /// Apply a partial update to a course the actor manages.
    async fn update_course(
        &self,
        actor: Actor,
        course: CourseId,
        update: CourseUpdate,
    ) -> Result<Course, Error>;

    /// Full course tree. Unpublished courses are visible to their
    /// managers only.
    async fn course_detail(&self, actor: Option<Actor>, course: CourseId)
        -> Result<CourseOutline, Error>;

    /// Page through the published catalogue.
    async fn list_published(&self, page: PageRequest) -> Result<Page<Course>, Error>;

    /// Courses owned by the acting instructor.
    async fn my_courses(&self, actor: Actor) -> Result<Vec<Course>, Error>;

    /// Add a module to a course the actor manages.
    async fn add_module(
        &self,
        actor: Actor,
        course: CourseId,
        request: NewModuleRequest,
    ) -> Result<CourseModule, Error>;

    /// Add a lesson to a module of a course the actor manages.
    async fn add_lesson(
        &self,
        actor: Actor,
        module: ModuleId,
        request: NewLessonRequest,
    ) -> Result<Lesson, Error>;
}

/// Catalogue service over a persistence port.
#[derive(Clone)]
pub struct CatalogueService<R> {
    repo: Arc<R>,
}

impl<R> CatalogueService<R> {
    /// Create a new service with the given repository.
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }
}

impl<R> CatalogueService<R>
where
    R: CatalogueRepository,
{
    async fn managed_course(&self, actor: Actor, course: CourseId) -> Result<Course, Error> {
        let found = self
            .repo
            .find_course(course)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("course not found"))?;
        if !actor.can_manage(found.instructor_id) {
            return Err(Error::forbidden("course belongs to another instructor"));
        }
        Ok(found)
    }

    fn require_author(actor: Actor) -> Result<(), Error> {
        match actor.role {
            Role::Instructor | Role::Admin => Ok(()),
            Role::Student => Err(Error::forbidden("instructor role required")),
        }
    }
}

#[async_trait]
impl<R> CatalogueApi for CatalogueService<R>
where
    R: CatalogueRepository,
{
    async fn create_course(
        &self,
        actor: Actor,
        request: NewCourseRequest,
    ) -> Result<Course, Error> {
        Self::require_author(actor)?;
        let title = course::validate_title(&request.title)
            .map_err(|e| Error::invalid_request(e.to_string()))?;
        let price = course::validate_price(request.price)
            .map_err(|e| Error::invalid_request(e.to_string()))?;

        let new_course = Course {
            id: CourseId::new(),
            title,
            description: request.description.trim().to_owned(),
            price,
            instructor_id: actor.id,
            published: false,
            created_at: Utc::now(),
        };
        self.repo
            .insert_course(&new_course)
            .await
            .map_err(map_repository_error)?;
        Ok(new_course)
    }

    async fn update_course(
        &self,
        actor: Actor,
        course: CourseId,
        update: CourseUpdate,
    ) -> Result<Course, Error> {
        self.managed_course(actor, course).await?;

        let mut update = update;
        if let Some(title) = update.title.take() {
            update.title = Some(
                course::validate_title(&title).map_err(|e| Error::invalid_request(e.to_string()))?,
            );
        }
        if let Some(price) = update.price {
            course::validate_price(price).map_err(|e| Error::invalid_request(e.to_string()))?;
        }

        self.repo
            .update_course(course, &update)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("course not found"))
    }

    async fn course_detail(
        &self,
        actor: Option<Actor>,
        course: CourseId,
    ) -> Result<CourseOutline, Error> {
        let outline = self
            .repo
            .outline(course)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("course not found"))?;

        if !outline.course.published {
            let manages = actor
                .map(|a| a.can_manage(outline.course.instructor_id))
                .unwrap_or(false);
            if !manages {
                return Err(Error::not_found("course not found"));
            }
        }
        Ok(outline)
    }

    async fn list_published(&self, page: PageRequest) -> Result<Page<Course>, Error> {
        self.repo
            .list_published(&page)
            .await
            .map_err(map_repository_error)
    }

    async fn my_courses(&self, actor: Actor) -> Result<Vec<Course>, Error> {
        Self::require_author(actor)?;
        self.repo
            .list_by_instructor(actor.id)
            .await
            .map_err(map_repository_error)
    }

    async fn add_module(
        &self,
        actor: Actor,
        course: CourseId,
        request: NewModuleRequest,
    ) -> Result<CourseModule, Error> {
        self.managed_course(actor, course).await?;
        let title = course::validate_title(&request.title)
            .map_err(|e| Error::invalid_request(e.to_string()))?;

        let module = CourseModule {
            id: ModuleId::new(),
            course_id: course,
            title,
            position: request.position,
        };
        self.repo
            .insert_module(&module)
            .await
            .map_err(map_repository_error)?;
        Ok(module)
    }

    async fn add_lesson(
        &self,
        actor: Actor,
        module: ModuleId,
        request: NewLessonRequest,
    ) -> Result<Lesson, Error> {
        let course = self
            .repo
            .course_of_module(module)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("module not found"))?;
        self.managed_course(actor, course).await?;

        let title = course::validate_title(&request.title)
            .map_err(|e| Error::invalid_request(e.to_string()))?;
        if request.duration_minutes < 0 {
            return Err(Error::invalid_request("lesson duration must not be negative"));
        }

        let lesson = Lesson {
            id: LessonId::new(),
            module_id: module,
            title,
            position: request.position,
            duration_minutes: request.duration_minutes,
        };
        self.repo
            .insert_lesson(&lesson)
            .await
            .map_err(map_repository_error)?;
        Ok(lesson)
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod service_tests;
