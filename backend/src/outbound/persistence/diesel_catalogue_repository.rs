//! PostgreSQL-backed `CatalogueRepository` implementation.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::AsyncConnection;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use pagination::{Page, PageRequest};

use crate::domain::catalogue::{Course, CourseModule, CourseUpdate, Lesson};
use crate::domain::ids::{CourseId, LessonId, ModuleId, UserId};
use crate::domain::ports::{CatalogueRepository, CourseOutline, ModuleOutline, RepositoryError};
use crate::{query_page, query_vec};

use super::diesel_helpers::{map_diesel_error, map_pool_error};
use super::models::{
    CourseChangeset, CourseRow, LessonRow, ModuleRow, NewCourseRow, NewLessonRow, NewModuleRow,
};
use super::pool::DbPool;
use super::schema::{course_modules, courses, lessons};

/// Diesel-backed implementation of the `CatalogueRepository` port.
#[derive(Clone)]
pub struct DieselCatalogueRepository {
    pool: DbPool,
}

impl DieselCatalogueRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_course(row: CourseRow) -> Result<Course, RepositoryError> {
    Ok(Course {
        id: CourseId::from_uuid(row.id),
        title: row.title,
        description: row.description,
        price: row.price,
        instructor_id: UserId::from_uuid(row.instructor_id),
        published: row.published,
        created_at: row.created_at,
    })
}

fn row_to_module(row: ModuleRow) -> Result<CourseModule, RepositoryError> {
    Ok(CourseModule {
        id: ModuleId::from_uuid(row.id),
        course_id: CourseId::from_uuid(row.course_id),
        title: row.title,
        position: row.position,
    })
}

fn row_to_lesson(row: LessonRow) -> Result<Lesson, RepositoryError> {
    Ok(Lesson {
        id: LessonId::from_uuid(row.id),
        module_id: ModuleId::from_uuid(row.module_id),
        title: row.title,
        position: row.position,
        duration_minutes: row.duration_minutes,
    })
}

#[async_trait]
impl CatalogueRepository for DieselCatalogueRepository {
    async fn insert_course(&self, course: &Course) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(courses::table)
            .values(&NewCourseRow {
                id: course.id.into_uuid(),
                title: &course.title,
                description: &course.description,
                price: course.price,
                instructor_id: course.instructor_id.into_uuid(),
                published: course.published,
                created_at: course.created_at,
            })
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn update_course(
        &self,
        id: CourseId,
        update: &CourseUpdate,
    ) -> Result<Option<Course>, RepositoryError> {
        // Diesel rejects an empty changeset; a field-less patch is a read.
        if update.title.is_none()
            && update.description.is_none()
            && update.price.is_none()
            && update.published.is_none()
        {
            return self.find_course(id).await;
        }

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let changeset = CourseChangeset {
            title: update.title.as_deref(),
            description: update.description.as_deref(),
            price: update.price,
            published: update.published,
        };

        let row: Option<CourseRow> =
            diesel::update(courses::table.filter(courses::id.eq(id.into_uuid())))
                .set(&changeset)
                .returning(CourseRow::as_returning())
                .get_result(&mut conn)
                .await
                .optional()
                .map_err(map_diesel_error)?;
        row.map(row_to_course).transpose()
    }

    async fn find_course(&self, id: CourseId) -> Result<Option<Course>, RepositoryError> {
        crate::query_optional!(
            self,
            courses::table,
            courses::id.eq(id.into_uuid()),
            CourseRow,
            row_to_course
        )
    }

    async fn list_published(&self, page: &PageRequest) -> Result<Page<Course>, RepositoryError> {
        query_page!(
            self,
            page,
            courses::table,
            courses::published.eq(true),
            courses::created_at.desc(),
            CourseRow,
            row_to_course
        )
    }

    async fn list_by_instructor(
        &self,
        instructor: UserId,
    ) -> Result<Vec<Course>, RepositoryError> {
        query_vec!(
            self,
            courses::table,
            courses::instructor_id.eq(instructor.into_uuid()),
            courses::created_at.desc(),
            CourseRow,
            row_to_course
        )
    }

    async fn insert_module(&self, module: &CourseModule) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(course_modules::table)
            .values(&NewModuleRow {
                id: module.id.into_uuid(),
                course_id: module.course_id.into_uuid(),
                title: &module.title,
                position: module.position,
            })
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn insert_lesson(&self, lesson: &Lesson) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(lessons::table)
            .values(&NewLessonRow {
                id: lesson.id.into_uuid(),
                module_id: lesson.module_id.into_uuid(),
                title: &lesson.title,
                position: lesson.position,
                duration_minutes: lesson.duration_minutes,
            })
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn outline(&self, id: CourseId) -> Result<Option<CourseOutline>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        // One transaction so the three reads observe a consistent MVCC
        // snapshot while an instructor is editing.
        let rows: Option<(CourseRow, Vec<ModuleRow>, Vec<LessonRow>)> = conn
            .transaction(|conn| {
                async move {
                    let course: Option<CourseRow> = courses::table
                        .filter(courses::id.eq(id.into_uuid()))
                        .select(CourseRow::as_select())
                        .first(conn)
                        .await
                        .optional()?;
                    let Some(course) = course else {
                        return Ok(None);
                    };
                    let modules: Vec<ModuleRow> = course_modules::table
                        .filter(course_modules::course_id.eq(id.into_uuid()))
                        .select(ModuleRow::as_select())
                        .order_by(course_modules::position.asc())
                        .load(conn)
                        .await?;
                    let lessons: Vec<LessonRow> = lessons::table
                        .inner_join(course_modules::table)
                        .filter(course_modules::course_id.eq(id.into_uuid()))
                        .select(LessonRow::as_select())
                        .order_by((course_modules::position.asc(), lessons::position.asc()))
                        .load(conn)
                        .await?;
                    Ok(Some((course, modules, lessons)))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        let Some((course_row, module_rows, lesson_rows)) = rows else {
            return Ok(None);
        };

        let course = row_to_course(course_row)?;
        let lessons = lesson_rows
            .into_iter()
            .map(row_to_lesson)
            .collect::<Result<Vec<_>, _>>()?;
        let modules = module_rows
            .into_iter()
            .map(row_to_module)
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|module| {
                let module_lessons = lessons
                    .iter()
                    .filter(|l| l.module_id == module.id)
                    .cloned()
                    .collect();
                ModuleOutline {
                    module,
                    lessons: module_lessons,
                }
            })
            .collect();

        Ok(Some(CourseOutline { course, modules }))
    }

    async fn course_of_lesson(
        &self,
        lesson: LessonId,
    ) -> Result<Option<CourseId>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let course_id: Option<uuid::Uuid> = lessons::table
            .inner_join(course_modules::table)
            .filter(lessons::id.eq(lesson.into_uuid()))
            .select(course_modules::course_id)
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(course_id.map(CourseId::from_uuid))
    }

    async fn course_of_module(
        &self,
        module: ModuleId,
    ) -> Result<Option<CourseId>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let course_id: Option<uuid::Uuid> = course_modules::table
            .filter(course_modules::id.eq(module.into_uuid()))
            .select(course_modules::course_id)
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(course_id.map(CourseId::from_uuid))
    }
}
