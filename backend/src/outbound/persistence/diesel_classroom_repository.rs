//! PostgreSQL-backed `ClassroomRepository` implementation.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::classroom::LiveClassSession;
use crate::domain::ids::{CourseId, LiveSessionId, UserId};
use crate::domain::ports::{ClassroomRepository, RepositoryError};
use crate::{query_optional, query_vec};

use super::diesel_helpers::{map_diesel_error, map_pool_error};
use super::models::{LiveSessionRow, NewLiveSessionRow};
use super::pool::DbPool;
use super::schema::live_class_sessions;

/// Diesel-backed implementation of the `ClassroomRepository` port.
#[derive(Clone)]
pub struct DieselClassroomRepository {
    pool: DbPool,
}

impl DieselClassroomRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_session(row: LiveSessionRow) -> Result<LiveClassSession, RepositoryError> {
    Ok(LiveClassSession {
        id: LiveSessionId::from_uuid(row.id),
        course_id: CourseId::from_uuid(row.course_id),
        topic: row.topic,
        starts_at: row.starts_at,
        duration_minutes: row.duration_minutes,
        join_url: row.join_url,
        host_id: UserId::from_uuid(row.host_id),
        cancelled: row.cancelled,
    })
}

#[async_trait]
impl ClassroomRepository for DieselClassroomRepository {
    async fn insert(&self, session: &LiveClassSession) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(live_class_sessions::table)
            .values(&NewLiveSessionRow {
                id: session.id.into_uuid(),
                course_id: session.course_id.into_uuid(),
                topic: &session.topic,
                starts_at: session.starts_at,
                duration_minutes: session.duration_minutes,
                join_url: &session.join_url,
                host_id: session.host_id.into_uuid(),
                cancelled: session.cancelled,
            })
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find(
        &self,
        id: LiveSessionId,
    ) -> Result<Option<LiveClassSession>, RepositoryError> {
        query_optional!(
            self,
            live_class_sessions::table,
            live_class_sessions::id.eq(id.into_uuid()),
            LiveSessionRow,
            row_to_session
        )
    }

    async fn set_cancelled(&self, id: LiveSessionId) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let updated = diesel::update(
            live_class_sessions::table.filter(live_class_sessions::id.eq(id.into_uuid())),
        )
        .set(live_class_sessions::cancelled.eq(true))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(updated > 0)
    }

    async fn list_for_course(
        &self,
        course: CourseId,
    ) -> Result<Vec<LiveClassSession>, RepositoryError> {
        query_vec!(
            self,
            live_class_sessions::table,
            live_class_sessions::course_id.eq(course.into_uuid()),
            live_class_sessions::starts_at.asc(),
            LiveSessionRow,
            row_to_session
        )
    }
}
