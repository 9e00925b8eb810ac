//! PostgreSQL-backed `ChatRepository` implementation.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use pagination::{Page, PageRequest};

use crate::domain::chat::ChatMessage;
use crate::domain::ids::{CourseId, MessageId, UserId};
use crate::domain::ports::{ChatRepository, RepositoryError};
use crate::query_page;

use super::diesel_helpers::{map_diesel_error, map_pool_error};
use super::models::{ChatMessageRow, NewChatMessageRow};
use super::pool::DbPool;
use super::schema::chat_messages;

/// Diesel-backed implementation of the `ChatRepository` port.
#[derive(Clone)]
pub struct DieselChatRepository {
    pool: DbPool,
}

impl DieselChatRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_message(row: ChatMessageRow) -> Result<ChatMessage, RepositoryError> {
    Ok(ChatMessage {
        id: MessageId::from_uuid(row.id),
        course_id: CourseId::from_uuid(row.course_id),
        author_id: UserId::from_uuid(row.author_id),
        body: row.body,
        sent_at: row.sent_at,
    })
}

#[async_trait]
impl ChatRepository for DieselChatRepository {
    async fn insert(&self, message: &ChatMessage) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(chat_messages::table)
            .values(&NewChatMessageRow {
                id: message.id.into_uuid(),
                course_id: message.course_id.into_uuid(),
                author_id: message.author_id.into_uuid(),
                body: &message.body,
                sent_at: message.sent_at,
            })
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn list_for_course(
        &self,
        course: CourseId,
        page: &PageRequest,
    ) -> Result<Page<ChatMessage>, RepositoryError> {
        query_page!(
            self,
            page,
            chat_messages::table,
            chat_messages::course_id.eq(course.into_uuid()),
            chat_messages::sent_at.asc(),
            ChatMessageRow,
            row_to_message
        )
    }
}
