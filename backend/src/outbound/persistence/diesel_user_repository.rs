//! PostgreSQL-backed `UserRepository` implementation.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use pagination::{Page, PageRequest};

use crate::domain::ids::UserId;
use crate::domain::ports::{RepositoryError, UserRepository};
use crate::domain::user::{Role, User};
use crate::{query_optional, query_page};

use super::diesel_helpers::{map_diesel_error, map_pool_error};
use super::models::{NewUserRow, UserRow};
use super::pool::DbPool;
use super::schema::users;

/// Diesel-backed implementation of the `UserRepository` port.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: UserRow) -> Result<User, RepositoryError> {
    let role = Role::parse(&row.role)
        .ok_or_else(|| RepositoryError::query(format!("unknown role in storage: {}", row.role)))?;
    Ok(User {
        id: UserId::from_uuid(row.id),
        display_name: row.display_name,
        email: row.email,
        role,
        created_at: row.created_at,
    })
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn insert(&self, user: &User, password_hash: &str) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(users::table)
            .values(&NewUserRow {
                id: user.id.into_uuid(),
                display_name: &user.display_name,
                email: &user.email,
                role: user.role.as_str(),
                password_hash,
                created_at: user.created_at,
            })
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        query_optional!(
            self,
            users::table,
            users::id.eq(id.into_uuid()),
            UserRow,
            row_to_user
        )
    }

    async fn credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<UserRow> = users::table
            .filter(users::email.eq(email))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(|row| {
            let hash = row.password_hash.clone();
            row_to_user(row).map(|user| (user, hash))
        })
        .transpose()
    }

    async fn update_display_name(&self, id: UserId, name: &str) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let updated = diesel::update(users::table.filter(users::id.eq(id.into_uuid())))
            .set(users::display_name.eq(name))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(updated > 0)
    }

    async fn list(&self, page: &PageRequest) -> Result<Page<User>, RepositoryError> {
        query_page!(
            self,
            page,
            users::table,
            users::id.is_not_null(),
            users::created_at.desc(),
            UserRow,
            row_to_user
        )
    }
}
