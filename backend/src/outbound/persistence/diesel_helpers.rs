//! Shared helpers and macros for Diesel repository implementations.

use tracing::debug;

use crate::domain::ports::RepositoryError;

use super::pool::PoolError;

diesel::define_sql_function! {
    /// PostgreSQL `upper(text)`, used for case-insensitive code lookups.
    fn upper(value: diesel::sql_types::Text) -> diesel::sql_types::Text
}

/// Map pool errors to repository errors.
pub fn map_pool_error(error: PoolError) -> RepositoryError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            RepositoryError::connection(message)
        }
    }
}

/// Map Diesel errors to repository errors, logging the detail.
pub fn map_diesel_error(error: diesel::result::Error) -> RepositoryError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        other => debug!(error = %other, "diesel operation failed"),
    }

    match error {
        DieselError::NotFound => RepositoryError::query("record not found"),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            RepositoryError::connection("database connection closed")
        }
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            RepositoryError::query(format!("unique violation: {}", info.message()))
        }
        _ => RepositoryError::query("database error"),
    }
}

/// Macro for query methods that return `Option<T>`.
///
/// Acquires a connection, runs the filtered select, maps errors, converts
/// the row through `$converter` (which may itself be fallible when written
/// as a closure returning `Result`).
#[macro_export]
macro_rules! query_optional {
    (
        $self:ident,
        $table:expr,
        $filter:expr,
        $row_type:ty,
        $converter:expr
    ) => {{
        use diesel::prelude::*;
        use diesel_async::RunQueryDsl;
        use $crate::outbound::persistence::diesel_helpers::map_diesel_error;
        use $crate::outbound::persistence::diesel_helpers::map_pool_error;

        let mut conn = $self.pool.get().await.map_err(map_pool_error)?;

        let result: Option<$row_type> = $table
            .filter($filter)
            .select(<$row_type>::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        match result {
            Some(row) => Ok(Some(($converter)(row)?)),
            None => Ok(None),
        }
    }};
}

/// Macro for query methods that return `Vec<T>`.
#[macro_export]
macro_rules! query_vec {
    (
        $self:ident,
        $table:expr,
        $filter:expr,
        $order_by:expr,
        $row_type:ty,
        $converter:expr
    ) => {{
        use diesel::prelude::*;
        use diesel_async::RunQueryDsl;
        use $crate::outbound::persistence::diesel_helpers::map_diesel_error;
        use $crate::outbound::persistence::diesel_helpers::map_pool_error;

        let mut conn = $self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<$row_type> = $table
            .filter($filter)
            .select(<$row_type>::as_select())
            .order_by($order_by)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows.into_iter().map($converter).collect()
    }};
}

/// Macro for offset-cursor pagination over a filtered, ordered select.
///
/// The cursor payload is the `i64` offset of the next page. Opaque to
/// clients; see the `pagination` crate.
#[macro_export]
macro_rules! query_page {
    (
        $self:ident,
        $page:expr,
        $table:expr,
        $filter:expr,
        $order_by:expr,
        $row_type:ty,
        $converter:expr
    ) => {{
        use diesel::prelude::*;
        use diesel_async::RunQueryDsl;
        use $crate::outbound::persistence::diesel_helpers::map_diesel_error;
        use $crate::outbound::persistence::diesel_helpers::map_pool_error;

        let offset: i64 = match $page.cursor() {
            Some(cursor) => cursor
                .decode()
                .map_err(|e| $crate::domain::ports::RepositoryError::query(e.to_string()))?,
            None => 0,
        };
        let limit = i64::from($page.limit());

        let mut conn = $self.pool.get().await.map_err(map_pool_error)?;

        // Fetch one extra row to learn whether a next page exists.
        let rows: Vec<$row_type> = $table
            .filter($filter)
            .select(<$row_type>::as_select())
            .order_by($order_by)
            .offset(offset)
            .limit(limit + 1)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let has_more = rows.len() as i64 > limit;
        let items: Vec<_> = rows
            .into_iter()
            .take(limit as usize)
            .map($converter)
            .collect::<Result<_, _>>()?;

        if has_more {
            let cursor = pagination::Cursor::encode(&(offset + limit))
                .map_err(|e| $crate::domain::ports::RepositoryError::query(e.to_string()))?;
            Ok(pagination::Page::with_next(items, cursor))
        } else {
            Ok(pagination::Page::last(items))
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn pool_errors_become_connection_errors() {
        let mapped = map_pool_error(PoolError::checkout("refused"));
        assert!(matches!(mapped, RepositoryError::Connection { .. }));
        assert!(mapped.to_string().contains("refused"));
    }

    #[rstest]
    fn not_found_becomes_query_error() {
        let mapped = map_diesel_error(diesel::result::Error::NotFound);
        assert!(matches!(mapped, RepositoryError::Query { .. }));
        assert!(mapped.to_string().contains("record not found"));
    }
}
