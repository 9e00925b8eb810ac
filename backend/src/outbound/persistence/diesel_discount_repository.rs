//! PostgreSQL-backed `DiscountRepository` implementation.
//!
//! Redemption runs in one transaction: the usage insert hits the unique
//! (code, user) index and the counter bump is a guarded compare-and-swap
//! against `max_uses`. Concurrent redemptions at the cap lose cleanly —
//! the historic overshoot is impossible here.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::AsyncConnection;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use pagination::{Page, PageRequest};

use crate::domain::discount::{DiscountCode, DiscountKind};
use crate::domain::ids::{CourseId, DiscountCodeId, PaymentId, UserId};
use crate::domain::ports::{DiscountRepository, RedeemOutcome, RepositoryError};
use crate::{query_optional, query_page};

use super::diesel_helpers::{map_diesel_error, map_pool_error, upper};
use super::models::{DiscountCodeRow, NewDiscountCodeRow, NewDiscountUsageRow};
use super::pool::DbPool;
use super::schema::{discount_codes, discount_usages};

/// Diesel-backed implementation of the `DiscountRepository` port.
#[derive(Clone)]
pub struct DieselDiscountRepository {
    pool: DbPool,
}

impl DieselDiscountRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_discount(row: DiscountCodeRow) -> Result<DiscountCode, RepositoryError> {
    Ok(DiscountCode {
        id: DiscountCodeId::from_uuid(row.id),
        code: row.code,
        kind: DiscountKind::parse(&row.kind),
        value: row.value,
        max_uses: row.max_uses,
        current_uses: row.current_uses,
        valid_from: row.valid_from,
        valid_until: row.valid_until,
        course_id: row.course_id.map(CourseId::from_uuid),
        active: row.active,
    })
}

#[async_trait]
impl DiscountRepository for DieselDiscountRepository {
    async fn insert(&self, code: &DiscountCode) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(discount_codes::table)
            .values(&NewDiscountCodeRow {
                id: code.id.into_uuid(),
                code: &code.code,
                kind: code.kind.as_str(),
                value: code.value,
                max_uses: code.max_uses,
                current_uses: code.current_uses,
                valid_from: code.valid_from,
                valid_until: code.valid_until,
                course_id: code.course_id.map(CourseId::into_uuid),
                active: code.active,
            })
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<DiscountCode>, RepositoryError> {
        let needle = code.trim().to_uppercase();
        query_optional!(
            self,
            discount_codes::table,
            upper(discount_codes::code).eq(needle),
            DiscountCodeRow,
            row_to_discount
        )
    }

    async fn has_usage(
        &self,
        code: DiscountCodeId,
        user: UserId,
    ) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let count: i64 = discount_usages::table
            .filter(
                discount_usages::discount_code_id
                    .eq(code.into_uuid())
                    .and(discount_usages::user_id.eq(user.into_uuid())),
            )
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(count > 0)
    }

    async fn redeem(
        &self,
        code: DiscountCodeId,
        user: UserId,
        payment: Option<PaymentId>,
    ) -> Result<RedeemOutcome, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let result = conn
            .transaction(|conn| {
                async move {
                    let inserted = diesel::insert_into(discount_usages::table)
                        .values(&NewDiscountUsageRow {
                            discount_code_id: code.into_uuid(),
                            user_id: user.into_uuid(),
                            payment_id: payment.map(PaymentId::into_uuid),
                            used_at: Utc::now(),
                        })
                        .on_conflict((
                            discount_usages::discount_code_id,
                            discount_usages::user_id,
                        ))
                        .do_nothing()
                        .execute(conn)
                        .await?;
                    if inserted == 0 {
                        return Ok(RedeemOutcome::AlreadyUsed);
                    }

                    let bumped = diesel::update(
                        discount_codes::table.filter(
                            discount_codes::id
                                .eq(code.into_uuid())
                                .and(discount_codes::current_uses.lt(discount_codes::max_uses)),
                        ),
                    )
                    .set(discount_codes::current_uses.eq(discount_codes::current_uses + 1))
                    .execute(conn)
                    .await?;
                    if bumped == 0 {
                        // Roll the usage row back; the cap is exhausted.
                        return Err(diesel::result::Error::RollbackTransaction);
                    }
                    Ok(RedeemOutcome::Applied)
                }
                .scope_boxed()
            })
            .await;

        match result {
            Ok(outcome) => Ok(outcome),
            Err(diesel::result::Error::RollbackTransaction) => Ok(RedeemOutcome::CapReached),
            Err(error) => Err(map_diesel_error(error)),
        }
    }

    async fn set_active(
        &self,
        code: DiscountCodeId,
        active: bool,
    ) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let updated =
            diesel::update(discount_codes::table.filter(discount_codes::id.eq(code.into_uuid())))
                .set(discount_codes::active.eq(active))
                .execute(&mut conn)
                .await
                .map_err(map_diesel_error)?;
        Ok(updated > 0)
    }

    async fn list(&self, page: &PageRequest) -> Result<Page<DiscountCode>, RepositoryError> {
        query_page!(
            self,
            page,
            discount_codes::table,
            discount_codes::id.is_not_null(),
            discount_codes::valid_from.desc(),
            DiscountCodeRow,
            row_to_discount
        )
    }
}
