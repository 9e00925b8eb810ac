//! PostgreSQL-backed `PaymentRepository` implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use pagination::{Page, PageRequest};

use crate::domain::ids::{CourseId, PaymentId, UserId};
use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::ports::{PaymentRepository, RepositoryError};
use crate::{query_optional, query_page};

use super::diesel_helpers::{map_diesel_error, map_pool_error};
use super::models::{NewPaymentRow, PaymentRow};
use super::pool::DbPool;
use super::schema::payments;

/// Diesel-backed implementation of the `PaymentRepository` port.
#[derive(Clone)]
pub struct DieselPaymentRepository {
    pool: DbPool,
}

impl DieselPaymentRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_payment(row: PaymentRow) -> Result<Payment, RepositoryError> {
    Ok(Payment {
        id: PaymentId::from_uuid(row.id),
        user_id: UserId::from_uuid(row.user_id),
        course_id: CourseId::from_uuid(row.course_id),
        amount: row.amount,
        // parse() folds unknown vocabulary into Pending rather than
        // failing a read on historic rows.
        status: PaymentStatus::parse(&row.status),
        processor_payment_id: row.processor_payment_id,
        external_reference: row.external_reference,
        method_detail: row.method_detail,
        approved_at: row.approved_at,
        created_at: row.created_at,
    })
}

#[async_trait]
impl PaymentRepository for DieselPaymentRepository {
    async fn insert(&self, payment: &Payment) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(payments::table)
            .values(&NewPaymentRow {
                id: payment.id.into_uuid(),
                user_id: payment.user_id.into_uuid(),
                course_id: payment.course_id.into_uuid(),
                amount: payment.amount,
                status: payment.status.as_str(),
                processor_payment_id: payment.processor_payment_id.as_deref(),
                external_reference: &payment.external_reference,
                method_detail: payment.method_detail.as_deref(),
                approved_at: payment.approved_at,
                created_at: payment.created_at,
            })
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find_by_processor_id(&self, id: &str) -> Result<Option<Payment>, RepositoryError> {
        query_optional!(
            self,
            payments::table,
            payments::processor_payment_id.eq(id),
            PaymentRow,
            row_to_payment
        )
    }

    async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        // Oldest pending row first: that is the checkout this notification
        // belongs to.
        let row: Option<PaymentRow> = payments::table
            .filter(
                payments::external_reference
                    .eq(reference)
                    .and(payments::status.eq(PaymentStatus::Pending.as_str())),
            )
            .order_by(payments::created_at.asc())
            .select(PaymentRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_payment).transpose()
    }

    async fn apply_status(
        &self,
        id: PaymentId,
        status: PaymentStatus,
        processor_id: Option<&str>,
        method_detail: Option<&str>,
        approved_at: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        // Optional fields only overwrite when the report carried them.
        diesel::update(payments::table.filter(payments::id.eq(id.into_uuid())))
            .set((
                payments::status.eq(status.as_str()),
                processor_id.map(|p| payments::processor_payment_id.eq(p)),
                method_detail.map(|m| payments::method_detail.eq(m)),
                approved_at.map(|a| payments::approved_at.eq(a)),
            ))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn list(&self, page: &PageRequest) -> Result<Page<Payment>, RepositoryError> {
        query_page!(
            self,
            page,
            payments::table,
            payments::id.is_not_null(),
            payments::created_at.desc(),
            PaymentRow,
            row_to_payment
        )
    }
}
