//! Billing domain service: discount validation, checkout, reconciliation.
//!
//! The webhook path never trusts the notification body: the authoritative
//! status is re-read from the processor, identities are recovered from the
//! tagged external reference, and status writes go through the guarded
//! transition table so out-of-order notifications cannot regress a
//! terminal payment.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagination::{Page, PageRequest};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::domain::Error;
use crate::domain::enrollment::Enrollment;
use crate::domain::ids::{CourseId, DiscountCodeId, PaymentId, UserId};
use crate::domain::ports::{
    CatalogueRepository, CoursePaymentOrder, DiscountRepository, EnrollmentRepository,
    PaymentGateway, PaymentRepository, RedeemOutcome, UserRepository, map_gateway_error,
    map_repository_error,
};
use crate::domain::user::Actor;

use super::discount::{DiscountCode, DiscountKind, DiscountVerdict, RejectionReason};
use super::payment::{Payment, PaymentStatus};
use super::reference::PaymentReference;

/// Inbound webhook notification, reduced to the one field that matters.
///
/// Everything else in the processor's payload is advisory; the handler
/// re-fetches the authoritative state.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookNotification {
    /// Processor-assigned payment identifier.
    pub processor_payment_id: String,
}

/// Result of a checkout call.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase", tag = "outcome", rename_all_fields = "camelCase")]
pub enum CheckoutOutcome {
    /// The course was free (or fully discounted); enrollment is done.
    Enrolled {
        /// The created or pre-existing enrollment.
        enrollment: Enrollment,
    },
    /// The processor must collect a payment first.
    PaymentRequired {
        /// The pending payment record.
        payment: Payment,
        /// Where to send the payer.
        redirect_url: String,
    },
}

/// Result of reconciling one webhook notification.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOutcome {
    /// The payment after reconciliation.
    pub payment: Payment,
    /// Whether the fetched status was applied (false on replays and
    /// ignored regressions).
    pub status_applied: bool,
    /// Whether this notification created the enrollment.
    pub newly_enrolled: bool,
}

/// Request to create a discount code.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewDiscountRequest {
    /// The code text; stored uppercase.
    pub code: String,
    /// How the value applies.
    #[schema(value_type = String, example = "percentage")]
    pub kind: DiscountKind,
    /// Percentage (`0..=100`) or fixed amount.
    #[schema(value_type = String, example = "20")]
    pub value: Decimal,
    /// Global redemption cap.
    pub max_uses: i32,
    /// Window start; defaults to now.
    pub valid_from: Option<DateTime<Utc>>,
    /// Window end; `None` means no expiry.
    pub valid_until: Option<DateTime<Utc>>,
    /// Restrict to one course; global when absent.
    pub course_id: Option<CourseId>,
}

/// Driving port for billing operations.
#[async_trait]
pub trait BillingApi: Send + Sync {
    /// Validate a discount code for a (user, course) pair.
    async fn validate_discount(
        &self,
        code: &str,
        user: UserId,
        course: CourseId,
    ) -> Result<DiscountVerdict, Error>;

    /// Start a course purchase, applying an optional discount code.
    async fn checkout(
        &self,
        actor: Actor,
        course: CourseId,
        discount_code: Option<String>,
    ) -> Result<CheckoutOutcome, Error>;

    /// Reconcile local payment state from a webhook notification.
    async fn reconcile(
        &self,
        notification: WebhookNotification,
    ) -> Result<ReconcileOutcome, Error>;

    /// Create a discount code. Admin only.
    async fn create_discount(
        &self,
        actor: Actor,
        request: NewDiscountRequest,
    ) -> Result<DiscountCode, Error>;

    /// Deactivate a discount code. Admin only.
    async fn deactivate_discount(&self, actor: Actor, id: DiscountCodeId) -> Result<(), Error>;

    /// Page through discount codes. Admin only.
    async fn list_discounts(
        &self,
        actor: Actor,
        page: PageRequest,
    ) -> Result<Page<DiscountCode>, Error>;

    /// Page through payments. Admin only.
    async fn list_payments(&self, actor: Actor, page: PageRequest)
        -> Result<Page<Payment>, Error>;
}

/// Billing service over persistence and gateway ports.
#[derive(Clone)]
pub struct BillingService<D, P, E, C, U, G> {
    discounts: Arc<D>,
    payments: Arc<P>,
    enrollments: Arc<E>,
    catalogue: Arc<C>,
    users: Arc<U>,
    gateway: Arc<G>,
    signing_key: Vec<u8>,
}

impl<D, P, E, C, U, G> BillingService<D, P, E, C, U, G> {
    /// Create a new service.
    ///
    /// `signing_key` tags external payment references so the webhook
    /// handler can verify recovered identities.
    pub fn new(
        discounts: Arc<D>,
        payments: Arc<P>,
        enrollments: Arc<E>,
        catalogue: Arc<C>,
        users: Arc<U>,
        gateway: Arc<G>,
        signing_key: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            discounts,
            payments,
            enrollments,
            catalogue,
            users,
            gateway,
            signing_key: signing_key.into(),
        }
    }

    fn require_admin(actor: Actor) -> Result<(), Error> {
        if actor.is_admin() {
            Ok(())
        } else {
            Err(Error::forbidden("admin role required"))
        }
    }
}

impl<D, P, E, C, U, G> BillingService<D, P, E, C, U, G>
where
    D: DiscountRepository,
    P: PaymentRepository,
    E: EnrollmentRepository,
    C: CatalogueRepository,
    U: UserRepository,
    G: PaymentGateway,
{
    /// Validate a code against a known course price.
    async fn verdict_for(
        &self,
        code: &str,
        user: UserId,
        course: CourseId,
        price: Decimal,
    ) -> Result<DiscountVerdict, Error> {
        let Some(discount) = self
            .discounts
            .find_by_code(code)
            .await
            .map_err(map_repository_error)?
        else {
            return Ok(DiscountVerdict::rejected(RejectionReason::UnknownCode));
        };

        if let Err(reason) = discount.check(course, Utc::now()) {
            return Ok(DiscountVerdict::rejected(reason));
        }

        // Per-user single use: rejected even when the global cap has room.
        if self
            .discounts
            .has_usage(discount.id, user)
            .await
            .map_err(map_repository_error)?
        {
            return Ok(DiscountVerdict::rejected(RejectionReason::AlreadyUsed));
        }

        let final_price = discount.apply(price);
        Ok(DiscountVerdict::accepted(discount, final_price))
    }

    async fn redeem_or_conflict(
        &self,
        discount: DiscountCodeId,
        user: UserId,
        payment: Option<PaymentId>,
    ) -> Result<(), Error> {
        let outcome = self
            .discounts
            .redeem(discount, user, payment)
            .await
            .map_err(map_repository_error)?;
        match outcome {
            RedeemOutcome::Applied => Ok(()),
            RedeemOutcome::CapReached => Err(Error::conflict(
                RejectionReason::CapReached.message(),
            )),
            RedeemOutcome::AlreadyUsed => Err(Error::conflict(
                RejectionReason::AlreadyUsed.message(),
            )),
        }
    }

    /// Adopt or create the local payment row for a notification.
    async fn resolve_payment(
        &self,
        processor_id: &str,
        report_reference: Option<&str>,
        report_amount: Option<Decimal>,
        report_method: Option<&str>,
        incoming: PaymentStatus,
    ) -> Result<Payment, Error> {
        if let Some(payment) = self
            .payments
            .find_by_processor_id(processor_id)
            .await
            .map_err(map_repository_error)?
        {
            return Ok(payment);
        }

        let reference = report_reference.ok_or_else(|| {
            Error::invalid_request("notification carries no external reference")
        })?;

        // A checkout-created pending row is adopted through its reference.
        if let Some(payment) = self
            .payments
            .find_by_reference(reference)
            .await
            .map_err(map_repository_error)?
        {
            return Ok(payment);
        }

        // First contact: recover and verify the identities, then insert
        // with the fetched status.
        let parsed = PaymentReference::decode(reference, &self.signing_key)
            .map_err(|e| Error::invalid_request(format!("webhook reference rejected: {e}")))?;
        let payment = Payment {
            id: PaymentId::new(),
            user_id: parsed.user_id,
            course_id: parsed.course_id,
            amount: report_amount.unwrap_or(Decimal::ZERO),
            status: incoming,
            processor_payment_id: Some(processor_id.to_owned()),
            external_reference: reference.to_owned(),
            method_detail: report_method.map(str::to_owned),
            approved_at: (incoming == PaymentStatus::Approved).then(Utc::now),
            created_at: Utc::now(),
        };
        self.payments
            .insert(&payment)
            .await
            .map_err(map_repository_error)?;
        info!(
            payment = %payment.id,
            processor = processor_id,
            status = %incoming,
            "payment discovered via webhook"
        );
        Ok(payment)
    }
}

#[async_trait]
impl<D, P, E, C, U, G> BillingApi for BillingService<D, P, E, C, U, G>
where
    D: DiscountRepository,
    P: PaymentRepository,
    E: EnrollmentRepository,
    C: CatalogueRepository,
    U: UserRepository,
    G: PaymentGateway,
{
    async fn validate_discount(
        &self,
        code: &str,
        user: UserId,
        course: CourseId,
    ) -> Result<DiscountVerdict, Error> {
        let course_row = self
            .catalogue
            .find_course(course)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("course not found"))?;
        self.verdict_for(code, user, course, course_row.price).await
    }

    async fn checkout(
        &self,
        actor: Actor,
        course: CourseId,
        discount_code: Option<String>,
    ) -> Result<CheckoutOutcome, Error> {
        let course_row = self
            .catalogue
            .find_course(course)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("course not found"))?;
        if !course_row.published {
            return Err(Error::not_found("course not found"));
        }
        if self
            .enrollments
            .find(actor.id, course)
            .await
            .map_err(map_repository_error)?
            .is_some()
        {
            return Err(Error::conflict("already enrolled in this course"));
        }

        let mut amount = course_row.price;
        let mut applied_discount: Option<DiscountCodeId> = None;
        if let Some(code) = discount_code {
            let verdict = self
                .verdict_for(&code, actor.id, course, course_row.price)
                .await?;
            match (verdict.discount, verdict.final_price) {
                (Some(discount), Some(final_price)) => {
                    amount = final_price;
                    applied_discount = Some(discount.id);
                }
                _ => {
                    let message = verdict
                        .message
                        .unwrap_or_else(|| "discount code rejected".to_owned());
                    return Err(Error::invalid_request(message));
                }
            }
        }

        if amount <= Decimal::ZERO {
            // Free after discount: redeem first so a lost race cannot
            // leave a zero-cost enrollment with an unredeemed code.
            if let Some(discount) = applied_discount {
                self.redeem_or_conflict(discount, actor.id, None).await?;
            }
            self.enrollments
                .insert_if_absent(&Enrollment::new(actor.id, course))
                .await
                .map_err(map_repository_error)?;
            let enrollment = self
                .enrollments
                .find(actor.id, course)
                .await
                .map_err(map_repository_error)?
                .ok_or_else(|| Error::internal("enrollment missing after insert"))?;
            return Ok(CheckoutOutcome::Enrolled { enrollment });
        }

        let payer = self
            .users
            .find_by_id(actor.id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("account not found"))?;

        let payment_id = PaymentId::new();
        let reference = PaymentReference::new(course, actor.id).encode(&self.signing_key);
        let order = CoursePaymentOrder {
            course_id: course,
            course_title: course_row.title.clone(),
            amount,
            payer_email: payer.email.clone(),
            external_reference: reference.clone(),
        };
        let preference = self
            .gateway
            .create_course_payment(&order)
            .await
            .map_err(map_gateway_error)?;

        if let Some(discount) = applied_discount {
            self.redeem_or_conflict(discount, actor.id, Some(payment_id))
                .await?;
        }

        let payment = Payment {
            id: payment_id,
            user_id: actor.id,
            course_id: course,
            amount,
            status: PaymentStatus::Pending,
            processor_payment_id: None,
            external_reference: reference,
            method_detail: None,
            approved_at: None,
            created_at: Utc::now(),
        };
        self.payments
            .insert(&payment)
            .await
            .map_err(map_repository_error)?;

        Ok(CheckoutOutcome::PaymentRequired {
            payment,
            redirect_url: preference.redirect_url,
        })
    }

    async fn reconcile(
        &self,
        notification: WebhookNotification,
    ) -> Result<ReconcileOutcome, Error> {
        let processor_id = notification.processor_payment_id;
        let report = self
            .gateway
            .payment_status(&processor_id)
            .await
            .map_err(map_gateway_error)?;
        let incoming = PaymentStatus::parse(&report.status);

        let payment = self
            .resolve_payment(
                &processor_id,
                report.external_reference.as_deref(),
                report.amount,
                report.method.as_deref(),
                incoming,
            )
            .await?;

        let needs_attach = payment.processor_payment_id.is_none();
        let status_applied = if payment.status == incoming {
            if needs_attach {
                self.payments
                    .apply_status(
                        payment.id,
                        incoming,
                        Some(&processor_id),
                        report.method.as_deref(),
                        None,
                    )
                    .await
                    .map_err(map_repository_error)?;
            }
            false
        } else if payment.status.can_transition_to(incoming) {
            let approved_at = (incoming == PaymentStatus::Approved).then(Utc::now);
            self.payments
                .apply_status(
                    payment.id,
                    incoming,
                    Some(&processor_id),
                    report.method.as_deref(),
                    approved_at,
                )
                .await
                .map_err(map_repository_error)?;
            true
        } else {
            warn!(
                payment = %payment.id,
                current = %payment.status,
                reported = %incoming,
                "ignoring out-of-order payment status notification"
            );
            false
        };

        let effective = if status_applied { incoming } else { payment.status };
        // Insert-or-ignore keeps webhook replays idempotent: the second
        // approved notification finds the row already present.
        let newly_enrolled = if effective == PaymentStatus::Approved {
            self.enrollments
                .insert_if_absent(&Enrollment::new(payment.user_id, payment.course_id))
                .await
                .map_err(map_repository_error)?
        } else {
            false
        };

        let payment = self
            .payments
            .find_by_processor_id(&processor_id)
            .await
            .map_err(map_repository_error)?
            .unwrap_or(payment);

        Ok(ReconcileOutcome {
            payment,
            status_applied,
            newly_enrolled,
        })
    }

    async fn create_discount(
        &self,
        actor: Actor,
        request: NewDiscountRequest,
    ) -> Result<DiscountCode, Error> {
        Self::require_admin(actor)?;

        let code_text = request.code.trim().to_uppercase();
        if code_text.is_empty() {
            return Err(Error::invalid_request("discount code must not be empty"));
        }
        if request.value <= Decimal::ZERO {
            return Err(Error::invalid_request("discount value must be positive"));
        }
        if request.kind == DiscountKind::Percentage && request.value > Decimal::ONE_HUNDRED {
            return Err(Error::invalid_request(
                "percentage discounts cannot exceed 100",
            ));
        }
        if request.max_uses < 1 {
            return Err(Error::invalid_request("max uses must be at least 1"));
        }
        let valid_from = request.valid_from.unwrap_or_else(Utc::now);
        if let Some(until) = request.valid_until {
            if until <= valid_from {
                return Err(Error::invalid_request(
                    "validity window must end after it starts",
                ));
            }
        }
        if let Some(scoped) = request.course_id {
            self.catalogue
                .find_course(scoped)
                .await
                .map_err(map_repository_error)?
                .ok_or_else(|| Error::not_found("scoped course not found"))?;
        }

        let discount = DiscountCode {
            id: DiscountCodeId::new(),
            code: code_text,
            kind: request.kind,
            value: request.value,
            max_uses: request.max_uses,
            current_uses: 0,
            valid_from,
            valid_until: request.valid_until,
            course_id: request.course_id,
            active: true,
        };
        self.discounts
            .insert(&discount)
            .await
            .map_err(map_repository_error)?;
        Ok(discount)
    }

    async fn deactivate_discount(&self, actor: Actor, id: DiscountCodeId) -> Result<(), Error> {
        Self::require_admin(actor)?;
        let updated = self
            .discounts
            .set_active(id, false)
            .await
            .map_err(map_repository_error)?;
        if !updated {
            return Err(Error::not_found("discount code not found"));
        }
        Ok(())
    }

    async fn list_discounts(
        &self,
        actor: Actor,
        page: PageRequest,
    ) -> Result<Page<DiscountCode>, Error> {
        Self::require_admin(actor)?;
        self.discounts
            .list(&page)
            .await
            .map_err(map_repository_error)
    }

    async fn list_payments(
        &self,
        actor: Actor,
        page: PageRequest,
    ) -> Result<Page<Payment>, Error> {
        Self::require_admin(actor)?;
        self.payments
            .list(&page)
            .await
            .map_err(map_repository_error)
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod service_tests;
