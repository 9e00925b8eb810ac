//! Unit tests for the billing service.

use std::sync::Arc;

use chrono::{Duration, Utc};
use pagination::PageRequest;
use rstest::rstest;
use rust_decimal::Decimal;

use crate::domain::catalogue::Course;
use crate::domain::ids::{CourseId, UserId};
use crate::domain::ports::{
    CatalogueRepository, DiscountRepository, EnrollmentRepository, ProcessorPaymentReport,
    UserRepository,
};
use crate::domain::user::{Actor, Role, User};
use crate::domain::ErrorCode;
use crate::testing::{
    InMemoryCatalogue, InMemoryDiscounts, InMemoryEnrollments, InMemoryPayments, InMemoryUsers,
    StubGateway,
};

use super::*;

const SIGNING_KEY: &[u8] = b"billing-test-key";

type Service = BillingService<
    InMemoryDiscounts,
    InMemoryPayments,
    InMemoryEnrollments,
    InMemoryCatalogue,
    InMemoryUsers,
    StubGateway,
>;

struct Fixture {
    service: Service,
    discounts: Arc<InMemoryDiscounts>,
    payments: Arc<InMemoryPayments>,
    enrollments: Arc<InMemoryEnrollments>,
    gateway: Arc<StubGateway>,
    student: Actor,
    course: CourseId,
}

fn admin() -> Actor {
    Actor {
        id: UserId::new(),
        role: Role::Admin,
    }
}

async fn fixture_with_price(price: Decimal) -> Fixture {
    let catalogue = Arc::new(InMemoryCatalogue::default());
    let enrollments = Arc::new(InMemoryEnrollments::new(catalogue.clone()));
    let discounts = Arc::new(InMemoryDiscounts::default());
    let payments = Arc::new(InMemoryPayments::default());
    let users = Arc::new(InMemoryUsers::default());
    let gateway = Arc::new(StubGateway::default());

    let student = Actor {
        id: UserId::new(),
        role: Role::Student,
    };
    users
        .insert(
            &User {
                id: student.id,
                display_name: "Grace Hopper".to_owned(),
                email: "grace@campus.test".to_owned(),
                role: Role::Student,
                created_at: Utc::now(),
            },
            "hash",
        )
        .await
        .expect("insert user");

    let course = CourseId::new();
    catalogue
        .insert_course(&Course {
            id: course,
            title: "Compilers".to_owned(),
            description: String::new(),
            price,
            instructor_id: UserId::new(),
            published: true,
            created_at: Utc::now(),
        })
        .await
        .expect("insert course");

    let service = BillingService::new(
        discounts.clone(),
        payments.clone(),
        enrollments.clone(),
        catalogue,
        users,
        gateway.clone(),
        SIGNING_KEY,
    );

    Fixture {
        service,
        discounts,
        payments,
        enrollments,
        gateway,
        student,
        course,
    }
}

async fn seed_discount(fixture: &Fixture, request: NewDiscountRequest) -> DiscountCode {
    fixture
        .service
        .create_discount(admin(), request)
        .await
        .expect("create discount")
}

fn percentage_request(code: &str, value: i64) -> NewDiscountRequest {
    NewDiscountRequest {
        code: code.to_owned(),
        kind: DiscountKind::Percentage,
        value: Decimal::from(value),
        max_uses: 10,
        valid_from: None,
        valid_until: Some(Utc::now() + Duration::days(30)),
        course_id: None,
    }
}

// --- discount validation and arithmetic -----------------------------------

#[tokio::test]
async fn twenty_percent_off_one_hundred_is_eighty() {
    let fixture = fixture_with_price(Decimal::new(10_000, 2)).await;
    seed_discount(&fixture, percentage_request("SPRING20", 20)).await;

    let verdict = fixture
        .service
        .validate_discount("SPRING20", fixture.student.id, fixture.course)
        .await
        .expect("validate");
    assert!(verdict.valid);
    assert_eq!(verdict.final_price, Some(Decimal::new(8_000, 2)));
}

#[tokio::test]
async fn fixed_discount_never_goes_negative() {
    let fixture = fixture_with_price(Decimal::new(2_000, 2)).await;
    seed_discount(
        &fixture,
        NewDiscountRequest {
            kind: DiscountKind::Fixed,
            value: Decimal::new(3_000, 2),
            ..percentage_request("THIRTYOFF", 0)
        },
    )
    .await;

    let verdict = fixture
        .service
        .validate_discount("THIRTYOFF", fixture.student.id, fixture.course)
        .await
        .expect("validate");
    assert_eq!(verdict.final_price, Some(Decimal::ZERO));
}

#[tokio::test]
async fn codes_match_case_insensitively() {
    let fixture = fixture_with_price(Decimal::new(10_000, 2)).await;
    seed_discount(&fixture, percentage_request("Spring20", 20)).await;

    let verdict = fixture
        .service
        .validate_discount("spring20", fixture.student.id, fixture.course)
        .await
        .expect("validate");
    assert!(verdict.valid);
}

#[tokio::test]
async fn unknown_code_is_rejected_with_message() {
    let fixture = fixture_with_price(Decimal::new(10_000, 2)).await;
    let verdict = fixture
        .service
        .validate_discount("NOPE", fixture.student.id, fixture.course)
        .await
        .expect("validate");
    assert!(!verdict.valid);
    assert_eq!(verdict.message.as_deref(), Some("discount code not found"));
}

#[tokio::test]
async fn per_user_single_use_beats_global_cap() {
    let fixture = fixture_with_price(Decimal::new(10_000, 2)).await;
    let discount = seed_discount(&fixture, percentage_request("ONCE", 10)).await;

    fixture
        .discounts
        .redeem(discount.id, fixture.student.id, None)
        .await
        .expect("redeem");

    let verdict = fixture
        .service
        .validate_discount("ONCE", fixture.student.id, fixture.course)
        .await
        .expect("validate");
    assert!(!verdict.valid);
    assert_eq!(
        verdict.message.as_deref(),
        Some("discount code already used by this account")
    );

    // A different user still passes.
    let other = UserId::new();
    let verdict = fixture
        .service
        .validate_discount("ONCE", other, fixture.course)
        .await
        .expect("validate");
    assert!(verdict.valid);
}

#[tokio::test]
async fn course_scoped_codes_validate_for_their_course() {
    let fixture = fixture_with_price(Decimal::new(10_000, 2)).await;
    seed_discount(
        &fixture,
        NewDiscountRequest {
            course_id: Some(fixture.course),
            ..percentage_request("SCOPED", 15)
        },
    )
    .await;

    let verdict = fixture
        .service
        .validate_discount("SCOPED", fixture.student.id, fixture.course)
        .await
        .expect("validate");
    assert!(verdict.valid);
}

// --- checkout -------------------------------------------------------------

#[tokio::test]
async fn checkout_free_course_enrolls_immediately() {
    let fixture = fixture_with_price(Decimal::ZERO).await;
    let outcome = fixture
        .service
        .checkout(fixture.student, fixture.course, None)
        .await
        .expect("checkout");

    assert!(matches!(outcome, CheckoutOutcome::Enrolled { .. }));
    assert_eq!(
        fixture
            .enrollments
            .enrollment_rows(fixture.student.id, fixture.course),
        1
    );
    assert!(fixture.gateway.orders().is_empty());
}

#[tokio::test]
async fn checkout_paid_course_creates_pending_payment() {
    let fixture = fixture_with_price(Decimal::new(10_000, 2)).await;
    let outcome = fixture
        .service
        .checkout(fixture.student, fixture.course, None)
        .await
        .expect("checkout");

    let CheckoutOutcome::PaymentRequired {
        payment,
        redirect_url,
    } = outcome
    else {
        panic!("expected a payment-required outcome");
    };
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.amount, Decimal::new(10_000, 2));
    assert!(redirect_url.contains("processor.test"));

    let orders = fixture.gateway.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].payer_email, "grace@campus.test");
    assert_eq!(orders[0].external_reference, payment.external_reference);
    assert!(
        PaymentReference::decode(&payment.external_reference, SIGNING_KEY).is_ok(),
        "reference must verify under the signing key"
    );
}

#[tokio::test]
async fn checkout_applies_discount_to_charged_amount() {
    let fixture = fixture_with_price(Decimal::new(10_000, 2)).await;
    let discount = seed_discount(&fixture, percentage_request("SPRING20", 20)).await;

    let outcome = fixture
        .service
        .checkout(
            fixture.student,
            fixture.course,
            Some("spring20".to_owned()),
        )
        .await
        .expect("checkout");

    let CheckoutOutcome::PaymentRequired { payment, .. } = outcome else {
        panic!("expected a payment-required outcome");
    };
    assert_eq!(payment.amount, Decimal::new(8_000, 2));
    assert_eq!(fixture.discounts.current_uses(discount.id), 1);
}

#[tokio::test]
async fn checkout_with_full_discount_enrolls_without_gateway() {
    let fixture = fixture_with_price(Decimal::new(5_000, 2)).await;
    seed_discount(
        &fixture,
        NewDiscountRequest {
            kind: DiscountKind::Percentage,
            value: Decimal::ONE_HUNDRED,
            ..percentage_request("FULLRIDE", 0)
        },
    )
    .await;

    let outcome = fixture
        .service
        .checkout(
            fixture.student,
            fixture.course,
            Some("FULLRIDE".to_owned()),
        )
        .await
        .expect("checkout");
    assert!(matches!(outcome, CheckoutOutcome::Enrolled { .. }));
    assert!(fixture.gateway.orders().is_empty());
}

#[tokio::test]
async fn checkout_rejects_invalid_code_without_side_effects() {
    let fixture = fixture_with_price(Decimal::new(10_000, 2)).await;
    let err = fixture
        .service
        .checkout(
            fixture.student,
            fixture.course,
            Some("MISSING".to_owned()),
        )
        .await
        .expect_err("invalid code");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert!(fixture.gateway.orders().is_empty());
}

#[tokio::test]
async fn checkout_rejects_existing_enrollment() {
    let fixture = fixture_with_price(Decimal::ZERO).await;
    fixture
        .service
        .checkout(fixture.student, fixture.course, None)
        .await
        .expect("first checkout");
    let err = fixture
        .service
        .checkout(fixture.student, fixture.course, None)
        .await
        .expect_err("second checkout");
    assert_eq!(err.code(), ErrorCode::Conflict);
}

// --- reconciliation -------------------------------------------------------

fn approved_report(reference: &str) -> ProcessorPaymentReport {
    ProcessorPaymentReport {
        status: "approved".to_owned(),
        amount: Some(Decimal::new(10_000, 2)),
        method: Some("credit_card".to_owned()),
        external_reference: Some(reference.to_owned()),
    }
}

#[tokio::test]
async fn approved_webhook_adopts_checkout_row_and_enrolls() {
    let fixture = fixture_with_price(Decimal::new(10_000, 2)).await;
    let outcome = fixture
        .service
        .checkout(fixture.student, fixture.course, None)
        .await
        .expect("checkout");
    let CheckoutOutcome::PaymentRequired { payment, .. } = outcome else {
        panic!("expected payment");
    };

    fixture
        .gateway
        .set_report("mp-1", approved_report(&payment.external_reference));

    let outcome = fixture
        .service
        .reconcile(WebhookNotification {
            processor_payment_id: "mp-1".to_owned(),
        })
        .await
        .expect("reconcile");

    assert!(outcome.status_applied);
    assert!(outcome.newly_enrolled);
    assert_eq!(outcome.payment.status, PaymentStatus::Approved);
    assert_eq!(outcome.payment.id, payment.id);
    assert_eq!(
        outcome.payment.processor_payment_id.as_deref(),
        Some("mp-1")
    );
    assert!(outcome.payment.approved_at.is_some());
}

#[tokio::test]
async fn replayed_approved_webhook_yields_exactly_one_enrollment() {
    let fixture = fixture_with_price(Decimal::new(10_000, 2)).await;
    let reference =
        PaymentReference::new(fixture.course, fixture.student.id).encode(SIGNING_KEY);
    fixture
        .gateway
        .set_report("mp-2", approved_report(&reference));

    let first = fixture
        .service
        .reconcile(WebhookNotification {
            processor_payment_id: "mp-2".to_owned(),
        })
        .await
        .expect("first notification");
    let second = fixture
        .service
        .reconcile(WebhookNotification {
            processor_payment_id: "mp-2".to_owned(),
        })
        .await
        .expect("replay");

    assert!(first.newly_enrolled);
    assert!(!second.newly_enrolled);
    assert!(!second.status_applied);
    assert_eq!(
        fixture
            .enrollments
            .enrollment_rows(fixture.student.id, fixture.course),
        1
    );
}

#[tokio::test]
async fn webhook_without_local_row_inserts_from_reference() {
    let fixture = fixture_with_price(Decimal::new(10_000, 2)).await;
    let reference =
        PaymentReference::new(fixture.course, fixture.student.id).encode(SIGNING_KEY);
    fixture
        .gateway
        .set_report("mp-3", approved_report(&reference));

    let outcome = fixture
        .service
        .reconcile(WebhookNotification {
            processor_payment_id: "mp-3".to_owned(),
        })
        .await
        .expect("reconcile");

    assert_eq!(outcome.payment.user_id, fixture.student.id);
    assert_eq!(outcome.payment.course_id, fixture.course);
    assert_eq!(outcome.payment.status, PaymentStatus::Approved);
    assert!(outcome.newly_enrolled);
    assert!(fixture.payments.get(outcome.payment.id).is_some());
}

#[tokio::test]
async fn webhook_with_tampered_reference_is_rejected() {
    let fixture = fixture_with_price(Decimal::new(10_000, 2)).await;
    let forged = format!(
        "course_{}_user_{}_{}",
        fixture.course,
        fixture.student.id,
        "0".repeat(16)
    );
    fixture.gateway.set_report("mp-4", approved_report(&forged));

    let err = fixture
        .service
        .reconcile(WebhookNotification {
            processor_payment_id: "mp-4".to_owned(),
        })
        .await
        .expect_err("reject forged reference");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(
        fixture
            .enrollments
            .enrollment_rows(fixture.student.id, fixture.course),
        0
    );
}

#[tokio::test]
async fn approved_payment_ignores_late_pending_report() {
    let fixture = fixture_with_price(Decimal::new(10_000, 2)).await;
    let reference =
        PaymentReference::new(fixture.course, fixture.student.id).encode(SIGNING_KEY);
    fixture
        .gateway
        .set_report("mp-5", approved_report(&reference));
    fixture
        .service
        .reconcile(WebhookNotification {
            processor_payment_id: "mp-5".to_owned(),
        })
        .await
        .expect("approve");

    // The processor later re-reports the same payment as pending.
    fixture.gateway.set_report(
        "mp-5",
        ProcessorPaymentReport {
            status: "in_process".to_owned(),
            amount: None,
            method: None,
            external_reference: Some(reference),
        },
    );
    let outcome = fixture
        .service
        .reconcile(WebhookNotification {
            processor_payment_id: "mp-5".to_owned(),
        })
        .await
        .expect("regression ignored");

    assert!(!outcome.status_applied);
    assert_eq!(outcome.payment.status, PaymentStatus::Approved);
}

#[tokio::test]
async fn gateway_outage_surfaces_as_service_unavailable() {
    let fixture = fixture_with_price(Decimal::new(10_000, 2)).await;
    fixture.gateway.fail_transport();

    let err = fixture
        .service
        .reconcile(WebhookNotification {
            processor_payment_id: "mp-6".to_owned(),
        })
        .await
        .expect_err("outage");
    assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
}

// --- administration -------------------------------------------------------

#[tokio::test]
async fn discount_management_is_admin_only() {
    let fixture = fixture_with_price(Decimal::new(10_000, 2)).await;
    let err = fixture
        .service
        .create_discount(fixture.student, percentage_request("NOPE", 10))
        .await
        .expect_err("forbidden");
    assert_eq!(err.code(), ErrorCode::Forbidden);

    let err = fixture
        .service
        .list_payments(fixture.student, PageRequest::default())
        .await
        .expect_err("forbidden");
    assert_eq!(err.code(), ErrorCode::Forbidden);
}

#[rstest]
#[case(Decimal::ZERO)]
#[case(Decimal::from(-5))]
#[tokio::test]
async fn non_positive_discount_values_are_rejected(#[case] value: Decimal) {
    let fixture = fixture_with_price(Decimal::new(10_000, 2)).await;
    let err = fixture
        .service
        .create_discount(
            admin(),
            NewDiscountRequest {
                value,
                ..percentage_request("BAD", 0)
            },
        )
        .await
        .expect_err("invalid value");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[tokio::test]
async fn deactivated_codes_stop_validating() {
    let fixture = fixture_with_price(Decimal::new(10_000, 2)).await;
    let discount = seed_discount(&fixture, percentage_request("SOONGONE", 10)).await;

    fixture
        .service
        .deactivate_discount(admin(), discount.id)
        .await
        .expect("deactivate");

    let verdict = fixture
        .service
        .validate_discount("SOONGONE", fixture.student.id, fixture.course)
        .await
        .expect("validate");
    assert!(!verdict.valid);
    assert_eq!(
        verdict.message.as_deref(),
        Some("discount code is no longer active")
    );
}
