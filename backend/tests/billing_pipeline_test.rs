//! End-to-end billing: discounts, checkout, webhook reconciliation.
//!
//! Drives the real billing service over in-memory doubles and a scripted
//! gateway, covering the discount arithmetic, the per-user single-use
//! rule, and webhook replay idempotence.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use campus_backend::domain::accounts::{AccountsApi, AccountsService, RegistrationRequest};
use campus_backend::domain::billing::{
    BillingApi, BillingService, CheckoutOutcome, DiscountKind, NewDiscountRequest,
    PaymentStatus, WebhookNotification,
};
use campus_backend::domain::catalogue::{
    CatalogueApi, CatalogueService, CourseUpdate, NewCourseRequest,
};
use campus_backend::domain::user::{Actor, Role};
use campus_backend::domain::CourseId;
use campus_backend::domain::ports::ProcessorPaymentReport;
use campus_backend::testing::{
    InMemoryCatalogue, InMemoryDiscounts, InMemoryEnrollments, InMemoryPayments, InMemoryUsers,
    StubGateway,
};

const SIGNING_KEY: &[u8] = b"integration-signing-key";

struct World {
    accounts: AccountsService<InMemoryUsers>,
    catalogue: CatalogueService<InMemoryCatalogue>,
    billing: BillingService<
        InMemoryDiscounts,
        InMemoryPayments,
        InMemoryEnrollments,
        InMemoryCatalogue,
        InMemoryUsers,
        StubGateway,
    >,
    enrollments: Arc<InMemoryEnrollments>,
    gateway: Arc<StubGateway>,
}

fn world() -> World {
    let users = Arc::new(InMemoryUsers::default());
    let catalogue = Arc::new(InMemoryCatalogue::default());
    let enrollments = Arc::new(InMemoryEnrollments::new(catalogue.clone()));
    let discounts = Arc::new(InMemoryDiscounts::default());
    let payments = Arc::new(InMemoryPayments::default());
    let gateway = Arc::new(StubGateway::default());

    World {
        accounts: AccountsService::new(users.clone()),
        catalogue: CatalogueService::new(catalogue.clone()),
        billing: BillingService::new(
            discounts,
            payments,
            enrollments.clone(),
            catalogue,
            users,
            gateway.clone(),
            SIGNING_KEY,
        ),
        enrollments,
        gateway,
    }
}

async fn register(world: &World, email: &str, role: Role) -> Actor {
    let user = world
        .accounts
        .register(RegistrationRequest {
            display_name: "Someone".to_owned(),
            email: email.to_owned(),
            password: "correct horse battery".to_owned(),
            role: Some(role),
        })
        .await
        .expect("register");
    Actor {
        id: user.id,
        role: user.role,
    }
}

async fn published_course(world: &World, instructor: Actor, price: Decimal) -> CourseId {
    let course = world
        .catalogue
        .create_course(
            instructor,
            NewCourseRequest {
                title: "Paid course".to_owned(),
                description: String::new(),
                price,
            },
        )
        .await
        .expect("create");
    world
        .catalogue
        .update_course(
            instructor,
            course.id,
            CourseUpdate {
                published: Some(true),
                ..CourseUpdate::default()
            },
        )
        .await
        .expect("publish");
    course.id
}

fn admin() -> Actor {
    Actor {
        id: campus_backend::domain::UserId::new(),
        role: Role::Admin,
    }
}

async fn seed_percentage_code(world: &World, code: &str, percent: i64) {
    world
        .billing
        .create_discount(
            admin(),
            NewDiscountRequest {
                code: code.to_owned(),
                kind: DiscountKind::Percentage,
                value: Decimal::from(percent),
                max_uses: 50,
                valid_from: None,
                valid_until: Some(Utc::now() + Duration::days(7)),
                course_id: None,
            },
        )
        .await
        .expect("seed code");
}

#[tokio::test]
async fn discounted_checkout_charges_the_reduced_amount() {
    let world = world();
    let instructor = register(&world, "prof@campus.test", Role::Instructor).await;
    let student = register(&world, "ada@campus.test", Role::Student).await;
    let course = published_course(&world, instructor, Decimal::new(10_000, 2)).await;
    seed_percentage_code(&world, "SPRING20", 20).await;

    let verdict = world
        .billing
        .validate_discount("spring20", student.id, course)
        .await
        .expect("validate");
    assert!(verdict.valid);
    assert_eq!(verdict.final_price, Some(Decimal::new(8_000, 2)));

    let outcome = world
        .billing
        .checkout(student, course, Some("SPRING20".to_owned()))
        .await
        .expect("checkout");
    let CheckoutOutcome::PaymentRequired { payment, .. } = outcome else {
        panic!("expected a pending payment");
    };
    assert_eq!(payment.amount, Decimal::new(8_000, 2));
    assert_eq!(payment.status, PaymentStatus::Pending);

    // The same student cannot reuse the code later.
    let verdict = world
        .billing
        .validate_discount("SPRING20", student.id, course)
        .await
        .expect("validate again");
    assert!(!verdict.valid);
}

#[tokio::test]
async fn approved_webhook_enrolls_once_even_when_replayed() {
    let world = world();
    let instructor = register(&world, "prof@campus.test", Role::Instructor).await;
    let student = register(&world, "ada@campus.test", Role::Student).await;
    let course = published_course(&world, instructor, Decimal::new(5_000, 2)).await;

    let outcome = world
        .billing
        .checkout(student, course, None)
        .await
        .expect("checkout");
    let CheckoutOutcome::PaymentRequired { payment, .. } = outcome else {
        panic!("expected a pending payment");
    };

    world.gateway.set_report(
        "proc-77",
        ProcessorPaymentReport {
            status: "approved".to_owned(),
            amount: Some(payment.amount),
            method: Some("credit_card".to_owned()),
            external_reference: Some(payment.external_reference.clone()),
        },
    );

    let notification = || WebhookNotification {
        processor_payment_id: "proc-77".to_owned(),
    };
    let first = world
        .billing
        .reconcile(notification())
        .await
        .expect("first webhook");
    assert!(first.status_applied);
    assert!(first.newly_enrolled);
    assert_eq!(first.payment.status, PaymentStatus::Approved);

    let replay = world
        .billing
        .reconcile(notification())
        .await
        .expect("replayed webhook");
    assert!(!replay.status_applied);
    assert!(!replay.newly_enrolled);
    assert_eq!(world.enrollments.enrollment_rows(student.id, course), 1);
}

#[tokio::test]
async fn rejected_payment_never_enrolls() {
    let world = world();
    let instructor = register(&world, "prof@campus.test", Role::Instructor).await;
    let student = register(&world, "ada@campus.test", Role::Student).await;
    let course = published_course(&world, instructor, Decimal::new(5_000, 2)).await;

    let outcome = world
        .billing
        .checkout(student, course, None)
        .await
        .expect("checkout");
    let CheckoutOutcome::PaymentRequired { payment, .. } = outcome else {
        panic!("expected a pending payment");
    };

    world.gateway.set_report(
        "proc-88",
        ProcessorPaymentReport {
            status: "rejected".to_owned(),
            amount: Some(payment.amount),
            method: None,
            external_reference: Some(payment.external_reference.clone()),
        },
    );
    let outcome = world
        .billing
        .reconcile(WebhookNotification {
            processor_payment_id: "proc-88".to_owned(),
        })
        .await
        .expect("webhook");

    assert_eq!(outcome.payment.status, PaymentStatus::Rejected);
    assert!(!outcome.newly_enrolled);
    assert_eq!(world.enrollments.enrollment_rows(student.id, course), 0);

    // A later, out-of-order "approved" report cannot resurrect it.
    world.gateway.set_report(
        "proc-88",
        ProcessorPaymentReport {
            status: "approved".to_owned(),
            amount: Some(payment.amount),
            method: None,
            external_reference: Some(payment.external_reference),
        },
    );
    let outcome = world
        .billing
        .reconcile(WebhookNotification {
            processor_payment_id: "proc-88".to_owned(),
        })
        .await
        .expect("late webhook");
    assert!(!outcome.status_applied);
    assert_eq!(outcome.payment.status, PaymentStatus::Rejected);
    assert_eq!(world.enrollments.enrollment_rows(student.id, course), 0);
}

#[tokio::test]
async fn full_discount_skips_the_processor_entirely() {
    let world = world();
    let instructor = register(&world, "prof@campus.test", Role::Instructor).await;
    let student = register(&world, "ada@campus.test", Role::Student).await;
    let course = published_course(&world, instructor, Decimal::new(3_000, 2)).await;
    seed_percentage_code(&world, "FULLRIDE", 100).await;

    let outcome = world
        .billing
        .checkout(student, course, Some("FULLRIDE".to_owned()))
        .await
        .expect("checkout");
    assert!(matches!(outcome, CheckoutOutcome::Enrolled { .. }));
    assert!(world.gateway.orders().is_empty());
    assert_eq!(world.enrollments.enrollment_rows(student.id, course), 1);
}
