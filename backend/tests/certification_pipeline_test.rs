//! End-to-end pipeline: enrollment, progress, eligibility, issuance.
//!
//! Drives the real domain services over the in-memory port doubles,
//! following one student from registration to a verified certificate.

use std::sync::Arc;

use rust_decimal::Decimal;
use url::Url;

use campus_backend::domain::accounts::{AccountsApi, AccountsService, RegistrationRequest};
use campus_backend::domain::catalogue::{
    CatalogueApi, CatalogueService, CourseUpdate, NewCourseRequest, NewLessonRequest,
    NewModuleRequest,
};
use campus_backend::domain::certification::{CertificationApi, CertificationService};
use campus_backend::domain::progress::{ProgressApi, ProgressService};
use campus_backend::domain::user::{Actor, Role};
use campus_backend::testing::{
    InMemoryCatalogue, InMemoryCertificates, InMemoryEnrollments, InMemoryUsers, StubRenderer,
};

struct World {
    accounts: AccountsService<InMemoryUsers>,
    catalogue: CatalogueService<InMemoryCatalogue>,
    progress: ProgressService<InMemoryEnrollments, InMemoryCatalogue>,
    certification: CertificationService<
        InMemoryCertificates,
        InMemoryEnrollments,
        InMemoryCatalogue,
        InMemoryUsers,
        StubRenderer,
    >,
    certificates: Arc<InMemoryCertificates>,
}

fn world() -> World {
    let users = Arc::new(InMemoryUsers::default());
    let catalogue = Arc::new(InMemoryCatalogue::default());
    let enrollments = Arc::new(InMemoryEnrollments::new(catalogue.clone()));
    let certificates = Arc::new(InMemoryCertificates::default());
    let renderer = Arc::new(StubRenderer::default());

    World {
        accounts: AccountsService::new(users.clone()),
        catalogue: CatalogueService::new(catalogue.clone()),
        progress: ProgressService::new(enrollments.clone(), catalogue.clone()),
        certification: CertificationService::new(
            certificates.clone(),
            enrollments,
            catalogue,
            users,
            renderer,
            Url::parse("https://campus.test").expect("url"),
        ),
        certificates,
    }
}

async fn register(world: &World, name: &str, email: &str, role: Role) -> Actor {
    let user = world
        .accounts
        .register(RegistrationRequest {
            display_name: name.to_owned(),
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

/// Publish a free course with one module and `lessons` lessons.
async fn published_course(
    world: &World,
    instructor: Actor,
    lessons: usize,
) -> (campus_backend::domain::CourseId, Vec<campus_backend::domain::LessonId>) {
    let course = world
        .catalogue
        .create_course(
            instructor,
            NewCourseRequest {
                title: "Numerical methods".to_owned(),
                description: "From Babbage onwards".to_owned(),
                price: Decimal::ZERO,
            },
        )
        .await
        .expect("create course");
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

    let module = world
        .catalogue
        .add_module(
            instructor,
            course.id,
            NewModuleRequest {
                title: "Fundamentals".to_owned(),
                position: 0,
            },
        )
        .await
        .expect("module");

    let mut lesson_ids = Vec::new();
    for position in 0..lessons {
        let lesson = world
            .catalogue
            .add_lesson(
                instructor,
                module.id,
                NewLessonRequest {
                    title: format!("Lesson {position}"),
                    position: position as i32,
                    duration_minutes: 15,
                },
            )
            .await
            .expect("lesson");
        lesson_ids.push(lesson.id);
    }
    (course.id, lesson_ids)
}

#[tokio::test]
async fn student_journey_from_enrollment_to_certificate() {
    let world = world();
    let instructor = register(&world, "Prof", "prof@campus.test", Role::Instructor).await;
    let student = register(&world, "Ada", "ada@campus.test", Role::Student).await;
    let (course, lessons) = published_course(&world, instructor, 10).await;

    world
        .progress
        .enroll_free(student, course)
        .await
        .expect("enroll");

    // Nine of ten lessons: 90%, not eligible.
    let mut last_percentage = 0;
    for lesson in lessons.iter().take(9) {
        let progress = world
            .progress
            .mark_lesson_complete(student, *lesson)
            .await
            .expect("mark");
        assert!(progress.percentage >= last_percentage, "monotonic progress");
        last_percentage = progress.percentage;
    }
    assert_eq!(last_percentage, 90);

    let verdict = world
        .certification
        .evaluate(student.id, course)
        .await
        .expect("evaluate");
    assert!(!verdict.eligible);
    assert_eq!(verdict.completion_percentage, 90);

    // The tenth lesson flips eligibility at exactly 100%.
    let progress = world
        .progress
        .mark_lesson_complete(student, lessons[9])
        .await
        .expect("final lesson");
    assert_eq!(progress.percentage, 100);

    let verdict = world
        .certification
        .evaluate(student.id, course)
        .await
        .expect("evaluate again");
    assert!(verdict.eligible);

    // Sequential double-issue converges on one certificate.
    let first = world
        .certification
        .issue(student, course)
        .await
        .expect("issue");
    let second = world
        .certification
        .issue(student, course)
        .await
        .expect("re-issue");
    assert_eq!(first.id, second.id);
    assert_eq!(world.certificates.certificate_rows(student.id, course), 1);

    // The certificate verifies publicly by code.
    let verified = world
        .certification
        .verify(&first.code)
        .await
        .expect("verify");
    assert!(verified.valid);
    assert!(verified.code.starts_with("CERT-"));
}

#[tokio::test]
async fn zero_lesson_course_never_certifies() {
    let world = world();
    let instructor = register(&world, "Prof", "prof@campus.test", Role::Instructor).await;
    let student = register(&world, "Ada", "ada@campus.test", Role::Student).await;
    let (course, _) = published_course(&world, instructor, 0).await;

    world
        .progress
        .enroll_free(student, course)
        .await
        .expect("enroll");

    let progress = world
        .progress
        .course_progress(student.id, course)
        .await
        .expect("progress");
    assert_eq!(progress.percentage, 0);

    let verdict = world
        .certification
        .evaluate(student.id, course)
        .await
        .expect("evaluate");
    assert!(!verdict.eligible);
    assert_eq!(verdict.reason.as_deref(), Some("course has no lessons"));
}

#[tokio::test]
async fn remarking_lessons_keeps_progress_stable() {
    let world = world();
    let instructor = register(&world, "Prof", "prof@campus.test", Role::Instructor).await;
    let student = register(&world, "Ada", "ada@campus.test", Role::Student).await;
    let (course, lessons) = published_course(&world, instructor, 3).await;

    world
        .progress
        .enroll_free(student, course)
        .await
        .expect("enroll");

    for lesson in &lessons {
        world
            .progress
            .mark_lesson_complete(student, *lesson)
            .await
            .expect("mark");
    }
    let before = world
        .progress
        .course_progress(student.id, course)
        .await
        .expect("progress");

    // Replaying a completion never decreases the stored percentage.
    world
        .progress
        .mark_lesson_complete(student, lessons[1])
        .await
        .expect("re-mark");
    let after = world
        .progress
        .course_progress(student.id, course)
        .await
        .expect("progress");
    assert_eq!(before, after);
    assert_eq!(after.percentage, 100);
}
