//! Unit tests for the progress service.

use std::sync::Arc;

use chrono::Utc;
use rstest::rstest;
use rust_decimal::Decimal;

use crate::domain::catalogue::{Course, CourseModule, Lesson};
use crate::domain::ids::{CourseId, LessonId, ModuleId, UserId};
use crate::domain::ports::CatalogueRepository;
use crate::domain::user::Actor;
use crate::domain::{ErrorCode, Role};
use crate::testing::{InMemoryCatalogue, InMemoryEnrollments};

use super::*;

struct Fixture {
    service: ProgressService<InMemoryEnrollments, InMemoryCatalogue>,
    enrollments: Arc<InMemoryEnrollments>,
    course: CourseId,
    lessons: Vec<LessonId>,
}

async fn fixture_with_lessons(lesson_count: usize, price: Decimal) -> Fixture {
    let catalogue = Arc::new(InMemoryCatalogue::default());
    let enrollments = Arc::new(InMemoryEnrollments::new(catalogue.clone()));
    let course_id = CourseId::new();

    catalogue
        .insert_course(&Course {
            id: course_id,
            title: "Fixture course".to_owned(),
            description: String::new(),
            price,
            instructor_id: UserId::new(),
            published: true,
            created_at: Utc::now(),
        })
        .await
        .expect("insert course");

    let module = CourseModule {
        id: ModuleId::new(),
        course_id,
        title: "Only module".to_owned(),
        position: 0,
    };
    catalogue.insert_module(&module).await.expect("insert module");

    let mut lessons = Vec::new();
    for position in 0..lesson_count {
        let lesson = Lesson {
            id: LessonId::new(),
            module_id: module.id,
            title: format!("Lesson {position}"),
            position: position as i32,
            duration_minutes: 10,
        };
        catalogue.insert_lesson(&lesson).await.expect("insert lesson");
        lessons.push(lesson.id);
    }

    Fixture {
        service: ProgressService::new(enrollments.clone(), catalogue),
        enrollments,
        course: course_id,
        lessons,
    }
}

fn student() -> Actor {
    Actor {
        id: UserId::new(),
        role: Role::Student,
    }
}

#[tokio::test]
async fn free_enroll_is_idempotent() {
    let fixture = fixture_with_lessons(2, Decimal::ZERO).await;
    let actor = student();

    let first = fixture
        .service
        .enroll_free(actor, fixture.course)
        .await
        .expect("enroll");
    let second = fixture
        .service
        .enroll_free(actor, fixture.course)
        .await
        .expect("re-enroll");

    assert_eq!(first.enrolled_at, second.enrolled_at);
    assert_eq!(fixture.enrollments.enrollment_rows(actor.id, fixture.course), 1);
}

#[tokio::test]
async fn paid_courses_reject_free_enroll() {
    let fixture = fixture_with_lessons(1, Decimal::new(9_900, 2)).await;
    let err = fixture
        .service
        .enroll_free(student(), fixture.course)
        .await
        .expect_err("must pay");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[tokio::test]
async fn progress_starts_at_zero() {
    let fixture = fixture_with_lessons(10, Decimal::ZERO).await;
    let actor = student();
    fixture
        .service
        .enroll_free(actor, fixture.course)
        .await
        .expect("enroll");

    let progress = fixture
        .service
        .course_progress(actor.id, fixture.course)
        .await
        .expect("progress");
    assert_eq!(progress.percentage, 0);
    assert_eq!(progress.total_lessons, 10);
}

#[tokio::test]
async fn zero_lesson_course_reports_zero_percent() {
    let fixture = fixture_with_lessons(0, Decimal::ZERO).await;
    let actor = student();
    fixture
        .service
        .enroll_free(actor, fixture.course)
        .await
        .expect("enroll");

    let progress = fixture
        .service
        .course_progress(actor.id, fixture.course)
        .await
        .expect("progress");
    assert_eq!(progress.percentage, 0);
    assert_eq!(progress.total_lessons, 0);
}

#[tokio::test]
async fn marking_lessons_never_decreases_percentage() {
    let fixture = fixture_with_lessons(4, Decimal::ZERO).await;
    let actor = student();
    fixture
        .service
        .enroll_free(actor, fixture.course)
        .await
        .expect("enroll");

    let mut last = 0u8;
    for lesson in &fixture.lessons {
        let progress = fixture
            .service
            .mark_lesson_complete(actor, *lesson)
            .await
            .expect("mark");
        assert!(progress.percentage >= last);
        last = progress.percentage;
    }
    assert_eq!(last, 100);

    // Re-marking an already complete lesson holds steady.
    let progress = fixture
        .service
        .mark_lesson_complete(actor, fixture.lessons[0])
        .await
        .expect("re-mark");
    assert_eq!(progress.percentage, 100);
}

#[tokio::test]
async fn completion_flag_lands_on_enrollment_row() {
    let fixture = fixture_with_lessons(2, Decimal::ZERO).await;
    let actor = student();
    fixture
        .service
        .enroll_free(actor, fixture.course)
        .await
        .expect("enroll");

    for lesson in &fixture.lessons {
        fixture
            .service
            .mark_lesson_complete(actor, *lesson)
            .await
            .expect("mark");
    }

    let enrollment = fixture
        .enrollments
        .find(actor.id, fixture.course)
        .await
        .expect("find")
        .expect("enrolled");
    assert_eq!(enrollment.progress, 100);
    assert!(enrollment.completed);
}

#[tokio::test]
async fn marking_requires_enrollment() {
    let fixture = fixture_with_lessons(1, Decimal::ZERO).await;
    let err = fixture
        .service
        .mark_lesson_complete(student(), fixture.lessons[0])
        .await
        .expect_err("not enrolled");
    assert_eq!(err.code(), ErrorCode::Forbidden);
}

#[tokio::test]
async fn unknown_lesson_is_not_found() {
    let fixture = fixture_with_lessons(1, Decimal::ZERO).await;
    let err = fixture
        .service
        .mark_lesson_complete(student(), LessonId::new())
        .await
        .expect_err("missing lesson");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn enrollment_listing_carries_course_titles() {
    let fixture = fixture_with_lessons(1, Decimal::ZERO).await;
    let actor = student();
    fixture
        .service
        .enroll_free(actor, fixture.course)
        .await
        .expect("enroll");

    let views = fixture
        .service
        .my_enrollments(actor)
        .await
        .expect("list");
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].course_title, "Fixture course");
}
