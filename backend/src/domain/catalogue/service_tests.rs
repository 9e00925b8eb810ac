//! Unit tests for the catalogue service.

use std::sync::Arc;

use pagination::PageRequest;
use rust_decimal::Decimal;

use crate::domain::user::Actor;
use crate::domain::{ErrorCode, Role, UserId};
use crate::testing::InMemoryCatalogue;

use super::*;

fn service() -> CatalogueService<InMemoryCatalogue> {
    CatalogueService::new(Arc::new(InMemoryCatalogue::default()))
}

fn instructor() -> Actor {
    Actor {
        id: UserId::new(),
        role: Role::Instructor,
    }
}

fn student() -> Actor {
    Actor {
        id: UserId::new(),
        role: Role::Student,
    }
}

fn new_course(title: &str) -> NewCourseRequest {
    NewCourseRequest {
        title: title.to_owned(),
        description: String::new(),
        price: Decimal::new(4_990, 2),
    }
}

#[tokio::test]
async fn create_course_assigns_owner_and_starts_unpublished() {
    let service = service();
    let actor = instructor();

    let course = service
        .create_course(actor, new_course("Rust basics"))
        .await
        .expect("create");

    assert_eq!(course.instructor_id, actor.id);
    assert!(!course.published);
}

#[tokio::test]
async fn students_cannot_create_courses() {
    let err = service()
        .create_course(student(), new_course("Nope"))
        .await
        .expect_err("forbidden");
    assert_eq!(err.code(), ErrorCode::Forbidden);
}

#[tokio::test]
async fn blank_titles_are_rejected() {
    let err = service()
        .create_course(instructor(), new_course("   "))
        .await
        .expect_err("invalid");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[tokio::test]
async fn update_requires_ownership() {
    let service = service();
    let owner = instructor();
    let course = service
        .create_course(owner, new_course("Owned"))
        .await
        .expect("create");

    let intruder = instructor();
    let err = service
        .update_course(
            intruder,
            course.id,
            CourseUpdate {
                published: Some(true),
                ..CourseUpdate::default()
            },
        )
        .await
        .expect_err("forbidden");
    assert_eq!(err.code(), ErrorCode::Forbidden);

    let updated = service
        .update_course(
            owner,
            course.id,
            CourseUpdate {
                published: Some(true),
                ..CourseUpdate::default()
            },
        )
        .await
        .expect("update");
    assert!(updated.published);
}

#[tokio::test]
async fn admins_manage_any_course() {
    let service = service();
    let course = service
        .create_course(instructor(), new_course("Any"))
        .await
        .expect("create");

    let admin = Actor {
        id: UserId::new(),
        role: Role::Admin,
    };
    let updated = service
        .update_course(
            admin,
            course.id,
            CourseUpdate {
                title: Some("Renamed".to_owned()),
                ..CourseUpdate::default()
            },
        )
        .await
        .expect("update");
    assert_eq!(updated.title, "Renamed");
}

#[tokio::test]
async fn unpublished_detail_is_hidden_from_outsiders() {
    let service = service();
    let owner = instructor();
    let course = service
        .create_course(owner, new_course("Draft"))
        .await
        .expect("create");

    let err = service
        .course_detail(Some(student()), course.id)
        .await
        .expect_err("hidden");
    assert_eq!(err.code(), ErrorCode::NotFound);

    let err = service
        .course_detail(None, course.id)
        .await
        .expect_err("hidden anonymously");
    assert_eq!(err.code(), ErrorCode::NotFound);

    let outline = service
        .course_detail(Some(owner), course.id)
        .await
        .expect("owner sees draft");
    assert_eq!(outline.course.id, course.id);
}

#[tokio::test]
async fn outline_orders_modules_and_lessons_by_position() {
    let service = service();
    let owner = instructor();
    let course = service
        .create_course(owner, new_course("Ordered"))
        .await
        .expect("create");
    service
        .update_course(
            owner,
            course.id,
            CourseUpdate {
                published: Some(true),
                ..CourseUpdate::default()
            },
        )
        .await
        .expect("publish");

    let later = service
        .add_module(
            owner,
            course.id,
            NewModuleRequest {
                title: "Second".to_owned(),
                position: 1,
            },
        )
        .await
        .expect("module");
    let first = service
        .add_module(
            owner,
            course.id,
            NewModuleRequest {
                title: "First".to_owned(),
                position: 0,
            },
        )
        .await
        .expect("module");
    service
        .add_lesson(
            owner,
            first.id,
            NewLessonRequest {
                title: "Intro".to_owned(),
                position: 0,
                duration_minutes: 10,
            },
        )
        .await
        .expect("lesson");

    let outline = service
        .course_detail(None, course.id)
        .await
        .expect("detail");
    assert_eq!(outline.modules.len(), 2);
    assert_eq!(outline.modules[0].module.id, first.id);
    assert_eq!(outline.modules[1].module.id, later.id);
    assert_eq!(outline.modules[0].lessons.len(), 1);
}

#[tokio::test]
async fn add_lesson_to_unknown_module_is_not_found() {
    let err = service()
        .add_lesson(
            instructor(),
            crate::domain::ModuleId::new(),
            NewLessonRequest {
                title: "Lost".to_owned(),
                position: 0,
                duration_minutes: 5,
            },
        )
        .await
        .expect_err("missing module");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn published_listing_excludes_drafts() {
    let service = service();
    let owner = instructor();
    let draft = service
        .create_course(owner, new_course("Draft"))
        .await
        .expect("create");
    let live = service
        .create_course(owner, new_course("Live"))
        .await
        .expect("create");
    service
        .update_course(
            owner,
            live.id,
            CourseUpdate {
                published: Some(true),
                ..CourseUpdate::default()
            },
        )
        .await
        .expect("publish");

    let page = service
        .list_published(PageRequest::default())
        .await
        .expect("list");
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, live.id);
    assert!(page.items.iter().all(|c| c.id != draft.id));
}
