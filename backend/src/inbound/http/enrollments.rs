//! Enrollment and progress handlers.

use actix_web::{HttpResponse, get, post, web};

use crate::domain::ids::{CourseId, LessonId};
use crate::server::AppServices;

use super::auth::Principal;
use super::error::ApiResult;

/// Enroll in a free course.
#[utoipa::path(
    post,
    path = "/api/v1/courses/{course_id}/enroll",
    responses(
        (status = 201, description = "Enrolled (idempotent)"),
        (status = 400, description = "Course requires payment"),
        (status = 404, description = "Course not found")
    ),
    tags = ["enrollments"]
)]
#[post("/courses/{course_id}/enroll")]
pub async fn enroll_free(
    services: web::Data<AppServices>,
    principal: Principal,
    path: web::Path<CourseId>,
) -> ApiResult<HttpResponse> {
    let enrollment = services
        .progress
        .enroll_free(principal.actor(), path.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(enrollment))
}

/// The actor's enrollments with course titles.
#[utoipa::path(
    get,
    path = "/api/v1/enrollments",
    responses((status = 200, description = "Enrollments with progress")),
    tags = ["enrollments"]
)]
#[get("/enrollments")]
pub async fn my_enrollments(
    services: web::Data<AppServices>,
    principal: Principal,
) -> ApiResult<HttpResponse> {
    let views = services.progress.my_enrollments(principal.actor()).await?;
    Ok(HttpResponse::Ok().json(views))
}

/// Aggregated progress for the actor in one course.
#[utoipa::path(
    get,
    path = "/api/v1/courses/{course_id}/progress",
    responses(
        (status = 200, description = "Completed/total lessons and percentage"),
        (status = 404, description = "Course not found")
    ),
    tags = ["enrollments"]
)]
#[get("/courses/{course_id}/progress")]
pub async fn course_progress(
    services: web::Data<AppServices>,
    principal: Principal,
    path: web::Path<CourseId>,
) -> ApiResult<HttpResponse> {
    let progress = services
        .progress
        .course_progress(principal.actor().id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(progress))
}

/// Mark a lesson complete and refresh the enrollment row.
#[utoipa::path(
    post,
    path = "/api/v1/lessons/{lesson_id}/complete",
    responses(
        (status = 200, description = "Updated progress"),
        (status = 403, description = "Not enrolled"),
        (status = 404, description = "Lesson not found")
    ),
    tags = ["enrollments"]
)]
#[post("/lessons/{lesson_id}/complete")]
pub async fn mark_lesson_complete(
    services: web::Data<AppServices>,
    principal: Principal,
    path: web::Path<LessonId>,
) -> ApiResult<HttpResponse> {
    let progress = services
        .progress
        .mark_lesson_complete(principal.actor(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(progress))
}
