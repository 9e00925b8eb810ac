//! Catalogue handlers: courses, modules, lessons.

use actix_web::{HttpResponse, get, patch, post, web};

use crate::domain::CourseId;
use crate::domain::catalogue::{
    CourseUpdate, NewCourseRequest, NewLessonRequest, NewModuleRequest,
};
use crate::domain::ids::ModuleId;
use crate::server::AppServices;

use super::PageQuery;
use super::auth::Principal;
use super::error::ApiResult;

/// Page through the published catalogue. Public.
#[utoipa::path(
    get,
    path = "/api/v1/courses",
    params(PageQuery),
    responses((status = 200, description = "A page of published courses")),
    tags = ["courses"]
)]
#[get("/courses")]
pub async fn list_courses(
    services: web::Data<AppServices>,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    let page = services
        .catalogue
        .list_published(query.into_inner().into_request())
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

/// Full course tree. Drafts are visible to their managers only.
#[utoipa::path(
    get,
    path = "/api/v1/courses/{course_id}",
    responses(
        (status = 200, description = "Course with modules and lessons"),
        (status = 404, description = "Course not found or not published")
    ),
    tags = ["courses"]
)]
#[get("/courses/{course_id}")]
pub async fn course_detail(
    services: web::Data<AppServices>,
    principal: Option<Principal>,
    path: web::Path<CourseId>,
) -> ApiResult<HttpResponse> {
    let outline = services
        .catalogue
        .course_detail(principal.map(|p| p.actor()), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(outline))
}

/// Create a course owned by the acting instructor.
#[utoipa::path(
    post,
    path = "/api/v1/courses",
    request_body = NewCourseRequest,
    responses(
        (status = 201, description = "Course created"),
        (status = 403, description = "Instructor role required")
    ),
    tags = ["courses"]
)]
#[post("/courses")]
pub async fn create_course(
    services: web::Data<AppServices>,
    principal: Principal,
    body: web::Json<NewCourseRequest>,
) -> ApiResult<HttpResponse> {
    let course = services
        .catalogue
        .create_course(principal.actor(), body.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(course))
}

/// Patch a course the actor manages.
#[utoipa::path(
    patch,
    path = "/api/v1/courses/{course_id}",
    request_body = CourseUpdate,
    responses(
        (status = 200, description = "Updated course"),
        (status = 403, description = "Course belongs to another instructor"),
        (status = 404, description = "Course not found")
    ),
    tags = ["courses"]
)]
#[patch("/courses/{course_id}")]
pub async fn update_course(
    services: web::Data<AppServices>,
    principal: Principal,
    path: web::Path<CourseId>,
    body: web::Json<CourseUpdate>,
) -> ApiResult<HttpResponse> {
    let course = services
        .catalogue
        .update_course(principal.actor(), path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(course))
}

/// Courses owned by the acting instructor.
#[utoipa::path(
    get,
    path = "/api/v1/courses/mine",
    responses((status = 200, description = "Owned courses")),
    tags = ["courses"]
)]
#[get("/courses/mine")]
pub async fn my_courses(
    services: web::Data<AppServices>,
    principal: Principal,
) -> ApiResult<HttpResponse> {
    let courses = services.catalogue.my_courses(principal.actor()).await?;
    Ok(HttpResponse::Ok().json(courses))
}

/// Add a module to a course.
#[utoipa::path(
    post,
    path = "/api/v1/courses/{course_id}/modules",
    request_body = NewModuleRequest,
    responses(
        (status = 201, description = "Module created"),
        (status = 404, description = "Course not found")
    ),
    tags = ["courses"]
)]
#[post("/courses/{course_id}/modules")]
pub async fn add_module(
    services: web::Data<AppServices>,
    principal: Principal,
    path: web::Path<CourseId>,
    body: web::Json<NewModuleRequest>,
) -> ApiResult<HttpResponse> {
    let module = services
        .catalogue
        .add_module(principal.actor(), path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(module))
}

/// Add a lesson to a module.
#[utoipa::path(
    post,
    path = "/api/v1/modules/{module_id}/lessons",
    request_body = NewLessonRequest,
    responses(
        (status = 201, description = "Lesson created"),
        (status = 404, description = "Module not found")
    ),
    tags = ["courses"]
)]
#[post("/modules/{module_id}/lessons")]
pub async fn add_lesson(
    services: web::Data<AppServices>,
    principal: Principal,
    path: web::Path<ModuleId>,
    body: web::Json<NewLessonRequest>,
) -> ApiResult<HttpResponse> {
    let lesson = services
        .catalogue
        .add_lesson(principal.actor(), path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(lesson))
}
