//! Live-class session handlers.

use actix_web::{HttpResponse, get, post, web};

use crate::domain::classroom::ScheduleSessionRequest;
use crate::domain::ids::{CourseId, LiveSessionId};
use crate::server::AppServices;

use super::auth::Principal;
use super::error::ApiResult;

/// Schedule a live class on a managed course.
#[utoipa::path(
    post,
    path = "/api/v1/courses/{course_id}/sessions",
    request_body = ScheduleSessionRequest,
    responses(
        (status = 201, description = "Session scheduled"),
        (status = 403, description = "Course belongs to another instructor")
    ),
    tags = ["classroom"]
)]
#[post("/courses/{course_id}/sessions")]
pub async fn schedule_session(
    services: web::Data<AppServices>,
    principal: Principal,
    path: web::Path<CourseId>,
    body: web::Json<ScheduleSessionRequest>,
) -> ApiResult<HttpResponse> {
    let session = services
        .classroom
        .schedule(principal.actor(), path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(session))
}

/// Soft-cancel a hosted session.
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{session_id}/cancel",
    responses(
        (status = 204, description = "Session cancelled"),
        (status = 404, description = "Session not found")
    ),
    tags = ["classroom"]
)]
#[post("/sessions/{session_id}/cancel")]
pub async fn cancel_session(
    services: web::Data<AppServices>,
    principal: Principal,
    path: web::Path<LiveSessionId>,
) -> ApiResult<HttpResponse> {
    services
        .classroom
        .cancel(principal.actor(), path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Sessions of a course, for participants.
#[utoipa::path(
    get,
    path = "/api/v1/courses/{course_id}/sessions",
    responses(
        (status = 200, description = "Sessions, soonest first"),
        (status = 403, description = "Not a participant")
    ),
    tags = ["classroom"]
)]
#[get("/courses/{course_id}/sessions")]
pub async fn list_sessions(
    services: web::Data<AppServices>,
    principal: Principal,
    path: web::Path<CourseId>,
) -> ApiResult<HttpResponse> {
    let sessions = services
        .classroom
        .list(principal.actor(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(sessions))
}
