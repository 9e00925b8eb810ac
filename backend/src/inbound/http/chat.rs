//! Course chat handlers.

use actix_web::{HttpResponse, get, post, web};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::domain::ids::CourseId;
use crate::server::AppServices;

use super::PageQuery;
use super::auth::Principal;
use super::error::ApiResult;

/// Chat post payload.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageRequest {
    /// Message text.
    pub body: String,
}

/// Post a message on a course board.
#[utoipa::path(
    post,
    path = "/api/v1/courses/{course_id}/messages",
    request_body = PostMessageRequest,
    responses(
        (status = 201, description = "Message posted"),
        (status = 403, description = "Not a participant")
    ),
    tags = ["chat"]
)]
#[post("/courses/{course_id}/messages")]
pub async fn post_message(
    services: web::Data<AppServices>,
    principal: Principal,
    path: web::Path<CourseId>,
    body: web::Json<PostMessageRequest>,
) -> ApiResult<HttpResponse> {
    let message = services
        .chat
        .post(principal.actor(), path.into_inner(), &body.body)
        .await?;
    Ok(HttpResponse::Created().json(message))
}

/// Page through a course's messages, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/courses/{course_id}/messages",
    params(PageQuery),
    responses(
        (status = 200, description = "A page of messages"),
        (status = 403, description = "Not a participant")
    ),
    tags = ["chat"]
)]
#[get("/courses/{course_id}/messages")]
pub async fn list_messages(
    services: web::Data<AppServices>,
    principal: Principal,
    path: web::Path<CourseId>,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    let page = services
        .chat
        .list(
            principal.actor(),
            path.into_inner(),
            query.into_inner().into_request(),
        )
        .await?;
    Ok(HttpResponse::Ok().json(page))
}
