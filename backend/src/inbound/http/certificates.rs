//! Certification handlers: eligibility, issuance, verification, grading.

use actix_web::{HttpResponse, get, post, web};

use crate::domain::certification::GradeRequest;
use crate::domain::ids::{CertificateId, CourseId};
use crate::server::AppServices;

use super::auth::Principal;
use super::error::ApiResult;

/// Evaluate certificate eligibility for the actor. Read-only.
#[utoipa::path(
    get,
    path = "/api/v1/courses/{course_id}/certificate/eligibility",
    responses(
        (status = 200, description = "Eligibility verdict, rejections included"),
        (status = 404, description = "Course not found")
    ),
    tags = ["certificates"]
)]
#[get("/courses/{course_id}/certificate/eligibility")]
pub async fn eligibility(
    services: web::Data<AppServices>,
    principal: Principal,
    path: web::Path<CourseId>,
) -> ApiResult<HttpResponse> {
    let verdict = services
        .certification
        .evaluate(principal.actor().id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(verdict))
}

/// Issue the actor's certificate for a completed course.
///
/// Idempotent: a second call returns the already-issued certificate.
#[utoipa::path(
    post,
    path = "/api/v1/courses/{course_id}/certificate",
    responses(
        (status = 201, description = "Certificate issued or already present"),
        (status = 400, description = "Not eligible"),
        (status = 404, description = "Course not found")
    ),
    tags = ["certificates"]
)]
#[post("/courses/{course_id}/certificate")]
pub async fn issue(
    services: web::Data<AppServices>,
    principal: Principal,
    path: web::Path<CourseId>,
) -> ApiResult<HttpResponse> {
    let certificate = services
        .certification
        .issue(principal.actor(), path.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(certificate))
}

/// Public certificate verification by code.
#[utoipa::path(
    get,
    path = "/api/v1/certificates/verify/{code}",
    responses(
        (status = 200, description = "Certificate, including its validity flag"),
        (status = 404, description = "Unknown code")
    ),
    tags = ["certificates"]
)]
#[get("/certificates/verify/{code}")]
pub async fn verify(
    services: web::Data<AppServices>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let certificate = services.certification.verify(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(certificate))
}

/// Soft-invalidate a certificate. Admin only.
#[utoipa::path(
    post,
    path = "/api/v1/admin/certificates/{certificate_id}/invalidate",
    responses(
        (status = 204, description = "Certificate invalidated"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Certificate not found")
    ),
    tags = ["admin"]
)]
#[post("/admin/certificates/{certificate_id}/invalidate")]
pub async fn invalidate(
    services: web::Data<AppServices>,
    principal: Principal,
    path: web::Path<CertificateId>,
) -> ApiResult<HttpResponse> {
    services
        .certification
        .invalidate(principal.actor(), path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Record a graded submission on a managed course.
#[utoipa::path(
    post,
    path = "/api/v1/courses/{course_id}/grades",
    request_body = GradeRequest,
    responses(
        (status = 204, description = "Grade recorded"),
        (status = 403, description = "Course belongs to another instructor")
    ),
    tags = ["certificates"]
)]
#[post("/courses/{course_id}/grades")]
pub async fn record_grade(
    services: web::Data<AppServices>,
    principal: Principal,
    path: web::Path<CourseId>,
    body: web::Json<GradeRequest>,
) -> ApiResult<HttpResponse> {
    services
        .certification
        .record_grade(principal.actor(), path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
