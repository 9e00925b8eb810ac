//! Billing handlers: discounts, checkout, webhook reconciliation.

use actix_web::{HttpResponse, get, post, web};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::domain::billing::{NewDiscountRequest, WebhookNotification};
use crate::domain::ids::{CourseId, DiscountCodeId};
use crate::server::AppServices;

use super::PageQuery;
use super::auth::Principal;
use super::error::ApiResult;

/// Discount validation payload.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateDiscountRequest {
    /// The code to validate, matched case-insensitively.
    pub code: String,
}

/// Checkout payload.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Optional discount code applied to the price.
    #[serde(default)]
    pub discount_code: Option<String>,
}

/// Validate a discount code against a course for the actor.
///
/// Rejections come back as a 200 with `valid: false` and a message; they
/// are outcomes, not errors.
#[utoipa::path(
    post,
    path = "/api/v1/courses/{course_id}/discount/validate",
    request_body = ValidateDiscountRequest,
    responses(
        (status = 200, description = "Verdict with final price or rejection message"),
        (status = 404, description = "Course not found")
    ),
    tags = ["billing"]
)]
#[post("/courses/{course_id}/discount/validate")]
pub async fn validate_discount(
    services: web::Data<AppServices>,
    principal: Principal,
    path: web::Path<CourseId>,
    body: web::Json<ValidateDiscountRequest>,
) -> ApiResult<HttpResponse> {
    let verdict = services
        .billing
        .validate_discount(&body.code, principal.actor().id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(verdict))
}

/// Start a course purchase.
#[utoipa::path(
    post,
    path = "/api/v1/courses/{course_id}/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Either enrolled directly or a redirect URL"),
        (status = 404, description = "Course not found"),
        (status = 409, description = "Already enrolled")
    ),
    tags = ["billing"]
)]
#[post("/courses/{course_id}/checkout")]
pub async fn checkout(
    services: web::Data<AppServices>,
    principal: Principal,
    path: web::Path<CourseId>,
    body: web::Json<CheckoutRequest>,
) -> ApiResult<HttpResponse> {
    let outcome = services
        .billing
        .checkout(
            principal.actor(),
            path.into_inner(),
            body.into_inner().discount_code,
        )
        .await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// Inbound payment processor webhook.
///
/// Unauthenticated: only the payment id is read from the body; the
/// authoritative state is fetched back from the processor.
#[utoipa::path(
    post,
    path = "/api/v1/payments/webhook",
    request_body = WebhookNotification,
    responses(
        (status = 200, description = "Reconciliation outcome"),
        (status = 400, description = "Unverifiable notification")
    ),
    tags = ["billing"]
)]
#[post("/payments/webhook")]
pub async fn payment_webhook(
    services: web::Data<AppServices>,
    body: web::Json<WebhookNotification>,
) -> ApiResult<HttpResponse> {
    let outcome = services.billing.reconcile(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// Create a discount code. Admin only.
#[utoipa::path(
    post,
    path = "/api/v1/admin/discounts",
    request_body = NewDiscountRequest,
    responses(
        (status = 201, description = "Discount created"),
        (status = 403, description = "Admin role required")
    ),
    tags = ["admin"]
)]
#[post("/admin/discounts")]
pub async fn create_discount(
    services: web::Data<AppServices>,
    principal: Principal,
    body: web::Json<NewDiscountRequest>,
) -> ApiResult<HttpResponse> {
    let discount = services
        .billing
        .create_discount(principal.actor(), body.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(discount))
}

/// Deactivate a discount code. Admin only.
#[utoipa::path(
    post,
    path = "/api/v1/admin/discounts/{discount_id}/deactivate",
    responses(
        (status = 204, description = "Discount deactivated"),
        (status = 404, description = "Discount not found")
    ),
    tags = ["admin"]
)]
#[post("/admin/discounts/{discount_id}/deactivate")]
pub async fn deactivate_discount(
    services: web::Data<AppServices>,
    principal: Principal,
    path: web::Path<DiscountCodeId>,
) -> ApiResult<HttpResponse> {
    services
        .billing
        .deactivate_discount(principal.actor(), path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Page through discount codes. Admin only.
#[utoipa::path(
    get,
    path = "/api/v1/admin/discounts",
    params(PageQuery),
    responses((status = 200, description = "A page of discount codes")),
    tags = ["admin"]
)]
#[get("/admin/discounts")]
pub async fn list_discounts(
    services: web::Data<AppServices>,
    principal: Principal,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    let page = services
        .billing
        .list_discounts(principal.actor(), query.into_inner().into_request())
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

/// Page through payments. Admin only.
#[utoipa::path(
    get,
    path = "/api/v1/admin/payments",
    params(PageQuery),
    responses((status = 200, description = "A page of payments")),
    tags = ["admin"]
)]
#[get("/admin/payments")]
pub async fn list_payments(
    services: web::Data<AppServices>,
    principal: Principal,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    let page = services
        .billing
        .list_payments(principal.actor(), query.into_inner().into_request())
        .await?;
    Ok(HttpResponse::Ok().json(page))
}
