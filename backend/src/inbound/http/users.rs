//! Account handlers: registration, login, profile, admin listing.

use actix_session::Session;
use actix_web::{HttpResponse, get, post, put, web};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::domain::accounts::RegistrationRequest;
use crate::domain::user::User;
use crate::server::AppServices;

use super::auth::Principal;
use super::error::ApiResult;
use super::PageQuery;

/// Login payload.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Login email.
    pub email: String,
    /// Plain-text password.
    pub password: String,
}

/// Profile update payload.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateRequest {
    /// New display name.
    pub display_name: String,
}

/// Register a new account.
#[utoipa::path(
    post,
    path = "/api/v1/users/register",
    request_body = RegistrationRequest,
    responses(
        (status = 201, description = "Account created", body = User),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Email already registered")
    ),
    tags = ["users"]
)]
#[post("/users/register")]
pub async fn register(
    services: web::Data<AppServices>,
    session: Session,
    body: web::Json<RegistrationRequest>,
) -> ApiResult<HttpResponse> {
    let user = services.accounts.register(body.into_inner()).await?;
    Principal::persist(&session, &user)?;
    Ok(HttpResponse::Created().json(user))
}

/// Verify credentials and open a session.
#[utoipa::path(
    post,
    path = "/api/v1/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = User),
        (status = 401, description = "Invalid credentials")
    ),
    tags = ["users"]
)]
#[post("/users/login")]
pub async fn login(
    services: web::Data<AppServices>,
    session: Session,
    body: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let user = services
        .accounts
        .login(&body.email, &body.password)
        .await?;
    Principal::persist(&session, &user)?;
    Ok(HttpResponse::Ok().json(user))
}

/// Close the session.
#[utoipa::path(
    post,
    path = "/api/v1/users/logout",
    responses((status = 204, description = "Session closed")),
    tags = ["users"]
)]
#[post("/users/logout")]
pub async fn logout(session: Session) -> HttpResponse {
    Principal::clear(&session);
    HttpResponse::NoContent().finish()
}

/// The authenticated account.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "The account", body = User),
        (status = 401, description = "Not authenticated")
    ),
    tags = ["users"]
)]
#[get("/users/me")]
pub async fn me(
    services: web::Data<AppServices>,
    principal: Principal,
) -> ApiResult<web::Json<User>> {
    let user = services.accounts.me(principal.actor().id).await?;
    Ok(web::Json(user))
}

/// Update the authenticated account's profile.
#[utoipa::path(
    put,
    path = "/api/v1/users/me",
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Updated account", body = User),
        (status = 400, description = "Validation failed")
    ),
    tags = ["users"]
)]
#[put("/users/me")]
pub async fn update_profile(
    services: web::Data<AppServices>,
    principal: Principal,
    body: web::Json<ProfileUpdateRequest>,
) -> ApiResult<web::Json<User>> {
    let user = services
        .accounts
        .update_profile(principal.actor(), &body.display_name)
        .await?;
    Ok(web::Json(user))
}

/// Page through all accounts. Admin only.
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    params(PageQuery),
    responses(
        (status = 200, description = "A page of accounts"),
        (status = 403, description = "Admin role required")
    ),
    tags = ["admin"]
)]
#[get("/admin/users")]
pub async fn list_users(
    services: web::Data<AppServices>,
    principal: Principal,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    let page = services
        .accounts
        .list_users(principal.actor(), query.into_inner().into_request())
        .await?;
    Ok(HttpResponse::Ok().json(page))
}
