//! HTTP surface test: routes, sessions, and the student journey.
//!
//! Boots the real Actix app (routes, session middleware, error envelope)
//! against services wired to in-memory doubles, then walks an instructor
//! and a student through the certificate flow over plain HTTP.

use std::sync::Arc;

use actix_session::SessionMiddleware;
use actix_session::storage::CookieSessionStore;
use actix_web::cookie::{Cookie, Key};
use actix_web::http::StatusCode;
use actix_web::{App, test, web};
use serde_json::{Value, json};
use url::Url;

use campus_backend::Trace;
use campus_backend::domain::accounts::AccountsService;
use campus_backend::domain::billing::BillingService;
use campus_backend::domain::catalogue::CatalogueService;
use campus_backend::domain::certification::CertificationService;
use campus_backend::domain::chat::ChatService;
use campus_backend::domain::classroom::ClassroomService;
use campus_backend::domain::progress::ProgressService;
use campus_backend::server::{AppServices, configure_api};
use campus_backend::testing::{
    InMemoryCatalogue, InMemoryCertificates, InMemoryChat, InMemoryClassroom, InMemoryDiscounts,
    InMemoryEnrollments, InMemoryPayments, InMemoryUsers, StubGateway, StubRenderer,
};

fn services() -> AppServices {
    let users = Arc::new(InMemoryUsers::default());
    let catalogue = Arc::new(InMemoryCatalogue::default());
    let enrollments = Arc::new(InMemoryEnrollments::new(catalogue.clone()));
    let certificates = Arc::new(InMemoryCertificates::default());
    let discounts = Arc::new(InMemoryDiscounts::default());
    let payments = Arc::new(InMemoryPayments::default());
    let classroom = Arc::new(InMemoryClassroom::default());
    let chat = Arc::new(InMemoryChat::default());
    let gateway = Arc::new(StubGateway::default());
    let renderer = Arc::new(StubRenderer::default());

    AppServices {
        accounts: Arc::new(AccountsService::new(users.clone())),
        catalogue: Arc::new(CatalogueService::new(catalogue.clone())),
        progress: Arc::new(ProgressService::new(enrollments.clone(), catalogue.clone())),
        certification: Arc::new(CertificationService::new(
            certificates,
            enrollments.clone(),
            catalogue.clone(),
            users.clone(),
            renderer,
            Url::parse("https://campus.test").expect("url"),
        )),
        billing: Arc::new(BillingService::new(
            discounts,
            payments,
            enrollments.clone(),
            catalogue.clone(),
            users,
            gateway,
            b"http-test-key".to_vec(),
        )),
        classroom: Arc::new(ClassroomService::new(
            classroom,
            catalogue.clone(),
            enrollments.clone(),
        )),
        chat: Arc::new(ChatService::new(chat, catalogue, enrollments)),
    }
}

macro_rules! app {
    () => {{
        let session =
            SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
                .cookie_secure(false)
                .build();
        test::init_service(
            App::new()
                .app_data(web::Data::new(services()))
                .wrap(Trace)
                .service(web::scope("/api/v1").wrap(session).configure(configure_api)),
        )
        .await
    }};
}

async fn register<S, B>(app: &S, name: &str, email: &str, role: &str) -> Cookie<'static>
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse<B>,
            Error = actix_web::Error,
        >,
    B: actix_web::body::MessageBody,
{
    let res = test::call_service(
        app,
        test::TestRequest::post()
            .uri("/api/v1/users/register")
            .set_json(json!({
                "displayName": name,
                "email": email,
                "password": "correct horse battery",
                "role": role,
            }))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    res.response()
        .cookies()
        .next()
        .expect("session cookie")
        .into_owned()
}

#[actix_web::test]
async fn unauthenticated_requests_get_the_error_envelope() {
    let app = app!();
    let res = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/v1/users/me").to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().contains_key("x-request-id"));

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["code"], "unauthorized");
}

#[actix_web::test]
async fn full_student_journey_over_http() {
    let app = app!();
    let instructor = register(&app, "Prof", "prof@campus.test", "instructor").await;
    let student = register(&app, "Ada", "ada@campus.test", "student").await;

    // Instructor: create, publish, and populate a free course.
    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/courses")
            .cookie(instructor.clone())
            .set_json(json!({
                "title": "Analytical engines",
                "description": "A history",
                "price": "0",
            }))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let course: Value = test::read_body_json(res).await;
    let course_id = course["id"].as_str().expect("course id").to_owned();

    let res = test::call_service(
        &app,
        test::TestRequest::patch()
            .uri(&format!("/api/v1/courses/{course_id}"))
            .cookie(instructor.clone())
            .set_json(json!({ "published": true }))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/courses/{course_id}/modules"))
            .cookie(instructor.clone())
            .set_json(json!({ "title": "Week one", "position": 0 }))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let module: Value = test::read_body_json(res).await;
    let module_id = module["id"].as_str().expect("module id").to_owned();

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/modules/{module_id}/lessons"))
            .cookie(instructor.clone())
            .set_json(json!({
                "title": "Difference engine",
                "position": 0,
                "durationMinutes": 20,
            }))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let lesson: Value = test::read_body_json(res).await;
    let lesson_id = lesson["id"].as_str().expect("lesson id").to_owned();

    // Student: enroll, complete the lesson, collect the certificate.
    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/courses/{course_id}/enroll"))
            .cookie(student.clone())
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/lessons/{lesson_id}/complete"))
            .cookie(student.clone())
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let progress: Value = test::read_body_json(res).await;
    assert_eq!(progress["percentage"], 100);

    let res = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!(
                "/api/v1/courses/{course_id}/certificate/eligibility"
            ))
            .cookie(student.clone())
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let verdict: Value = test::read_body_json(res).await;
    assert_eq!(verdict["eligible"], true);

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/courses/{course_id}/certificate"))
            .cookie(student.clone())
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let certificate: Value = test::read_body_json(res).await;
    let code = certificate["code"].as_str().expect("code").to_owned();
    assert!(code.starts_with("CERT-"));

    // Anyone can verify by code, no session required.
    let res = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/certificates/verify/{code}"))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let verified: Value = test::read_body_json(res).await;
    assert_eq!(verified["valid"], true);
}

#[actix_web::test]
async fn students_cannot_reach_admin_listings() {
    let app = app!();
    let student = register(&app, "Ada", "ada@campus.test", "student").await;

    let res = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/admin/payments")
            .cookie(student)
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["code"], "forbidden");
}

#[actix_web::test]
async fn draft_courses_are_hidden_from_the_public_listing() {
    let app = app!();
    let instructor = register(&app, "Prof", "prof@campus.test", "instructor").await;

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/courses")
            .cookie(instructor)
            .set_json(json!({ "title": "Secret draft", "price": "10.00" }))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/v1/courses").to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let page: Value = test::read_body_json(res).await;
    assert_eq!(page["items"].as_array().map(Vec::len), Some(0));
}
