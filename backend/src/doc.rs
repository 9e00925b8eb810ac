//! OpenAPI document assembled from the handler annotations.

use utoipa::OpenApi;

/// Public OpenAPI surface served by Swagger UI in debug builds.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Campus Virtual API",
        description = "Learning-management backend: catalogue, enrollments, \
                       progress, certificates, discounts and payments."
    ),
    paths(
        crate::inbound::http::users::register,
        crate::inbound::http::users::login,
        crate::inbound::http::users::logout,
        crate::inbound::http::users::me,
        crate::inbound::http::users::update_profile,
        crate::inbound::http::users::list_users,
        crate::inbound::http::courses::list_courses,
        crate::inbound::http::courses::course_detail,
        crate::inbound::http::courses::create_course,
        crate::inbound::http::courses::update_course,
        crate::inbound::http::courses::my_courses,
        crate::inbound::http::courses::add_module,
        crate::inbound::http::courses::add_lesson,
        crate::inbound::http::enrollments::enroll_free,
        crate::inbound::http::enrollments::my_enrollments,
        crate::inbound::http::enrollments::course_progress,
        crate::inbound::http::enrollments::mark_lesson_complete,
        crate::inbound::http::certificates::eligibility,
        crate::inbound::http::certificates::issue,
        crate::inbound::http::certificates::verify,
        crate::inbound::http::certificates::invalidate,
        crate::inbound::http::certificates::record_grade,
        crate::inbound::http::billing::validate_discount,
        crate::inbound::http::billing::checkout,
        crate::inbound::http::billing::payment_webhook,
        crate::inbound::http::billing::create_discount,
        crate::inbound::http::billing::deactivate_discount,
        crate::inbound::http::billing::list_discounts,
        crate::inbound::http::billing::list_payments,
        crate::inbound::http::classroom::schedule_session,
        crate::inbound::http::classroom::cancel_session,
        crate::inbound::http::classroom::list_sessions,
        crate::inbound::http::chat::post_message,
        crate::inbound::http::chat::list_messages,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        crate::domain::user::User,
        crate::domain::user::Role,
        crate::domain::catalogue::Course,
        crate::domain::catalogue::CourseUpdate,
        crate::domain::catalogue::CourseModule,
        crate::domain::catalogue::Lesson,
        crate::domain::catalogue::NewCourseRequest,
        crate::domain::catalogue::NewModuleRequest,
        crate::domain::catalogue::NewLessonRequest,
        crate::domain::ports::CourseOutline,
        crate::domain::ports::ModuleOutline,
        crate::domain::ports::SubmissionGrade,
        crate::domain::ports::PaymentPreference,
        crate::domain::enrollment::Enrollment,
        crate::domain::enrollment::LessonProgress,
        crate::domain::enrollment::CourseProgress,
        crate::domain::progress::EnrollmentView,
        crate::domain::certification::Certificate,
        crate::domain::certification::EligibilityVerdict,
        crate::domain::certification::GradeRequest,
        crate::domain::discount::DiscountCode,
        crate::domain::discount::DiscountVerdict,
        crate::domain::payment::Payment,
        crate::domain::payment::PaymentStatus,
        crate::domain::billing::CheckoutOutcome,
        crate::domain::billing::ReconcileOutcome,
        crate::domain::billing::WebhookNotification,
        crate::domain::billing::NewDiscountRequest,
        crate::domain::classroom::LiveClassSession,
        crate::domain::classroom::ScheduleSessionRequest,
        crate::domain::chat::ChatMessage,
        crate::domain::accounts::RegistrationRequest,
        crate::inbound::http::users::LoginRequest,
        crate::inbound::http::users::ProfileUpdateRequest,
        crate::inbound::http::billing::ValidateDiscountRequest,
        crate::inbound::http::billing::CheckoutRequest,
        crate::inbound::http::chat::PostMessageRequest,
        crate::inbound::http::error::ApiError,
        crate::domain::error::ErrorCode,
    ))
)]
pub struct ApiDoc;
