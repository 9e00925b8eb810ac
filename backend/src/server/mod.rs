//! Server wiring: service construction, route registration, migrations.

pub mod config;

use std::sync::Arc;

use actix_web::web;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use url::Url;

use crate::domain::accounts::{AccountsApi, AccountsService};
use crate::domain::billing::{BillingApi, BillingService};
use crate::domain::catalogue::{CatalogueApi, CatalogueService};
use crate::domain::certification::{CertificationApi, CertificationService};
use crate::domain::chat::{ChatApi, ChatService};
use crate::domain::classroom::{ClassroomApi, ClassroomService};
use crate::domain::ports::{CertificateRenderer, PaymentGateway};
use crate::domain::progress::{ProgressApi, ProgressService};
use crate::inbound::http::{
    billing, certificates, chat, classroom, courses, enrollments, users,
};
use crate::outbound::persistence::{
    DbPool, DieselCatalogueRepository, DieselCertificateRepository, DieselChatRepository,
    DieselClassroomRepository, DieselDiscountRepository, DieselEnrollmentRepository,
    DieselPaymentRepository, DieselUserRepository,
};

pub use self::config::{AppConfig, ConfigError};

/// Embedded SQL migrations, applied at startup.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Trait-object bundle of every domain service, shared as app data.
pub struct AppServices {
    /// Account management.
    pub accounts: Arc<dyn AccountsApi>,
    /// Course catalogue.
    pub catalogue: Arc<dyn CatalogueApi>,
    /// Enrollment and progress.
    pub progress: Arc<dyn ProgressApi>,
    /// Certificate eligibility and issuance.
    pub certification: Arc<dyn CertificationApi>,
    /// Discounts, checkout, reconciliation.
    pub billing: Arc<dyn BillingApi>,
    /// Live-class scheduling.
    pub classroom: Arc<dyn ClassroomApi>,
    /// Course chat.
    pub chat: Arc<dyn ChatApi>,
}

impl AppServices {
    /// Wire every service against Diesel repositories on `pool`.
    ///
    /// The gateway and renderer adapters stay generic so tests can pass
    /// doubles.
    pub fn with_database<G, R>(
        pool: DbPool,
        gateway: Arc<G>,
        renderer: Arc<R>,
        frontend_base: Url,
        signing_key: Vec<u8>,
    ) -> Self
    where
        G: PaymentGateway + 'static,
        R: CertificateRenderer + 'static,
    {
        let user_repo = Arc::new(DieselUserRepository::new(pool.clone()));
        let catalogue_repo = Arc::new(DieselCatalogueRepository::new(pool.clone()));
        let enrollment_repo = Arc::new(DieselEnrollmentRepository::new(pool.clone()));
        let certificate_repo = Arc::new(DieselCertificateRepository::new(pool.clone()));
        let discount_repo = Arc::new(DieselDiscountRepository::new(pool.clone()));
        let payment_repo = Arc::new(DieselPaymentRepository::new(pool.clone()));
        let classroom_repo = Arc::new(DieselClassroomRepository::new(pool.clone()));
        let chat_repo = Arc::new(DieselChatRepository::new(pool));

        Self {
            accounts: Arc::new(AccountsService::new(user_repo.clone())),
            catalogue: Arc::new(CatalogueService::new(catalogue_repo.clone())),
            progress: Arc::new(ProgressService::new(
                enrollment_repo.clone(),
                catalogue_repo.clone(),
            )),
            certification: Arc::new(CertificationService::new(
                certificate_repo,
                enrollment_repo.clone(),
                catalogue_repo.clone(),
                user_repo.clone(),
                renderer,
                frontend_base,
            )),
            billing: Arc::new(BillingService::new(
                discount_repo,
                payment_repo,
                enrollment_repo.clone(),
                catalogue_repo.clone(),
                user_repo,
                gateway,
                signing_key,
            )),
            classroom: Arc::new(ClassroomService::new(
                classroom_repo,
                catalogue_repo.clone(),
                enrollment_repo.clone(),
            )),
            chat: Arc::new(ChatService::new(chat_repo, catalogue_repo, enrollment_repo)),
        }
    }
}

/// Register every `/api/v1` route.
///
/// Static segments (`/courses/mine`) are registered before their dynamic
/// siblings (`/courses/{course_id}`) so they match first.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(users::register)
        .service(users::login)
        .service(users::logout)
        .service(users::me)
        .service(users::update_profile)
        .service(users::list_users)
        .service(courses::my_courses)
        .service(courses::list_courses)
        .service(courses::create_course)
        .service(enrollments::my_enrollments)
        .service(enrollments::enroll_free)
        .service(enrollments::course_progress)
        .service(enrollments::mark_lesson_complete)
        .service(certificates::eligibility)
        .service(certificates::issue)
        .service(certificates::verify)
        .service(certificates::invalidate)
        .service(certificates::record_grade)
        .service(billing::validate_discount)
        .service(billing::checkout)
        .service(billing::payment_webhook)
        .service(billing::create_discount)
        .service(billing::deactivate_discount)
        .service(billing::list_discounts)
        .service(billing::list_payments)
        .service(classroom::schedule_session)
        .service(classroom::cancel_session)
        .service(classroom::list_sessions)
        .service(chat::post_message)
        .service(chat::list_messages)
        .service(courses::add_module)
        .service(courses::add_lesson)
        .service(courses::update_course)
        .service(courses::course_detail);
}

/// Apply pending migrations against `database_url`.
///
/// Runs on a blocking thread; Diesel's migration harness is synchronous.
///
/// # Errors
///
/// Returns a message when the connection or a migration fails.
pub async fn run_migrations(database_url: &str) -> Result<(), String> {
    let url = database_url.to_owned();
    tokio::task::spawn_blocking(move || {
        use diesel::Connection;

        let mut conn = diesel::PgConnection::establish(&url)
            .map_err(|e| format!("database connection failed: {e}"))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map(|_| ())
            .map_err(|e| format!("migrations failed: {e}"))
    })
    .await
    .map_err(|e| format!("migration task panicked: {e}"))?
}
