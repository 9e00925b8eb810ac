//! Domain ports defining the edges of the hexagon.
//!
//! Ports describe how the domain expects to interact with driven adapters
//! (the database, the payment processor, the certificate renderer). Each
//! trait exposes strongly typed errors so adapters map their failures into
//! predictable variants instead of returning `anyhow::Result`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagination::{Page, PageRequest};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use super::catalogue::{Course, CourseModule, CourseUpdate, Lesson};
use super::certification::Certificate;
use super::chat::ChatMessage;
use super::classroom::LiveClassSession;
use super::discount::DiscountCode;
use super::enrollment::{Enrollment, LessonCounts, LessonProgress};
use super::ids::{
    CertificateId, CourseId, DiscountCodeId, LessonId, LiveSessionId, ModuleId, PaymentId, UserId,
};
use super::payment::{Payment, PaymentStatus};
use super::user::User;

/// Errors surfaced by persistence adapters.
///
/// Shared across every repository port: the services only ever distinguish
/// "the database is unreachable" from "the statement failed".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// Pool checkout or connection failures.
    #[error("repository connection failed: {message}")]
    Connection {
        /// Adapter-supplied description.
        message: String,
    },
    /// Query or statement execution failures.
    #[error("repository query failed: {message}")]
    Query {
        /// Adapter-supplied description.
        message: String,
    },
}

impl RepositoryError {
    /// Helper for connection oriented failures.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Helper for query failures.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

/// Errors surfaced by the payment processor adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Network-level failure reaching the processor.
    #[error("payment gateway transport failed: {message}")]
    Transport {
        /// Adapter-supplied description.
        message: String,
    },
    /// The processor answered with a non-success status.
    #[error("payment gateway returned status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body excerpt.
        message: String,
    },
    /// The processor's response did not decode.
    #[error("payment gateway response malformed: {message}")]
    Decode {
        /// Adapter-supplied description.
        message: String,
    },
}

impl GatewayError {
    /// Helper for transport failures.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Helper for non-success statuses.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Helper for decode failures.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

/// Errors surfaced by the certificate rendering adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The renderer is unreachable.
    #[error("certificate renderer unavailable: {message}")]
    Unavailable {
        /// Adapter-supplied description.
        message: String,
    },
    /// The renderer rejected the request.
    #[error("certificate rendering failed: {message}")]
    Failed {
        /// Adapter-supplied description.
        message: String,
    },
}

impl RenderError {
    /// Helper for outages.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Helper for rejected render requests.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Read models shared between ports and services
// ---------------------------------------------------------------------------

/// A module with its lessons, ordered by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleOutline {
    /// The module itself.
    pub module: CourseModule,
    /// Lessons in position order.
    pub lessons: Vec<Lesson>,
}

/// A course with its full module/lesson tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseOutline {
    /// The course.
    pub course: Course,
    /// Modules in position order.
    pub modules: Vec<ModuleOutline>,
}

/// Outcome of a transactional discount redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemOutcome {
    /// Usage recorded and the counter bumped.
    Applied,
    /// The compare-and-swap found the cap already reached.
    CapReached,
    /// The unique (discount, user) index rejected a second redemption.
    AlreadyUsed,
}

/// A graded assignment submission feeding the certificate score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionGrade {
    /// Primary identifier.
    pub id: Uuid,
    /// Graded student.
    pub student_id: UserId,
    /// Course the assignment belongs to.
    pub course_id: CourseId,
    /// Assignment label, free-form.
    pub assignment_title: String,
    /// Score awarded, `0..=100` by convention.
    #[schema(value_type = String, example = "87.5")]
    pub score: Decimal,
    /// When the grade was recorded.
    pub graded_at: DateTime<Utc>,
}

/// Order details sent to the processor when building a payment preference.
#[derive(Debug, Clone, PartialEq)]
pub struct CoursePaymentOrder {
    /// Course being purchased.
    pub course_id: CourseId,
    /// Title shown on the processor's checkout page.
    pub course_title: String,
    /// Amount to charge, after discounts.
    pub amount: Decimal,
    /// Payer's email, forwarded to the processor.
    pub payer_email: String,
    /// Structured reference echoed back by webhook notifications.
    pub external_reference: String,
}

/// A created processor checkout preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPreference {
    /// Processor-assigned preference identifier.
    pub preference_id: String,
    /// Where to send the payer to complete the purchase.
    pub redirect_url: String,
}

/// Authoritative payment state fetched from the processor.
///
/// `status` is the processor's raw vocabulary; callers normalise it via
/// [`PaymentStatus::parse`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorPaymentReport {
    /// Raw status string as reported.
    pub status: String,
    /// Amount the processor recorded, when present.
    pub amount: Option<Decimal>,
    /// Payment method detail, when present.
    pub method: Option<String>,
    /// The external reference echoed back, when present.
    pub external_reference: Option<String>,
}

/// A rendered certificate asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedAsset {
    /// Public URL of the rendered document.
    pub asset_url: String,
}

// ---------------------------------------------------------------------------
// Driven ports: persistence
// ---------------------------------------------------------------------------

/// Persistence port for user accounts and their credentials.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account with its password hash.
    async fn insert(&self, user: &User, password_hash: &str) -> Result<(), RepositoryError>;

    /// Fetch an account by identifier.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Fetch an account and its password hash by email.
    async fn credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Update an account's display name; `false` when the account is gone.
    async fn update_display_name(&self, id: UserId, name: &str) -> Result<bool, RepositoryError>;

    /// Page through all accounts, newest first.
    async fn list(&self, page: &PageRequest) -> Result<Page<User>, RepositoryError>;
}

/// Persistence port for the course catalogue tree.
#[async_trait]
pub trait CatalogueRepository: Send + Sync {
    /// Insert a new course.
    async fn insert_course(&self, course: &Course) -> Result<(), RepositoryError>;

    /// Apply a partial update; returns the updated course or `None` when
    /// it does not exist.
    async fn update_course(
        &self,
        id: CourseId,
        update: &CourseUpdate,
    ) -> Result<Option<Course>, RepositoryError>;

    /// Fetch a course by id.
    async fn find_course(&self, id: CourseId) -> Result<Option<Course>, RepositoryError>;

    /// Page through published courses, newest first.
    async fn list_published(&self, page: &PageRequest) -> Result<Page<Course>, RepositoryError>;

    /// All courses owned by an instructor.
    async fn list_by_instructor(&self, instructor: UserId)
        -> Result<Vec<Course>, RepositoryError>;

    /// Insert a module.
    async fn insert_module(&self, module: &CourseModule) -> Result<(), RepositoryError>;

    /// Insert a lesson.
    async fn insert_lesson(&self, lesson: &Lesson) -> Result<(), RepositoryError>;

    /// The full course tree, or `None` when the course does not exist.
    async fn outline(&self, id: CourseId) -> Result<Option<CourseOutline>, RepositoryError>;

    /// The course a lesson belongs to, through its module.
    async fn course_of_lesson(&self, lesson: LessonId)
        -> Result<Option<CourseId>, RepositoryError>;

    /// The course a module belongs to.
    async fn course_of_module(&self, module: ModuleId)
        -> Result<Option<CourseId>, RepositoryError>;
}

/// Persistence port for enrollments and lesson progress.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Insert unless an enrollment for (user, course) already exists.
    ///
    /// Returns `true` when a row was inserted, `false` when the unique
    /// index silently dropped the duplicate.
    async fn insert_if_absent(&self, enrollment: &Enrollment) -> Result<bool, RepositoryError>;

    /// Fetch one enrollment.
    async fn find(
        &self,
        user: UserId,
        course: CourseId,
    ) -> Result<Option<Enrollment>, RepositoryError>;

    /// All enrollments of a user, newest first.
    async fn list_for_user(&self, user: UserId) -> Result<Vec<Enrollment>, RepositoryError>;

    /// Write the aggregated progress onto the enrollment row.
    async fn set_progress(
        &self,
        user: UserId,
        course: CourseId,
        progress: u8,
        completed: bool,
    ) -> Result<bool, RepositoryError>;

    /// Record a lesson completion; overwrites idempotently.
    async fn upsert_lesson_progress(
        &self,
        progress: &LessonProgress,
    ) -> Result<(), RepositoryError>;

    /// Total and completed lesson counts for a (user, course) pair.
    async fn lesson_counts(
        &self,
        user: UserId,
        course: CourseId,
    ) -> Result<LessonCounts, RepositoryError>;
}

/// Persistence port for certificates and assignment grades.
#[async_trait]
pub trait CertificateRepository: Send + Sync {
    /// Insert a certificate unless one exists for (student, course).
    ///
    /// Runs insert and fallback read in one transaction so concurrent
    /// issuance converges on a single row; returns the stored certificate
    /// either way.
    async fn insert_or_existing(
        &self,
        certificate: &Certificate,
    ) -> Result<Certificate, RepositoryError>;

    /// Fetch the certificate for (student, course), if issued.
    async fn find_for(
        &self,
        student: UserId,
        course: CourseId,
    ) -> Result<Option<Certificate>, RepositoryError>;

    /// Look a certificate up by its public code.
    async fn find_by_code(&self, code: &str) -> Result<Option<Certificate>, RepositoryError>;

    /// Flip the validity flag; `false` when the certificate is unknown.
    async fn set_validity(
        &self,
        id: CertificateId,
        valid: bool,
    ) -> Result<bool, RepositoryError>;

    /// Record a graded submission.
    async fn record_grade(&self, grade: &SubmissionGrade) -> Result<(), RepositoryError>;

    /// Average score across graded submissions; `None` when nothing is
    /// graded.
    async fn average_score(
        &self,
        student: UserId,
        course: CourseId,
    ) -> Result<Option<Decimal>, RepositoryError>;
}

/// Persistence port for discount codes and their usage ledger.
#[async_trait]
pub trait DiscountRepository: Send + Sync {
    /// Insert a new code.
    async fn insert(&self, code: &DiscountCode) -> Result<(), RepositoryError>;

    /// Case-insensitive lookup by code.
    async fn find_by_code(&self, code: &str) -> Result<Option<DiscountCode>, RepositoryError>;

    /// Whether this user already redeemed this code.
    async fn has_usage(
        &self,
        code: DiscountCodeId,
        user: UserId,
    ) -> Result<bool, RepositoryError>;

    /// Transactionally record a usage row and bump `current_uses`.
    ///
    /// The counter update is a guarded compare-and-swap against
    /// `max_uses`; redemptions racing at the cap lose cleanly instead of
    /// overshooting.
    async fn redeem(
        &self,
        code: DiscountCodeId,
        user: UserId,
        payment: Option<PaymentId>,
    ) -> Result<RedeemOutcome, RepositoryError>;

    /// Toggle the active flag; `false` when the code is unknown.
    async fn set_active(&self, code: DiscountCodeId, active: bool)
        -> Result<bool, RepositoryError>;

    /// Page through all codes, newest first.
    async fn list(&self, page: &PageRequest) -> Result<Page<DiscountCode>, RepositoryError>;
}

/// Persistence port for payment records.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Insert a new payment row.
    async fn insert(&self, payment: &Payment) -> Result<(), RepositoryError>;

    /// Fetch by the processor's payment identifier.
    async fn find_by_processor_id(&self, id: &str) -> Result<Option<Payment>, RepositoryError>;

    /// Fetch by external reference, oldest pending first.
    async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, RepositoryError>;

    /// Apply a status report onto an existing row.
    async fn apply_status(
        &self,
        id: PaymentId,
        status: PaymentStatus,
        processor_id: Option<&str>,
        method_detail: Option<&str>,
        approved_at: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError>;

    /// Page through all payments, newest first.
    async fn list(&self, page: &PageRequest) -> Result<Page<Payment>, RepositoryError>;
}

/// Persistence port for live-class session metadata.
#[async_trait]
pub trait ClassroomRepository: Send + Sync {
    /// Insert a scheduled session.
    async fn insert(&self, session: &LiveClassSession) -> Result<(), RepositoryError>;

    /// Fetch a session by id.
    async fn find(&self, id: LiveSessionId)
        -> Result<Option<LiveClassSession>, RepositoryError>;

    /// Soft-cancel a session; `false` when it is unknown.
    async fn set_cancelled(&self, id: LiveSessionId) -> Result<bool, RepositoryError>;

    /// Sessions of a course, soonest first, cancelled ones included.
    async fn list_for_course(
        &self,
        course: CourseId,
    ) -> Result<Vec<LiveClassSession>, RepositoryError>;
}

/// Persistence port for course chat messages.
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Insert a message.
    async fn insert(&self, message: &ChatMessage) -> Result<(), RepositoryError>;

    /// Page through a course's messages, oldest first.
    async fn list_for_course(
        &self,
        course: CourseId,
        page: &PageRequest,
    ) -> Result<Page<ChatMessage>, RepositoryError>;
}

// ---------------------------------------------------------------------------
// Driven ports: external collaborators
// ---------------------------------------------------------------------------

/// Client port for the external payment processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a checkout preference for a course purchase.
    async fn create_course_payment(
        &self,
        order: &CoursePaymentOrder,
    ) -> Result<PaymentPreference, GatewayError>;

    /// Fetch the authoritative state of a payment.
    ///
    /// Webhook bodies are never trusted; reconciliation always re-reads
    /// the status through this call.
    async fn payment_status(
        &self,
        processor_payment_id: &str,
    ) -> Result<ProcessorPaymentReport, GatewayError>;
}

/// Client port for the PDF/QR certificate rendering service.
#[async_trait]
pub trait CertificateRenderer: Send + Sync {
    /// Render a certificate document and return its public URL.
    async fn render(
        &self,
        certificate: &Certificate,
        student_name: &str,
        course_title: &str,
    ) -> Result<RenderedAsset, RenderError>;
}

// ---------------------------------------------------------------------------
// Error mapping helpers
// ---------------------------------------------------------------------------

/// Map repository failures into transport-agnostic domain errors.
pub fn map_repository_error(error: RepositoryError) -> super::Error {
    match error {
        RepositoryError::Connection { message } => {
            super::Error::service_unavailable(format!("storage unavailable: {message}"))
        }
        RepositoryError::Query { message } => {
            super::Error::internal(format!("storage error: {message}"))
        }
    }
}

/// Map gateway failures into transport-agnostic domain errors.
pub fn map_gateway_error(error: GatewayError) -> super::Error {
    match error {
        GatewayError::Transport { message } => {
            super::Error::service_unavailable(format!("payment processor unreachable: {message}"))
        }
        GatewayError::Status { status, message } => super::Error::internal(format!(
            "payment processor returned status {status}: {message}"
        )),
        GatewayError::Decode { message } => {
            super::Error::internal(format!("payment processor response malformed: {message}"))
        }
    }
}
