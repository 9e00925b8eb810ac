//! In-memory port implementations for tests.
//!
//! These doubles back the domain services in unit and integration tests
//! without a database. They mirror the adapters' observable semantics:
//! insert-or-ignore enrollments, transactional discount redemption, the
//! certificate uniqueness guarantee.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagination::{Cursor, Page, PageRequest};
use rust_decimal::Decimal;

use crate::domain::catalogue::{Course, CourseModule, CourseUpdate, Lesson};
use crate::domain::certification::Certificate;
use crate::domain::chat::ChatMessage;
use crate::domain::classroom::LiveClassSession;
use crate::domain::discount::DiscountCode;
use crate::domain::enrollment::{Enrollment, LessonCounts, LessonProgress};
use crate::domain::ids::{
    CertificateId, CourseId, DiscountCodeId, LessonId, LiveSessionId, ModuleId, PaymentId,
    UserId,
};
use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::ports::{
    CatalogueRepository, CertificateRenderer, CertificateRepository, ChatRepository,
    ClassroomRepository, CourseOutline, CoursePaymentOrder, DiscountRepository,
    EnrollmentRepository, GatewayError, ModuleOutline, PaymentGateway, PaymentPreference,
    PaymentRepository, ProcessorPaymentReport, RedeemOutcome, RenderError, RenderedAsset,
    RepositoryError, SubmissionGrade, UserRepository,
};
use crate::domain::user::User;

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().expect("test store poisoned")
}

/// Slice a full result set into an offset-cursor page.
fn page_slice<T: Clone>(items: &[T], page: &PageRequest) -> Result<Page<T>, RepositoryError> {
    let offset: usize = match page.cursor() {
        Some(cursor) => cursor
            .decode()
            .map_err(|e| RepositoryError::query(e.to_string()))?,
        None => 0,
    };
    let limit = page.limit() as usize;
    let slice: Vec<T> = items.iter().skip(offset).take(limit).cloned().collect();
    let next = offset + slice.len();
    if next < items.len() {
        let cursor = Cursor::encode(&next).map_err(|e| RepositoryError::query(e.to_string()))?;
        Ok(Page::with_next(slice, cursor))
    } else {
        Ok(Page::last(slice))
    }
}

/// In-memory catalogue store.
#[derive(Default)]
pub struct InMemoryCatalogue {
    courses: Mutex<Vec<Course>>,
    modules: Mutex<Vec<CourseModule>>,
    lessons: Mutex<Vec<Lesson>>,
}

impl InMemoryCatalogue {
    /// Snapshot of lesson ids reachable through a course's modules.
    pub fn lessons_of_course(&self, course: CourseId) -> Vec<LessonId> {
        let module_ids: Vec<ModuleId> = lock(&self.modules)
            .iter()
            .filter(|m| m.course_id == course)
            .map(|m| m.id)
            .collect();
        lock(&self.lessons)
            .iter()
            .filter(|l| module_ids.contains(&l.module_id))
            .map(|l| l.id)
            .collect()
    }
}

#[async_trait]
impl CatalogueRepository for InMemoryCatalogue {
    async fn insert_course(&self, course: &Course) -> Result<(), RepositoryError> {
        lock(&self.courses).push(course.clone());
        Ok(())
    }

    async fn update_course(
        &self,
        id: CourseId,
        update: &CourseUpdate,
    ) -> Result<Option<Course>, RepositoryError> {
        let mut courses = lock(&self.courses);
        let Some(course) = courses.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(title) = &update.title {
            course.title = title.clone();
        }
        if let Some(description) = &update.description {
            course.description = description.clone();
        }
        if let Some(price) = update.price {
            course.price = price;
        }
        if let Some(published) = update.published {
            course.published = published;
        }
        Ok(Some(course.clone()))
    }

    async fn find_course(&self, id: CourseId) -> Result<Option<Course>, RepositoryError> {
        Ok(lock(&self.courses).iter().find(|c| c.id == id).cloned())
    }

    async fn list_published(&self, page: &PageRequest) -> Result<Page<Course>, RepositoryError> {
        let mut published: Vec<Course> = lock(&self.courses)
            .iter()
            .filter(|c| c.published)
            .cloned()
            .collect();
        published.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        page_slice(&published, page)
    }

    async fn list_by_instructor(
        &self,
        instructor: UserId,
    ) -> Result<Vec<Course>, RepositoryError> {
        Ok(lock(&self.courses)
            .iter()
            .filter(|c| c.instructor_id == instructor)
            .cloned()
            .collect())
    }

    async fn insert_module(&self, module: &CourseModule) -> Result<(), RepositoryError> {
        lock(&self.modules).push(module.clone());
        Ok(())
    }

    async fn insert_lesson(&self, lesson: &Lesson) -> Result<(), RepositoryError> {
        lock(&self.lessons).push(lesson.clone());
        Ok(())
    }

    async fn outline(&self, id: CourseId) -> Result<Option<CourseOutline>, RepositoryError> {
        let Some(course) = lock(&self.courses).iter().find(|c| c.id == id).cloned() else {
            return Ok(None);
        };
        let mut modules: Vec<CourseModule> = lock(&self.modules)
            .iter()
            .filter(|m| m.course_id == id)
            .cloned()
            .collect();
        modules.sort_by_key(|m| m.position);
        let lessons = lock(&self.lessons);
        let modules = modules
            .into_iter()
            .map(|module| {
                let mut module_lessons: Vec<Lesson> = lessons
                    .iter()
                    .filter(|l| l.module_id == module.id)
                    .cloned()
                    .collect();
                module_lessons.sort_by_key(|l| l.position);
                ModuleOutline {
                    module,
                    lessons: module_lessons,
                }
            })
            .collect();
        Ok(Some(CourseOutline { course, modules }))
    }

    async fn course_of_lesson(
        &self,
        lesson: LessonId,
    ) -> Result<Option<CourseId>, RepositoryError> {
        let module_id = lock(&self.lessons)
            .iter()
            .find(|l| l.id == lesson)
            .map(|l| l.module_id);
        let Some(module_id) = module_id else {
            return Ok(None);
        };
        Ok(lock(&self.modules)
            .iter()
            .find(|m| m.id == module_id)
            .map(|m| m.course_id))
    }

    async fn course_of_module(
        &self,
        module: ModuleId,
    ) -> Result<Option<CourseId>, RepositoryError> {
        Ok(lock(&self.modules)
            .iter()
            .find(|m| m.id == module)
            .map(|m| m.course_id))
    }
}

/// In-memory enrollment and lesson-progress store.
///
/// Holds a handle to the catalogue so lesson counts can join through
/// modules the way the SQL adapter does.
pub struct InMemoryEnrollments {
    catalogue: Arc<InMemoryCatalogue>,
    enrollments: Mutex<Vec<Enrollment>>,
    progress: Mutex<Vec<LessonProgress>>,
}

impl InMemoryEnrollments {
    /// Create a store joined to the given catalogue.
    pub fn new(catalogue: Arc<InMemoryCatalogue>) -> Self {
        Self {
            catalogue,
            enrollments: Mutex::new(Vec::new()),
            progress: Mutex::new(Vec::new()),
        }
    }

    /// Number of enrollment rows for a (user, course) pair.
    pub fn enrollment_rows(&self, user: UserId, course: CourseId) -> usize {
        lock(&self.enrollments)
            .iter()
            .filter(|e| e.user_id == user && e.course_id == course)
            .count()
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryEnrollments {
    async fn insert_if_absent(&self, enrollment: &Enrollment) -> Result<bool, RepositoryError> {
        let mut enrollments = lock(&self.enrollments);
        let exists = enrollments
            .iter()
            .any(|e| e.user_id == enrollment.user_id && e.course_id == enrollment.course_id);
        if exists {
            return Ok(false);
        }
        enrollments.push(enrollment.clone());
        Ok(true)
    }

    async fn find(
        &self,
        user: UserId,
        course: CourseId,
    ) -> Result<Option<Enrollment>, RepositoryError> {
        Ok(lock(&self.enrollments)
            .iter()
            .find(|e| e.user_id == user && e.course_id == course)
            .cloned())
    }

    async fn list_for_user(&self, user: UserId) -> Result<Vec<Enrollment>, RepositoryError> {
        Ok(lock(&self.enrollments)
            .iter()
            .filter(|e| e.user_id == user)
            .cloned()
            .collect())
    }

    async fn set_progress(
        &self,
        user: UserId,
        course: CourseId,
        progress: u8,
        completed: bool,
    ) -> Result<bool, RepositoryError> {
        let mut enrollments = lock(&self.enrollments);
        let Some(row) = enrollments
            .iter_mut()
            .find(|e| e.user_id == user && e.course_id == course)
        else {
            return Ok(false);
        };
        row.progress = progress;
        row.completed = completed;
        Ok(true)
    }

    async fn upsert_lesson_progress(
        &self,
        progress: &LessonProgress,
    ) -> Result<(), RepositoryError> {
        let mut rows = lock(&self.progress);
        if let Some(row) = rows
            .iter_mut()
            .find(|p| p.user_id == progress.user_id && p.lesson_id == progress.lesson_id)
        {
            row.completed_at = progress.completed_at;
        } else {
            rows.push(progress.clone());
        }
        Ok(())
    }

    async fn lesson_counts(
        &self,
        user: UserId,
        course: CourseId,
    ) -> Result<LessonCounts, RepositoryError> {
        let lesson_ids = self.catalogue.lessons_of_course(course);
        let completed = lock(&self.progress)
            .iter()
            .filter(|p| p.user_id == user && lesson_ids.contains(&p.lesson_id))
            .count();
        Ok(LessonCounts {
            total: lesson_ids.len() as u32,
            completed: completed as u32,
        })
    }
}

/// In-memory certificate and grade store.
#[derive(Default)]
pub struct InMemoryCertificates {
    certificates: Mutex<Vec<Certificate>>,
    grades: Mutex<Vec<SubmissionGrade>>,
}

impl InMemoryCertificates {
    /// Number of certificate rows for a (student, course) pair.
    pub fn certificate_rows(&self, student: UserId, course: CourseId) -> usize {
        lock(&self.certificates)
            .iter()
            .filter(|c| c.student_id == student && c.course_id == course)
            .count()
    }
}

#[async_trait]
impl CertificateRepository for InMemoryCertificates {
    async fn insert_or_existing(
        &self,
        certificate: &Certificate,
    ) -> Result<Certificate, RepositoryError> {
        let mut certificates = lock(&self.certificates);
        if let Some(existing) = certificates
            .iter()
            .find(|c| c.student_id == certificate.student_id && c.course_id == certificate.course_id)
        {
            return Ok(existing.clone());
        }
        certificates.push(certificate.clone());
        Ok(certificate.clone())
    }

    async fn find_for(
        &self,
        student: UserId,
        course: CourseId,
    ) -> Result<Option<Certificate>, RepositoryError> {
        Ok(lock(&self.certificates)
            .iter()
            .find(|c| c.student_id == student && c.course_id == course)
            .cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Certificate>, RepositoryError> {
        Ok(lock(&self.certificates)
            .iter()
            .find(|c| c.code == code)
            .cloned())
    }

    async fn set_validity(
        &self,
        id: CertificateId,
        valid: bool,
    ) -> Result<bool, RepositoryError> {
        let mut certificates = lock(&self.certificates);
        let Some(row) = certificates.iter_mut().find(|c| c.id == id) else {
            return Ok(false);
        };
        row.valid = valid;
        Ok(true)
    }

    async fn record_grade(&self, grade: &SubmissionGrade) -> Result<(), RepositoryError> {
        lock(&self.grades).push(grade.clone());
        Ok(())
    }

    async fn average_score(
        &self,
        student: UserId,
        course: CourseId,
    ) -> Result<Option<Decimal>, RepositoryError> {
        let grades = lock(&self.grades);
        let scores: Vec<Decimal> = grades
            .iter()
            .filter(|g| g.student_id == student && g.course_id == course)
            .map(|g| g.score)
            .collect();
        if scores.is_empty() {
            return Ok(None);
        }
        let total: Decimal = scores.iter().copied().sum();
        Ok(Some(total / Decimal::from(scores.len() as u64)))
    }
}

/// In-memory discount store with transactional redemption semantics.
#[derive(Default)]
pub struct InMemoryDiscounts {
    codes: Mutex<Vec<DiscountCode>>,
    usages: Mutex<Vec<(DiscountCodeId, UserId, Option<PaymentId>)>>,
}

impl InMemoryDiscounts {
    /// Current usage counter for a code.
    pub fn current_uses(&self, code: DiscountCodeId) -> i32 {
        lock(&self.codes)
            .iter()
            .find(|c| c.id == code)
            .map(|c| c.current_uses)
            .unwrap_or(0)
    }
}

#[async_trait]
impl DiscountRepository for InMemoryDiscounts {
    async fn insert(&self, code: &DiscountCode) -> Result<(), RepositoryError> {
        lock(&self.codes).push(code.clone());
        Ok(())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<DiscountCode>, RepositoryError> {
        let needle = code.to_uppercase();
        Ok(lock(&self.codes)
            .iter()
            .find(|c| c.code.to_uppercase() == needle)
            .cloned())
    }

    async fn has_usage(
        &self,
        code: DiscountCodeId,
        user: UserId,
    ) -> Result<bool, RepositoryError> {
        Ok(lock(&self.usages)
            .iter()
            .any(|(c, u, _)| *c == code && *u == user))
    }

    async fn redeem(
        &self,
        code: DiscountCodeId,
        user: UserId,
        payment: Option<PaymentId>,
    ) -> Result<RedeemOutcome, RepositoryError> {
        let mut usages = lock(&self.usages);
        if usages.iter().any(|(c, u, _)| *c == code && *u == user) {
            return Ok(RedeemOutcome::AlreadyUsed);
        }
        let mut codes = lock(&self.codes);
        let Some(row) = codes.iter_mut().find(|c| c.id == code) else {
            return Err(RepositoryError::query("discount code vanished"));
        };
        if row.current_uses >= row.max_uses {
            return Ok(RedeemOutcome::CapReached);
        }
        row.current_uses += 1;
        usages.push((code, user, payment));
        Ok(RedeemOutcome::Applied)
    }

    async fn set_active(
        &self,
        code: DiscountCodeId,
        active: bool,
    ) -> Result<bool, RepositoryError> {
        let mut codes = lock(&self.codes);
        let Some(row) = codes.iter_mut().find(|c| c.id == code) else {
            return Ok(false);
        };
        row.active = active;
        Ok(true)
    }

    async fn list(&self, page: &PageRequest) -> Result<Page<DiscountCode>, RepositoryError> {
        let codes = lock(&self.codes).clone();
        page_slice(&codes, page)
    }
}

/// In-memory payment store.
#[derive(Default)]
pub struct InMemoryPayments {
    payments: Mutex<Vec<Payment>>,
}

impl InMemoryPayments {
    /// Snapshot a payment by id.
    pub fn get(&self, id: PaymentId) -> Option<Payment> {
        lock(&self.payments).iter().find(|p| p.id == id).cloned()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPayments {
    async fn insert(&self, payment: &Payment) -> Result<(), RepositoryError> {
        lock(&self.payments).push(payment.clone());
        Ok(())
    }

    async fn find_by_processor_id(&self, id: &str) -> Result<Option<Payment>, RepositoryError> {
        Ok(lock(&self.payments)
            .iter()
            .find(|p| p.processor_payment_id.as_deref() == Some(id))
            .cloned())
    }

    async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, RepositoryError> {
        Ok(lock(&self.payments)
            .iter()
            .find(|p| p.external_reference == reference)
            .cloned())
    }

    async fn apply_status(
        &self,
        id: PaymentId,
        status: PaymentStatus,
        processor_id: Option<&str>,
        method_detail: Option<&str>,
        approved_at: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        let mut payments = lock(&self.payments);
        let Some(row) = payments.iter_mut().find(|p| p.id == id) else {
            return Err(RepositoryError::query("payment vanished"));
        };
        row.status = status;
        if let Some(processor_id) = processor_id {
            row.processor_payment_id = Some(processor_id.to_owned());
        }
        if let Some(method_detail) = method_detail {
            row.method_detail = Some(method_detail.to_owned());
        }
        if approved_at.is_some() {
            row.approved_at = approved_at;
        }
        Ok(())
    }

    async fn list(&self, page: &PageRequest) -> Result<Page<Payment>, RepositoryError> {
        let payments = lock(&self.payments).clone();
        page_slice(&payments, page)
    }
}

/// In-memory user store.
#[derive(Default)]
pub struct InMemoryUsers {
    users: Mutex<Vec<(User, String)>>,
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn insert(&self, user: &User, password_hash: &str) -> Result<(), RepositoryError> {
        let mut users = lock(&self.users);
        if users.iter().any(|(u, _)| u.email == user.email) {
            return Err(RepositoryError::query("duplicate email"));
        }
        users.push((user.clone(), password_hash.to_owned()));
        Ok(())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(lock(&self.users)
            .iter()
            .find(|(u, _)| u.id == id)
            .map(|(u, _)| u.clone()))
    }

    async fn credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        Ok(lock(&self.users)
            .iter()
            .find(|(u, _)| u.email == email)
            .cloned())
    }

    async fn update_display_name(&self, id: UserId, name: &str) -> Result<bool, RepositoryError> {
        let mut users = lock(&self.users);
        let Some((user, _)) = users.iter_mut().find(|(u, _)| u.id == id) else {
            return Ok(false);
        };
        user.display_name = name.to_owned();
        Ok(true)
    }

    async fn list(&self, page: &PageRequest) -> Result<Page<User>, RepositoryError> {
        let users: Vec<User> = lock(&self.users).iter().map(|(u, _)| u.clone()).collect();
        page_slice(&users, page)
    }
}

/// In-memory classroom store.
#[derive(Default)]
pub struct InMemoryClassroom {
    sessions: Mutex<Vec<LiveClassSession>>,
}

#[async_trait]
impl ClassroomRepository for InMemoryClassroom {
    async fn insert(&self, session: &LiveClassSession) -> Result<(), RepositoryError> {
        lock(&self.sessions).push(session.clone());
        Ok(())
    }

    async fn find(
        &self,
        id: LiveSessionId,
    ) -> Result<Option<LiveClassSession>, RepositoryError> {
        Ok(lock(&self.sessions).iter().find(|s| s.id == id).cloned())
    }

    async fn set_cancelled(&self, id: LiveSessionId) -> Result<bool, RepositoryError> {
        let mut sessions = lock(&self.sessions);
        let Some(row) = sessions.iter_mut().find(|s| s.id == id) else {
            return Ok(false);
        };
        row.cancelled = true;
        Ok(true)
    }

    async fn list_for_course(
        &self,
        course: CourseId,
    ) -> Result<Vec<LiveClassSession>, RepositoryError> {
        let mut sessions: Vec<LiveClassSession> = lock(&self.sessions)
            .iter()
            .filter(|s| s.course_id == course)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.starts_at);
        Ok(sessions)
    }
}

/// In-memory chat store.
#[derive(Default)]
pub struct InMemoryChat {
    messages: Mutex<Vec<ChatMessage>>,
}

#[async_trait]
impl ChatRepository for InMemoryChat {
    async fn insert(&self, message: &ChatMessage) -> Result<(), RepositoryError> {
        lock(&self.messages).push(message.clone());
        Ok(())
    }

    async fn list_for_course(
        &self,
        course: CourseId,
        page: &PageRequest,
    ) -> Result<Page<ChatMessage>, RepositoryError> {
        let mut messages: Vec<ChatMessage> = lock(&self.messages)
            .iter()
            .filter(|m| m.course_id == course)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.sent_at);
        page_slice(&messages, page)
    }
}

/// Scriptable payment gateway double.
#[derive(Default)]
pub struct StubGateway {
    orders: Mutex<Vec<CoursePaymentOrder>>,
    reports: Mutex<HashMap<String, ProcessorPaymentReport>>,
    fail_transport: Mutex<bool>,
}

impl StubGateway {
    /// Script the report returned for a processor payment id.
    pub fn set_report(&self, processor_id: impl Into<String>, report: ProcessorPaymentReport) {
        lock(&self.reports).insert(processor_id.into(), report);
    }

    /// Make every call fail with a transport error.
    pub fn fail_transport(&self) {
        *lock(&self.fail_transport) = true;
    }

    /// Orders passed to `create_course_payment`.
    pub fn orders(&self) -> Vec<CoursePaymentOrder> {
        lock(&self.orders).clone()
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_course_payment(
        &self,
        order: &CoursePaymentOrder,
    ) -> Result<PaymentPreference, GatewayError> {
        if *lock(&self.fail_transport) {
            return Err(GatewayError::transport("stubbed outage"));
        }
        lock(&self.orders).push(order.clone());
        Ok(PaymentPreference {
            preference_id: format!("pref-{}", lock(&self.orders).len()),
            redirect_url: "https://processor.test/checkout/pref".to_owned(),
        })
    }

    async fn payment_status(
        &self,
        processor_payment_id: &str,
    ) -> Result<ProcessorPaymentReport, GatewayError> {
        if *lock(&self.fail_transport) {
            return Err(GatewayError::transport("stubbed outage"));
        }
        lock(&self.reports)
            .get(processor_payment_id)
            .cloned()
            .ok_or_else(|| GatewayError::status(404, "unknown payment"))
    }
}

/// Certificate renderer double.
#[derive(Default)]
pub struct StubRenderer {
    fail: Mutex<bool>,
}

impl StubRenderer {
    /// Make the renderer fail.
    pub fn fail(&self) {
        *lock(&self.fail) = true;
    }
}

#[async_trait]
impl CertificateRenderer for StubRenderer {
    async fn render(
        &self,
        certificate: &Certificate,
        _student_name: &str,
        _course_title: &str,
    ) -> Result<RenderedAsset, RenderError> {
        if *lock(&self.fail) {
            return Err(RenderError::unavailable("stubbed outage"));
        }
        Ok(RenderedAsset {
            asset_url: format!("https://render.test/certificates/{}.pdf", certificate.code),
        })
    }
}
