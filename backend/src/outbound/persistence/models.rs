//! Database row types for the persistence adapters.
//!
//! Read rows derive `Queryable`/`Selectable`; insert rows borrow their
//! string fields. Conversion to domain types happens in the repository
//! files so enum parsing failures surface as repository errors.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::schema::{
    certificates, chat_messages, course_modules, courses, discount_codes, discount_usages,
    enrollments, lesson_progress, lessons, live_class_sessions, payments, submission_grades,
    users,
};

/// Account row.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
    pub role: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// New account row.
#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUserRow<'a> {
    pub id: Uuid,
    pub display_name: &'a str,
    pub email: &'a str,
    pub role: &'a str,
    pub password_hash: &'a str,
    pub created_at: DateTime<Utc>,
}

/// Course row.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = courses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CourseRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub instructor_id: Uuid,
    pub published: bool,
    pub created_at: DateTime<Utc>,
}

/// New course row.
#[derive(Debug, Insertable)]
#[diesel(table_name = courses)]
pub struct NewCourseRow<'a> {
    pub id: Uuid,
    pub title: &'a str,
    pub description: &'a str,
    pub price: Decimal,
    pub instructor_id: Uuid,
    pub published: bool,
    pub created_at: DateTime<Utc>,
}

/// Partial course update.
#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = courses)]
pub struct CourseChangeset<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub price: Option<Decimal>,
    pub published: Option<bool>,
}

/// Module row.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = course_modules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ModuleRow {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub position: i32,
}

/// New module row.
#[derive(Debug, Insertable)]
#[diesel(table_name = course_modules)]
pub struct NewModuleRow<'a> {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: &'a str,
    pub position: i32,
}

/// Lesson row.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = lessons)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LessonRow {
    pub id: Uuid,
    pub module_id: Uuid,
    pub title: String,
    pub position: i32,
    pub duration_minutes: i32,
}

/// New lesson row.
#[derive(Debug, Insertable)]
#[diesel(table_name = lessons)]
pub struct NewLessonRow<'a> {
    pub id: Uuid,
    pub module_id: Uuid,
    pub title: &'a str,
    pub position: i32,
    pub duration_minutes: i32,
}

/// Enrollment row.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = enrollments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EnrollmentRow {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub progress: i16,
    pub completed: bool,
    pub enrolled_at: DateTime<Utc>,
}

/// New enrollment row.
#[derive(Debug, Insertable)]
#[diesel(table_name = enrollments)]
pub struct NewEnrollmentRow {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub progress: i16,
    pub completed: bool,
    pub enrolled_at: DateTime<Utc>,
}

/// New lesson-progress row.
#[derive(Debug, Insertable)]
#[diesel(table_name = lesson_progress)]
pub struct NewLessonProgressRow {
    pub user_id: Uuid,
    pub lesson_id: Uuid,
    pub completed_at: DateTime<Utc>,
}

/// Certificate row.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = certificates)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CertificateRow {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub certificate_code: String,
    pub final_score: Option<Decimal>,
    pub valid: bool,
    pub issued_at: DateTime<Utc>,
    pub verification_url: String,
    pub asset_url: Option<String>,
}

/// New certificate row.
#[derive(Debug, Insertable)]
#[diesel(table_name = certificates)]
pub struct NewCertificateRow<'a> {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub certificate_code: &'a str,
    pub final_score: Option<Decimal>,
    pub valid: bool,
    pub issued_at: DateTime<Utc>,
    pub verification_url: &'a str,
    pub asset_url: Option<&'a str>,
}

/// New submission-grade row.
#[derive(Debug, Insertable)]
#[diesel(table_name = submission_grades)]
pub struct NewSubmissionGradeRow<'a> {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub assignment_title: &'a str,
    pub score: Decimal,
    pub graded_at: DateTime<Utc>,
}

/// Discount code row.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = discount_codes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DiscountCodeRow {
    pub id: Uuid,
    pub code: String,
    pub kind: String,
    pub value: Decimal,
    pub max_uses: i32,
    pub current_uses: i32,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub course_id: Option<Uuid>,
    pub active: bool,
}

/// New discount code row.
#[derive(Debug, Insertable)]
#[diesel(table_name = discount_codes)]
pub struct NewDiscountCodeRow<'a> {
    pub id: Uuid,
    pub code: &'a str,
    pub kind: &'a str,
    pub value: Decimal,
    pub max_uses: i32,
    pub current_uses: i32,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub course_id: Option<Uuid>,
    pub active: bool,
}

/// New discount usage row.
#[derive(Debug, Insertable)]
#[diesel(table_name = discount_usages)]
pub struct NewDiscountUsageRow {
    pub discount_code_id: Uuid,
    pub user_id: Uuid,
    pub payment_id: Option<Uuid>,
    pub used_at: DateTime<Utc>,
}

/// Payment row.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PaymentRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub amount: Decimal,
    pub status: String,
    pub processor_payment_id: Option<String>,
    pub external_reference: String,
    pub method_detail: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// New payment row.
#[derive(Debug, Insertable)]
#[diesel(table_name = payments)]
pub struct NewPaymentRow<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub amount: Decimal,
    pub status: &'a str,
    pub processor_payment_id: Option<&'a str>,
    pub external_reference: &'a str,
    pub method_detail: Option<&'a str>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Live-class session row.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = live_class_sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LiveSessionRow {
    pub id: Uuid,
    pub course_id: Uuid,
    pub topic: String,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub join_url: String,
    pub host_id: Uuid,
    pub cancelled: bool,
}

/// New live-class session row.
#[derive(Debug, Insertable)]
#[diesel(table_name = live_class_sessions)]
pub struct NewLiveSessionRow<'a> {
    pub id: Uuid,
    pub course_id: Uuid,
    pub topic: &'a str,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub join_url: &'a str,
    pub host_id: Uuid,
    pub cancelled: bool,
}

/// Chat message row.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = chat_messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ChatMessageRow {
    pub id: Uuid,
    pub course_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

/// New chat message row.
#[derive(Debug, Insertable)]
#[diesel(table_name = chat_messages)]
pub struct NewChatMessageRow<'a> {
    pub id: Uuid,
    pub course_id: Uuid,
    pub author_id: Uuid,
    pub body: &'a str,
    pub sent_at: DateTime<Utc>,
}
