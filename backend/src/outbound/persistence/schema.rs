//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the migrations exactly; regenerate with
//! `diesel print-schema` after schema changes.

diesel::table! {
    /// Registered accounts.
    users (id) {
        /// Primary key: UUID v4.
        id -> Uuid,
        /// Name shown to other participants.
        display_name -> Varchar,
        /// Login email, unique.
        email -> Varchar,
        /// Role name: student, instructor or admin.
        role -> Varchar,
        /// argon2id password hash.
        password_hash -> Varchar,
        /// Registration timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Courses offered in the catalogue.
    courses (id) {
        /// Primary key: UUID v4.
        id -> Uuid,
        /// Course title.
        title -> Varchar,
        /// Longer description.
        description -> Text,
        /// Enrollment price.
        price -> Numeric,
        /// Owning instructor.
        instructor_id -> Uuid,
        /// Visibility in the public catalogue.
        published -> Bool,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Ordered lesson groups within a course.
    course_modules (id) {
        /// Primary key: UUID v4.
        id -> Uuid,
        /// Owning course.
        course_id -> Uuid,
        /// Module heading.
        title -> Varchar,
        /// Position within the course.
        position -> Int4,
    }
}

diesel::table! {
    /// Lessons, the unit of progress tracking.
    lessons (id) {
        /// Primary key: UUID v4.
        id -> Uuid,
        /// Owning module.
        module_id -> Uuid,
        /// Lesson heading.
        title -> Varchar,
        /// Position within the module.
        position -> Int4,
        /// Display metadata; progress weighs lessons equally.
        duration_minutes -> Int4,
    }
}

diesel::table! {
    /// Course enrollments; one row per (user, course).
    enrollments (user_id, course_id) {
        /// Enrolled user.
        user_id -> Uuid,
        /// Course enrolled in.
        course_id -> Uuid,
        /// Rounded completion percentage.
        progress -> Int2,
        /// Whether every lesson is complete.
        completed -> Bool,
        /// Enrollment timestamp.
        enrolled_at -> Timestamptz,
    }
}

diesel::table! {
    /// Per-lesson completion markers; one row per (user, lesson).
    lesson_progress (user_id, lesson_id) {
        /// The learner.
        user_id -> Uuid,
        /// The completed lesson.
        lesson_id -> Uuid,
        /// Completion timestamp, refreshed on re-completion.
        completed_at -> Timestamptz,
    }
}

diesel::table! {
    /// Issued certificates; unique per (student, course).
    certificates (id) {
        /// Primary key: UUID v4.
        id -> Uuid,
        /// Certified student.
        student_id -> Uuid,
        /// Completed course.
        course_id -> Uuid,
        /// Public verification code, unique.
        certificate_code -> Varchar,
        /// Average graded score at issue time.
        final_score -> Nullable<Numeric>,
        /// Soft validity flag.
        valid -> Bool,
        /// Issue timestamp.
        issued_at -> Timestamptz,
        /// Public verification page.
        verification_url -> Varchar,
        /// Rendered PDF asset, when available.
        asset_url -> Nullable<Varchar>,
    }
}

diesel::table! {
    /// Graded assignment submissions feeding certificate scores.
    submission_grades (id) {
        /// Primary key: UUID v4.
        id -> Uuid,
        /// Graded student.
        student_id -> Uuid,
        /// Course the assignment belongs to.
        course_id -> Uuid,
        /// Assignment label.
        assignment_title -> Varchar,
        /// Score awarded.
        score -> Numeric,
        /// Grading timestamp.
        graded_at -> Timestamptz,
    }
}

diesel::table! {
    /// Redeemable discount codes.
    discount_codes (id) {
        /// Primary key: UUID v4.
        id -> Uuid,
        /// The code, stored uppercase, unique.
        code -> Varchar,
        /// Kind name: percentage or fixed.
        kind -> Varchar,
        /// Percentage or absolute amount, per kind.
        value -> Numeric,
        /// Global redemption cap.
        max_uses -> Int4,
        /// Redemptions so far; guarded against exceeding the cap.
        current_uses -> Int4,
        /// Window start.
        valid_from -> Timestamptz,
        /// Window end; null means no expiry.
        valid_until -> Nullable<Timestamptz>,
        /// Optional course scope; null means global.
        course_id -> Nullable<Uuid>,
        /// Deactivated codes always fail validation.
        active -> Bool,
    }
}

diesel::table! {
    /// Discount redemption ledger; one row per (code, user).
    discount_usages (discount_code_id, user_id) {
        /// The redeemed code.
        discount_code_id -> Uuid,
        /// Redeeming user.
        user_id -> Uuid,
        /// Payment the redemption was attached to, when paid.
        payment_id -> Nullable<Uuid>,
        /// Redemption timestamp.
        used_at -> Timestamptz,
    }
}

diesel::table! {
    /// Payment transaction records.
    payments (id) {
        /// Primary key: UUID v4.
        id -> Uuid,
        /// Paying user.
        user_id -> Uuid,
        /// Course being purchased.
        course_id -> Uuid,
        /// Amount charged after discounts.
        amount -> Numeric,
        /// Status name: pending, approved or rejected.
        status -> Varchar,
        /// Processor-assigned payment id, unique when present.
        processor_payment_id -> Nullable<Varchar>,
        /// Structured reference echoed by webhook notifications.
        external_reference -> Varchar,
        /// Payment method detail reported by the processor.
        method_detail -> Nullable<Varchar>,
        /// Approval timestamp.
        approved_at -> Nullable<Timestamptz>,
        /// Record creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Live-class session metadata.
    live_class_sessions (id) {
        /// Primary key: UUID v4.
        id -> Uuid,
        /// Course the session belongs to.
        course_id -> Uuid,
        /// Topic shown to attendees.
        topic -> Varchar,
        /// Scheduled start time.
        starts_at -> Timestamptz,
        /// Planned duration in minutes.
        duration_minutes -> Int4,
        /// Provider join URL.
        join_url -> Varchar,
        /// Hosting instructor.
        host_id -> Uuid,
        /// Soft cancellation flag.
        cancelled -> Bool,
    }
}

diesel::table! {
    /// Course chat messages.
    chat_messages (id) {
        /// Primary key: UUID v4.
        id -> Uuid,
        /// Course the message belongs to.
        course_id -> Uuid,
        /// Posting user.
        author_id -> Uuid,
        /// Message text.
        body -> Text,
        /// Posting timestamp.
        sent_at -> Timestamptz,
    }
}

diesel::joinable!(course_modules -> courses (course_id));
diesel::joinable!(lessons -> course_modules (module_id));
diesel::joinable!(lesson_progress -> lessons (lesson_id));
diesel::joinable!(discount_usages -> discount_codes (discount_code_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    courses,
    course_modules,
    lessons,
    enrollments,
    lesson_progress,
    certificates,
    submission_grades,
    discount_codes,
    discount_usages,
    payments,
    live_class_sessions,
    chat_messages,
);
