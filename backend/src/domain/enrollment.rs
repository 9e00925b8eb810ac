//! Enrollments and lesson-level progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ids::{CourseId, LessonId, UserId};

/// A user's registration in a course.
///
/// ## Invariants
/// - At most one enrollment per (user, course); the storage layer enforces
///   this with a unique index and insert-or-ignore semantics.
/// - `progress` is a rounded percentage in `0..=100`; `completed` is set
///   exactly when every lesson of the course is complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    /// Enrolled user.
    pub user_id: UserId,
    /// Course enrolled in.
    pub course_id: CourseId,
    /// Rounded completion percentage, `0..=100`.
    pub progress: u8,
    /// Whether every lesson has been completed.
    pub completed: bool,
    /// When the enrollment was created.
    pub enrolled_at: DateTime<Utc>,
}

impl Enrollment {
    /// A fresh enrollment with no progress.
    pub fn new(user_id: UserId, course_id: CourseId) -> Self {
        Self {
            user_id,
            course_id,
            progress: 0,
            completed: false,
            enrolled_at: Utc::now(),
        }
    }
}

/// Per-lesson completion marker.
///
/// Written idempotently: marking an already-complete lesson refreshes
/// `completed_at` and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgress {
    /// The learner.
    pub user_id: UserId,
    /// The completed lesson.
    pub lesson_id: LessonId,
    /// Completion timestamp.
    pub completed_at: DateTime<Utc>,
}

/// Lesson counts backing a progress computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LessonCounts {
    /// Lessons reachable through the course's modules, publish flag ignored.
    pub total: u32,
    /// Of those, lessons this user has completed.
    pub completed: u32,
}

/// Aggregated course progress for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgress {
    /// Lessons completed by the user.
    pub completed_lessons: u32,
    /// Total lessons in the course.
    pub total_lessons: u32,
    /// `round(completed / total * 100)`; zero for a course with no lessons.
    pub percentage: u8,
}

impl CourseProgress {
    /// Compute progress from raw counts.
    ///
    /// Every lesson weighs equally. A zero-lesson course reports 0%
    /// rather than erroring.
    pub fn from_counts(counts: LessonCounts) -> Self {
        let LessonCounts { total, completed } = counts;
        let completed = completed.min(total);
        let percentage = if total == 0 {
            0
        } else {
            // round-half-up, matching Math.round on completed/total*100
            u8::try_from((u64::from(completed) * 100 + u64::from(total) / 2) / u64::from(total))
                .unwrap_or(100)
        };
        Self {
            completed_lessons: completed,
            total_lessons: total,
            percentage,
        }
    }

    /// Whether every lesson is complete.
    ///
    /// Distinct from `percentage == 100`: rounding can display 100 before
    /// the final lesson is done, and certification requires full
    /// completion.
    pub const fn is_complete(&self) -> bool {
        self.total_lessons > 0 && self.completed_lessons == self.total_lessons
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0, 0)]
    #[case(10, 0, 0)]
    #[case(10, 9, 90)]
    #[case(10, 10, 100)]
    #[case(3, 1, 33)]
    #[case(3, 2, 67)]
    #[case(7, 5, 71)]
    fn percentage_rounds_half_up(#[case] total: u32, #[case] completed: u32, #[case] pct: u8) {
        let progress = CourseProgress::from_counts(LessonCounts { total, completed });
        assert_eq!(progress.percentage, pct);
    }

    #[rstest]
    fn zero_lesson_course_reports_zero_percent() {
        let progress = CourseProgress::from_counts(LessonCounts::default());
        assert_eq!(progress.percentage, 0);
        assert!(!progress.is_complete());
    }

    #[rstest]
    fn completion_requires_every_lesson() {
        // 199/200 rounds to 100 but the course is not complete.
        let progress = CourseProgress::from_counts(LessonCounts {
            total: 200,
            completed: 199,
        });
        assert_eq!(progress.percentage, 100);
        assert!(!progress.is_complete());

        let full = CourseProgress::from_counts(LessonCounts {
            total: 200,
            completed: 200,
        });
        assert!(full.is_complete());
    }

    #[rstest]
    fn completed_count_is_clamped_to_total() {
        // Stale completion rows for deleted lessons must not overshoot.
        let progress = CourseProgress::from_counts(LessonCounts {
            total: 4,
            completed: 6,
        });
        assert_eq!(progress.completed_lessons, 4);
        assert_eq!(progress.percentage, 100);
    }

    #[rstest]
    fn new_enrollment_starts_blank() {
        let enrollment = Enrollment::new(UserId::new(), CourseId::new());
        assert_eq!(enrollment.progress, 0);
        assert!(!enrollment.completed);
    }
}
