//! Modules grouping lessons inside a course.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ids::{CourseId, ModuleId};

/// An ordered group of lessons within a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseModule {
    /// Primary identifier.
    pub id: ModuleId,
    /// Owning course.
    pub course_id: CourseId,
    /// Module heading.
    pub title: String,
    /// Position within the course, starting at zero.
    pub position: i32,
}
