//! Lessons, the unit of progress tracking.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ids::{LessonId, ModuleId};

/// A single lesson within a module.
///
/// Progress aggregation weighs every lesson equally; `duration_minutes`
/// is display metadata only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    /// Primary identifier.
    pub id: LessonId,
    /// Owning module.
    pub module_id: ModuleId,
    /// Lesson heading.
    pub title: String,
    /// Position within the module, starting at zero.
    pub position: i32,
    /// Expected viewing time in minutes.
    pub duration_minutes: i32,
}
