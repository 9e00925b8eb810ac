//! Course catalogue: courses, modules, lessons and their management.

pub mod course;
pub mod course_module;
pub mod lesson;
pub mod service;

pub use self::course::{Course, CourseUpdate, CourseValidationError};
pub use self::course_module::CourseModule;
pub use self::lesson::Lesson;
pub use self::service::{
    CatalogueApi, CatalogueService, NewCourseRequest, NewLessonRequest, NewModuleRequest,
};
