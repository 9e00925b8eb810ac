//! Enrollment and progress tracking.

pub mod service;

pub use self::service::{EnrollmentView, ProgressApi, ProgressService};
