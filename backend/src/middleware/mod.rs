//! Actix middleware.

pub mod trace;

pub use self::trace::{RequestId, Trace};
