//! Domain primitives, aggregates, ports and services.
//!
//! Keep types immutable where practical and document invariants and
//! serialisation contracts in each type's Rustdoc. Nothing in this module
//! tree knows about HTTP or SQL; inbound and outbound adapters translate
//! at the edges.

pub mod accounts;
pub mod billing;
pub mod catalogue;
pub mod certification;
pub mod chat;
pub mod classroom;
pub mod enrollment;
pub mod error;
pub mod ids;
pub mod ports;
pub mod progress;
pub mod user;

pub use self::billing::{discount, payment, reference};
pub use self::error::{Error, ErrorCode};
pub use self::ids::{
    CertificateId, CourseId, DiscountCodeId, LessonId, LiveSessionId, MessageId, ModuleId,
    PaymentId, UserId,
};
pub use self::user::{Actor, Role, User};

/// Convenient domain result alias.
pub type ApiResult<T> = Result<T, Error>;
