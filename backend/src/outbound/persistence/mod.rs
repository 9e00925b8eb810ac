//! Diesel-async persistence adapters for the domain's repository ports.

pub mod diesel_catalogue_repository;
pub mod diesel_certificate_repository;
pub mod diesel_chat_repository;
pub mod diesel_classroom_repository;
pub mod diesel_discount_repository;
pub mod diesel_enrollment_repository;
pub mod diesel_helpers;
pub mod diesel_payment_repository;
pub mod diesel_user_repository;
pub mod models;
pub mod pool;
pub mod schema;

pub use self::diesel_catalogue_repository::DieselCatalogueRepository;
pub use self::diesel_certificate_repository::DieselCertificateRepository;
pub use self::diesel_chat_repository::DieselChatRepository;
pub use self::diesel_classroom_repository::DieselClassroomRepository;
pub use self::diesel_discount_repository::DieselDiscountRepository;
pub use self::diesel_enrollment_repository::DieselEnrollmentRepository;
pub use self::diesel_payment_repository::DieselPaymentRepository;
pub use self::diesel_user_repository::DieselUserRepository;
pub use self::pool::{DbPool, PoolConfig, PoolError};
