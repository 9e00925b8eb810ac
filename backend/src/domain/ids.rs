//! Strongly typed identifiers for domain aggregates.
//!
//! Every aggregate gets its own UUID-backed id type so a course id can
//! never be passed where a user id is expected.

/// Define a UUID-backed identifier newtype.
macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize,
            utoipa::ToSchema,
        )]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub const fn from_uuid(value: uuid::Uuid) -> Self {
                Self(value)
            }

            /// Borrow the underlying UUID.
            pub const fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }

            /// Copy out the underlying UUID.
            pub const fn into_uuid(self) -> uuid::Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(value: uuid::Uuid) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(uuid::Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id!(
    /// Identifier of a registered user.
    UserId
);
uuid_id!(
    /// Identifier of a course.
    CourseId
);
uuid_id!(
    /// Identifier of a module within a course.
    ModuleId
);
uuid_id!(
    /// Identifier of a lesson within a module.
    LessonId
);
uuid_id!(
    /// Identifier of an issued certificate.
    CertificateId
);
uuid_id!(
    /// Identifier of a payment record.
    PaymentId
);
uuid_id!(
    /// Identifier of a discount code.
    DiscountCodeId
);
uuid_id!(
    /// Identifier of a scheduled live-class session.
    LiveSessionId
);
uuid_id!(
    /// Identifier of a course chat message.
    MessageId
);
