//! Type-safe identifiers.
//!
//! [`UserId`] and [`EventId`] are newtype wrappers around [`uuid::Uuid`] so
//! that a user identity can never be passed where an idempotency key is
//! expected, and vice versa.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

macro_rules! uuid_newtype {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Creates a new random identifier (UUID v4).
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Wraps an existing [`uuid::Uuid`].
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner [`uuid::Uuid`].
            #[must_use]
            pub const fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }

            /// Parses the hyphenated string form.
            ///
            /// # Errors
            ///
            /// Returns [`LedgerError::Validation`] if `raw` is not a UUID.
            pub fn parse(raw: &str) -> Result<Self, LedgerError> {
                uuid::Uuid::parse_str(raw.trim())
                    .map(Self)
                    .map_err(|_| LedgerError::Validation(format!("invalid {}: {raw}", $label)))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for uuid::Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_newtype!(
    /// Identity of a rewarded user.
    UserId,
    "user_id"
);

uuid_newtype!(
    /// External idempotency key of a reward event. At most one reward is
    /// ever recorded per `EventId`.
    EventId,
    "event_id"
);
