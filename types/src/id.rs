//! Identifier types for users, signs and submissions.
//!
//! Every identifier is a random (v4) UUID. The byte form is used as the
//! storage key, so it is fixed-width and sorts consistently.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::TypesError;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Width of the byte form used in storage keys.
            pub const LEN: usize = 16;

            /// Generate a fresh random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(Uuid::from_bytes(bytes))
            }

            /// Decode from a storage key slice. Fails if the slice is not 16 bytes.
            pub fn from_slice(bytes: &[u8]) -> Result<Self, TypesError> {
                Uuid::from_slice(bytes)
                    .map(Self)
                    .map_err(|e| TypesError::InvalidId(format!("{}: {e}", $label)))
            }

            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = TypesError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| TypesError::InvalidId(format!("{}: {e}", $label)))
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

define_id!(
    /// Identifies a user (voter, proposer or admin).
    UserId,
    "user id"
);

define_id!(
    /// Identifies a proposed change awaiting community resolution.
    SubmissionId,
    "submission id"
);

define_id!(
    /// Identifies a persisted traffic sign record.
    SignId,
    "sign id"
);
