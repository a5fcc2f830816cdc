//! Typed identifier wrappers around `u64`.
//!
//! Each entity kind gets its own identifier type so a post id can never be
//! passed where a user id is expected. Identifiers are allocated by the
//! store, start at zero, and serialize as plain integers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Generates a newtype wrapper around `u64` with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw identifier value.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// The raw identifier value.
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map(Self)
                    .map_err(|_| TypeError::InvalidId(s.to_string()))
            }
        }
    };
}

define_id!(
    /// Identifier of a [`User`](crate::User).
    UserId
);

define_id!(
    /// Identifier of a [`Post`](crate::Post).
    PostId
);

define_id!(
    /// Identifier of a [`Comment`](crate::Comment).
    CommentId
);
