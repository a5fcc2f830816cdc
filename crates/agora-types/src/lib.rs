//! Foundation types for Agora.
//!
//! Every other Agora crate depends on `agora-types`. The crate holds the
//! public shape of the three entity kinds and the identifiers that tie them
//! together.
//!
//! # Key Types
//!
//! - [`UserId`], [`PostId`], [`CommentId`]: strongly-typed `u64` identifiers
//! - [`User`], [`Post`], [`Comment`]: entity views returned by stores,
//!   carrying their derived relationship sets
//! - [`EntityKind`]: discriminates the three entity tables
//! - [`IdArray`]: aggregated id lists as produced by relational backends

pub mod error;
pub mod id_array;
pub mod ids;
pub mod models;

pub use error::{IdArrayError, TypeError};
pub use id_array::IdArray;
pub use ids::{CommentId, PostId, UserId};
pub use models::{Comment, EntityKind, Post, User};
