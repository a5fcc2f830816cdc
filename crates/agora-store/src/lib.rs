//! Content storage for Agora.
//!
//! The request layer talks to storage only through the [`ContentStore`]
//! trait. The in-memory backend is built from three pieces:
//!
//! - [`ConcurrentMap`]: a lock-guarded table with snapshot iteration.
//! - [`IdSequence`]: a lock-free identifier allocator per entity kind.
//! - [`EventBroadcaster`]: fan-out of newly created posts and comments to
//!   live subscribers, never blocking the writer.

pub mod backend;
pub mod broadcast;
pub mod credential;
pub mod error;
pub mod map;
pub mod memory;
pub mod sequence;
pub mod traits;

pub use backend::{open_store, StorageKind};
pub use broadcast::{
    Delivery, EventBroadcaster, Subscription, SubscriptionFilter, SubscriptionToken,
    SUBSCRIBER_CAPACITY,
};
pub use credential::{CredentialHash, CredentialHasher};
pub use error::{StoreError, StoreResult, UnknownStorageKind};
pub use map::ConcurrentMap;
pub use memory::{InMemoryContentStore, StoreOptions};
pub use sequence::IdSequence;
pub use traits::ContentStore;
