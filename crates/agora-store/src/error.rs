use agora_types::{CommentId, EntityKind, PostId, UserId};

/// Errors from content store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The requested entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: u64 },

    /// The caller does not own the resource.
    #[error("user {caller} is not the author of post {post}")]
    Unauthorized { post: PostId, caller: UserId },

    /// Comment creation was attempted on a post with comments turned off.
    #[error("comments are disabled on post {post}")]
    CommentsDisabled { post: PostId },

    /// The parent comment belongs to a different post.
    #[error("parent comment {parent} does not belong to post {post}")]
    ParentMismatch { parent: CommentId, post: PostId },

    /// An internal invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn user_not_found(id: UserId) -> Self {
        Self::NotFound {
            kind: EntityKind::User,
            id: id.get(),
        }
    }

    pub fn post_not_found(id: PostId) -> Self {
        Self::NotFound {
            kind: EntityKind::Post,
            id: id.get(),
        }
    }

    pub fn comment_not_found(id: CommentId) -> Self {
        Self::NotFound {
            kind: EntityKind::Comment,
            id: id.get(),
        }
    }

    /// Returns `true` for any of the not-found variants.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A storage backend name that does not match any [`StorageKind`](crate::StorageKind).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported storage backend: {0}")]
pub struct UnknownStorageKind(pub String);

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
