use tokio_util::sync::CancellationToken;

use agora_types::{Comment, CommentId, Post, PostId, User, UserId};

use crate::broadcast::{Subscription, SubscriptionToken};
use crate::error::StoreResult;

/// Storage contract consumed by the request layer.
///
/// All implementations must satisfy these invariants:
/// - Identifiers are unique per entity kind and never reused.
/// - Derived relationship sets (`post_ids`, `comment_ids`, `reply_ids`) are
///   computed from the live tables on every read and returned ascending.
/// - Only a post's author may toggle its comments.
/// - Entities are never deleted.
/// - Successful post and comment creations are published to live
///   subscribers.
///
/// The request layer holds an `Arc<dyn ContentStore>` and never learns
/// which backend is behind it.
pub trait ContentStore: Send + Sync {
    /// Register a user. The password is hashed before it is stored.
    fn create_user(&self, username: &str, email: &str, password: &str) -> StoreResult<User>;

    /// Create a post with comments enabled.
    fn create_post(&self, title: &str, content: &str, author: UserId) -> StoreResult<Post>;

    /// Create a comment, optionally replying to `parent`.
    ///
    /// Fails with `CommentsDisabled` if the post has comments turned off.
    fn create_comment(
        &self,
        content: &str,
        author: UserId,
        post: PostId,
        parent: Option<CommentId>,
    ) -> StoreResult<Comment>;

    fn get_user_by_id(&self, id: UserId) -> StoreResult<User>;

    /// Up to `limit` users with ids `offset, offset + 1, ...`, stopping at
    /// the first id that does not exist.
    fn get_users(&self, limit: usize, offset: u64) -> StoreResult<Vec<User>>;

    fn get_post_by_id(&self, id: PostId) -> StoreResult<Post>;

    /// Positional page over post ids, like [`get_users`](Self::get_users).
    fn get_posts(&self, limit: usize, offset: u64) -> StoreResult<Vec<Post>>;

    fn get_comment_by_id(&self, id: CommentId) -> StoreResult<Comment>;

    /// Positional page over comment ids, like [`get_users`](Self::get_users).
    fn get_comments(&self, limit: usize, offset: u64) -> StoreResult<Vec<Comment>>;

    /// Flip a post's comments-enabled flag and return the new state.
    ///
    /// Fails with `NotFound` if the post does not exist and `Unauthorized`
    /// if `caller` is not its author.
    fn toggle_comments(&self, post: PostId, caller: UserId) -> StoreResult<bool>;

    /// All posts authored by `user`, ascending by id.
    fn get_posts_from_user(&self, user: UserId) -> StoreResult<Vec<Post>>;

    /// All comments on `post`, ascending by id.
    fn get_comments_for_post(&self, post: PostId) -> StoreResult<Vec<Comment>>;

    /// Direct replies to `comment`, ascending by id.
    fn get_replies(&self, comment: CommentId) -> StoreResult<Vec<Comment>>;

    /// Stream of posts created from now on, until `cancel` fires.
    fn subscribe_to_posts(&self, cancel: &CancellationToken) -> StoreResult<Subscription<Post>>;

    /// Stream of comments created on `post` from now on, until `cancel` fires.
    fn subscribe_to_comments(
        &self,
        post: PostId,
        cancel: &CancellationToken,
    ) -> StoreResult<Subscription<Comment>>;

    /// Detach a subscription by token. Returns `false` if it was already gone.
    fn unsubscribe(&self, token: &SubscriptionToken) -> bool;
}
