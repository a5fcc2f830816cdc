//! In-memory reference implementation of the storage contract.
//!
//! [`InMemoryContentStore`] keeps one [`ConcurrentMap`] per entity kind,
//! each with its own [`IdSequence`]. Records are immutable `Arc`s; the only
//! mutable field, a post's comments-enabled flag, is an `AtomicBool`.
//! Derived relationship sets are never stored: every read rescans the
//! table that holds the foreign key.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use agora_types::{Comment, CommentId, Post, PostId, User, UserId};

use crate::broadcast::{EventBroadcaster, Subscription, SubscriptionToken};
use crate::credential::{CredentialHash, CredentialHasher};
use crate::error::{StoreError, StoreResult};
use crate::map::ConcurrentMap;
use crate::sequence::IdSequence;
use crate::traits::ContentStore;

/// Behavioural switches for the in-memory store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Reject posts and comments whose author, post, or parent comment does
    /// not exist. Off by default: references are accepted as given.
    pub enforce_references: bool,
}

struct UserRecord {
    id: UserId,
    username: String,
    email: String,
    // Never leaves the store. No login flow reads it yet.
    #[cfg_attr(not(test), allow(dead_code))]
    credential: CredentialHash,
}

struct PostRecord {
    id: PostId,
    title: String,
    content: String,
    created_at: DateTime<Utc>,
    author_id: UserId,
    comments_enabled: AtomicBool,
}

struct CommentRecord {
    id: CommentId,
    content: String,
    author_id: UserId,
    post_id: PostId,
    parent_comment_id: Option<CommentId>,
    created_at: DateTime<Utc>,
}

/// Thread-safe, process-lifetime content store.
pub struct InMemoryContentStore {
    users: ConcurrentMap<UserId, Arc<UserRecord>>,
    user_seq: IdSequence,
    posts: ConcurrentMap<PostId, Arc<PostRecord>>,
    post_seq: IdSequence,
    comments: ConcurrentMap<CommentId, Arc<CommentRecord>>,
    comment_seq: IdSequence,
    broadcaster: Arc<EventBroadcaster>,
    options: StoreOptions,
}

impl InMemoryContentStore {
    /// Create an empty store with default options and its own broadcaster.
    pub fn new() -> Self {
        Self::with_options(StoreOptions::default())
    }

    pub fn with_options(options: StoreOptions) -> Self {
        Self::with_broadcaster(options, Arc::new(EventBroadcaster::new()))
    }

    /// Create an empty store that publishes into `broadcaster`.
    pub fn with_broadcaster(options: StoreOptions, broadcaster: Arc<EventBroadcaster>) -> Self {
        Self {
            users: ConcurrentMap::new(),
            user_seq: IdSequence::new(),
            posts: ConcurrentMap::new(),
            post_seq: IdSequence::new(),
            comments: ConcurrentMap::new(),
            comment_seq: IdSequence::new(),
            broadcaster,
            options,
        }
    }

    pub fn broadcaster(&self) -> &Arc<EventBroadcaster> {
        &self.broadcaster
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn post_count(&self) -> usize {
        self.posts.len()
    }

    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }

    /// Check a password against the stored credential of `user`.
    #[cfg(test)]
    pub(crate) fn verify_password(&self, user: UserId, password: &str) -> StoreResult<bool> {
        let record = self
            .users
            .load(&user)
            .ok_or_else(|| StoreError::user_not_found(user))?;
        Ok(CredentialHasher::PASSWORD.verify(password, &record.credential))
    }

    // -----------------------------------------------------------------------
    // Derived relationship scans
    // -----------------------------------------------------------------------

    fn post_ids_of(&self, author: UserId) -> Vec<PostId> {
        let mut ids = Vec::new();
        self.posts.range(|id, post| {
            if post.author_id == author {
                ids.push(*id);
            }
            true
        });
        ids.sort_unstable();
        ids
    }

    fn comment_ids_of(&self, post: PostId) -> Vec<CommentId> {
        let mut ids = Vec::new();
        self.comments.range(|id, comment| {
            if comment.post_id == post {
                ids.push(*id);
            }
            true
        });
        ids.sort_unstable();
        ids
    }

    fn reply_ids_of(&self, parent: CommentId) -> Vec<CommentId> {
        let mut ids = Vec::new();
        self.comments.range(|id, comment| {
            if comment.parent_comment_id == Some(parent) {
                ids.push(*id);
            }
            true
        });
        ids.sort_unstable();
        ids
    }

    /// One pass over the comment table grouping ids by post and by parent.
    fn comment_edges(&self) -> CommentEdges {
        let mut edges = CommentEdges::default();
        self.comments.range(|id, comment| {
            edges.by_post.entry(comment.post_id).or_default().push(*id);
            if let Some(parent) = comment.parent_comment_id {
                edges.by_parent.entry(parent).or_default().push(*id);
            }
            true
        });
        for ids in edges.by_post.values_mut().chain(edges.by_parent.values_mut()) {
            ids.sort_unstable();
        }
        edges
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    fn user_view(record: &UserRecord, post_ids: Vec<PostId>) -> User {
        User {
            id: record.id,
            username: record.username.clone(),
            email: record.email.clone(),
            post_ids,
        }
    }

    fn post_view(record: &PostRecord, comment_ids: Vec<CommentId>) -> Post {
        Post {
            id: record.id,
            title: record.title.clone(),
            content: record.content.clone(),
            created_at: record.created_at,
            author_id: record.author_id,
            comments_enabled: record.comments_enabled.load(Ordering::Acquire),
            comment_ids,
        }
    }

    fn comment_view(record: &CommentRecord, reply_ids: Vec<CommentId>) -> Comment {
        Comment {
            id: record.id,
            content: record.content.clone(),
            author_id: record.author_id,
            post_id: record.post_id,
            parent_comment_id: record.parent_comment_id,
            created_at: record.created_at,
            reply_ids,
        }
    }

    fn sorted_posts(&self, records: Vec<Arc<PostRecord>>) -> Vec<Post> {
        let mut edges = self.comment_edges();
        let mut posts: Vec<Post> = records
            .iter()
            .map(|record| {
                let ids = edges.by_post.remove(&record.id).unwrap_or_default();
                Self::post_view(record, ids)
            })
            .collect();
        posts.sort_unstable_by_key(|post| post.id);
        posts
    }

    fn sorted_comments(&self, records: Vec<Arc<CommentRecord>>) -> Vec<Comment> {
        let mut edges = self.comment_edges();
        let mut comments: Vec<Comment> = records
            .iter()
            .map(|record| {
                let ids = edges.by_parent.remove(&record.id).unwrap_or_default();
                Self::comment_view(record, ids)
            })
            .collect();
        comments.sort_unstable_by_key(|comment| comment.id);
        comments
    }

    // -----------------------------------------------------------------------
    // Reference checks
    // -----------------------------------------------------------------------

    fn require_user(&self, id: UserId) -> StoreResult<()> {
        if self.options.enforce_references && !self.users.contains_key(&id) {
            return Err(StoreError::user_not_found(id));
        }
        Ok(())
    }

    fn check_parent(&self, parent: Option<CommentId>, post: PostId) -> StoreResult<()> {
        let Some(parent) = parent else {
            return Ok(());
        };
        if !self.options.enforce_references {
            return Ok(());
        }
        match self.comments.load(&parent) {
            None => Err(StoreError::comment_not_found(parent)),
            Some(record) if record.post_id != post => {
                Err(StoreError::ParentMismatch { parent, post })
            }
            Some(_) => Ok(()),
        }
    }
}

#[derive(Default)]
struct CommentEdges {
    by_post: HashMap<PostId, Vec<CommentId>>,
    by_parent: HashMap<CommentId, Vec<CommentId>>,
}

/// Positional page: `limit` consecutive ids from `offset`, stopping at the
/// first gap.
fn page<K, V>(map: &ConcurrentMap<K, V>, limit: usize, offset: u64) -> Vec<V>
where
    K: From<u64> + Eq + std::hash::Hash + Clone,
    V: Clone,
{
    (0..limit as u64)
        .map_while(|i| offset.checked_add(i))
        .map_while(|raw| map.load(&K::from(raw)))
        .collect()
}

/// Allocate the next id from `seq` and insert the record built for it, both
/// under the table's write lock. Ids therefore appear in the table in
/// allocation order and a positional page never sees a transient gap.
fn insert_allocated<K, V, F>(
    map: &ConcurrentMap<K, Arc<V>>,
    seq: &IdSequence,
    build: F,
) -> StoreResult<Arc<V>>
where
    K: From<u64> + Eq + std::hash::Hash + Clone + fmt::Display,
    F: FnOnce(K) -> V,
{
    let (id, record, existed) = map.insert_with(|| {
        let id = K::from(seq.next()?);
        let record = Arc::new(build(id.clone()));
        Ok::<_, StoreError>((id, record))
    })?;
    if existed {
        return Err(StoreError::Internal(format!("identifier {id} allocated twice")));
    }
    Ok(record)
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentStore for InMemoryContentStore {
    fn create_user(&self, username: &str, email: &str, password: &str) -> StoreResult<User> {
        let credential = CredentialHasher::PASSWORD.hash(password);
        let record = insert_allocated(&self.users, &self.user_seq, |id| UserRecord {
            id,
            username: username.to_string(),
            email: email.to_string(),
            credential,
        })?;
        let id = record.id;
        debug!(user = %id, username, "user created");

        Ok(Self::user_view(&record, self.post_ids_of(id)))
    }

    fn create_post(&self, title: &str, content: &str, author: UserId) -> StoreResult<Post> {
        self.require_user(author)?;

        let record = insert_allocated(&self.posts, &self.post_seq, |id| PostRecord {
            id,
            title: title.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
            author_id: author,
            comments_enabled: AtomicBool::new(true),
        })?;
        let id = record.id;

        let post = Self::post_view(&record, self.comment_ids_of(id));
        let delivery = self.broadcaster.publish_post(&post);
        debug!(post = %id, author = %author, delivered = delivery.delivered, "post created");
        Ok(post)
    }

    fn create_comment(
        &self,
        content: &str,
        author: UserId,
        post: PostId,
        parent: Option<CommentId>,
    ) -> StoreResult<Comment> {
        self.require_user(author)?;
        match self.posts.load(&post) {
            Some(record) if !record.comments_enabled.load(Ordering::Acquire) => {
                return Err(StoreError::CommentsDisabled { post });
            }
            Some(_) => {}
            None if self.options.enforce_references => {
                return Err(StoreError::post_not_found(post));
            }
            None => {}
        }
        self.check_parent(parent, post)?;

        let record = insert_allocated(&self.comments, &self.comment_seq, |id| CommentRecord {
            id,
            content: content.to_string(),
            author_id: author,
            post_id: post,
            parent_comment_id: parent,
            created_at: Utc::now(),
        })?;
        let id = record.id;

        let comment = Self::comment_view(&record, self.reply_ids_of(id));
        let delivery = self.broadcaster.publish_comment(&comment);
        debug!(
            comment = %id,
            post = %post,
            reply = comment.is_reply(),
            parent = ?parent,
            delivered = delivery.delivered,
            "comment created"
        );
        Ok(comment)
    }

    fn get_user_by_id(&self, id: UserId) -> StoreResult<User> {
        let record = self
            .users
            .load(&id)
            .ok_or_else(|| StoreError::user_not_found(id))?;
        Ok(Self::user_view(&record, self.post_ids_of(id)))
    }

    fn get_users(&self, limit: usize, offset: u64) -> StoreResult<Vec<User>> {
        let records = page(&self.users, limit, offset);
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_author: HashMap<UserId, Vec<PostId>> = HashMap::new();
        self.posts.range(|id, post| {
            by_author.entry(post.author_id).or_default().push(*id);
            true
        });

        Ok(records
            .iter()
            .map(|record| {
                let mut ids = by_author.remove(&record.id).unwrap_or_default();
                ids.sort_unstable();
                Self::user_view(record, ids)
            })
            .collect())
    }

    fn get_post_by_id(&self, id: PostId) -> StoreResult<Post> {
        let record = self
            .posts
            .load(&id)
            .ok_or_else(|| StoreError::post_not_found(id))?;
        Ok(Self::post_view(&record, self.comment_ids_of(id)))
    }

    fn get_posts(&self, limit: usize, offset: u64) -> StoreResult<Vec<Post>> {
        let records = page(&self.posts, limit, offset);
        if records.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.sorted_posts(records))
    }

    fn get_comment_by_id(&self, id: CommentId) -> StoreResult<Comment> {
        let record = self
            .comments
            .load(&id)
            .ok_or_else(|| StoreError::comment_not_found(id))?;
        Ok(Self::comment_view(&record, self.reply_ids_of(id)))
    }

    fn get_comments(&self, limit: usize, offset: u64) -> StoreResult<Vec<Comment>> {
        let records = page(&self.comments, limit, offset);
        if records.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.sorted_comments(records))
    }

    fn toggle_comments(&self, post: PostId, caller: UserId) -> StoreResult<bool> {
        let record = self
            .posts
            .load(&post)
            .ok_or_else(|| StoreError::post_not_found(post))?;
        if record.author_id != caller {
            return Err(StoreError::Unauthorized { post, caller });
        }

        let enabled = !record.comments_enabled.fetch_xor(true, Ordering::AcqRel);
        debug!(post = %post, enabled, "comments toggled");
        Ok(enabled)
    }

    fn get_posts_from_user(&self, user: UserId) -> StoreResult<Vec<Post>> {
        let mut records = Vec::new();
        self.posts.range(|_, post| {
            if post.author_id == user {
                records.push(Arc::clone(post));
            }
            true
        });
        if records.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.sorted_posts(records))
    }

    fn get_comments_for_post(&self, post: PostId) -> StoreResult<Vec<Comment>> {
        let mut records = Vec::new();
        self.comments.range(|_, comment| {
            if comment.post_id == post {
                records.push(Arc::clone(comment));
            }
            true
        });
        if records.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.sorted_comments(records))
    }

    fn get_replies(&self, comment: CommentId) -> StoreResult<Vec<Comment>> {
        let mut records = Vec::new();
        self.comments.range(|_, candidate| {
            if candidate.parent_comment_id == Some(comment) {
                records.push(Arc::clone(candidate));
            }
            true
        });
        if records.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.sorted_comments(records))
    }

    fn subscribe_to_posts(&self, cancel: &CancellationToken) -> StoreResult<Subscription<Post>> {
        Ok(self.broadcaster.subscribe_to_posts(cancel))
    }

    fn subscribe_to_comments(
        &self,
        post: PostId,
        cancel: &CancellationToken,
    ) -> StoreResult<Subscription<Comment>> {
        Ok(self.broadcaster.subscribe_to_comments(post, cancel))
    }

    fn unsubscribe(&self, token: &SubscriptionToken) -> bool {
        self.broadcaster.unsubscribe(token)
    }
}

impl fmt::Debug for InMemoryContentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryContentStore")
            .field("users", &self.user_count())
            .field("posts", &self.post_count())
            .field("comments", &self.comment_count())
            .field("options", &self.options)
            .finish()
    }
}
