//! Live fan-out of newly created content.
//!
//! The [`EventBroadcaster`] keeps one registry of subscribers per topic
//! (posts, comments). Each subscriber owns a single-slot channel. Publishing
//! never waits on a subscriber: if the slot is still occupied the event is
//! dropped for that subscriber and counted, and subscribers whose receiving
//! side has gone away are pruned on the spot.
//!
//! A [`Subscription`] lives until the first of:
//!
//! - the caller's [`CancellationToken`] fires,
//! - [`EventBroadcaster::unsubscribe`] is called with its token,
//! - the `Subscription` is closed or dropped.
//!
//! Whichever happens first removes the registry entry; later attempts are
//! no-ops.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use agora_types::{Comment, Post, PostId};

use crate::map::ConcurrentMap;

/// Pending events a subscriber may hold before further events are dropped.
pub const SUBSCRIBER_CAPACITY: usize = 1;

const TOKEN_LEN: usize = 24;

/// Opaque name of one live subscription.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(String);

impl SubscriptionToken {
    /// A fresh random alphanumeric token.
    pub fn generate() -> Self {
        let token = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect();
        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub:{}", &self.0[..8.min(self.0.len())])
    }
}

/// Which events a subscriber is interested in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubscriptionFilter {
    /// If set, only events attached to this post are delivered.
    pub post: Option<PostId>,
}

impl SubscriptionFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn post(post: PostId) -> Self {
        Self { post: Some(post) }
    }

    /// Returns `true` if an event scoped to `post` matches this filter.
    pub fn matches(&self, post: PostId) -> bool {
        self.post.map_or(true, |wanted| wanted == post)
    }
}

/// Registry entry: a filter paired with the sending half of the channel.
#[derive(Clone)]
struct Subscriber<T> {
    filter: SubscriptionFilter,
    sender: mpsc::Sender<T>,
    cancel: CancellationToken,
}

/// Outcome of a single fan-out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub dropped: usize,
    pub pruned: usize,
}

/// Subscribers of one topic, keyed by token.
struct Registry<T> {
    topic: &'static str,
    subscribers: ConcurrentMap<SubscriptionToken, Subscriber<T>>,
}

impl<T: Clone + Send + 'static> Registry<T> {
    fn new(topic: &'static str) -> Arc<Self> {
        Arc::new(Self {
            topic,
            subscribers: ConcurrentMap::new(),
        })
    }

    fn register(
        self: &Arc<Self>,
        filter: SubscriptionFilter,
        parent: &CancellationToken,
    ) -> Subscription<T> {
        let (sender, receiver) = mpsc::channel(SUBSCRIBER_CAPACITY);
        let cancel = parent.child_token();
        let mut token = SubscriptionToken::generate();
        let subscriber = Subscriber {
            filter,
            sender,
            cancel: cancel.clone(),
        };
        // Never overwrite an existing registration.
        while self.subscribers.load_or_store(token.clone(), subscriber.clone()).1 {
            token = SubscriptionToken::generate();
        }
        debug!(topic = self.topic, token = ?token, post = ?filter.post, "subscriber attached");

        // Detach as soon as the cancellation fires, even if the consumer
        // never polls again. Outside a runtime, detachment happens on the
        // consumer's next `recv` or on drop.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let registry = Arc::downgrade(self);
            let watched = cancel.clone();
            let watched_token = token.clone();
            handle.spawn(async move {
                watched.cancelled().await;
                if let Some(registry) = registry.upgrade() {
                    registry.remove(&watched_token);
                }
            });
        }

        Subscription {
            token,
            receiver,
            cancel,
            registry: Arc::downgrade(self),
        }
    }

    /// Remove a subscriber. Returns `true` only for the call that removed it.
    fn remove(&self, token: &SubscriptionToken) -> bool {
        match self.subscribers.load_and_delete(token) {
            Some(subscriber) => {
                subscriber.cancel.cancel();
                debug!(topic = self.topic, token = ?token, "subscriber detached");
                true
            }
            None => false,
        }
    }

    fn fan_out(&self, event: &T, scope: PostId) -> Delivery {
        let mut delivery = Delivery::default();
        let mut stale = Vec::new();

        self.subscribers.range(|token, subscriber| {
            if !subscriber.filter.matches(scope) {
                return true;
            }
            match subscriber.sender.try_send(event.clone()) {
                Ok(()) => delivery.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    delivery.dropped += 1;
                    warn!(topic = self.topic, token = ?token, "subscriber slot full, event dropped");
                }
                Err(TrySendError::Closed(_)) => stale.push(token.clone()),
            }
            true
        });

        for token in &stale {
            if self.remove(token) {
                delivery.pruned += 1;
            }
        }
        delivery
    }

    fn len(&self) -> usize {
        self.subscribers.len()
    }
}

/// Receiving end of one live subscription.
pub struct Subscription<T: Clone + Send + 'static> {
    token: SubscriptionToken,
    receiver: mpsc::Receiver<T>,
    cancel: CancellationToken,
    registry: Weak<Registry<T>>,
}

impl<T: Clone + Send + 'static> Subscription<T> {
    pub fn token(&self) -> &SubscriptionToken {
        &self.token
    }

    /// Wait for the next event.
    ///
    /// Returns `None` once the subscription has ended, whether by
    /// cancellation, unsubscribe, or [`close`](Self::close).
    pub async fn recv(&mut self) -> Option<T> {
        if self.cancel.is_cancelled() {
            self.close();
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                self.close();
                None
            }
            event = self.receiver.recv() => event,
        }
    }

    /// Take a pending event without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        if self.cancel.is_cancelled() {
            self.close();
            return None;
        }
        self.receiver.try_recv().ok()
    }

    /// End the subscription and detach it from the broadcaster.
    pub fn close(&mut self) {
        self.cancel.cancel();
        self.receiver.close();
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.token);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl<T: Clone + Send + 'static> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<T: Clone + Send + 'static> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("token", &self.token)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Fan-out hub for post and comment creation events.
pub struct EventBroadcaster {
    posts: Arc<Registry<Post>>,
    comments: Arc<Registry<Comment>>,
    dropped: AtomicU64,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self {
            posts: Registry::new("posts"),
            comments: Registry::new("comments"),
            dropped: AtomicU64::new(0),
        }
    }

    /// Subscribe to every newly created post.
    pub fn subscribe_to_posts(&self, cancel: &CancellationToken) -> Subscription<Post> {
        self.posts.register(SubscriptionFilter::any(), cancel)
    }

    /// Subscribe to comments created on `post`.
    pub fn subscribe_to_comments(
        &self,
        post: PostId,
        cancel: &CancellationToken,
    ) -> Subscription<Comment> {
        self.comments.register(SubscriptionFilter::post(post), cancel)
    }

    /// Remove a subscription by token. Safe to call repeatedly.
    pub fn unsubscribe(&self, token: &SubscriptionToken) -> bool {
        self.posts.remove(token) || self.comments.remove(token)
    }

    /// Deliver `post` to every post subscriber.
    pub fn publish_post(&self, post: &Post) -> Delivery {
        let delivery = self.posts.fan_out(post, post.id);
        self.record(delivery)
    }

    /// Deliver `comment` to subscribers of its post.
    pub fn publish_comment(&self, comment: &Comment) -> Delivery {
        let delivery = self.comments.fan_out(comment, comment.post_id);
        self.record(delivery)
    }

    fn record(&self, delivery: Delivery) -> Delivery {
        if delivery.dropped > 0 {
            self.dropped
                .fetch_add(delivery.dropped as u64, Ordering::Relaxed);
        }
        delivery
    }

    pub fn post_subscriber_count(&self) -> usize {
        self.posts.len()
    }

    pub fn comment_subscriber_count(&self) -> usize {
        self.comments.len()
    }

    /// Events dropped because a subscriber's slot was full.
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBroadcaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBroadcaster")
            .field("post_subscribers", &self.post_subscriber_count())
            .field("comment_subscribers", &self.comment_subscriber_count())
            .field("dropped_events", &self.dropped_events())
            .finish()
    }
}
