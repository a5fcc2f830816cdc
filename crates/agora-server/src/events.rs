//! Live subscriptions over Server-Sent Events.
//!
//! Each stream owns its [`Subscription`]. When the client disconnects axum
//! drops the stream, which drops the subscription and unregisters it. Server
//! shutdown cancels the token every subscription is tied to, ending the
//! streams cleanly.

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};
use serde::Serialize;

use agora_store::Subscription;
use agora_types::{Comment, Post, PostId};

use crate::error::ServerResult;
use crate::state::AppState;

pub const POST_EVENT: &str = "post";
pub const COMMENT_EVENT: &str = "comment";

fn into_events<T>(
    subscription: Subscription<T>,
    name: &'static str,
    id_of: fn(&T) -> u64,
) -> impl Stream<Item = Result<Event, axum::Error>>
where
    T: Serialize + Clone + Send + 'static,
{
    stream::unfold(subscription, move |mut subscription| async move {
        let item = subscription.recv().await?;
        let event = Event::default()
            .event(name)
            .id(id_of(&item).to_string())
            .json_data(&item);
        Some((event, subscription))
    })
}

/// Stream every post created from now on.
pub async fn subscribe_posts(
    State(state): State<AppState>,
) -> ServerResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    let subscription = state.store.subscribe_to_posts(&state.shutdown)?;
    tracing::debug!(token = ?subscription.token(), "post stream opened");
    let events = into_events(subscription, POST_EVENT, |post: &Post| post.id.get());
    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(state.keep_alive)))
}

/// Stream every comment created on one post from now on.
pub async fn subscribe_comments(
    State(state): State<AppState>,
    Path(post): Path<PostId>,
) -> ServerResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    let subscription = state.store.subscribe_to_comments(post, &state.shutdown)?;
    tracing::debug!(token = ?subscription.token(), %post, "comment stream opened");
    let events = into_events(subscription, COMMENT_EVENT, |comment: &Comment| {
        comment.id.get()
    });
    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(state.keep_alive)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_types::UserId;
    use futures::StreamExt;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn stream_yields_created_posts() {
        let state = AppState::in_memory();
        let subscription = state.store.subscribe_to_posts(&state.shutdown).unwrap();
        let mut events = Box::pin(into_events(subscription, POST_EVENT, |p: &Post| p.id.get()));

        state.store.create_post("t", "c", UserId::new(0)).unwrap();
        assert!(events.next().await.expect("one event").is_ok());
    }

    #[tokio::test]
    async fn stream_ends_on_cancellation() {
        let state = AppState::in_memory();
        let cancel = CancellationToken::new();
        let subscription = state.store.subscribe_to_posts(&cancel).unwrap();
        let mut events = Box::pin(into_events(subscription, POST_EVENT, |p: &Post| p.id.get()));

        cancel.cancel();
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn dropping_stream_unregisters() {
        let store = std::sync::Arc::new(agora_store::InMemoryContentStore::new());
        let cancel = CancellationToken::new();
        let subscription = agora_store::ContentStore::subscribe_to_comments(
            store.as_ref(),
            PostId::new(0),
            &cancel,
        )
        .unwrap();
        let events = into_events(subscription, COMMENT_EVENT, |c: &Comment| c.id.get());
        assert_eq!(store.broadcaster().comment_subscriber_count(), 1);

        drop(events);
        assert_eq!(store.broadcaster().comment_subscriber_count(), 0);
    }
}
