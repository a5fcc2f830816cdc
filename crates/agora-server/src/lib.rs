//! HTTP request layer for Agora.
//!
//! Exposes the content store as a JSON API, streams newly created posts and
//! comments over Server-Sent Events, and owns service configuration and
//! logging setup.

pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod handler;
pub mod logging;
pub mod router;
pub mod server;
pub mod state;

pub use auth::{Caller, CALLER_HEADER};
pub use config::{Env, HttpServerConfig, ServiceConfig, StorageConfig, CONFIG_PATH_ENV};
pub use error::{ServerError, ServerResult};
pub use server::AgoraServer;
pub use state::AppState;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use axum::Router;
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    use agora_types::{Comment, Post, User};

    fn app() -> (Router, AppState) {
        let state = AppState::in_memory();
        (router::build_router(state.clone()), state)
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn seed(app: &Router) -> (User, Post) {
        let response = send(
            app,
            post_json(
                "/v1/users",
                json!({"username": "alice", "email": "a@example.com", "password": "pw"}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let user: User = body_json(response).await;

        let response = send(
            app,
            post_json(
                "/v1/posts",
                json!({"title": "hello", "content": "world", "author_id": user.id}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let post: Post = body_json(response).await;
        (user, post)
    }

    // -----------------------------------------------------------------------
    // Basics
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn health_endpoint() {
        let (app, _) = app();
        let response = send(&app, get("/v1/health")).await;
        assert_eq!(response.status(), 200);
        let body: Value = body_json(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn user_round_trip() {
        let (app, _) = app();
        let (user, post) = seed(&app).await;

        let response = send(&app, get(&format!("/v1/users/{}", user.id))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let fetched: User = body_json(response).await;
        assert_eq!(fetched.username, "alice");
        assert_eq!(fetched.post_ids, vec![post.id]);

        let body: Value = body_json(send(&app, get("/v1/users")).await).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert!(body[0].get("password").is_none());
    }

    #[tokio::test]
    async fn missing_entities_are_404() {
        let (app, _) = app();
        for uri in ["/v1/users/5", "/v1/posts/5", "/v1/comments/5"] {
            let response = send(&app, get(uri)).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn malformed_id_is_400() {
        let (app, _) = app();
        let response = send(&app, get("/v1/users/abc")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn blank_title_is_400() {
        let (app, _) = app();
        let response = send(
            &app,
            post_json("/v1/posts", json!({"title": " ", "content": "c", "author_id": 0})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn paging_is_capped() {
        let (app, state) = app();
        for i in 0..120 {
            state.store.create_user(&format!("u{i}"), "e", "p").unwrap();
        }
        let page: Vec<User> = body_json(send(&app, get("/v1/users")).await).await;
        assert_eq!(page.len(), 20);
        let page: Vec<User> = body_json(send(&app, get("/v1/users?limit=500")).await).await;
        assert_eq!(page.len(), 100);
        let page: Vec<User> =
            body_json(send(&app, get("/v1/users?limit=5&offset=118")).await).await;
        assert_eq!(page.len(), 2);
    }

    // -----------------------------------------------------------------------
    // Comments and toggling
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn comment_thread_over_http() {
        let (app, _) = app();
        let (user, post) = seed(&app).await;

        let response = send(
            &app,
            post_json(
                "/v1/comments",
                json!({"content": "first", "author_id": user.id, "post_id": post.id}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let root: Comment = body_json(response).await;

        let response = send(
            &app,
            post_json(
                "/v1/comments",
                json!({
                    "content": "reply",
                    "author_id": user.id,
                    "post_id": post.id,
                    "parent_comment_id": root.id
                }),
            ),
        )
        .await;
        let reply: Comment = body_json(response).await;

        let replies: Vec<Comment> =
            body_json(send(&app, get(&format!("/v1/comments/{}/replies", root.id))).await).await;
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].id, reply.id);

        let on_post: Vec<Comment> =
            body_json(send(&app, get(&format!("/v1/posts/{}/comments", post.id))).await).await;
        assert_eq!(on_post.len(), 2);

        let by_user: Vec<Post> =
            body_json(send(&app, get(&format!("/v1/users/{}/posts", user.id))).await).await;
        assert_eq!(by_user.len(), 1);
    }

    #[tokio::test]
    async fn toggle_requires_caller_header() {
        let (app, _) = app();
        let (_, post) = seed(&app).await;
        let request = Request::builder()
            .method("POST")
            .uri(format!("/v1/posts/{}/toggle-comments", post.id))
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, request).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn toggle_by_author_then_comment_conflicts() {
        let (app, _) = app();
        let (user, post) = seed(&app).await;

        let request = Request::builder()
            .method("POST")
            .uri(format!("/v1/posts/{}/toggle-comments", post.id))
            .header(CALLER_HEADER, user.id.to_string())
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: handler::ToggleCommentsResponse = body_json(response).await;
        assert!(!body.comments_enabled);

        let response = send(
            &app,
            post_json(
                "/v1/comments",
                json!({"content": "x", "author_id": user.id, "post_id": post.id}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn toggle_by_stranger_is_403() {
        let (app, state) = app();
        let (_, post) = seed(&app).await;
        let stranger = state.store.create_user("bob", "b@example.com", "pw").unwrap();

        let request = Request::builder()
            .method("POST")
            .uri(format!("/v1/posts/{}/toggle-comments", post.id))
            .header(CALLER_HEADER, stranger.id.to_string())
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, request).await.status(), StatusCode::FORBIDDEN);
        assert!(state.store.get_post_by_id(post.id).unwrap().comments_enabled);
    }

    // -----------------------------------------------------------------------
    // Subscriptions
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn subscription_endpoint_is_event_stream() {
        let (app, _) = app();
        let response = send(&app, get("/v1/subscriptions/posts/0/comments")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("text/event-stream"));
    }

    #[tokio::test]
    async fn dropping_event_stream_unsubscribes() {
        let store = std::sync::Arc::new(agora_store::InMemoryContentStore::new());
        let state = AppState::new(store.clone());
        let app = router::build_router(state);

        let response = send(&app, get("/v1/subscriptions/posts")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(store.broadcaster().post_subscriber_count(), 1);

        drop(response);
        assert_eq!(store.broadcaster().post_subscriber_count(), 0);
    }
}
