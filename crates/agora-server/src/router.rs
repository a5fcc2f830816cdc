use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{events, handler};

/// Build the axum router with all Agora endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/users", post(handler::create_user).get(handler::list_users))
        .route("/v1/users/:id", get(handler::get_user))
        .route("/v1/users/:id/posts", get(handler::list_user_posts))
        .route("/v1/posts", post(handler::create_post).get(handler::list_posts))
        .route("/v1/posts/:id", get(handler::get_post))
        .route("/v1/posts/:id/comments", get(handler::list_post_comments))
        .route("/v1/posts/:id/toggle-comments", post(handler::toggle_comments))
        .route("/v1/comments", post(handler::create_comment).get(handler::list_comments))
        .route("/v1/comments/:id", get(handler::get_comment))
        .route("/v1/comments/:id/replies", get(handler::list_replies))
        .route("/v1/subscriptions/posts", get(events::subscribe_posts))
        .route(
            "/v1/subscriptions/posts/:id/comments",
            get(events::subscribe_comments),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
