use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use agora_types::{Comment, CommentId, Post, PostId, User, UserId};

use crate::auth::Caller;
use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

pub const DEFAULT_PAGE_LIMIT: usize = 20;
pub const MAX_PAGE_LIMIT: usize = 100;

#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<usize>,
    pub offset: Option<u64>,
}

impl Pagination {
    /// `(limit, offset)` with the limit capped at [`MAX_PAGE_LIMIT`].
    pub fn resolve(&self) -> (usize, u64) {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT);
        (limit, self.offset.unwrap_or(0))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    pub author_id: UserId,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
    pub author_id: UserId,
    pub post_id: PostId,
    #[serde(default)]
    pub parent_comment_id: Option<CommentId>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToggleCommentsResponse {
    pub post_id: PostId,
    pub comments_enabled: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

fn require(field: &str, value: &str) -> ServerResult<()> {
    if value.trim().is_empty() {
        return Err(ServerError::BadRequest(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> ServerResult<(StatusCode, Json<User>)> {
    require("username", &req.username)?;
    require("email", &req.email)?;
    require("password", &req.password)?;
    let user = state.store.create_user(&req.username, &req.email, &req.password)?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> ServerResult<Json<Vec<User>>> {
    let (limit, offset) = page.resolve();
    Ok(Json(state.store.get_users(limit, offset)?))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> ServerResult<Json<User>> {
    Ok(Json(state.store.get_user_by_id(id)?))
}

pub async fn list_user_posts(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> ServerResult<Json<Vec<Post>>> {
    Ok(Json(state.store.get_posts_from_user(id)?))
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

pub async fn create_post(
    State(state): State<AppState>,
    Json(req): Json<CreatePostRequest>,
) -> ServerResult<(StatusCode, Json<Post>)> {
    require("title", &req.title)?;
    require("content", &req.content)?;
    let post = state.store.create_post(&req.title, &req.content, req.author_id)?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn list_posts(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> ServerResult<Json<Vec<Post>>> {
    let (limit, offset) = page.resolve();
    Ok(Json(state.store.get_posts(limit, offset)?))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<PostId>,
) -> ServerResult<Json<Post>> {
    Ok(Json(state.store.get_post_by_id(id)?))
}

pub async fn list_post_comments(
    State(state): State<AppState>,
    Path(id): Path<PostId>,
) -> ServerResult<Json<Vec<Comment>>> {
    Ok(Json(state.store.get_comments_for_post(id)?))
}

/// Flip comments on a post. Only its author may do this.
pub async fn toggle_comments(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<PostId>,
) -> ServerResult<Json<ToggleCommentsResponse>> {
    let comments_enabled = state.store.toggle_comments(id, caller.id())?;
    Ok(Json(ToggleCommentsResponse {
        post_id: id,
        comments_enabled,
    }))
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

pub async fn create_comment(
    State(state): State<AppState>,
    Json(req): Json<CreateCommentRequest>,
) -> ServerResult<(StatusCode, Json<Comment>)> {
    require("content", &req.content)?;
    let comment = state.store.create_comment(
        &req.content,
        req.author_id,
        req.post_id,
        req.parent_comment_id,
    )?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> ServerResult<Json<Vec<Comment>>> {
    let (limit, offset) = page.resolve();
    Ok(Json(state.store.get_comments(limit, offset)?))
}

pub async fn get_comment(
    State(state): State<AppState>,
    Path(id): Path<CommentId>,
) -> ServerResult<Json<Comment>> {
    Ok(Json(state.store.get_comment_by_id(id)?))
}

pub async fn list_replies(
    State(state): State<AppState>,
    Path(id): Path<CommentId>,
) -> ServerResult<Json<Vec<Comment>>> {
    Ok(Json(state.store.get_replies(id)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_cap() {
        assert_eq!(Pagination::default().resolve(), (DEFAULT_PAGE_LIMIT, 0));
        let page = Pagination {
            limit: Some(1_000),
            offset: Some(7),
        };
        assert_eq!(page.resolve(), (MAX_PAGE_LIMIT, 7));
    }

    #[test]
    fn blank_fields_are_rejected() {
        assert!(require("title", "hello").is_ok());
        let err = require("title", "   ").unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(_)));
    }

    #[test]
    fn comment_request_parent_is_optional() {
        let req: CreateCommentRequest =
            serde_json::from_str(r#"{"content":"x","author_id":1,"post_id":2}"#).unwrap();
        assert_eq!(req.parent_comment_id, None);
        assert_eq!(req.post_id, PostId::new(2));
    }
}
