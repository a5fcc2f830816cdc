use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use agora_store::StoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Store(err) => match err {
                StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                StoreError::Unauthorized { .. } => StatusCode::FORBIDDEN,
                StoreError::CommentsDisabled { .. } => StatusCode::CONFLICT,
                StoreError::ParentMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                StoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_types::{CommentId, PostId, UserId};

    #[test]
    fn store_errors_map_to_statuses() {
        let cases = [
            (StoreError::post_not_found(PostId::new(1)), StatusCode::NOT_FOUND),
            (
                StoreError::Unauthorized {
                    post: PostId::new(1),
                    caller: UserId::new(2),
                },
                StatusCode::FORBIDDEN,
            ),
            (
                StoreError::CommentsDisabled { post: PostId::new(1) },
                StatusCode::CONFLICT,
            ),
            (
                StoreError::ParentMismatch {
                    parent: CommentId::new(3),
                    post: PostId::new(1),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (StoreError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ServerError::from(err).status(), status);
        }
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let response = ServerError::Internal("db exploded".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn not_found_message_passes_through() {
        let err = ServerError::from(StoreError::user_not_found(UserId::new(9)));
        assert_eq!(err.to_string(), "user not found: 9");
    }
}
