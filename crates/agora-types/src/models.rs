//! Entity views returned by content stores.
//!
//! A view is a snapshot of one stored entity together with its derived
//! relationship set, computed at read time. Views never carry credential
//! material.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::ids::{CommentId, PostId, UserId};

/// The three entity tables of a content store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    Post,
    Comment,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::User => "user",
            Self::Post => "post",
            Self::Comment => "comment",
        };
        write!(f, "{s}")
    }
}

impl FromStr for EntityKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "post" => Ok(Self::Post),
            "comment" => Ok(Self::Comment),
            other => Err(TypeError::UnknownEntityKind(other.to_string())),
        }
    }
}

/// A registered user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    /// Posts authored by this user, ascending.
    pub post_ids: Vec<PostId>,
}

/// A post authored by a user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author_id: UserId,
    pub comments_enabled: bool,
    /// Comments attached to this post, ascending.
    pub comment_ids: Vec<CommentId>,
}

/// A comment on a post, optionally replying to another comment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub content: String,
    pub author_id: UserId,
    pub post_id: PostId,
    pub parent_comment_id: Option<CommentId>,
    pub created_at: DateTime<Utc>,
    /// Direct replies to this comment, ascending.
    pub reply_ids: Vec<CommentId>,
}

impl Comment {
    /// Returns `true` if this comment answers another comment.
    pub fn is_reply(&self) -> bool {
        self.parent_comment_id.is_some()
    }
}
