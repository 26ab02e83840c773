use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::title::PostTitle;

/// Records that carry a backend `_id`.
pub trait Identified {
    fn id(&self) -> &str;
}

/// A reference the backend sometimes expands into the full record and
/// sometimes leaves as a bare id, depending on the endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Ref<T> {
    Id(String),
    Record(T),
}

impl<T: Identified> Ref<T> {
    pub fn id(&self) -> &str {
        match self {
            Ref::Id(id) => id,
            Ref::Record(record) => record.id(),
        }
    }

    pub fn record(&self) -> Option<&T> {
        match self {
            Ref::Id(_) => None,
            Ref::Record(record) => Some(record),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub full_name: String,
    /// Favorited channel ids, JSON-encoded. See [`crate::favorites`].
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub posts: Vec<Ref<PostSummary>>,
    #[serde(default)]
    pub comments: Vec<Ref<Comment>>,
    #[serde(default)]
    pub likes: Vec<Ref<Like>>,
}

impl Identified for User {
    fn id(&self) -> &str {
        &self.id
    }
}

impl User {
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.email
        } else {
            &self.full_name
        }
    }

    pub fn favorites_field(&self) -> &str {
        self.username.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Identified for Channel {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub image: Option<String>,
    pub channel: Ref<Channel>,
    pub author: User,
    #[serde(default)]
    pub likes: Vec<Like>,
    #[serde(default)]
    pub comments: Vec<Ref<Comment>>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl Identified for Post {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Post {
    pub fn decoded_title(&self) -> PostTitle {
        PostTitle::decode(&self.title)
    }

    pub fn like_by(&self, user_id: &str) -> Option<&Like> {
        self.likes.iter().find(|like| like.user == user_id)
    }

    pub fn comment_records(&self) -> impl Iterator<Item = &Comment> {
        self.comments.iter().filter_map(Ref::record)
    }
}

/// A post as embedded in a user record, where relations are bare ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub channel: Ref<Channel>,
    #[serde(default)]
    pub comments: Vec<Ref<Comment>>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl Identified for PostSummary {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: String,
    pub post: String,
}

impl Identified for Like {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub comment: String,
    pub author: Ref<User>,
    #[serde(default)]
    pub post: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl Identified for Comment {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Comment {
    pub fn author_name(&self) -> &str {
        match &self.author {
            Ref::Record(user) => user.display_name(),
            Ref::Id(_) => "unknown",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationType {
    Like,
    Comment,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub notification_type: NotificationType,
    pub notification_type_id: String,
    pub user_id: String,
    pub post_id: String,
}
