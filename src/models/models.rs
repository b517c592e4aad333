use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::STORY_TTL_HOURS;

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string. Never leaves the store.
    pub password: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub profile_picture: String,
    #[serde(default)]
    pub liked_posts: Vec<String>,
    #[serde(default)]
    pub posts: Vec<String>,
    #[serde(default)]
    pub stories: Vec<String>,
    #[serde(default)]
    pub followings: Vec<String>,
    #[serde(default)]
    pub followers: Vec<String>,
    #[serde(default)]
    pub follower_requests: Vec<String>,
    #[serde(default)]
    pub sent_requests: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: &str, email: &str, password_hash: String) -> Self {
        let now = Utc::now();
        User {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_lowercase(),
            password: password_hash,
            private: false,
            profile_picture: String::new(),
            liked_posts: Vec::new(),
            posts: Vec::new(),
            stories: Vec::new(),
            followings: Vec::new(),
            followers: Vec::new(),
            follower_requests: Vec::new(),
            sent_requests: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: String,
    pub author: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub comments: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(author: &str, content: String, images: Vec<String>) -> Self {
        let now = Utc::now();
        Post {
            id: Uuid::new_v4().to_string(),
            author: author.to_string(),
            images,
            content,
            likes: Vec::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    pub author: String,
    pub post_id: String,
    #[serde(default)]
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(author: &str, post_id: &str, content: String) -> Self {
        let now = Utc::now();
        Comment {
            id: Uuid::new_v4().to_string(),
            author: author.to_string(),
            post_id: post_id.to_string(),
            content,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    #[serde(rename = "_id")]
    pub id: String,
    pub author: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub viewers: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Story {
    pub fn new(author: &str, image: String) -> Self {
        let now = Utc::now();
        Story {
            id: Uuid::new_v4().to_string(),
            author: author.to_string(),
            image,
            viewers: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Stories expire softly: they stay in the store but stop being served
    /// once they are older than the story window.
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        self.created_at >= now - Duration::hours(STORY_TTL_HOURS)
    }
}

/// Claims carried inside a signed access token.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TokenClaims {
    pub id: String,
    pub iat: i64,
    pub exp: i64,
}

/// Appends `id` unless it is already present. Returns whether the list changed.
pub fn push_unique(list: &mut Vec<String>, id: &str) -> bool {
    if list.iter().any(|x| x == id) {
        return false;
    }
    list.push(id.to_string());
    true
}

/// Removes every occurrence of `id`. Returns whether the list changed.
pub fn pull(list: &mut Vec<String>, id: &str) -> bool {
    let before = list.len();
    list.retain(|x| x != id);
    list.len() != before
}
