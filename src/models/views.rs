//! Response projections. Documents are stored whole; these are the trimmed
//! shapes handed back to clients, with references expanded.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::db::{load_comment, load_story, load_user};
use crate::core::store::DocumentStore;
use crate::models::models::{Comment, Post, Story, User};

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StoryView {
    #[serde(rename = "_id")]
    pub id: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub viewers: Vec<String>,
}

impl From<&Story> for StoryView {
    fn from(story: &Story) -> Self {
        StoryView {
            id: story.id.clone(),
            image: story.image.clone(),
            created_at: story.created_at,
            viewers: story.viewers.clone(),
        }
    }
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ViewerView {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub profile_picture: String,
}

/// A story with its viewers expanded, as shown to the story's owner.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OwnStoryView {
    #[serde(rename = "_id")]
    pub id: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub viewers: Vec<ViewerView>,
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuthorView {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub private: bool,
    pub profile_picture: String,
    pub stories: Vec<StoryView>,
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    #[serde(rename = "_id")]
    pub id: String,
    pub author: AuthorView,
    pub post_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    #[serde(rename = "_id")]
    pub id: String,
    pub author: AuthorView,
    pub images: Vec<String>,
    pub content: String,
    pub likes: Vec<String>,
    pub comments: Vec<CommentView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Relationship-aware user entry used by search results and follow lists.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserCard {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub profile_picture: String,
    pub private: bool,
    pub stories: Vec<StoryView>,
    pub followers: Vec<String>,
    pub follower_requests: Vec<String>,
    pub sent_requests: Vec<String>,
}

/// What a non-follower gets back for a private account.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PrivateSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub private: bool,
    pub profile_picture: String,
    pub posts_count: usize,
    pub followings_count: usize,
    pub followers_count: usize,
}

impl From<&User> for PrivateSummary {
    fn from(user: &User) -> Self {
        PrivateSummary {
            id: user.id.clone(),
            name: user.name.clone(),
            private: user.private,
            profile_picture: user.profile_picture.clone(),
            posts_count: user.posts.len(),
            followings_count: user.followings.len(),
            followers_count: user.followers.len(),
        }
    }
}

/// Expands references for one response, memoizing user lookups so an author
/// with many comments is loaded once.
pub struct Populator<'a> {
    store: &'a dyn DocumentStore,
    now: DateTime<Utc>,
    authors: HashMap<String, Option<AuthorView>>,
}

impl<'a> Populator<'a> {
    pub fn new(store: &'a dyn DocumentStore, now: DateTime<Utc>) -> Self {
        Populator {
            store,
            now,
            authors: HashMap::new(),
        }
    }

    pub fn store(&self) -> &'a dyn DocumentStore {
        self.store
    }

    /// Stories among `ids` still inside the visibility window, oldest first.
    pub fn recent_stories(&self, ids: &[String]) -> anyhow::Result<Vec<StoryView>> {
        let mut stories = Vec::new();
        for id in ids {
            if let Some(story) = load_story(self.store, id)? {
                if story.is_visible_at(self.now) {
                    stories.push(StoryView::from(&story));
                }
            }
        }
        stories.sort_by_key(|s| s.created_at);
        Ok(stories)
    }

    pub fn viewers(&self, ids: &[String]) -> anyhow::Result<Vec<ViewerView>> {
        let mut viewers = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(user) = load_user(self.store, id)? {
                viewers.push(ViewerView {
                    id: user.id,
                    name: user.name,
                    profile_picture: user.profile_picture,
                });
            }
        }
        Ok(viewers)
    }

    pub fn own_stories(&self, ids: &[String]) -> anyhow::Result<Vec<OwnStoryView>> {
        self.recent_stories(ids)?
            .into_iter()
            .map(|story| {
                Ok(OwnStoryView {
                    viewers: self.viewers(&story.viewers)?,
                    id: story.id,
                    image: story.image,
                    created_at: story.created_at,
                })
            })
            .collect()
    }

    pub fn author_of(&self, user: &User) -> anyhow::Result<AuthorView> {
        Ok(AuthorView {
            id: user.id.clone(),
            name: user.name.clone(),
            private: user.private,
            profile_picture: user.profile_picture.clone(),
            stories: self.recent_stories(&user.stories)?,
        })
    }

    pub fn author(&mut self, id: &str) -> anyhow::Result<Option<AuthorView>> {
        if let Some(cached) = self.authors.get(id) {
            return Ok(cached.clone());
        }
        let view = match load_user(self.store, id)? {
            Some(user) => Some(self.author_of(&user)?),
            None => None,
        };
        self.authors.insert(id.to_string(), view.clone());
        Ok(view)
    }

    pub fn comment(&mut self, comment: &Comment) -> anyhow::Result<Option<CommentView>> {
        let author = match self.author(&comment.author)? {
            Some(author) => author,
            None => return Ok(None),
        };
        Ok(Some(CommentView {
            id: comment.id.clone(),
            author,
            post_id: comment.post_id.clone(),
            content: comment.content.clone(),
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }))
    }

    /// Expands a post with its author and its comments, newest comment first.
    pub fn post(&mut self, post: &Post) -> anyhow::Result<Option<PostView>> {
        let author = match self.author(&post.author)? {
            Some(author) => author,
            None => return Ok(None),
        };

        let mut comments = Vec::with_capacity(post.comments.len());
        for id in &post.comments {
            if let Some(comment) = load_comment(self.store, id)? {
                if let Some(view) = self.comment(&comment)? {
                    comments.push(view);
                }
            }
        }
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(Some(PostView {
            id: post.id.clone(),
            author,
            images: post.images.clone(),
            content: post.content.clone(),
            likes: post.likes.clone(),
            comments,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }))
    }

    pub fn card(&self, user: &User) -> anyhow::Result<UserCard> {
        Ok(UserCard {
            id: user.id.clone(),
            name: user.name.clone(),
            profile_picture: user.profile_picture.clone(),
            private: user.private,
            stories: self.recent_stories(&user.stories)?,
            followers: user.followers.clone(),
            follower_requests: user.follower_requests.clone(),
            sent_requests: user.sent_requests.clone(),
        })
    }

    /// Cards for every id that still resolves to a user, in list order.
    pub fn cards(&self, ids: &[String]) -> anyhow::Result<Vec<UserCard>> {
        let mut cards = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(user) = load_user(self.store, id)? {
                cards.push(self.card(&user)?);
            }
        }
        Ok(cards)
    }
}
