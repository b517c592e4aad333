//! Feed assembly: joins posts with their authors, comments and the comment
//! authors' recent stories, then applies privacy and recency rules.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::db::{load_post, load_user};
use crate::core::store::DocumentStore;
use crate::models::models::User;
use crate::models::views::{PostView, Populator, PrivateSummary, StoryView};

/// Whether `viewer_id` may see `target`'s posts and stories.
pub fn can_view(viewer_id: &str, target: &User) -> bool {
    !target.private || target.id == viewer_id || target.followers.iter().any(|id| id == viewer_id)
}

fn newest_first(posts: &mut [PostView]) {
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn populate_posts(populator: &mut Populator<'_>, ids: &[String]) -> anyhow::Result<Vec<PostView>> {
    let mut posts = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(post) = load_post(populator.store(), id)? {
            if let Some(view) = populator.post(&post)? {
                posts.push(view);
            }
        }
    }
    Ok(posts)
}

/// The viewer's own posts plus the posts of everyone they follow, newest first.
pub fn following_feed(store: &dyn DocumentStore, viewer: &User, now: DateTime<Utc>) -> anyhow::Result<Vec<PostView>> {
    let mut populator = Populator::new(store, now);
    let mut posts = populate_posts(&mut populator, &viewer.posts)?;

    for following_id in &viewer.followings {
        if following_id == &viewer.id {
            continue;
        }
        if let Some(author) = load_user(store, following_id)? {
            posts.extend(populate_posts(&mut populator, &author.posts)?);
        }
    }

    newest_first(&mut posts);
    Ok(posts)
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProfileContent {
    pub name: String,
    pub private: bool,
    pub profile_picture: String,
    pub stories: Vec<StoryView>,
    pub posts: Vec<String>,
    pub followings: Vec<String>,
    pub followers: Vec<String>,
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
pub enum UserPosts {
    /// The target is private and the viewer does not follow them.
    Restricted { user: PrivateSummary },
    Full { posts: Vec<PostView>, user: ProfileContent },
}

/// A single user's posts as seen by `viewer_id`.
pub fn user_posts(
    store: &dyn DocumentStore,
    viewer_id: &str,
    target: &User,
    now: DateTime<Utc>,
) -> anyhow::Result<UserPosts> {
    if !can_view(viewer_id, target) {
        return Ok(UserPosts::Restricted {
            user: PrivateSummary::from(target),
        });
    }

    let mut populator = Populator::new(store, now);
    let mut posts = populate_posts(&mut populator, &target.posts)?;
    newest_first(&mut posts);

    Ok(UserPosts::Full {
        posts,
        user: ProfileContent {
            name: target.name.clone(),
            private: target.private,
            profile_picture: target.profile_picture.clone(),
            stories: populator.recent_stories(&target.stories)?,
            posts: target.posts.clone(),
            followings: target.followings.clone(),
            followers: target.followers.clone(),
        },
    })
}

/// Posts the viewer liked, in like order, minus any whose author is now
/// private to the viewer. Authors are re-read on every call.
pub fn liked_posts(store: &dyn DocumentStore, viewer: &User, now: DateTime<Utc>) -> anyhow::Result<Vec<PostView>> {
    let mut populator = Populator::new(store, now);
    let mut posts = Vec::with_capacity(viewer.liked_posts.len());

    for post_id in &viewer.liked_posts {
        let post = match load_post(store, post_id)? {
            Some(post) => post,
            None => continue,
        };
        let author = match load_user(store, &post.author)? {
            Some(author) => author,
            None => continue,
        };
        let visible = !author.private
            || author.id == viewer.id
            || viewer.followings.iter().any(|id| id == &author.id);
        if !visible {
            continue;
        }
        if let Some(view) = populator.post(&post)? {
            posts.push(view);
        }
    }
    Ok(posts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{comment_key, post_key, story_key};
    use crate::core::db::save_user;
    use crate::core::test_support::{reload, seed_user};
    use crate::core::store::MemoryStore;
    use crate::follow::{accept_request, follow_user};
    use crate::models::models::{push_unique, Comment, Post, Story};
    use chrono::Duration;

    fn add_post(store: &dyn DocumentStore, author: &User, content: &str, age: Duration) -> Post {
        let mut author = reload(store, author);
        let mut post = Post::new(&author.id, content.to_string(), Vec::new());
        post.created_at = Utc::now() - age;
        store.set_json(&post_key(&post.id), &post).unwrap();
        push_unique(&mut author.posts, &post.id);
        save_user(store, &author).unwrap();
        post
    }

    fn add_comment(store: &dyn DocumentStore, post: &Post, author: &User, age: Duration) -> Comment {
        let mut post: Post = store.get_json(&post_key(&post.id)).unwrap().unwrap();
        let mut comment = Comment::new(&author.id, &post.id, "nice".to_string());
        comment.created_at = Utc::now() - age;
        store.set_json(&comment_key(&comment.id), &comment).unwrap();
        push_unique(&mut post.comments, &comment.id);
        store.set_json(&post_key(&post.id), &post).unwrap();
        comment
    }

    fn add_story(store: &dyn DocumentStore, author: &User, created_at: DateTime<Utc>) -> Story {
        let mut author = reload(store, author);
        let mut story = Story::new(&author.id, "story.png".to_string());
        story.created_at = created_at;
        store.set_json(&story_key(&story.id), &story).unwrap();
        push_unique(&mut author.stories, &story.id);
        save_user(store, &author).unwrap();
        story
    }

    #[test]
    fn test_feed_merges_own_and_followed_posts_newest_first() {
        let memory = MemoryStore::new();
        let store: &dyn DocumentStore = &memory;
        let viewer = seed_user(store, "viewer", false);
        let friend = seed_user(store, "friend", false);
        let stranger = seed_user(store, "stranger", false);

        let old = add_post(store, &viewer, "old", Duration::hours(5));
        let new = add_post(store, &friend, "new", Duration::hours(1));
        add_post(store, &stranger, "hidden", Duration::minutes(1));
        follow_user(store, &viewer.id, &friend.id).unwrap();

        let feed = following_feed(store, &reload(store, &viewer), Utc::now()).unwrap();
        let ids: Vec<_> = feed.iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids, vec![new.id, old.id]);
        assert_eq!(feed[0].author.name, "friend");
    }

    #[test]
    fn test_comments_sorted_newest_first() {
        let memory = MemoryStore::new();
        let store: &dyn DocumentStore = &memory;
        let viewer = seed_user(store, "viewer", false);
        let post = add_post(store, &viewer, "hello", Duration::hours(3));
        let first = add_comment(store, &post, &viewer, Duration::hours(2));
        let second = add_comment(store, &post, &viewer, Duration::hours(1));

        let feed = following_feed(store, &reload(store, &viewer), Utc::now()).unwrap();
        let ids: Vec<_> = feed[0].comments.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn test_comment_author_story_visible_for_24_hours() {
        let memory = MemoryStore::new();
        let store: &dyn DocumentStore = &memory;
        let viewer = seed_user(store, "viewer", false);
        let commenter = seed_user(store, "commenter", false);
        let post = add_post(store, &viewer, "hello", Duration::hours(1));
        add_comment(store, &post, &commenter, Duration::minutes(5));

        let created = Utc::now();
        let story = add_story(store, &commenter, created);
        let viewer = reload(store, &viewer);

        let at_23h = following_feed(store, &viewer, created + Duration::hours(23)).unwrap();
        let stories = &at_23h[0].comments[0].author.stories;
        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].id, story.id);

        let at_25h = following_feed(store, &viewer, created + Duration::hours(25)).unwrap();
        assert!(at_25h[0].comments[0].author.stories.is_empty());
    }

    #[test]
    fn test_private_user_posts_restricted_for_non_follower() {
        let memory = MemoryStore::new();
        let store: &dyn DocumentStore = &memory;
        let outsider = seed_user(store, "outsider", false);
        let owner = seed_user(store, "owner", true);
        add_post(store, &owner, "secret", Duration::hours(1));
        let owner = reload(store, &owner);

        let result = user_posts(store, &outsider.id, &owner, Utc::now()).unwrap();
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("posts").is_none());
        let user = value["user"].as_object().unwrap();
        let mut keys: Vec<_> = user.keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["_id", "followersCount", "followingsCount", "name", "postsCount", "private", "profilePicture"]
        );
        assert_eq!(value["user"]["postsCount"], 1);

        // The owner sees everything
        let own = serde_json::to_value(user_posts(store, &owner.id, &owner, Utc::now()).unwrap()).unwrap();
        assert_eq!(own["posts"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_private_user_posts_visible_after_accept() {
        let memory = MemoryStore::new();
        let store: &dyn DocumentStore = &memory;
        let fan = seed_user(store, "fan", false);
        let owner = seed_user(store, "owner", true);
        add_post(store, &owner, "secret", Duration::hours(1));

        follow_user(store, &fan.id, &owner.id).unwrap();
        let pending = user_posts(store, &fan.id, &reload(store, &owner), Utc::now()).unwrap();
        assert!(matches!(pending, UserPosts::Restricted { .. }));

        accept_request(store, &owner.id, &fan.id).unwrap();
        let accepted = user_posts(store, &fan.id, &reload(store, &owner), Utc::now()).unwrap();
        match accepted {
            UserPosts::Full { posts, .. } => assert_eq!(posts[0].content, "secret"),
            other => panic!("expected full listing, got {:?}", other),
        }
    }

    #[test]
    fn test_liked_posts_rechecks_author_privacy() {
        let memory = MemoryStore::new();
        let store: &dyn DocumentStore = &memory;
        let viewer = seed_user(store, "viewer", false);
        let author = seed_user(store, "author", false);
        let post = add_post(store, &author, "public for now", Duration::hours(1));

        let mut viewer_doc = reload(store, &viewer);
        push_unique(&mut viewer_doc.liked_posts, &post.id);
        push_unique(&mut viewer_doc.liked_posts, "deleted-post");
        save_user(store, &viewer_doc).unwrap();

        assert_eq!(liked_posts(store, &viewer_doc, Utc::now()).unwrap().len(), 1);

        let mut author_doc = reload(store, &author);
        author_doc.private = true;
        save_user(store, &author_doc).unwrap();
        assert!(liked_posts(store, &viewer_doc, Utc::now()).unwrap().is_empty());
    }
}
