use std::sync::Mutex;

use chrono::{Duration, Utc};

use crate::config::*;
use crate::core::errors::{ApiError, ApiResult};
use crate::core::helpers::hash_password;
use crate::core::store::{Batch, DocumentStore};
use crate::models::models::{push_unique, Comment, Post, Story, User};

pub fn load_user(store: &dyn DocumentStore, id: &str) -> anyhow::Result<Option<User>> {
    store.get_json::<User>(&user_key(id))
}

pub fn require_user(store: &dyn DocumentStore, id: &str, missing: &str) -> ApiResult<User> {
    load_user(store, id)?.ok_or_else(|| ApiError::not_found(missing))
}

pub fn save_user(store: &dyn DocumentStore, user: &User) -> anyhow::Result<()> {
    store.set_json(&user_key(&user.id), user)
}

pub fn find_user_by_email(store: &dyn DocumentStore, email: &str) -> anyhow::Result<Option<User>> {
    match store.get_json::<String>(&email_key(email))? {
        Some(id) => load_user(store, &id),
        None => Ok(None),
    }
}

/// Every registered user, in registration order.
pub fn all_users(store: &dyn DocumentStore) -> anyhow::Result<Vec<User>> {
    let ids: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    let mut users = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(user) = load_user(store, &id)? {
            users.push(user);
        }
    }
    Ok(users)
}

// Serializes the email check and the `users_list` read-modify-write. Spin
// runs each request in its own instance, so this only matters natively.
static REGISTRY_LOCK: Mutex<()> = Mutex::new(());

/// Stores a new user together with its email index and registry entry.
/// Fails with 400 when the email is already taken.
pub fn insert_user(store: &dyn DocumentStore, user: &User) -> ApiResult<()> {
    let _guard = REGISTRY_LOCK
        .lock()
        .map_err(|_| anyhow::anyhow!("user registry lock poisoned"))?;

    if store.get_json::<String>(&email_key(&user.email))?.is_some() {
        return Err(ApiError::bad_request("This email is already registered"));
    }
    let mut ids: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    push_unique(&mut ids, &user.id);

    let mut batch = Batch::new();
    batch.put(user_key(&user.id), user)?;
    batch.put(email_key(&user.email), &user.id)?;
    batch.put(USERS_LIST_KEY.to_string(), &ids)?;
    batch.commit(store)?;
    Ok(())
}

pub fn load_post(store: &dyn DocumentStore, id: &str) -> anyhow::Result<Option<Post>> {
    store.get_json::<Post>(&post_key(id))
}

pub fn require_post(store: &dyn DocumentStore, id: &str) -> ApiResult<Post> {
    load_post(store, id)?.ok_or_else(|| ApiError::not_found("There is no post with that id"))
}

pub fn load_comment(store: &dyn DocumentStore, id: &str) -> anyhow::Result<Option<Comment>> {
    store.get_json::<Comment>(&comment_key(id))
}

pub fn load_story(store: &dyn DocumentStore, id: &str) -> anyhow::Result<Option<Story>> {
    store.get_json::<Story>(&story_key(id))
}

pub fn init_demo_data(store: &dyn DocumentStore) -> anyhow::Result<()> {
    if find_user_by_email(store, "alice@glimpse.dev")?.is_some() {
        return Ok(()); // Already initialized
    }

    let mut alice = User::new("alice", "alice@glimpse.dev", hash_password("alice123")?);
    let mut bob = User::new("bob", "bob@glimpse.dev", hash_password("bob123")?);
    let mut carol = User::new("carol", "carol@glimpse.dev", hash_password("carol123")?);
    carol.private = true;

    // alice follows bob, bob has asked to follow carol
    push_unique(&mut alice.followings, &bob.id);
    push_unique(&mut bob.followers, &alice.id);
    push_unique(&mut carol.follower_requests, &bob.id);
    push_unique(&mut bob.sent_requests, &carol.id);

    let mut welcome = Post::new(&alice.id, "Hello from Glimpse!".to_string(), Vec::new());
    let mut hiking = Post::new(&bob.id, "Back from the mountains.".to_string(), Vec::new());
    hiking.created_at = Utc::now() - Duration::hours(2);
    let secret = Post::new(&carol.id, "Only my followers can read this.".to_string(), Vec::new());

    let reply = Comment::new(&alice.id, &hiking.id, "Looks amazing!".to_string());
    push_unique(&mut hiking.comments, &reply.id);
    push_unique(&mut welcome.likes, &bob.id);
    push_unique(&mut bob.liked_posts, &welcome.id);

    let story = Story::new(&bob.id, String::new());
    push_unique(&mut bob.stories, &story.id);

    push_unique(&mut alice.posts, &welcome.id);
    push_unique(&mut bob.posts, &hiking.id);
    push_unique(&mut carol.posts, &secret.id);

    for user in [&alice, &bob, &carol] {
        insert_user(store, user)?;
    }

    let mut batch = Batch::new();
    batch.put(post_key(&welcome.id), &welcome)?;
    batch.put(post_key(&hiking.id), &hiking)?;
    batch.put(post_key(&secret.id), &secret)?;
    batch.put(comment_key(&reply.id), &reply)?;
    batch.put(story_key(&story.id), &story)?;
    batch.commit(store)?;

    tracing::info!("seeded demo users alice, bob and carol");
    Ok(())
}
