use chrono::Utc;
use spin_sdk::http::{Request, Response};

use crate::auth::authenticate;
use crate::config::*;
use crate::core::db::{require_post, require_user};
use crate::core::errors::{ApiError, ApiResult};
use crate::core::form::Form;
use crate::core::helpers::{ok_data, ok_message, require_id, sanitize_text, success};
use crate::core::store::{Batch, DocumentStore};
use crate::feed::{following_feed, liked_posts, user_posts};
use crate::models::models::{pull, push_unique, Post};

fn post_content(form: &Form) -> ApiResult<String> {
    let content = sanitize_text(form.text("content").unwrap_or_default().trim());
    if content.chars().count() > MAX_POST_LENGTH {
        return Err(ApiError::bad_request("Invalid content"));
    }
    Ok(content)
}

pub fn create_post(store: &dyn DocumentStore, req: Request) -> ApiResult<Response> {
    let user_id = authenticate(store, &req)?;
    let form = Form::from_request(&req)?;
    let content = post_content(&form)?;
    let images = form.save_images(store, "post_image", "post", &user_id)?;

    if content.is_empty() && images.is_empty() {
        return Err(ApiError::bad_request("Invalid content"));
    }

    let mut author = require_user(store, &user_id, "User not found")?;
    let post = Post::new(&user_id, content, images);
    push_unique(&mut author.posts, &post.id);
    author.touch();

    let mut batch = Batch::new();
    batch.put(post_key(&post.id), &post)?;
    batch.put(user_key(&author.id), &author)?;
    batch.commit(store)?;

    tracing::info!(post_id = %post.id, author = %user_id, "post created");
    success(201, Some(&post), Some("Post added successfully!"))
}

pub fn get_user_posts(store: &dyn DocumentStore, req: Request, target_id: &str) -> ApiResult<Response> {
    let viewer_id = authenticate(store, &req)?;
    let target = require_user(store, require_id(target_id)?, "User not found")?;
    ok_data(user_posts(store, &viewer_id, &target, Utc::now())?)
}

pub fn get_following_posts(store: &dyn DocumentStore, req: Request) -> ApiResult<Response> {
    let viewer_id = authenticate(store, &req)?;
    let viewer = require_user(store, &viewer_id, "User not found")?;
    ok_data(following_feed(store, &viewer, Utc::now())?)
}

pub fn get_liked_posts(store: &dyn DocumentStore, req: Request) -> ApiResult<Response> {
    let viewer_id = authenticate(store, &req)?;
    let viewer = require_user(store, &viewer_id, "User not found")?;
    ok_data(liked_posts(store, &viewer, Utc::now())?)
}

pub fn update_post(store: &dyn DocumentStore, req: Request, post_id: &str) -> ApiResult<Response> {
    let user_id = authenticate(store, &req)?;
    let mut post = require_post(store, require_id(post_id)?)?;
    if post.author != user_id {
        return Err(ApiError::Forbidden("You are not the owner of this post".to_string()));
    }

    let form = Form::from_request(&req)?;
    let content = post_content(&form)?;
    let images = form.save_images(store, "post_image", "post", &user_id)?;

    post.content = content;
    if !images.is_empty() {
        post.images = images;
    }
    if post.content.is_empty() && post.images.is_empty() {
        return Err(ApiError::bad_request("Invalid content"));
    }
    post.updated_at = Utc::now();
    store.set_json(&post_key(&post.id), &post)?;

    tracing::info!(post_id = %post.id, "post updated");
    success(200, Some(&post), Some("Post updated successfully"))
}

pub fn delete_post(store: &dyn DocumentStore, req: Request, post_id: &str) -> ApiResult<Response> {
    let user_id = authenticate(store, &req)?;
    let post = require_post(store, require_id(post_id)?)?;
    if post.author != user_id {
        return Err(ApiError::Forbidden("You are not the owner of this post".to_string()));
    }

    for comment_id in &post.comments {
        store.delete(&comment_key(comment_id))?;
    }
    store.delete(&post_key(&post.id))?;

    let mut author = require_user(store, &user_id, "User not found")?;
    pull(&mut author.posts, &post.id);
    author.touch();
    store.set_json(&user_key(&author.id), &author)?;

    tracing::info!(post_id = %post.id, "post deleted");
    ok_message("Post deleted successfully")
}

/// Likes the post, or removes the like when it is already there.
pub fn like_post(store: &dyn DocumentStore, req: Request, post_id: &str) -> ApiResult<Response> {
    let user_id = authenticate(store, &req)?;
    let mut post = require_post(store, require_id(post_id)?)?;
    let mut user = require_user(store, &user_id, "User not found")?;

    let liked = if user.liked_posts.iter().any(|id| id == &post.id) {
        pull(&mut user.liked_posts, &post.id);
        pull(&mut post.likes, &user_id);
        false
    } else {
        push_unique(&mut user.liked_posts, &post.id);
        push_unique(&mut post.likes, &user_id);
        true
    };
    user.touch();

    let mut batch = Batch::new();
    batch.put(user_key(&user.id), &user)?;
    batch.put(post_key(&post.id), &post)?;
    batch.commit(store)?;

    tracing::debug!(post_id = %post.id, user_id = %user_id, liked, "like toggled");
    if liked {
        ok_message("Post liked successfully.")
    } else {
        ok_message("Post unliked successfully.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use crate::core::test_support::{body_json, get, post, reload, request, seed_user};
    use spin_sdk::http::Method;

    fn create(store: &MemoryStore, author: &crate::models::models::User, content: &str) -> String {
        let resp = create_post(store, post("/api/post/create", serde_json::json!({ "content": content }), author)).unwrap();
        assert_eq!(*resp.status(), 201);
        body_json(&resp)["data"]["_id"].as_str().unwrap().to_string()
    }

    #[test]
    fn test_create_post_links_author() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice", false);
        let id = create(&store, &alice, "first <b>post</b>");

        let alice = reload(&store, &alice);
        assert_eq!(alice.posts, vec![id.clone()]);
        let stored = require_post(&store, &id).unwrap();
        assert_eq!(stored.content, "first post");
    }

    #[test]
    fn test_post_text_round_trips_unchanged() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice", false);
        let id = create(&store, &alice, "Tom & Jerry <3");
        assert_eq!(require_post(&store, &id).unwrap().content, "Tom & Jerry <3");

        let uri = format!("/api/post/update/{}", id);
        let req = request(Method::Put, &uri, Some(serde_json::json!({ "content": "a < b && c > d" })), Some(&alice.id));
        let resp = update_post(&store, req, &id).unwrap();
        assert_eq!(body_json(&resp)["data"]["content"], "a < b && c > d");
    }

    #[test]
    fn test_create_post_requires_auth_and_content() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice", false);

        let anonymous = request(Method::Post, "/api/post/create", Some(serde_json::json!({ "content": "x" })), None);
        assert!(matches!(create_post(&store, anonymous), Err(ApiError::Unauthorized)));

        let empty = post("/api/post/create", serde_json::json!({ "content": "  " }), &alice);
        assert!(matches!(create_post(&store, empty), Err(ApiError::BadRequest(_))));

        let long = post("/api/post/create", serde_json::json!({ "content": "a".repeat(5001) }), &alice);
        assert!(matches!(create_post(&store, long), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_only_author_updates_and_deletes() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice", false);
        let bob = seed_user(&store, "bob", false);
        let id = create(&store, &alice, "original");
        let uri = format!("/api/post/update/{}", id);

        let by_bob = request(Method::Put, &uri, Some(serde_json::json!({ "content": "hijack" })), Some(&bob.id));
        assert!(matches!(update_post(&store, by_bob, &id), Err(ApiError::Forbidden(_))));

        let by_alice = request(Method::Put, &uri, Some(serde_json::json!({ "content": "edited" })), Some(&alice.id));
        let resp = update_post(&store, by_alice, &id).unwrap();
        assert_eq!(body_json(&resp)["data"]["content"], "edited");

        let uri = format!("/api/post/delete/{}", id);
        let by_bob = request(Method::Delete, &uri, None, Some(&bob.id));
        assert!(matches!(delete_post(&store, by_bob, &id), Err(ApiError::Forbidden(_))));

        let by_alice = request(Method::Delete, &uri, None, Some(&alice.id));
        delete_post(&store, by_alice, &id).unwrap();
        assert!(reload(&store, &alice).posts.is_empty());
        assert!(matches!(require_post(&store, &id), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_like_toggles_both_documents() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice", false);
        let bob = seed_user(&store, "bob", false);
        let id = create(&store, &alice, "like me");
        let uri = format!("/api/post/like/{}", id);

        let resp = like_post(&store, post(&uri, serde_json::json!({}), &bob), &id).unwrap();
        assert_eq!(body_json(&resp)["message"], "Post liked successfully.");
        assert_eq!(reload(&store, &bob).liked_posts, vec![id.clone()]);
        assert_eq!(require_post(&store, &id).unwrap().likes, vec![bob.id.clone()]);

        let resp = like_post(&store, post(&uri, serde_json::json!({}), &bob), &id).unwrap();
        assert_eq!(body_json(&resp)["message"], "Post unliked successfully.");
        assert!(reload(&store, &bob).liked_posts.is_empty());
        assert!(require_post(&store, &id).unwrap().likes.is_empty());
    }

    #[test]
    fn test_like_missing_post_is_not_found() {
        let store = MemoryStore::new();
        let bob = seed_user(&store, "bob", false);
        let missing = uuid::Uuid::new_v4().to_string();
        let req = post("/api/post/like/x", serde_json::json!({}), &bob);
        assert!(matches!(like_post(&store, req, &missing), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_private_posts_endpoint_returns_summary() {
        let store = MemoryStore::new();
        let outsider = seed_user(&store, "outsider", false);
        let owner = seed_user(&store, "owner", true);
        create(&store, &owner, "hidden");

        let uri = format!("/api/post/get/{}", owner.id);
        let resp = get_user_posts(&store, get(&uri, &outsider), &owner.id).unwrap();
        let body = body_json(&resp);
        assert!(body["data"].get("posts").is_none());
        assert_eq!(body["data"]["user"]["name"], "owner");
        assert_eq!(body["data"]["user"]["postsCount"], 1);
    }

    #[test]
    fn test_following_feed_endpoint() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice", false);
        create(&store, &alice, "mine");

        let resp = get_following_posts(&store, get("/api/post/followings", &alice)).unwrap();
        let body = body_json(&resp);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["author"]["name"], "alice");
    }
}
