use chrono::Utc;
use spin_sdk::http::{Request, Response};

use crate::auth::authenticate;
use crate::config::*;
use crate::core::db::{load_comment, load_post, require_post};
use crate::core::errors::{ApiError, ApiResult};
use crate::core::form::Form;
use crate::core::helpers::{ok_message, require_id, sanitize_text, success};
use crate::core::store::{Batch, DocumentStore};
use crate::models::models::{pull, push_unique, Comment};
use crate::models::views::Populator;

pub fn add_comment(store: &dyn DocumentStore, req: Request, post_id: &str) -> ApiResult<Response> {
    let user_id = authenticate(store, &req)?;
    let mut post = require_post(store, require_id(post_id)?)?;

    let form = Form::from_request(&req)?;
    let content = sanitize_text(form.text("content").unwrap_or_default().trim());
    if content.is_empty() || content.chars().count() > MAX_COMMENT_LENGTH {
        return Err(ApiError::bad_request("Please provide a comment"));
    }

    let comment = Comment::new(&user_id, &post.id, content);
    push_unique(&mut post.comments, &comment.id);

    let mut batch = Batch::new();
    batch.put(comment_key(&comment.id), &comment)?;
    batch.put(post_key(&post.id), &post)?;
    batch.commit(store)?;

    tracing::info!(comment_id = %comment.id, post_id = %post.id, "comment added");
    let view = Populator::new(store, Utc::now()).comment(&comment)?;
    success(201, view, Some("Comment added successfully!"))
}

/// Removes a comment. Allowed for the comment's author and the post's author.
pub fn delete_comment(store: &dyn DocumentStore, req: Request, comment_id: &str) -> ApiResult<Response> {
    let user_id = authenticate(store, &req)?;
    let comment = load_comment(store, require_id(comment_id)?)?
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;
    let mut post = load_post(store, &comment.post_id)?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    if comment.author != user_id && post.author != user_id {
        return Err(ApiError::Forbidden("You cannot delete this comment".to_string()));
    }

    pull(&mut post.comments, &comment.id);
    store.set_json(&post_key(&post.id), &post)?;
    store.delete(&comment_key(&comment.id))?;

    tracing::info!(comment_id = %comment.id, post_id = %post.id, "comment deleted");
    ok_message("Comment deleted successfully")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use crate::core::test_support::{body_json, post, request, seed_user};
    use crate::models::models::Post;
    use spin_sdk::http::Method;

    fn seed_post(store: &dyn DocumentStore, author: &str) -> Post {
        let post = Post::new(author, "hello".to_string(), Vec::new());
        store.set_json(&post_key(&post.id), &post).unwrap();
        post
    }

    #[test]
    fn test_add_comment_pushes_onto_post() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice", false);
        let target = seed_post(&store, &alice.id);

        let uri = format!("/api/comment/{}", target.id);
        let resp = add_comment(&store, post(&uri, serde_json::json!({ "content": "great" }), &alice), &target.id).unwrap();
        assert_eq!(*resp.status(), 201);
        let body = body_json(&resp);
        assert_eq!(body["data"]["author"]["name"], "alice");
        assert_eq!(body["data"]["postId"], target.id);

        let stored = require_post(&store, &target.id).unwrap();
        assert_eq!(stored.comments, vec![body["data"]["_id"].as_str().unwrap().to_string()]);
    }

    #[test]
    fn test_add_comment_validation() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice", false);
        let target = seed_post(&store, &alice.id);

        let empty = post("/api/comment/x", serde_json::json!({ "content": "" }), &alice);
        assert!(matches!(add_comment(&store, empty, &target.id), Err(ApiError::BadRequest(_))));

        let missing = uuid::Uuid::new_v4().to_string();
        let req = post("/api/comment/x", serde_json::json!({ "content": "hi" }), &alice);
        assert!(matches!(add_comment(&store, req, &missing), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_delete_comment_permissions() {
        let store = MemoryStore::new();
        let owner = seed_user(&store, "owner", false);
        let commenter = seed_user(&store, "commenter", false);
        let stranger = seed_user(&store, "stranger", false);
        let target = seed_post(&store, &owner.id);

        let uri = format!("/api/comment/{}", target.id);
        let resp = add_comment(&store, post(&uri, serde_json::json!({ "content": "mine" }), &commenter), &target.id).unwrap();
        let comment_id = body_json(&resp)["data"]["_id"].as_str().unwrap().to_string();

        let uri = format!("/api/comment/{}", comment_id);
        let by_stranger = request(Method::Delete, &uri, None, Some(&stranger.id));
        assert!(matches!(delete_comment(&store, by_stranger, &comment_id), Err(ApiError::Forbidden(_))));

        let by_owner = request(Method::Delete, &uri, None, Some(&owner.id));
        delete_comment(&store, by_owner, &comment_id).unwrap();
        assert!(require_post(&store, &target.id).unwrap().comments.is_empty());

        let again = request(Method::Delete, &uri, None, Some(&owner.id));
        assert!(matches!(delete_comment(&store, again, &comment_id), Err(ApiError::NotFound(_))));
    }
}
