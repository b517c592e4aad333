//! Follow relationships between users.
//!
//! Each ordered pair (A, B) moves through `none -> pending -> active` when B is
//! private, or straight to `active` when B is public. A pending request lives in
//! `B.follower_requests` and `A.sent_requests`; an active edge lives in
//! `B.followers` and `A.followings`. Both documents are committed together.

use chrono::Utc;
use spin_sdk::http::{Request, Response};

use crate::auth::authenticate;
use crate::config::user_key;
use crate::core::db::require_user;
use crate::core::errors::{ApiError, ApiResult};
use crate::core::helpers::{ok_data, ok_message, require_id};
use crate::core::store::{Batch, DocumentStore};
use crate::models::models::{pull, push_unique, User};
use crate::models::views::Populator;

const USER_NOT_FOUND: &str = "User not found.";

#[derive(Debug)]
pub enum FollowOutcome {
    /// Target is private; a request is now pending.
    Requested(User),
    /// Target is public; the follow edge exists.
    Followed(User),
}

fn commit_pair(store: &dyn DocumentStore, first: &mut User, second: &mut User) -> ApiResult<()> {
    first.touch();
    second.touch();
    let mut batch = Batch::new();
    batch.put(user_key(&first.id), &*first)?;
    batch.put(user_key(&second.id), &*second)?;
    batch.commit(store)?;
    Ok(())
}

pub fn follow_user(store: &dyn DocumentStore, requester_id: &str, target_id: &str) -> ApiResult<FollowOutcome> {
    if requester_id == target_id {
        return Err(ApiError::bad_request("You cannot follow yourself."));
    }

    let mut target = require_user(store, target_id, USER_NOT_FOUND)?;
    let requester_key = requester_id.to_string();
    if target.follower_requests.contains(&requester_key) || target.followers.contains(&requester_key) {
        return Err(ApiError::bad_request(
            "You have already sent a follow request to this user.",
        ));
    }
    let mut requester = require_user(store, requester_id, USER_NOT_FOUND)?;

    if target.private {
        push_unique(&mut target.follower_requests, requester_id);
        push_unique(&mut requester.sent_requests, target_id);
        commit_pair(store, &mut target, &mut requester)?;
        tracing::info!(from = %requester_id, to = %target_id, "follow request sent");
        return Ok(FollowOutcome::Requested(target));
    }

    push_unique(&mut requester.followings, target_id);
    push_unique(&mut target.followers, requester_id);
    commit_pair(store, &mut requester, &mut target)?;
    tracing::info!(from = %requester_id, to = %target_id, "followed");
    Ok(FollowOutcome::Followed(target))
}

pub fn unfollow_user(store: &dyn DocumentStore, follower_id: &str, target_id: &str) -> ApiResult<()> {
    if follower_id == target_id {
        return Err(ApiError::bad_request("You cannot unfollow yourself."));
    }

    let mut target = require_user(store, target_id, USER_NOT_FOUND)?;
    if !target.followers.iter().any(|id| id == follower_id) {
        return Err(ApiError::bad_request("You are not following this user."));
    }
    let mut follower = require_user(store, follower_id, USER_NOT_FOUND)?;

    pull(&mut target.followers, follower_id);
    pull(&mut follower.followings, target_id);
    commit_pair(store, &mut target, &mut follower)?;
    tracing::info!(from = %follower_id, to = %target_id, "unfollowed");
    Ok(())
}

/// Withdraws a pending request. Returns the requester with its updated
/// `sent_requests`.
pub fn cancel_request(store: &dyn DocumentStore, requester_id: &str, target_id: &str) -> ApiResult<User> {
    let mut requester = require_user(store, requester_id, USER_NOT_FOUND)?;
    if !requester.sent_requests.iter().any(|id| id == target_id) {
        return Err(ApiError::bad_request("Follow request not found."));
    }
    let mut target = require_user(store, target_id, USER_NOT_FOUND)?;

    pull(&mut requester.sent_requests, target_id);
    pull(&mut target.follower_requests, requester_id);
    commit_pair(store, &mut requester, &mut target)?;
    tracing::info!(from = %requester_id, to = %target_id, "follow request cancelled");
    Ok(requester)
}

/// Turns a pending request into a follow edge. Returns the owner.
pub fn accept_request(store: &dyn DocumentStore, owner_id: &str, requester_id: &str) -> ApiResult<User> {
    let mut owner = require_user(store, owner_id, USER_NOT_FOUND)?;
    if !owner.follower_requests.iter().any(|id| id == requester_id) {
        return Err(ApiError::bad_request("Follower request not found."));
    }
    let mut requester = require_user(store, requester_id, USER_NOT_FOUND)?;

    pull(&mut owner.follower_requests, requester_id);
    push_unique(&mut owner.followers, requester_id);
    pull(&mut requester.sent_requests, owner_id);
    push_unique(&mut requester.followings, owner_id);
    commit_pair(store, &mut owner, &mut requester)?;
    tracing::info!(from = %requester_id, to = %owner_id, "follow request accepted");
    Ok(owner)
}

/// Rejects a pending request without creating an edge. Returns the owner.
pub fn dismiss_request(store: &dyn DocumentStore, owner_id: &str, requester_id: &str) -> ApiResult<User> {
    let mut owner = require_user(store, owner_id, USER_NOT_FOUND)?;
    if !owner.follower_requests.iter().any(|id| id == requester_id) {
        return Err(ApiError::bad_request("Follow request not found."));
    }
    let mut requester = require_user(store, requester_id, USER_NOT_FOUND)?;

    pull(&mut owner.follower_requests, requester_id);
    pull(&mut requester.sent_requests, owner_id);
    commit_pair(store, &mut owner, &mut requester)?;
    tracing::info!(from = %requester_id, to = %owner_id, "follow request dismissed");
    Ok(owner)
}

// === HTTP Handlers ===

pub fn handle_follow(store: &dyn DocumentStore, req: Request, target_id: &str) -> ApiResult<Response> {
    let user_id = authenticate(store, &req)?;
    let target_id = require_id(target_id)?;

    match follow_user(store, &user_id, target_id)? {
        FollowOutcome::Requested(target) => ok_data(serde_json::json!({
            "user": { "_id": target.id, "private": target.private },
        })),
        FollowOutcome::Followed(target) => {
            let stories = Populator::new(store, Utc::now()).recent_stories(&target.stories)?;
            ok_data(serde_json::json!({
                "user": {
                    "_id": target.id,
                    "private": target.private,
                    "name": target.name,
                    "profilePicture": target.profile_picture,
                    "stories": stories,
                    "followers": target.followers,
                },
            }))
        }
    }
}

pub fn handle_unfollow(store: &dyn DocumentStore, req: Request, target_id: &str) -> ApiResult<Response> {
    let user_id = authenticate(store, &req)?;
    unfollow_user(store, &user_id, require_id(target_id)?)?;
    ok_message("Unfollowed successfully.")
}

pub fn handle_cancel(store: &dyn DocumentStore, req: Request, target_id: &str) -> ApiResult<Response> {
    let user_id = authenticate(store, &req)?;
    let requester = cancel_request(store, &user_id, require_id(target_id)?)?;
    ok_data(requester.sent_requests)
}

pub fn handle_accept(store: &dyn DocumentStore, req: Request, requester_id: &str) -> ApiResult<Response> {
    let user_id = authenticate(store, &req)?;
    let owner = accept_request(store, &user_id, require_id(requester_id)?)?;
    ok_data(serde_json::json!({
        "followerRequests": owner.follower_requests,
        "followers": owner.followers,
    }))
}

pub fn handle_dismiss(store: &dyn DocumentStore, req: Request, requester_id: &str) -> ApiResult<Response> {
    let user_id = authenticate(store, &req)?;
    let owner = dismiss_request(store, &user_id, require_id(requester_id)?)?;
    ok_data(owner.follower_requests)
}
