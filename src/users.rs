use chrono::Utc;
use serde::Serialize;
use spin_sdk::http::{Request, Response};

use crate::auth::authenticate;
use crate::config::{MAX_NAME_LENGTH, MIN_NAME_LENGTH};
use crate::core::db::{load_user, require_user, save_user};
use crate::core::errors::{ApiError, ApiResult};
use crate::core::form::Form;
use crate::core::helpers::{ok_data, require_id, sanitize_text, success};
use crate::core::store::DocumentStore;
use crate::models::models::User;
use crate::models::views::{OwnStoryView, Populator, UserCard};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FollowingView {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    profile_picture: String,
    private: bool,
    stories: Vec<OwnStoryView>,
    followers: Vec<String>,
    followings: Vec<String>,
}

/// The signed-in user's own document, password excluded.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileView {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    email: String,
    private: bool,
    profile_picture: String,
    liked_posts: Vec<String>,
    posts: Vec<String>,
    stories: Vec<OwnStoryView>,
    followings: Vec<FollowingView>,
    followers: Vec<String>,
    follower_requests: Vec<String>,
    sent_requests: Vec<String>,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

fn build_profile(store: &dyn DocumentStore, user: User) -> anyhow::Result<ProfileView> {
    let populator = Populator::new(store, Utc::now());

    let mut followings = Vec::with_capacity(user.followings.len());
    for id in &user.followings {
        if let Some(f) = load_user(store, id)? {
            followings.push(FollowingView {
                stories: populator.own_stories(&f.stories)?,
                id: f.id,
                name: f.name,
                profile_picture: f.profile_picture,
                private: f.private,
                followers: f.followers,
                followings: f.followings,
            });
        }
    }

    Ok(ProfileView {
        stories: populator.own_stories(&user.stories)?,
        followings,
        id: user.id,
        name: user.name,
        email: user.email,
        private: user.private,
        profile_picture: user.profile_picture,
        liked_posts: user.liked_posts,
        posts: user.posts,
        followers: user.followers,
        follower_requests: user.follower_requests,
        sent_requests: user.sent_requests,
        created_at: user.created_at,
        updated_at: user.updated_at,
    })
}

pub fn get_profile(store: &dyn DocumentStore, req: Request) -> ApiResult<Response> {
    let user_id = authenticate(store, &req)?;
    let user = require_user(store, &user_id, "User not found")?;
    ok_data(build_profile(store, user)?)
}

/// Updates name, privacy and profile picture. Accepts either a JSON body or a
/// multipart form whose `info` field holds the JSON and whose
/// `profile_image` field holds the picture.
pub fn edit_profile(store: &dyn DocumentStore, req: Request) -> ApiResult<Response> {
    let user_id = authenticate(store, &req)?;
    let mut user = require_user(store, &user_id, "User not found!")?;

    let form = Form::from_request(&req)?;
    let info = match form.text("info") {
        Some(info) => Form::from_json(info.as_bytes())?,
        None => Form::from_json(b"")?,
    };
    let field = |name: &str| info.text(name).or_else(|| form.text(name)).map(str::to_string);

    if let Some(name) = field("name").map(|n| sanitize_text(n.trim())).filter(|n| !n.is_empty()) {
        let len = name.chars().count();
        if !(MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&len) {
            return Err(ApiError::bad_request("Name must be between 3 and 15 characters"));
        }
        user.name = name;
    }
    if let Some(private) = info.flag("private").or_else(|| form.flag("private")) {
        user.private = private;
    }
    if let Some(picture) = form.save_single_image(store, "profile_image", "user", &user_id)? {
        user.profile_picture = picture;
    }

    user.touch();
    save_user(store, &user)?;
    tracing::info!(user_id = %user.id, private = user.private, "profile updated");

    success(
        200,
        Some(serde_json::json!({
            "name": user.name,
            "profilePicture": user.profile_picture,
            "private": user.private,
        })),
        None,
    )
}

fn relation_cards(
    store: &dyn DocumentStore,
    user_id: &str,
    select: impl Fn(&User) -> &Vec<String>,
) -> ApiResult<Vec<UserCard>> {
    let user = require_user(store, user_id, "User not found")?;
    Ok(Populator::new(store, Utc::now()).cards(select(&user))?)
}

pub fn get_followers(store: &dyn DocumentStore, req: Request, user_id: &str) -> ApiResult<Response> {
    authenticate(store, &req)?;
    ok_data(relation_cards(store, require_id(user_id)?, |u| &u.followers)?)
}

pub fn get_followings(store: &dyn DocumentStore, req: Request, user_id: &str) -> ApiResult<Response> {
    authenticate(store, &req)?;
    ok_data(relation_cards(store, require_id(user_id)?, |u| &u.followings)?)
}

pub fn get_sent_requests(store: &dyn DocumentStore, req: Request) -> ApiResult<Response> {
    let user_id = authenticate(store, &req)?;
    ok_data(relation_cards(store, &user_id, |u| &u.sent_requests)?)
}

pub fn get_follower_requests(store: &dyn DocumentStore, req: Request) -> ApiResult<Response> {
    let user_id = authenticate(store, &req)?;
    ok_data(relation_cards(store, &user_id, |u| &u.follower_requests)?)
}
