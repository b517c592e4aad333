use spin_sdk::http::{Request, Response};

use crate::core::errors::{ApiError, ApiResult};
use crate::core::query_params::{decode_segment, path_segments};
use crate::core::static_server::{serve_image, serve_static};
use crate::core::store::DocumentStore;
use crate::{auth, comments, follow, posts, search, stories, users};

/// Dispatches a request to its handler. Every failure is rendered through
/// the `ApiError` response formatter, so this never fails.
pub fn route(store: &dyn DocumentStore, req: Request) -> Response {
    let method = req.method().to_string().to_uppercase();
    let path = req.path().to_string();
    tracing::debug!(method = %method, path = %path, "incoming request");

    dispatch(store, req, &method, &path).unwrap_or_else(Response::from)
}

fn dispatch(store: &dyn DocumentStore, req: Request, method: &str, path: &str) -> ApiResult<Response> {
    let segments = path_segments(path);

    match (method, segments.as_slice()) {
        // auth
        ("POST", ["api", "auth", "register"]) => auth::register(store, req),
        ("POST", ["api", "auth", "login"]) => auth::login(store, req),
        ("GET", ["api", "auth", "logout"]) => auth::logout(store, req),

        // user
        ("GET", ["api", "user", "profile"]) => users::get_profile(store, req),
        ("POST", ["api", "user", "edit"]) => users::edit_profile(store, req),
        ("GET", ["api", "user", "sentRequests"]) => users::get_sent_requests(store, req),
        ("GET", ["api", "user", "followerRequests"]) => users::get_follower_requests(store, req),
        ("GET", ["api", "user", "followers", id]) => users::get_followers(store, req, id),
        ("GET", ["api", "user", "followings", id]) => users::get_followings(store, req, id),
        ("GET", ["api", "user", "get", query]) => search::handle_search(store, req, &decode_segment(query)),
        ("POST", ["api", "user", "follow", id]) => follow::handle_follow(store, req, id),
        ("POST", ["api", "user", "unfollow", id]) => follow::handle_unfollow(store, req, id),
        ("POST", ["api", "user", "cancel", id]) => follow::handle_cancel(store, req, id),
        ("POST", ["api", "user", "accept", id]) => follow::handle_accept(store, req, id),
        ("POST", ["api", "user", "dismiss", id]) => follow::handle_dismiss(store, req, id),

        // post
        ("GET", ["api", "post", "followings"]) => posts::get_following_posts(store, req),
        ("GET", ["api", "post", "likedPosts"]) => posts::get_liked_posts(store, req),
        ("POST", ["api", "post", "create"]) => posts::create_post(store, req),
        ("GET", ["api", "post", "get", id]) => posts::get_user_posts(store, req, id),
        ("PUT", ["api", "post", "update", id]) => posts::update_post(store, req, id),
        ("DELETE", ["api", "post", "delete", id]) => posts::delete_post(store, req, id),
        ("POST", ["api", "post", "like", id]) => posts::like_post(store, req, id),

        // comment
        ("POST", ["api", "comment", id]) => comments::add_comment(store, req, id),
        ("DELETE", ["api", "comment", id]) => comments::delete_comment(store, req, id),

        // story
        ("POST", ["api", "story", "create"]) => stories::create_story(store, req),
        ("POST", ["api", "story", "view", id]) => stories::view_story(store, req, id),

        ("GET", ["images", name]) => serve_image(store, &decode_segment(name)),
        ("GET", ["api", ..]) => Err(ApiError::not_found("No route found")),
        ("GET", _) => serve_static(path),
        _ => Err(ApiError::not_found("No route found")),
    }
}
