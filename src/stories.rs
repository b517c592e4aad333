use chrono::Utc;
use spin_sdk::http::{Request, Response};

use crate::auth::authenticate;
use crate::config::*;
use crate::core::db::{load_story, require_user};
use crate::core::errors::{ApiError, ApiResult};
use crate::core::form::Form;
use crate::core::helpers::{ok_data, require_id, success};
use crate::core::store::{Batch, DocumentStore};
use crate::feed::can_view;
use crate::models::models::{push_unique, Story};
use crate::models::views::StoryView;

pub fn create_story(store: &dyn DocumentStore, req: Request) -> ApiResult<Response> {
    let user_id = authenticate(store, &req)?;
    let form = Form::from_request(&req)?;
    let image = form
        .save_single_image(store, "story_image", "story", &user_id)?
        .ok_or_else(|| ApiError::bad_request("Please provide a valid image file"))?;

    let mut author = require_user(store, &user_id, "User not found")?;
    let story = Story::new(&user_id, image);
    push_unique(&mut author.stories, &story.id);
    author.touch();

    let mut batch = Batch::new();
    batch.put(story_key(&story.id), &story)?;
    batch.put(user_key(&author.id), &author)?;
    batch.commit(store)?;

    tracing::info!(story_id = %story.id, author = %user_id, "story created");
    success(201, Some(StoryView::from(&story)), Some("Story added successfully!"))
}

/// Records the caller as a viewer. Authors viewing their own story are not
/// counted.
pub fn view_story(store: &dyn DocumentStore, req: Request, story_id: &str) -> ApiResult<Response> {
    let user_id = authenticate(store, &req)?;
    let now = Utc::now();
    let mut story = load_story(store, require_id(story_id)?)?
        .filter(|s| s.is_visible_at(now))
        .ok_or_else(|| ApiError::not_found("Story not found"))?;

    let author = require_user(store, &story.author, "User not found")?;
    if !can_view(&user_id, &author) {
        return Err(ApiError::Forbidden("This account is private".to_string()));
    }

    if story.author != user_id && push_unique(&mut story.viewers, &user_id) {
        story.updated_at = now;
        store.set_json(&story_key(&story.id), &story)?;
        tracing::debug!(story_id = %story.id, viewer = %user_id, "story viewed");
    }
    ok_data(StoryView::from(&story))
}
