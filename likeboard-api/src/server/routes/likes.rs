use crate::{
    likes::ToggleOutcome,
    server::{
        AppUrl, LikeToggle, Result, ServerError, ServerRouter, ServerState,
        auth::AuthenticatedUser,
        flash::{Flash, FlashLevel, FlashRedirect},
        json::Json,
    },
};
use axum::{extract::State, http::HeaderMap};
use axum_extra::routing::{RouterExt, TypedPath};
use likeboard_common::model::{Id, post::PostMarker, user::User};
use likeboard_db::DbClient;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(toggle_like)
        .typed_get(get_post_likes)
}

impl From<ToggleOutcome> for FlashLevel {
    fn from(outcome: ToggleOutcome) -> Self {
        match outcome {
            ToggleOutcome::Liked | ToggleOutcome::Unliked => FlashLevel::Success,
            ToggleOutcome::SelfLikeRejected => FlashLevel::Info,
        }
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/like", rejection(ServerError))]
struct ToggleLikePath {
    id: Id<PostMarker>,
}

#[axum::debug_handler(state = ServerState)]
async fn toggle_like(
    ToggleLikePath { id }: ToggleLikePath,
    State(db): State<Arc<DbClient>>,
    State(like_toggle): State<Arc<LikeToggle>>,
    State(app_url): State<AppUrl>,
    user: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<FlashRedirect> {
    let actor = user.fetch(&db).await?;
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    let result = like_toggle.toggle(&actor, &post).await?;

    let flash = Flash {
        level: result.outcome.into(),
        message: result.message.to_owned(),
    };
    Ok(FlashRedirect::back(&headers, &app_url, flash))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/likes", rejection(ServerError))]
struct PostLikesPath {
    id: Id<PostMarker>,
}

async fn get_post_likes(
    PostLikesPath { id }: PostLikesPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Vec<User>>> {
    let likers = db
        .fetch_post_likers(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(likers))
}
