//! Liking and unliking posts.
//!
//! [`LikeToggleService::toggle`] flips whether an actor likes a post. Self-likes
//! are refused as a normal outcome. A transition into the liked state hands
//! exactly one notification to the [`PostLikedNotifier`] after the like row is
//! written; unliking never notifies.

mod store;

pub use store::LikeStore;

use likeboard_common::model::{post::Post, user::User};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Receives "post liked" events. Implementations must not block and must not
/// fail the caller; delivery happens elsewhere.
pub trait PostLikedNotifier: Send + Sync {
    fn notify_post_liked(&self, post: &Post, liker: &User);
}

impl<T: PostLikedNotifier + ?Sized> PostLikedNotifier for Arc<T> {
    fn notify_post_liked(&self, post: &Post, liker: &User) {
        (**self).notify_post_liked(post, liker);
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum ToggleOutcome {
    Liked,
    Unliked,
    SelfLikeRejected,
}

impl ToggleOutcome {
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            ToggleOutcome::Liked => "Post liked!",
            ToggleOutcome::Unliked => "Post unliked.",
            ToggleOutcome::SelfLikeRejected => "You cannot like your own post.",
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct ToggleResult {
    pub outcome: ToggleOutcome,
    pub message: &'static str,
}

impl From<ToggleOutcome> for ToggleResult {
    fn from(outcome: ToggleOutcome) -> Self {
        Self {
            outcome,
            message: outcome.message(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ToggleError<E> {
    #[error("Persisting the like failed: {0}")]
    Persistence(#[source] E),
}

pub struct LikeToggleService<S, N> {
    store: S,
    notifier: N,
}

impl<S, N> LikeToggleService<S, N>
where
    S: LikeStore,
    N: PostLikedNotifier,
{
    #[must_use]
    pub fn new(store: S, notifier: N) -> Self {
        Self { store, notifier }
    }

    #[instrument(skip_all, fields(actor = %actor.id, post = %post.id))]
    pub async fn toggle(
        &self,
        actor: &User,
        post: &Post,
    ) -> Result<ToggleResult, ToggleError<S::Error>> {
        if actor.id == post.author.id {
            info!("Refusing self-like");
            return Ok(ToggleOutcome::SelfLikeRejected.into());
        }

        let existing = self
            .store
            .find_like(actor.id, post.id)
            .await
            .map_err(ToggleError::Persistence)?;

        if let Some(like) = existing {
            let removed = self
                .store
                .delete_like(&like)
                .await
                .map_err(ToggleError::Persistence)?;
            if !removed {
                debug!(like = %like.id, "Like was already gone");
            }

            info!("Post unliked");
            return Ok(ToggleOutcome::Unliked.into());
        }

        let like = self
            .store
            .create_like(actor.id, post.id)
            .await
            .map_err(ToggleError::Persistence)?;
        info!(like = %like.id, "Post liked");

        if post.author.email.is_some() {
            self.notifier.notify_post_liked(post, actor);
        } else {
            debug!(owner = %post.author.id, "Owner has no email address, skipping notification");
        }

        Ok(ToggleOutcome::Liked.into())
    }
}
