use likeboard_common::model::{Id, like::Like, post::PostMarker, user::UserMarker};
use likeboard_db::{DbClient, DbError};
use std::{error::Error, sync::Arc};

/// Persistence the like toggle needs. Uniqueness of `(user, post)` is the
/// store's job: a duplicate `create_like` must fail.
pub trait LikeStore: Send + Sync {
    type Error: Error + Send + Sync + 'static;

    fn find_like(
        &self,
        user_id: Id<UserMarker>,
        post_id: Id<PostMarker>,
    ) -> impl Future<Output = Result<Option<Like>, Self::Error>> + Send;

    fn create_like(
        &self,
        user_id: Id<UserMarker>,
        post_id: Id<PostMarker>,
    ) -> impl Future<Output = Result<Like, Self::Error>> + Send;

    /// Returns whether the like still existed.
    fn delete_like(&self, like: &Like) -> impl Future<Output = Result<bool, Self::Error>> + Send;
}

impl LikeStore for DbClient {
    type Error = DbError;

    async fn find_like(
        &self,
        user_id: Id<UserMarker>,
        post_id: Id<PostMarker>,
    ) -> Result<Option<Like>, DbError> {
        DbClient::find_like(self, user_id, post_id).await
    }

    async fn create_like(
        &self,
        user_id: Id<UserMarker>,
        post_id: Id<PostMarker>,
    ) -> Result<Like, DbError> {
        DbClient::create_like(self, user_id, post_id).await
    }

    async fn delete_like(&self, like: &Like) -> Result<bool, DbError> {
        DbClient::delete_like(self, like).await
    }
}

impl<T: LikeStore> LikeStore for Arc<T> {
    type Error = T::Error;

    fn find_like(
        &self,
        user_id: Id<UserMarker>,
        post_id: Id<PostMarker>,
    ) -> impl Future<Output = Result<Option<Like>, Self::Error>> + Send {
        (**self).find_like(user_id, post_id)
    }

    fn create_like(
        &self,
        user_id: Id<UserMarker>,
        post_id: Id<PostMarker>,
    ) -> impl Future<Output = Result<Like, Self::Error>> + Send {
        (**self).create_like(user_id, post_id)
    }

    fn delete_like(&self, like: &Like) -> impl Future<Output = Result<bool, Self::Error>> + Send {
        (**self).delete_like(like)
    }
}
