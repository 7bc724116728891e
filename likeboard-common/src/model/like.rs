use crate::model::{Id, post::PostMarker, user::UserMarker};
use serde::{Deserialize, Serialize};
use time::UtcDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct LikeMarker;

/// "User `user_id` likes post `post_id`". Unique per `(user_id, post_id)`.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Like {
    pub id: Id<LikeMarker>,
    pub user_id: Id<UserMarker>,
    pub post_id: Id<PostMarker>,
    #[serde(with = "crate::util::rfc3339")]
    pub created_at: UtcDateTime,
}
