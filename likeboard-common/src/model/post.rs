use crate::model::{
    Id,
    user::{User, UserMarker},
};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;
use time::UtcDateTime;

pub const POST_CONTENT_MAX_LEN: usize = 10_000;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author: User,
    pub content: PostContent,
    #[serde(with = "crate::util::rfc3339")]
    pub created_at: UtcDateTime,
}

/// A post without its author resolved.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct PartialPost {
    pub id: Id<PostMarker>,
    pub author_id: Id<UserMarker>,
    pub content: PostContent,
    #[serde(with = "crate::util::rfc3339")]
    pub created_at: UtcDateTime,
}

/// Listing entry for the posts index.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct PostSummary {
    #[serde(flatten)]
    pub post: Post,
    pub like_count: u64,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct PostContent(String);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidPostContentError {
    #[error("You must write a post.")]
    Missing,
    #[error("The post cannot be greater than 10,000 characters.")]
    TooLong,
}

impl PostContent {
    pub fn new(content: String) -> Result<Self, InvalidPostContentError> {
        if content.trim().is_empty() {
            Err(InvalidPostContentError::Missing)
        } else if content.chars().count() > POST_CONTENT_MAX_LEN {
            Err(InvalidPostContentError::TooLong)
        } else {
            Ok(Self(content))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for PostContent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        PostContent::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Other(&err.to_string()), &"PostContent"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::post::{InvalidPostContentError, POST_CONTENT_MAX_LEN, PostContent};

    #[test]
    fn content_is_required() {
        assert_eq!(
            PostContent::new(String::new()),
            Err(InvalidPostContentError::Missing)
        );
        assert_eq!(
            PostContent::new(" \n\t".to_owned()),
            Err(InvalidPostContentError::Missing)
        );
    }

    #[test]
    fn content_length_is_counted_in_chars() {
        assert!(PostContent::new("é".repeat(POST_CONTENT_MAX_LEN)).is_ok());
        assert_eq!(
            PostContent::new("a".repeat(POST_CONTENT_MAX_LEN + 1)),
            Err(InvalidPostContentError::TooLong)
        );
    }
}
