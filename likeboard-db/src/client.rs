use crate::record::{
    AuthenticationRecord, FullPostRecord, LikeRecord, PartialPostRecord, PostSummaryRecord,
    UserRecord,
};
use likeboard_common::model::{
    Id, ModelValidationError,
    auth::{AuthTokenHash, Authentication},
    like::Like,
    post::{PartialPost, Post, PostContent, PostMarker, PostSummary},
    user::{User, UserMarker},
};
use likeboard_common::snowflake::{
    ProcessId, Snowflake, SnowflakeGenerator, SnowflakeTimestampError, WorkerId,
};
use sqlx::{
    PgPool, migrate::MigrateError, postgres::PgPoolOptions, query, query_as, query_scalar,
};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, instrument};

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("Unique constraint {constraint} was violated")]
    UniqueViolation { constraint: String },
    #[error("Could not generate an id: {0}")]
    Snowflake(#[from] SnowflakeTimestampError),
    #[error("Running migrations failed: {0}")]
    Migrate(#[from] MigrateError),
    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DbError::UniqueViolation {
                    constraint: db_err.constraint().unwrap_or("unknown").to_owned(),
                }
            }
            err => DbError::Sqlx(err),
        }
    }
}

const FULL_POST_COLUMNS: &str = "
    posts.post_snowflake,
    posts.content,
    posts.created_at,
    users.user_snowflake,
    users.handle,
    users.email
";

const POSTS_WITH_AUTHORS: &str =
    "posts.posts JOIN users.users ON users.user_snowflake = posts.user_snowflake";

#[derive(Debug)]
pub struct DbClient {
    pool: PgPool,
    snowflake_generator: Mutex<SnowflakeGenerator>,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            pool,
            snowflake_generator: Mutex::new(SnowflakeGenerator::new(worker_id, process_id)),
        }
    }

    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        worker_id: WorkerId,
        process_id: ProcessId,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self::new(pool, worker_id, process_id))
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!().run(&self.pool).await?;
        Ok(())
    }

    fn next_snowflake(&self) -> Result<Snowflake> {
        let mut generator = self
            .snowflake_generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(generator.generate()?)
    }

    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT
                users.user_snowflake,
                users.handle,
                users.email
            FROM
                users.users
            WHERE
                users.user_snowflake = $1
            ",
        )
        .bind(user_id.to_db())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        let record = query_as::<_, AuthenticationRecord>(
            "
            SELECT
                authentications.user_snowflake,
                authentications.token_hash,
                authentications.created_at,
                authentications.expires_after_seconds
            FROM
                users.authentications
            WHERE
                authentications.token_hash = $1
            ",
        )
        .bind(&token_hash.0[..])
        .fetch_optional(&self.pool)
        .await?;

        let authentication = record.map(Authentication::try_from).transpose()?;
        Ok(authentication)
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, FullPostRecord>(&format!(
            "
            SELECT {FULL_POST_COLUMNS}
            FROM
                {POSTS_WITH_AUTHORS}
            WHERE
                posts.post_snowflake = $1
            "
        ))
        .bind(post_id.to_db())
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    /// Newest posts first, with their like counts.
    pub async fn fetch_posts(&self, limit: i64) -> Result<Vec<PostSummary>> {
        let records = query_as::<_, PostSummaryRecord>(&format!(
            "
            SELECT
                {FULL_POST_COLUMNS},
                (
                    SELECT COUNT(*)
                    FROM likes.likes
                    WHERE likes.post_snowflake = posts.post_snowflake
                ) AS like_count
            FROM
                {POSTS_WITH_AUTHORS}
            ORDER BY
                posts.post_snowflake DESC
            LIMIT $1
            "
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let posts = records
            .into_iter()
            .map(PostSummary::try_from)
            .collect::<Result<_, _>>()?;
        Ok(posts)
    }

    /// `None` if the user does not exist.
    pub async fn fetch_user_posts(
        &self,
        user_id: Id<UserMarker>,
    ) -> Result<Option<Vec<PartialPost>>> {
        if self.fetch_user(user_id).await?.is_none() {
            return Ok(None);
        }

        let records = query_as::<_, PartialPostRecord>(
            "
            SELECT
                posts.post_snowflake,
                posts.user_snowflake,
                posts.content,
                posts.created_at
            FROM
                posts.posts
            WHERE
                posts.user_snowflake = $1
            ORDER BY
                posts.post_snowflake DESC
            ",
        )
        .bind(user_id.to_db())
        .fetch_all(&self.pool)
        .await?;

        let posts = records
            .into_iter()
            .map(PartialPost::try_from)
            .collect::<Result<_, _>>()?;
        Ok(Some(posts))
    }

    pub async fn create_post(
        &self,
        content: &PostContent,
        author: Id<UserMarker>,
    ) -> Result<PartialPost> {
        let post_snowflake = self.next_snowflake()?;

        let record = query_as::<_, PartialPostRecord>(
            "
            INSERT INTO posts.posts (post_snowflake, content, user_snowflake)
            VALUES ($1, $2, $3)
            RETURNING post_snowflake, user_snowflake, content, created_at
            ",
        )
        .bind(post_snowflake.get().cast_signed())
        .bind(content.get())
        .bind(author.to_db())
        .fetch_one(&self.pool)
        .await?;

        Ok(record.try_into()?)
    }

    /// Returns whether a row was removed. Likes on the post go with it.
    #[instrument(skip(self), level = "debug")]
    pub async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let result = query(
            "
            DELETE FROM posts.posts
            WHERE posts.post_snowflake = $1
            ",
        )
        .bind(post_id.to_db())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn find_like(
        &self,
        user_id: Id<UserMarker>,
        post_id: Id<PostMarker>,
    ) -> Result<Option<Like>> {
        let record = query_as::<_, LikeRecord>(
            "
            SELECT
                likes.like_snowflake,
                likes.user_snowflake,
                likes.post_snowflake,
                likes.created_at
            FROM
                likes.likes
            WHERE
                likes.user_snowflake = $1 AND likes.post_snowflake = $2
            ",
        )
        .bind(user_id.to_db())
        .bind(post_id.to_db())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Like::from))
    }

    /// Fails with [`DbError::UniqueViolation`] if the like already exists.
    #[instrument(skip(self), level = "debug")]
    pub async fn create_like(
        &self,
        user_id: Id<UserMarker>,
        post_id: Id<PostMarker>,
    ) -> Result<Like> {
        let like_snowflake = self.next_snowflake()?;

        let record = query_as::<_, LikeRecord>(
            "
            INSERT INTO likes.likes (like_snowflake, user_snowflake, post_snowflake)
            VALUES ($1, $2, $3)
            RETURNING like_snowflake, user_snowflake, post_snowflake, created_at
            ",
        )
        .bind(like_snowflake.get().cast_signed())
        .bind(user_id.to_db())
        .bind(post_id.to_db())
        .fetch_one(&self.pool)
        .await?;

        Ok(record.into())
    }

    /// Returns whether a row was removed.
    #[instrument(skip(self), level = "debug")]
    pub async fn delete_like(&self, like: &Like) -> Result<bool> {
        let result = query(
            "
            DELETE FROM likes.likes
            WHERE likes.like_snowflake = $1
            ",
        )
        .bind(like.id.to_db())
        .execute(&self.pool)
        .await?;

        debug!(rows = result.rows_affected(), "Deleted like");
        Ok(result.rows_affected() > 0)
    }

    /// Users who liked the post, oldest like first. `None` if the post does not exist.
    pub async fn fetch_post_likers(&self, post_id: Id<PostMarker>) -> Result<Option<Vec<User>>> {
        let post_exists = query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM posts.posts WHERE posts.post_snowflake = $1)",
        )
        .bind(post_id.to_db())
        .fetch_one(&self.pool)
        .await?;
        if !post_exists {
            return Ok(None);
        }

        let records = query_as::<_, UserRecord>(
            "
            SELECT
                users.user_snowflake,
                users.handle,
                users.email
            FROM
                likes.likes
                JOIN users.users ON users.user_snowflake = likes.user_snowflake
            WHERE
                likes.post_snowflake = $1
            ORDER BY
                likes.like_snowflake
            ",
        )
        .bind(post_id.to_db())
        .fetch_all(&self.pool)
        .await?;

        let users = records
            .into_iter()
            .map(User::try_from)
            .collect::<Result<_, _>>()?;
        Ok(Some(users))
    }

    /// Posts the user has liked, most recent like first. `None` if the user does not exist.
    pub async fn fetch_liked_posts(&self, user_id: Id<UserMarker>) -> Result<Option<Vec<Post>>> {
        if self.fetch_user(user_id).await?.is_none() {
            return Ok(None);
        }

        let records = query_as::<_, FullPostRecord>(&format!(
            "
            SELECT {FULL_POST_COLUMNS}
            FROM
                likes.likes
                JOIN ({POSTS_WITH_AUTHORS}) ON posts.post_snowflake = likes.post_snowflake
            WHERE
                likes.user_snowflake = $1
            ORDER BY
                likes.like_snowflake DESC
            "
        ))
        .bind(user_id.to_db())
        .fetch_all(&self.pool)
        .await?;

        let posts = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?;
        Ok(Some(posts))
    }
}
