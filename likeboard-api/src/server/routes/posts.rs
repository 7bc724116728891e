use crate::server::{
    AppUrl, Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    flash::{Flash, FlashLevel, FlashRedirect, PendingFlash},
    json::Json,
};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
};
use axum_extra::{
    extract::CookieJar,
    routing::{RouterExt, TypedPath},
};
use likeboard_common::model::{
    Id,
    post::{PartialPost, Post, PostContent, PostMarker, PostSummary},
    user::UserMarker,
};
use likeboard_db::DbClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

const POSTS_PAGE_SIZE: i64 = 100;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_posts)
        .typed_post(create_post)
        .typed_get(get_post)
        .typed_delete(delete_post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts")]
struct PostsPath;

/// The listing page, with the flash left by the previous action.
#[derive(Serialize)]
struct PostsPage {
    flash: Option<Flash>,
    posts: Vec<PostSummary>,
}

async fn get_posts(
    _: PostsPath,
    State(db): State<Arc<DbClient>>,
    PendingFlash { flash, jar }: PendingFlash,
) -> Result<(CookieJar, Json<PostsPage>)> {
    let posts = db.fetch_posts(POSTS_PAGE_SIZE).await?;

    Ok((jar, Json(PostsPage { flash, posts })))
}

#[derive(Deserialize)]
struct CreatePostBody {
    content: String,
}

async fn create_post(
    _: PostsPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(body): Json<CreatePostBody>,
) -> Result<(StatusCode, Json<PartialPost>)> {
    let content = PostContent::new(body.content)?;
    let post = db.create_post(&content, user.user_id()).await?;
    info!(post = %post.id, author = %post.author_id, "Post created");

    Ok((StatusCode::CREATED, Json(post)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

async fn get_post(
    PostPath { id }: PostPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Post>> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}

fn ensure_author(post: &Post, user: Id<UserMarker>) -> Result<()> {
    if post.author.id == user {
        Ok(())
    } else {
        Err(ServerError::NotPostAuthor {
            post: post.id,
            user,
        })
    }
}

async fn delete_post(
    PostPath { id }: PostPath,
    State(db): State<Arc<DbClient>>,
    State(app_url): State<AppUrl>,
    user: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<FlashRedirect> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;
    ensure_author(&post, user.user_id())?;

    // Gone in between: someone else's delete won.
    if !db.delete_post(id).await? {
        return Err(ServerError::PostByIdNotFound(id));
    }
    info!(post = %id, author = %post.author.id, "Post deleted");

    let flash = Flash {
        level: FlashLevel::Success,
        message: "Post deleted.".to_owned(),
    };
    Ok(FlashRedirect::back(&headers, &app_url, flash))
}

#[cfg(test)]
mod tests {
    use crate::server::{
        ServerError,
        flash::{Flash, FlashLevel},
        routes::posts::{PostsPage, ensure_author},
    };
    use likeboard_common::model::{
        post::{Post, PostContent},
        user::{User, UserHandle},
    };
    use serde_json::json;
    use time::UtcDateTime;

    fn post_by(author: u64) -> Post {
        Post {
            id: 10_u64.into(),
            author: User {
                id: author.into(),
                handle: UserHandle::new("alice".to_owned()).unwrap(),
                email: None,
            },
            content: PostContent::new("Hello".to_owned()).unwrap(),
            created_at: UtcDateTime::now(),
        }
    }

    #[test]
    fn only_the_author_may_delete() {
        let post = post_by(1);

        assert!(ensure_author(&post, 1_u64.into()).is_ok());

        let err = ensure_author(&post, 2_u64.into()).unwrap_err();
        assert!(matches!(
            err,
            ServerError::NotPostAuthor { post, user } if post.to_db() == 10 && user.to_db() == 2
        ));
    }

    #[test]
    fn listing_carries_flash() {
        let page = PostsPage {
            flash: Some(Flash {
                level: FlashLevel::Success,
                message: "Post liked!".to_owned(),
            }),
            posts: Vec::new(),
        };

        assert_eq!(
            serde_json::to_value(&page).unwrap(),
            json!({
                "flash": { "level": "success", "message": "Post liked!" },
                "posts": [],
            })
        );

        let empty = PostsPage {
            flash: None,
            posts: Vec::new(),
        };
        assert_eq!(
            serde_json::to_value(&empty).unwrap(),
            json!({ "flash": null, "posts": [] })
        );
    }
}
