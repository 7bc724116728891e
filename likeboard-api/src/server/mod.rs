use crate::{
    likes::{LikeToggleService, ToggleError},
    mail::MailQueue,
};
use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection},
    },
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use json::Json;
use likeboard_common::model::{
    Id,
    auth::{AuthTokenDecodeError, AuthTokenHashError},
    post::{InvalidPostContentError, PostMarker},
    user::UserMarker,
};
use likeboard_db::{DbClient, DbError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, warn};

mod auth;
pub mod flash;
mod json;
mod routes;

pub type ServerRouter = Router<ServerState>;

pub type LikeToggle = LikeToggleService<Arc<DbClient>, MailQueue>;

/// Public base url of the app, without a trailing slash.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct AppUrl(Arc<str>);

impl AppUrl {
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self(url.trim_end_matches('/').into())
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
    pub like_toggle: Arc<LikeToggle>,
    pub app_url: AppUrl,
}

pub fn routes() -> ServerRouter {
    routes::routes()
        .fallback(fallback)
        .method_not_allowed_fallback(method_not_allowed)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub async fn method_not_allowed(method: Method, uri: Uri) -> ServerError {
    ServerError::MethodNotAllowed(method, uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Method {0} is not allowed on {1}")]
    MethodNotAllowed(Method, Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Authorization header was missing or invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error("The provided auth token could not be decoded: {0}")]
    InvalidAuthToken(#[from] AuthTokenDecodeError),
    #[error("The auth token could not be hashed: {0}")]
    AuthTokenHash(#[from] AuthTokenHashError),
    #[error("Provided token was invalid")]
    InvalidToken,
    #[error(transparent)]
    Database(#[from] DbError),
    #[error(transparent)]
    InvalidPost(#[from] InvalidPostContentError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("User with id {0} was not found.")]
    UserByIdNotFound(Id<UserMarker>),
    #[error("Post {post} does not belong to user {user}.")]
    NotPostAuthor {
        post: Id<PostMarker>,
        user: Id<UserMarker>,
    },
}

impl From<ToggleError<DbError>> for ServerError {
    fn from(err: ToggleError<DbError>) -> Self {
        match err {
            ToggleError::Persistence(err) => ServerError::Database(err),
        }
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::UserByIdNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::MethodNotAllowed(..) => StatusCode::METHOD_NOT_ALLOWED,
            ServerError::InvalidAuthorizationHeader(rejection) if rejection.is_missing() => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::InvalidToken => StatusCode::UNAUTHORIZED,
            ServerError::NotPostAuthor { .. } => StatusCode::FORBIDDEN,
            ServerError::JsonRejection(rejection) => rejection.status(),
            ServerError::InvalidAuthorizationHeader(_)
            | ServerError::InvalidAuthToken(_) => StatusCode::BAD_REQUEST,
            ServerError::InvalidPost(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::JsonResponse(_)
            | ServerError::Database(_)
            | ServerError::AuthTokenHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!(error = %self, %status, "Replying with error");
        } else {
            warn!(error = %self, %status, "Replying with error");
        }

        // Server-side details stay in the log.
        let message = status.is_client_error().then(|| self.to_string());
        let error_response = ErrorResponse {
            status: status.as_u16(),
            message,
        };
        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        likes::ToggleError,
        server::{AppUrl, ErrorResponse, ServerError},
    };
    use axum::{
        http::{Method, StatusCode},
        response::{IntoResponse, Response},
    };
    use http_body_util::BodyExt;
    use likeboard_common::model::post::InvalidPostContentError;
    use likeboard_db::DbError;

    async fn body(response: Response) -> ErrorResponse {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[test]
    fn app_url_drops_trailing_slash() {
        assert_eq!(AppUrl::new("https://likeboard.example/").get(), "https://likeboard.example");
    }

    #[test]
    fn statuses() {
        assert_eq!(ServerError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ServerError::PostByIdNotFound(1_u64.into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServerError::InvalidPost(InvalidPostContentError::TooLong).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServerError::NotPostAuthor {
                post: 1_u64.into(),
                user: 2_u64.into(),
            }
            .status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServerError::MethodNotAllowed(Method::PATCH, "/posts".parse().unwrap()).status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }

    #[tokio::test]
    async fn validation_message_reaches_client() {
        let response = ServerError::InvalidPost(InvalidPostContentError::Missing).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let error = body(response).await;
        assert_eq!(error.status, 422);
        assert_eq!(error.message.as_deref(), Some("You must write a post."));
    }

    #[tokio::test]
    async fn lost_like_race_is_an_opaque_server_error() {
        let lost_race = ToggleError::Persistence(DbError::UniqueViolation {
            constraint: "likes_user_post_unique".to_owned(),
        });

        let err = ServerError::from(lost_race);
        assert!(matches!(
            &err,
            ServerError::Database(DbError::UniqueViolation { constraint })
                if constraint == "likes_user_post_unique"
        ));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let error = body(response).await;
        assert_eq!(error.status, 500);
        assert_eq!(error.message, None);
    }
}
