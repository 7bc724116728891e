use crate::server::ServerRouter;
use axum::{response::Redirect, routing::get};

mod likes;
mod posts;
mod users;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .route("/", get(|| async { Redirect::to("/posts") }))
        .merge(posts::routes())
        .merge(likes::routes())
        .merge(users::routes())
}

#[cfg(test)]
mod tests {
    use crate::{
        likes::LikeToggleService,
        mail::MailQueue,
        server::{self, AppUrl, ServerState},
    };
    use axum::{
        Router,
        body::Body,
        http::{Method, Request, StatusCode, header},
    };
    use likeboard_common::snowflake::{ProcessId, WorkerId};
    use likeboard_db::DbClient;
    use http_body_util::BodyExt;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Router over a pool that never connects; only requests rejected before
    /// touching the database can be exercised.
    fn app() -> Router {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://likeboard@localhost/likeboard")
            .unwrap();
        let db_client = Arc::new(DbClient::new(
            pool,
            WorkerId::default(),
            ProcessId::default(),
        ));
        let (mail_queue, _) = MailQueue::new();

        server::routes().with_state(ServerState {
            like_toggle: Arc::new(LikeToggleService::new(Arc::clone(&db_client), mail_queue)),
            db_client,
            app_url: AppUrl::new("http://localhost:8080"),
        })
    }

    async fn send(method: Method, uri: &str) -> axum::response::Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        app().oneshot(request).await.unwrap()
    }

    #[tokio::test]
    async fn root_redirects_to_posts() {
        let response = send(Method::GET, "/").await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/posts");
    }

    #[tokio::test]
    async fn toggle_requires_authentication() {
        let response = send(Method::POST, "/posts/1/like").await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn toggle_rejects_malformed_token() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/posts/1/like")
            .header(header::AUTHORIZATION, "Bearer not-a-token")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_post_id_is_not_found() {
        let response = send(Method::POST, "/posts/not-a-number/like").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_requires_authentication() {
        let response = send(Method::DELETE, "/posts/1").await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn delete_of_malformed_post_id_is_not_found() {
        let response = send(Method::DELETE, "/posts/not-a-number").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn wrong_method_is_a_json_error() {
        let response = send(Method::PATCH, "/posts/1").await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(error["status"], 405);
        assert_eq!(error["message"], "Method PATCH is not allowed on /posts/1");
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let response = send(Method::GET, "/nowhere").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
