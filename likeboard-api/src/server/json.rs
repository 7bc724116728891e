use crate::server::ServerError;
use axum::{
    Json as AxumJson,
    extract::{FromRequest, Request, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use axum_extra::TypedHeader;
use headers::ContentType;
use serde::Serialize;

/// JSON body in and out. Bad bodies become [`ServerError::JsonRejection`] and
/// keep axum's status (`415`, `400` or `422`); a body that cannot be
/// serialized becomes a `500`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T, S> FromRequest<S> for Json<T>
where
    AxumJson<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let AxumJson(value) = AxumJson::<T>::from_request(request, state).await?;
        Ok(Self(value))
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(json) => (TypedHeader(ContentType::json()), json).into_response(),
            Err(err) => ServerError::JsonResponse(err).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::server::{ServerError, json::Json};
    use axum::{
        body::Body,
        extract::{FromRequest, Request},
        http::{StatusCode, header},
    };
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct NewPost {
        content: String,
    }

    fn request(content_type: Option<&str>, body: &'static str) -> Request {
        let mut request = axum::http::Request::builder().method("POST").uri("/posts");
        if let Some(content_type) = content_type {
            request = request.header(header::CONTENT_TYPE, content_type);
        }
        request.body(Body::from(body)).unwrap()
    }

    async fn extract(request: Request) -> Result<Json<NewPost>, ServerError> {
        Json::<NewPost>::from_request(request, &()).await
    }

    #[tokio::test]
    async fn accepts_json() {
        let Json(body) = extract(request(Some("application/json"), r#"{"content":"hi"}"#))
            .await
            .unwrap();

        assert_eq!(body.content, "hi");
    }

    #[tokio::test]
    async fn rejections_keep_their_status() {
        for (content_type, body, status) in [
            (None, r#"{"content":"hi"}"#, StatusCode::UNSUPPORTED_MEDIA_TYPE),
            (Some("application/json"), "{", StatusCode::BAD_REQUEST),
            (
                Some("application/json"),
                r#"{"content":5}"#,
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ] {
            let err = extract(request(content_type, body)).await.unwrap_err();

            assert!(matches!(err, ServerError::JsonRejection(_)));
            assert_eq!(err.status(), status, "{body}");
        }
    }
}
