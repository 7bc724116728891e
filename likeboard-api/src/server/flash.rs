//! One-shot status messages carried to the next page in a cookie.
//!
//! [`FlashRedirect`] sets the cookie; [`PendingFlash`] reads it on the next
//! request and hands back a jar that clears it, so each flash is shown once.

use crate::server::{AppUrl, ServerError};
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use time::Duration;
use tracing::{debug, warn};

pub const FLASH_COOKIE: &str = "flash";
pub const FALLBACK_LOCATION: &str = "/posts";
/// How long an unread flash survives in the browser.
pub const FLASH_MAX_AGE: Duration = Duration::minutes(5);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    /// Cookie-safe encoding: base64url of the JSON form.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        Ok(BASE64_URL_SAFE_NO_PAD.encode(json))
    }

    #[must_use]
    pub fn decode(value: &str) -> Option<Self> {
        let json = BASE64_URL_SAFE_NO_PAD.decode(value).ok()?;
        serde_json::from_slice(&json).ok()
    }
}

/// The flash left by the previous response, if any.
///
/// Return [`PendingFlash::jar`] as part of the response to clear the cookie.
#[derive(Clone, Debug)]
pub struct PendingFlash {
    pub flash: Option<Flash>,
    pub jar: CookieJar,
}

impl<S> FromRequestParts<S> for PendingFlash
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_request_parts(parts, state).await?;

        let Some(cookie) = jar.get(FLASH_COOKIE) else {
            return Ok(Self { flash: None, jar });
        };

        let flash = Flash::decode(cookie.value());
        if flash.is_none() {
            debug!("Discarding undecodable flash cookie");
        }

        Ok(Self {
            flash,
            jar: jar.remove(Cookie::build(FLASH_COOKIE).path("/")),
        })
    }
}

/// `303 See Other` back to where the user came from, with a flash attached.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct FlashRedirect {
    pub location: String,
    pub flash: Flash,
}

impl FlashRedirect {
    /// Redirects to the `Referer` if it points into this app, else to the post listing.
    #[must_use]
    pub fn back(headers: &HeaderMap, app_url: &AppUrl, flash: Flash) -> Self {
        let referer = headers
            .get(header::REFERER)
            .and_then(|value| value.to_str().ok());

        Self {
            location: back_location(referer, app_url),
            flash,
        }
    }
}

fn back_location(referer: Option<&str>, app_url: &AppUrl) -> String {
    let Some(referer) = referer else {
        return FALLBACK_LOCATION.to_owned();
    };

    let is_local_path = referer.starts_with('/') && !referer.starts_with("//");
    let is_own_url = referer
        .strip_prefix(app_url.get())
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'));

    if is_local_path || is_own_url {
        referer.to_owned()
    } else {
        warn!(referer, "Ignoring foreign referer");
        FALLBACK_LOCATION.to_owned()
    }
}

impl IntoResponse for FlashRedirect {
    fn into_response(self) -> Response {
        let value = match self.flash.encode() {
            Ok(value) => value,
            Err(err) => return ServerError::JsonResponse(err).into_response(),
        };
        let cookie = Cookie::build((FLASH_COOKIE, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(FLASH_MAX_AGE)
            .build();

        (
            [(header::SET_COOKIE, cookie.to_string())],
            Redirect::to(&self.location),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use crate::server::{
        AppUrl,
        flash::{
            FALLBACK_LOCATION, FLASH_COOKIE, FLASH_MAX_AGE, Flash, FlashLevel, FlashRedirect,
            PendingFlash, back_location,
        },
    };
    use axum::{
        extract::FromRequestParts,
        http::{HeaderMap, HeaderValue, Request, StatusCode, header},
        response::IntoResponse,
    };
    use axum_extra::extract::cookie::Cookie;

    fn app_url() -> AppUrl {
        AppUrl::new("https://likeboard.example")
    }

    fn liked() -> Flash {
        Flash {
            level: FlashLevel::Success,
            message: "Post liked!".to_owned(),
        }
    }

    async fn pending(cookie: Option<&str>) -> PendingFlash {
        let mut request = Request::builder().uri("/posts");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let (mut parts, ()) = request.body(()).unwrap().into_parts();

        PendingFlash::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[test]
    fn back_to_referer_inside_app() {
        assert_eq!(back_location(Some("/posts?page=2"), &app_url()), "/posts?page=2");
        assert_eq!(
            back_location(Some("https://likeboard.example/users/4"), &app_url()),
            "https://likeboard.example/users/4"
        );
    }

    #[test]
    fn foreign_or_missing_referer_falls_back() {
        for referer in [
            None,
            Some("https://evil.example/posts"),
            Some("//evil.example"),
            Some("https://likeboard.example.evil.example/"),
        ] {
            assert_eq!(back_location(referer, &app_url()), FALLBACK_LOCATION);
        }
    }

    #[test]
    fn flash_survives_cookie_encoding() {
        let encoded = liked().encode().unwrap();

        assert!(encoded.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(Flash::decode(&encoded), Some(liked()));
        assert_eq!(Flash::decode("%%%"), None);
    }

    #[test]
    fn all_levels_decode() {
        for (level, name) in [
            (FlashLevel::Success, "success"),
            (FlashLevel::Error, "error"),
            (FlashLevel::Warning, "warning"),
            (FlashLevel::Info, "info"),
        ] {
            assert_eq!(serde_json::to_value(level).unwrap(), name);

            let flash = Flash {
                level,
                message: "Heads up".to_owned(),
            };
            assert_eq!(Flash::decode(&flash.encode().unwrap()), Some(flash));
        }
    }

    #[test]
    fn redirect_response_carries_flash() {
        let mut headers = HeaderMap::new();
        headers.insert(header::REFERER, HeaderValue::from_static("/posts"));
        let flash = Flash {
            level: FlashLevel::Info,
            message: "You cannot like your own post.".to_owned(),
        };

        let response = FlashRedirect::back(&headers, &app_url(), flash.clone()).into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/posts");

        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        let cookie = Cookie::parse(set_cookie).unwrap();
        assert_eq!(cookie.name(), FLASH_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.max_age(), Some(FLASH_MAX_AGE));
        assert_eq!(Flash::decode(cookie.value()), Some(flash));
    }

    #[tokio::test]
    async fn flash_is_read_once() {
        let cookie = format!("{FLASH_COOKIE}={}", liked().encode().unwrap());

        let first = pending(Some(&cookie)).await;
        assert_eq!(first.flash, Some(liked()));

        // The response clears the cookie, so the browser sends none next time.
        let response = (first.jar, ()).into_response();
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        let removal = Cookie::parse(set_cookie).unwrap();
        assert_eq!(removal.name(), FLASH_COOKIE);
        assert_eq!(removal.value(), "");
        assert_eq!(removal.max_age(), Some(time::Duration::ZERO));

        let second = pending(None).await;
        assert_eq!(second.flash, None);
        let response = (second.jar, ()).into_response();
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn undecodable_flash_is_dropped_and_cleared() {
        // base64url of `not-json`
        let first = pending(Some("flash=bm90LWpzb24")).await;
        assert_eq!(first.flash, None);

        let response = (first.jar, ()).into_response();
        assert!(response.headers().get(header::SET_COOKIE).is_some());
    }
}
