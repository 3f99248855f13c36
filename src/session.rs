//! Session cookies and the guards that protect routes.
//!
//! The cookie carries `<token>.<signature>`, where the signature is an
//! HMAC-SHA256 of the token under the configured secret. The token itself
//! is looked up in the store, so logging out or expiring a session takes
//! effect immediately whatever the client still holds.

use anyhow::{Result, anyhow};
use axum::extract::{Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use base64ct::{Base64UrlUnpadded, Encoding};
use calnotes_core::{SessionPolicy, UserId};
use chrono::Utc;
use hmac::{Hmac, Mac};
use log::debug;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;

use crate::config::SessionConfig;
use crate::routes::AppError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

const GENERATED_SECRET_BYTES: usize = 48;

/// A random secret suitable for `session_secret`.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; GENERATED_SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}

/// The authenticated caller, inserted into request extensions by the guards.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub user_id: UserId,
    pub username: String,
}

pub struct SessionCookies {
    mac: HmacSha256,
    cookie_name: String,
    policy: SessionPolicy,
    secure: bool,
}

impl SessionCookies {
    pub fn new(secret: &[u8], config: &SessionConfig) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| anyhow!("Invalid session secret: {}", e))?;
        Ok(SessionCookies {
            mac,
            cookie_name: config.cookie_name.clone(),
            policy: config.policy()?,
            secure: config.secure_cookie,
        })
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    fn signature(&self, token: &str) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        mac
    }

    /// Cookie value for `token`.
    pub fn encode(&self, token: &str) -> String {
        let sig = self.signature(token).finalize().into_bytes();
        format!("{}.{}", token, Base64UrlUnpadded::encode_string(&sig))
    }

    /// The token inside a cookie value, if the signature checks out.
    pub fn decode<'a>(&self, value: &'a str) -> Option<&'a str> {
        let (token, sig) = value.rsplit_once('.')?;
        let sig = Base64UrlUnpadded::decode_vec(sig).ok()?;
        self.signature(token).verify_slice(&sig).ok()?;
        Some(token)
    }

    /// The verified session token from the request's cookies.
    pub fn token_from_headers<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|cookies| cookies.split(';'))
            .filter_map(|cookie| cookie.trim().split_once('='))
            .filter(|(name, _)| *name == self.cookie_name)
            .find_map(|(_, value)| self.decode(value))
    }

    /// `Set-Cookie` value establishing a session.
    pub fn set_cookie(&self, token: &str) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
            self.cookie_name,
            self.encode(token),
            self.policy.lifetime.num_seconds(),
            if self.secure { "; Secure" } else { "" }
        )
    }

    /// `Set-Cookie` value removing the session cookie.
    pub fn clear_cookie(&self) -> String {
        format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0{}",
            self.cookie_name,
            if self.secure { "; Secure" } else { "" }
        )
    }
}

struct Authorized {
    user: CurrentUser,
    refresh_cookie: Option<String>,
}

/// Resolve the request's session, extending it in sliding mode.
async fn authorize(state: &AppState, headers: &HeaderMap) -> Result<Option<Authorized>, AppError> {
    let Some(token) = state.cookies.token_from_headers(headers) else {
        return Ok(None);
    };

    let token = token.to_string();
    let policy = state.cookies.policy().clone();
    let sliding = policy.sliding;
    let found = state
        .run(move |store, _| {
            let now = Utc::now();
            let Some(session) = store.find_session(&token, now)? else {
                return Ok(None);
            };
            if policy.sliding {
                store.extend_session(&session.token, policy.expiry_from(now)?)?;
            }
            Ok(Some(session))
        })
        .await?;

    Ok(found.map(|session| Authorized {
        refresh_cookie: sliding.then(|| state.cookies.set_cookie(&session.token)),
        user: CurrentUser {
            user_id: session.user_id,
            username: session.username,
        },
    }))
}

async fn proceed(authorized: Authorized, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(authorized.user);
    let mut response = next.run(request).await;
    if let Some(cookie) = authorized.refresh_cookie {
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}

/// Guard for API routes: 401 without a valid session.
pub async fn require_api_session(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    match authorize(&state, request.headers()).await {
        Ok(Some(authorized)) => proceed(authorized, request, next).await,
        Ok(None) => {
            debug!("rejecting unauthenticated API request to {}", request.uri().path());
            AppError::unauthenticated().into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Guard for page routes: redirect to the login page without a valid session.
pub async fn require_page_session(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    match authorize(&state, request.headers()).await {
        Ok(Some(authorized)) => proceed(authorized, request, next).await,
        Ok(None) => Redirect::to("/login").into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookies() -> SessionCookies {
        SessionCookies::new(b"0123456789abcdef0123456789abcdef", &SessionConfig::default()).unwrap()
    }

    #[test]
    fn test_encode_decode() {
        let cookies = cookies();
        let value = cookies.encode("abc123");
        assert!(value.starts_with("abc123."));
        assert_eq!(cookies.decode(&value), Some("abc123"));
    }

    #[test]
    fn test_tampered_cookie_is_rejected() {
        let cookies = cookies();
        let value = cookies.encode("abc123");
        let sig = value.split_once('.').unwrap().1;

        assert_eq!(cookies.decode(&format!("abc124.{sig}")), None);
        assert_eq!(cookies.decode("abc123"), None);
        assert_eq!(cookies.decode("abc123.not-base64!"), None);

        let other = SessionCookies::new(
            b"ffffffffffffffffffffffffffffffff",
            &SessionConfig::default(),
        )
        .unwrap();
        assert_eq!(other.decode(&value), None);
    }

    #[test]
    fn test_token_from_headers() {
        let cookies = cookies();
        let mut headers = HeaderMap::new();
        let cookie = format!("theme=dark; calnotes_session={}; lang=zh", cookies.encode("tok"));
        headers.insert(COOKIE, HeaderValue::from_str(&cookie).unwrap());
        assert_eq!(cookies.token_from_headers(&headers), Some("tok"));

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("calnotes_session=tok.bad"));
        assert_eq!(cookies.token_from_headers(&headers), None);
    }

    #[test]
    fn test_cookie_attributes() {
        let cookies = cookies();
        let set = cookies.set_cookie("tok");
        assert!(set.starts_with("calnotes_session=tok."));
        assert!(set.contains("HttpOnly"));
        assert!(set.contains("SameSite=Lax"));
        assert!(set.contains(&format!("Max-Age={}", 31 * 24 * 60 * 60)));
        assert!(!set.contains("Secure"));
        assert!(cookies.clear_cookie().contains("Max-Age=0"));
    }

    #[test]
    fn test_generated_secret_is_long_enough() {
        let a = generate_secret();
        assert!(a.len() >= crate::config::MIN_SECRET_BYTES);
        assert_ne!(a, generate_secret());
    }
}
