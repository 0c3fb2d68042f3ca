//! Browser session identity, carried in the `intake_session` cookie.
//!
//! The session id scopes the stored responses and the transient draft the way
//! browser-local storage is scoped to one browser.

use std::convert::Infallible;

use axum::{
  async_trait,
  extract::FromRequestParts,
  http::{
    header::{COOKIE, SET_COOKIE},
    request::Parts,
    HeaderMap, HeaderValue,
  },
  response::{IntoResponse, Response},
};
use tracing::debug;
use uuid::Uuid;

pub const COOKIE_NAME: &str = "intake_session";

/// Matches the default idle-session TTL.
pub const COOKIE_MAX_AGE_SECS: u64 = 24 * 60 * 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Session {
  pub id: Uuid,
  /// Minted for this request; the cookie must be sent back.
  pub fresh: bool,
}

impl Session {
  pub fn from_headers(headers: &HeaderMap) -> Self {
    match session_id(headers) {
      Some(id) => Self { id, fresh: false },
      None => {
        let id = Uuid::new_v4();
        debug!(target: "intake_frontend", session = %id, "New session");
        Self { id, fresh: true }
      }
    }
  }

  pub fn key(&self) -> String {
    self.id.to_string()
  }

  /// Adds the `Set-Cookie` header when the session is new.
  pub fn attach(&self, res: impl IntoResponse) -> Response {
    let mut res = res.into_response();
    if self.fresh {
      let cookie = format!(
        "{COOKIE_NAME}={}; Path=/; Max-Age={COOKIE_MAX_AGE_SECS}; HttpOnly; SameSite=Lax",
        self.id
      );
      if let Ok(v) = HeaderValue::from_str(&cookie) {
        res.headers_mut().append(SET_COOKIE, v);
      }
    }
    res
  }
}

/// Only well-formed UUIDs are accepted; anything else starts a new session.
fn session_id(headers: &HeaderMap) -> Option<Uuid> {
  headers
    .get_all(COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(k, _)| *k == COOKIE_NAME)
    .and_then(|(_, v)| Uuid::parse_str(v.trim()).ok())
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
  S: Send + Sync,
{
  type Rejection = Infallible;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    Ok(Session::from_headers(&parts.headers))
  }
}
