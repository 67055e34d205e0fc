//! Browser session identity.
//!
//! The session id travels in a `session_id` cookie. Requests without a usable
//! one get a fresh uuid, and every response re-sets the cookie.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName};
use std::convert::Infallible;

pub const SESSION_COOKIE: &str = "session_id";

const MAX_ID_LEN: usize = 64;

/// Session id of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: String,
    is_new: bool,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            is_new: true,
        }
    }

    /// Session from the request cookies, or a new one.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .map(|(_, value)| value.trim())
            .filter(|value| is_valid_id(value))
            .map(|value| Self {
                id: value.to_string(),
                is_new: false,
            })
            .unwrap_or_default()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// `Set-Cookie` header binding the browser to this session.
    pub fn cookie(&self) -> [(HeaderName, String); 1] {
        [(
            SET_COOKIE,
            format!("{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax", self.id),
        )]
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn is_valid_id(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_ID_LEN
        && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
