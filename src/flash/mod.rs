//! One-time notifications carried across a redirect.
//!
//! A flash is written into a cookie on the redirect response and consumed by the
//! next rendered page, which clears the cookie.

use axum::{
    http::{header::SET_COOKIE, HeaderMap, HeaderValue},
    response::{IntoResponse, Redirect, Response},
};
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::auth::read_cookie;

pub const FLASH_COOKIE_NAME: &str = "yelpcamp_flash";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

/// A single flash message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn new(kind: FlashKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(FlashKind::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(FlashKind::Error, message)
    }

    /// `303 See Other` to `location` with this message queued for the next page.
    pub fn redirect(&self, location: &str) -> Response {
        let mut response = Redirect::to(location).into_response();
        match flash_cookie(std::slice::from_ref(self)) {
            Some(cookie) => {
                response.headers_mut().append(SET_COOKIE, cookie);
            }
            None => tracing::warn!("Dropping flash message that could not be encoded"),
        }
        response
    }
}

/// Encode messages into a cookie-safe value.
pub fn encode_flashes(flashes: &[Flash]) -> Option<String> {
    let json = serde_json::to_vec(flashes).ok()?;
    Some(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json))
}

/// Decode a cookie value; malformed values yield no messages.
pub fn decode_flashes(value: &str) -> Vec<Flash> {
    base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(value.trim())
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}

/// Pending messages on the incoming request.
pub fn read_flashes(headers: &HeaderMap) -> Vec<Flash> {
    read_cookie(headers, FLASH_COOKIE_NAME)
        .map(|value| decode_flashes(&value))
        .unwrap_or_default()
}

fn flash_cookie(flashes: &[Flash]) -> Option<HeaderValue> {
    let value = encode_flashes(flashes)?;
    HeaderValue::from_str(&format!(
        "{FLASH_COOKIE_NAME}={value}; Path=/; HttpOnly; SameSite=Lax"
    ))
    .ok()
}

/// Expire the flash cookie once its messages were shown.
pub fn clear_flash_cookie() -> HeaderValue {
    HeaderValue::from_static("yelpcamp_flash=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}
