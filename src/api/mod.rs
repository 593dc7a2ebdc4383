//! HTTP handlers.
//!
//! Every handler ends in exactly one of: a rendered page (a JSON view model),
//! a redirect carrying a flash message, or an explicit error status.

mod campgrounds;
mod comments;
mod landing;
mod users;

pub use campgrounds::*;
pub use comments::*;
pub use landing::*;
pub use users::*;

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header::SET_COOKIE, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::CurrentUser;
use crate::flash::{clear_flash_cookie, read_flashes, Flash};
use crate::models::User;

/// Per-request data every rendered page carries.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub current_user: Option<User>,
    pub flash: Vec<Flash>,
}

impl<S: Send + Sync> FromRequestParts<S> for PageContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self {
            current_user: parts
                .extensions
                .get::<CurrentUser>()
                .map(|CurrentUser(user)| user.clone()),
            flash: read_flashes(&parts.headers),
        })
    }
}

/// A rendered page: the view to render and the data it is rendered with.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T: Serialize> {
    pub view: &'static str,
    pub data: T,
    pub flash: Vec<Flash>,
    pub current_user: Option<User>,
}

impl<T: Serialize> IntoResponse for Page<T> {
    fn into_response(self) -> Response {
        // Showing the messages consumes them.
        let consumed = !self.flash.is_empty();
        let mut response = (StatusCode::OK, Json(self)).into_response();
        if consumed {
            response
                .headers_mut()
                .append(SET_COOKIE, clear_flash_cookie());
        }
        response
    }
}

/// Render `view` with `data` for the current request.
pub fn render<T: Serialize>(ctx: PageContext, view: &'static str, data: T) -> Page<T> {
    Page {
        view,
        data,
        flash: ctx.flash,
        current_user: ctx.current_user,
    }
}
