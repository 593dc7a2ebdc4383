//! Session-based authentication and comment ownership gates.
//!
//! `load_session` runs on every request and attaches the logged-in user, if any.
//! `require_login` and `require_comment_owner` are per-route gates; when either
//! rejects a request the handler behind it never runs.

mod session;

pub use session::*;

use axum::{
    extract::{Path, Request, State},
    http::{header::REFERER, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::errors::AppError;
use crate::flash::Flash;
use crate::models::{CommentPath, User};
use crate::AppState;

/// The authenticated user, attached to the request by `load_session`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

pub const LOGIN_PATH: &str = "/login";

/// Resolve the session cookie, if any, into a `CurrentUser` extension.
pub async fn load_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = read_cookie(request.headers(), SESSION_COOKIE_NAME) {
        match state.repo.get_session_user(&hash_session_token(&token)).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(CurrentUser(user));
            }
            Ok(None) => tracing::debug!("Ignoring unknown or expired session"),
            Err(e) => return e.into_response(),
        }
    }
    next.run(request).await
}

/// Reject anonymous requests with a flash and a redirect to the login page.
pub async fn require_login(request: Request, next: Next) -> Response {
    if request.extensions().get::<CurrentUser>().is_some() {
        return next.run(request).await;
    }

    tracing::debug!(path = %request.uri().path(), "Anonymous request rejected");
    Flash::error("You need to be logged in to do that.").redirect(LOGIN_PATH)
}

/// Allow the request only when the logged-in user wrote the addressed comment.
///
/// The comment must also be listed on the campground named in the path. A
/// missing or misplaced comment and a foreign comment are reported with
/// different flashes; all of them send the user back where they came from.
pub async fn require_comment_owner(
    State(state): State<AppState>,
    Path(params): Path<CommentPath>,
    request: Request,
    next: Next,
) -> Response {
    let Some(CurrentUser(user)) = request.extensions().get::<CurrentUser>().cloned() else {
        return Flash::error("You need to be logged in to do that.").redirect(LOGIN_PATH);
    };

    let back = back_location(request.headers(), &format!("/campgrounds/{}", params.id));

    let comment = match state.repo.get_comment(&params.comment_id).await {
        Ok(Some(comment)) => comment,
        Ok(None) => return comment_not_found(back),
        Err(e) => return e.redirect_to(back).into_response(),
    };

    match state.repo.get_campground(&params.id).await {
        Ok(Some(campground)) if campground.comments.contains(&comment.id) => {}
        Ok(_) => {
            tracing::debug!(
                campground_id = %params.id,
                comment_id = %params.comment_id,
                "Comment is not listed on this campground"
            );
            return comment_not_found(back);
        }
        Err(e) => return e.redirect_to(back).into_response(),
    }

    if !comment.is_authored_by(&user.id) {
        tracing::warn!(
            user_id = %user.id,
            comment_id = %params.comment_id,
            "Ownership check failed"
        );
        return AppError::Forbidden("You don't have permission to do that".to_string())
            .redirect_to(back)
            .into_response();
    }

    next.run(request).await
}

fn comment_not_found(back: String) -> Response {
    AppError::NotFound("Comment not found".to_string())
        .redirect_to(back)
        .into_response()
}

/// Path of the referring page on this site, or `fallback`.
pub fn back_location(headers: &HeaderMap, fallback: &str) -> String {
    headers
        .get(REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(referer_path)
        .unwrap_or_else(|| fallback.to_string())
}

/// Keep only the path and query so a redirect can never leave this site.
fn referer_path(referer: &str) -> Option<String> {
    let path = match referer.split_once("://") {
        Some((_, rest)) => &rest[rest.find('/')?..],
        None => referer,
    };
    (path.starts_with('/') && !path.starts_with("//")).then(|| path.to_string())
}
