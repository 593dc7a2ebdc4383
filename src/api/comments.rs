//! Comment endpoints, nested under a campground.
//!
//! All routes here sit behind `require_login`; the member routes additionally
//! sit behind `require_comment_owner`.

use axum::{
    extract::{Extension, Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;

use super::{render, Page, PageContext, CAMPGROUNDS_PATH};
use crate::auth::{back_location, CurrentUser};
use crate::errors::{AppError, Redirected};
use crate::flash::Flash;
use crate::models::{CommentPath, CommentRequest, EditCommentForm, NewCommentForm};
use crate::AppState;

fn campground_path(id: &str) -> String {
    format!("{}/{}", CAMPGROUNDS_PATH, id)
}

fn validate_text(text: &str) -> Result<&str, AppError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::Validation("Comment text is required".to_string()));
    }
    Ok(text)
}

/// GET /campgrounds/:id/comments/new - Comment creation form.
pub async fn new_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ctx: PageContext,
) -> Result<Page<NewCommentForm>, Redirected> {
    let campground = state
        .repo
        .get_campground(&id)
        .await
        .map_err(|e| e.redirect_to(CAMPGROUNDS_PATH))?
        .ok_or_else(|| {
            AppError::NotFound("Campground not found".to_string()).redirect_to(CAMPGROUNDS_PATH)
        })?;

    Ok(render(ctx, "comments/new", NewCommentForm { campground }))
}

/// POST /campgrounds/:id/comments - Create a comment.
pub async fn create_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Form(request): Form<CommentRequest>,
) -> Result<Response, Redirected> {
    let text = validate_text(&request.text)
        .map_err(|e| e.redirect_to(format!("{}/comments/new", campground_path(&id))))?;

    let comment = state
        .repo
        .create_comment_for_campground(&id, text, &user)
        .await
        .map_err(|e| e.redirect_to(CAMPGROUNDS_PATH))?;

    tracing::info!(
        campground_id = %id,
        comment_id = %comment.id,
        author = %user.username,
        "Comment created"
    );
    Ok(Flash::success("Comment successfully posted.").redirect(&campground_path(&id)))
}

/// GET /campgrounds/:id/comments/:comment_id/edit - Comment edit form.
pub async fn edit_comment(
    State(state): State<AppState>,
    Path(params): Path<CommentPath>,
    headers: HeaderMap,
    ctx: PageContext,
) -> Result<Page<EditCommentForm>, Redirected> {
    let back = back_location(&headers, &campground_path(&params.id));

    let comment = state
        .repo
        .get_comment(&params.comment_id)
        .await
        .map_err(|e| e.redirect_to(back.clone()))?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()).redirect_to(back))?;

    Ok(render(
        ctx,
        "comments/edit",
        EditCommentForm {
            campground_id: params.id,
            comment,
        },
    ))
}

/// PUT /campgrounds/:id/comments/:comment_id - Update a comment's text.
pub async fn update_comment(
    State(state): State<AppState>,
    Path(params): Path<CommentPath>,
    headers: HeaderMap,
    Form(request): Form<CommentRequest>,
) -> Result<Response, Redirected> {
    apply_update(&state, &params, &headers, &request.text).await
}

/// DELETE /campgrounds/:id/comments/:comment_id - Delete a comment.
pub async fn delete_comment(
    State(state): State<AppState>,
    Path(params): Path<CommentPath>,
    headers: HeaderMap,
) -> Result<Response, Redirected> {
    apply_delete(&state, &params, &headers).await
}

/// Method override for HTML forms, which can only submit GET and POST.
#[derive(Debug, Default, Deserialize)]
pub struct MethodOverride {
    #[serde(rename = "_method")]
    pub method: Option<String>,
}

/// Form body of an overridden request; the text is only needed for updates.
#[derive(Debug, Default, Deserialize)]
pub struct OverrideForm {
    #[serde(rename = "_method")]
    pub method: Option<String>,
    #[serde(rename = "comment[text]")]
    pub text: Option<String>,
}

/// POST /campgrounds/:id/comments/:comment_id?_method=PUT|DELETE
pub async fn override_comment(
    State(state): State<AppState>,
    Path(params): Path<CommentPath>,
    Query(query): Query<MethodOverride>,
    headers: HeaderMap,
    Form(form): Form<OverrideForm>,
) -> Result<Response, Redirected> {
    let method = query
        .method
        .or(form.method)
        .unwrap_or_default()
        .to_ascii_uppercase();

    match method.as_str() {
        "PUT" => {
            let text = form.text.unwrap_or_default();
            apply_update(&state, &params, &headers, &text).await
        }
        "DELETE" => apply_delete(&state, &params, &headers).await,
        other => {
            tracing::debug!(method = %other, "Unsupported method override");
            Err(AppError::Validation("Unsupported form method".to_string())
                .redirect_to(back_location(&headers, &campground_path(&params.id))))
        }
    }
}

async fn apply_update(
    state: &AppState,
    params: &CommentPath,
    headers: &HeaderMap,
    text: &str,
) -> Result<Response, Redirected> {
    let back = back_location(headers, &campground_path(&params.id));
    let text = validate_text(text).map_err(|e| e.redirect_to(back.clone()))?;

    state
        .repo
        .update_comment_text(&params.comment_id, text)
        .await
        .map_err(|e| e.redirect_to(back))?;

    tracing::info!(comment_id = %params.comment_id, "Comment updated");
    Ok(Redirect::to(&campground_path(&params.id)).into_response())
}

async fn apply_delete(
    state: &AppState,
    params: &CommentPath,
    headers: &HeaderMap,
) -> Result<Response, Redirected> {
    let back = back_location(headers, &campground_path(&params.id));

    state
        .repo
        .delete_comment(&params.comment_id)
        .await
        .map_err(|e| e.redirect_to(back))?;

    tracing::info!(comment_id = %params.comment_id, "Comment deleted");
    Ok(Flash::success("Comment successfully deleted.").redirect(&campground_path(&params.id)))
}
