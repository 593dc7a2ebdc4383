//! Campground endpoints.

use axum::{
    extract::{Path, State},
    response::Response,
    Form,
};

use super::{render, Page, PageContext};
use crate::errors::{AppError, Redirected};
use crate::flash::Flash;
use crate::models::{Campground, CampgroundDetail, CreateCampgroundRequest};
use crate::AppState;

pub const CAMPGROUNDS_PATH: &str = "/campgrounds";

/// GET /campgrounds - List all campgrounds.
///
/// This is the fallback target of other redirects, so failures here are an
/// explicit error status rather than another redirect.
pub async fn list_campgrounds(
    State(state): State<AppState>,
    ctx: PageContext,
) -> Result<Page<Vec<Campground>>, AppError> {
    let campgrounds = state.repo.list_campgrounds().await?;
    tracing::debug!("Found {} campgrounds", campgrounds.len());
    Ok(render(ctx, "campgrounds/index", campgrounds))
}

/// GET /campgrounds/new - Campground creation form.
pub async fn new_campground(ctx: PageContext) -> Page<()> {
    render(ctx, "campgrounds/new", ())
}

/// POST /campgrounds - Create a campground.
pub async fn create_campground(
    State(state): State<AppState>,
    Form(request): Form<CreateCampgroundRequest>,
) -> Result<Response, Redirected> {
    let form_path = format!("{}/new", CAMPGROUNDS_PATH);

    if request.campground_name.trim().is_empty() {
        return Err(AppError::Validation("Campground name is required".to_string())
            .redirect_to(form_path));
    }
    if request.campground_image.trim().is_empty() {
        return Err(AppError::Validation("Campground image is required".to_string())
            .redirect_to(form_path));
    }

    let campground = state
        .repo
        .create_campground(&request)
        .await
        .map_err(|e| e.redirect_to(form_path))?;

    tracing::info!(campground_id = %campground.id, "Campground created");
    Ok(Flash::success("Campground successfully created.").redirect(CAMPGROUNDS_PATH))
}

/// GET /campgrounds/:id - Show one campground with its comments.
pub async fn show_campground(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ctx: PageContext,
) -> Result<Page<CampgroundDetail>, Redirected> {
    let campground = state
        .repo
        .get_campground(&id)
        .await
        .map_err(|e| e.redirect_to(CAMPGROUNDS_PATH))?
        .ok_or_else(|| {
            AppError::NotFound("Campground not found".to_string()).redirect_to(CAMPGROUNDS_PATH)
        })?;

    let comments = state
        .repo
        .list_comments_by_ids(&campground.comments)
        .await
        .map_err(|e| e.redirect_to(CAMPGROUNDS_PATH))?;

    Ok(render(
        ctx,
        "campgrounds/show",
        CampgroundDetail {
            campground,
            comments,
        },
    ))
}
