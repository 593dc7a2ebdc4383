//! Campground model, the primary browsable record.

use serde::{Deserialize, Serialize};

use super::Comment;

/// A listed campground.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campground {
    pub id: String,
    pub name: String,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordered ids of the comments posted on this campground
    #[serde(default)]
    pub comments: Vec<String>,
    pub created_at: String,
}

/// Form body for creating a campground.
///
/// Field names match the creation form inputs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampgroundRequest {
    pub campground_name: String,
    pub campground_image: String,
    #[serde(default)]
    pub campground_description: Option<String>,
}

impl CreateCampgroundRequest {
    /// Empty descriptions are stored as absent.
    pub fn description(&self) -> Option<&str> {
        self.campground_description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

/// Detail view of a campground with its comments resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampgroundDetail {
    pub campground: Campground,
    pub comments: Vec<Comment>,
}
