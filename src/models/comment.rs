//! Comment model.

use serde::{Deserialize, Serialize};

/// Snapshot of the user who wrote a comment, taken at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommentAuthor {
    pub id: String,
    pub username: String,
}

/// A user-authored note attached to a campground.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub text: String,
    pub author: CommentAuthor,
    pub created_at: String,
    pub updated_at: String,
}

impl Comment {
    pub fn is_authored_by(&self, user_id: &str) -> bool {
        self.author.id == user_id
    }
}

/// Form body for creating or updating a comment.
///
/// Only the text is client-editable; author fields come from the session.
#[derive(Debug, Clone, Deserialize)]
pub struct CommentRequest {
    #[serde(rename = "comment[text]")]
    pub text: String,
}

/// Data for the comment creation form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCommentForm {
    pub campground: super::Campground,
}

/// Data for the comment edit form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditCommentForm {
    pub campground_id: String,
    pub comment: Comment,
}

/// Route parameters of the comment member routes.
#[derive(Debug, Clone, Deserialize)]
pub struct CommentPath {
    /// Parent campground id
    pub id: String,
    pub comment_id: String,
}
