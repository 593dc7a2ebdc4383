//! Data models for the YelpCamp application.
//!
//! Records are serialized camelCase so view models read naturally in a front end.

mod campground;
mod comment;
mod user;

pub use campground::*;
pub use comment::*;
pub use user::*;
