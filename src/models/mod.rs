//! Data models for the academy portal.
//!
//! These models match the JSON documents held by the remote store (camelCase fields).

mod course;
mod enrollment;
mod id;
mod session;
mod user;

pub use course::*;
pub use enrollment::*;
pub use id::*;
pub use session::*;
pub use user::*;
