//! Services module
//!
//! Business logic services that coordinate between HTTP handlers, the
//! repository and upstream APIs.

pub mod classifier;
pub mod community;
pub mod submissions;

pub use classifier::{Classification, Classifier};
pub use community::CommunityService;
pub use submissions::SubmissionsService;
