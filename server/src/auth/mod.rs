//! Authentication: GitHub OAuth and signed sessions

pub mod github;
pub mod session;

pub use github::{GithubOAuth, GithubUser};
pub use session::{SessionKeys, SessionUser};
