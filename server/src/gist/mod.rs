//! GitHub Gist storage for the personal library

pub mod client;
pub mod library;
pub mod memory;
pub mod models;

pub use client::{DocumentStore, GistConnector, HttpGistConnector, HttpGistStore};
pub use library::GistLibrary;
pub use memory::{MemoryDocumentStore, MemoryGistConnector};
pub use models::*;
