//! Favored Prompts library
//!
//! The prompt library server, its Gist-backed personal library, the local
//! store with remote sync and the MCP tool server. The binary in
//! `main.rs` wires these together.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod gist;
pub mod local;
pub mod mcp;
pub mod remote;
pub mod services;
