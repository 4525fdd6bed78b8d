//! Model Context Protocol server
//!
//! A small JSON-RPC tool server over the personal library, reachable over
//! SSE from the web server or over stdio from the command line.

pub mod protocol;
pub mod sse;
pub mod stdio;
pub mod tools;

pub use sse::McpSessions;
pub use stdio::StdioTransport;
pub use tools::ToolServer;
