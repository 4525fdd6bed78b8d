//! SSE transport sessions
//!
//! `GET /api/mcp` opens a session and streams responses as `message`
//! events; clients post requests to the endpoint announced in the first
//! `endpoint` event. A session lives exactly as long as its stream.

use axum::response::sse::Event;
use futures::stream::Stream;
use serde_json::Value;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::tools::ToolServer;
use crate::error::{AppError, Result};

/// Buffered responses per session before senders wait
const SESSION_BUFFER: usize = 32;

struct Session {
    server: ToolServer,
    outbox: mpsc::Sender<Value>,
}

#[derive(Clone, Default)]
pub struct McpSessions {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
}

/// Removes its session from the registry when dropped
pub struct SessionGuard {
    id: String,
    sessions: Arc<Mutex<HashMap<String, Session>>>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let removed = self
            .sessions
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&self.id)
            .is_some();
        if removed {
            tracing::info!("MCP session {} closed", self.id);
        }
    }
}

impl McpSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Register a session and return its event stream
    pub fn open(&self, server: ToolServer) -> (String, impl Stream<Item = std::result::Result<Event, Infallible>>) {
        let id = Uuid::new_v4().to_string();
        let (outbox, mut inbox) = mpsc::channel::<Value>(SESSION_BUFFER);

        self.lock().insert(id.clone(), Session { server, outbox });
        tracing::info!("MCP session {} opened", id);

        let guard = SessionGuard {
            id: id.clone(),
            sessions: self.sessions.clone(),
        };
        let endpoint = format!("/api/mcp?sessionId={id}");

        let stream = async_stream::stream! {
            let _guard = guard;
            yield Ok(Event::default().event("endpoint").data(endpoint));

            while let Some(message) = inbox.recv().await {
                yield Ok(Event::default().event("message").data(message.to_string()));
            }
        };

        (id, stream)
    }

    /// Route a posted message to its session.
    ///
    /// The response is produced in the background and delivered on the
    /// session's stream.
    pub fn dispatch(&self, session_id: &str, body: &str) -> Result<()> {
        serde_json::from_str::<Value>(body)
            .map_err(|e| AppError::Validation(format!("Invalid JSON: {e}")))?;

        let (server, outbox) = {
            let sessions = self.lock();
            let session = sessions
                .get(session_id)
                .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
            (session.server.clone(), session.outbox.clone())
        };

        let body = body.to_string();
        tokio::spawn(async move {
            if let Some(response) = server.handle_raw(&body).await {
                if outbox.send(response).await.is_err() {
                    tracing::debug!("MCP session closed before response was delivered");
                }
            }
        });

        Ok(())
    }
}
