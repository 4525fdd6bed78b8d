//! Stdio transport: newline-delimited JSON-RPC on stdin and stdout.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use super::protocol::{JsonRpcError, RequestId, PARSE_ERROR};
use super::tools::ToolServer;
use crate::error::Result;

pub struct StdioTransport {
    server: ToolServer,
}

impl StdioTransport {
    pub fn new(server: ToolServer) -> Self {
        Self { server }
    }

    /// Serve the process's stdin and stdout until EOF
    pub async fn run(&self) -> Result<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        self.serve(stdin, tokio::io::stdout()).await
    }

    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        tracing::info!("Stdio transport started");

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            let response = match std::str::from_utf8(&buf) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    self.server.handle_raw(trimmed).await
                }
                Err(e) => {
                    tracing::warn!("Skipping stdin line that is not UTF-8: {}", e);
                    serde_json::to_value(JsonRpcError::new(
                        RequestId::Null,
                        PARSE_ERROR,
                        format!("Invalid UTF-8: {e}"),
                    ))
                    .ok()
                }
            };

            if let Some(response) = response {
                let mut framed = serde_json::to_string(&response)?;
                framed.push('\n');
                writer.write_all(framed.as_bytes()).await?;
                writer.flush().await?;
            }
        }

        tracing::info!("EOF on stdin, shutting down");
        Ok(())
    }
}
