//! Line-delimited JSON-RPC over stdin/stdout: one request per line in, one
//! response per line out. Notifications get no line back.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use poem_core::McpHandler;

pub async fn run(handler: &McpHandler) -> Result<()> {
    info!("Serving MCP over stdio...");
    serve(handler, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}

pub async fn serve<R, W>(handler: &McpHandler, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.context("Failed to read from stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some(response) = handler.handle_bytes(line.as_bytes()).await else {
            debug!("Notification handled, nothing to write");
            continue;
        };

        let mut out = serde_json::to_string(&response).context("Failed to encode response")?;
        out.push('\n');
        writer
            .write_all(out.as_bytes())
            .await
            .context("Failed to write to stdout")?;
        writer.flush().await.context("Failed to flush stdout")?;
    }

    info!("stdin closed, stdio transport stopping.");
    Ok(())
}
