//! `rulewire ship` – ship newline-delimited JSON events to the controller.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use rulewire_core::config::ConnectionConfig;
use rulewire_core::shipper::{exit_sentinel, send_event_log, EventLogQueue};

pub async fn run_ship(config: ConnectionConfig, file: Option<PathBuf>) -> Result<()> {
    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel();
        }
    });

    let (tx, rx) = mpsc::unbounded_channel();
    let producer = tokio::spawn(async move {
        let count = match file {
            Some(path) => {
                let file = tokio::fs::File::open(&path)
                    .await
                    .with_context(|| format!("cannot open {}", path.display()))?;
                enqueue_lines(BufReader::new(file), &tx).await?
            }
            None => enqueue_lines(BufReader::new(tokio::io::stdin()), &tx).await?,
        };
        // input drained; end the shipping loop
        let _ = tx.send(exit_sentinel());
        Ok::<usize, anyhow::Error>(count)
    });

    send_event_log(&config, EventLogQueue::new(rx), &cancel)
        .await
        .context("event shipping failed")?;

    let count = producer.await.context("event reader task failed")??;
    tracing::info!("event shipping finished after {} record(s)", count);
    println!("Shipped {count} event(s)");
    Ok(())
}

/// Parse each non-empty line as one JSON event and enqueue it.
async fn enqueue_lines<R>(
    reader: BufReader<R>,
    tx: &mpsc::UnboundedSender<Value>,
) -> Result<usize>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut lines = reader.lines();
    let mut count = 0usize;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let event: Value =
            serde_json::from_str(&line).with_context(|| format!("invalid event: {line}"))?;
        if tx.send(event).is_err() {
            break;
        }
        count += 1;
    }
    Ok(count)
}
