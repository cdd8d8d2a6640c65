//! Event-stream driver for the `metasync` binary.

use anyhow::{bail, Context, Result};
use metasync_connector::ReconciliationEngine;
use metasync_types::Event;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{error, warn};

/// Feeds every NDJSON event in `input` to `engine`, in order.
///
/// Blank lines are ignored and malformed lines are logged and skipped.
/// Returns the number of events observed. A fatal engine error stops the
/// stream and is returned; the engine is then aborted and must not be
/// finalized.
pub async fn run_events<R>(engine: &mut ReconciliationEngine, input: R) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut line_no = 0usize;
    let mut observed = 0usize;

    while let Some(line) = lines.next_line().await.context("reading events")? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event = match Event::from_json(line) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = line_no, "Skipping malformed event: {e}");
                continue;
            }
        };

        if let Err(e) = engine.observe(event).await {
            error!(line = line_no, "Cycle aborted: {e}");
            bail!("cycle aborted at line {line_no}: {e}");
        }
        observed += 1;
    }

    Ok(observed)
}
