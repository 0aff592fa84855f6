//! JSON-lines replay feed.
//!
//! Each non-empty line is one `MarketUpdate` tagged by `type`, e.g.
//! `{"type":"TopOfBook","best_bid_price":"100.0","best_ask_price":"101.0"}`.
//! Lines starting with `#` are comments.

use std::path::Path;
use std::time::Duration;

use quoter_core::MarketUpdate;
use quoter_mm::UpdateSink;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};

/// Parse one replay line. `None` for blank and comment lines.
pub fn parse_line(line_no: usize, line: &str) -> AppResult<Option<MarketUpdate>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|source| AppError::Replay {
            line: line_no,
            source,
        })
}

/// Stream a replay file into `sink`, pausing `pace` between updates.
///
/// Returns the number of updates sent. Stops early when the receiver is gone.
pub async fn replay_file(path: &Path, sink: UpdateSink, pace: Duration) -> AppResult<usize> {
    let file = tokio::fs::File::open(path).await?;
    let mut lines = BufReader::new(file).lines();
    let mut sent = 0;
    let mut line_no = 0;

    info!(path = %path.display(), "Replay started");
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let Some(update) = parse_line(line_no, &line)? else {
            continue;
        };
        if sink.send(update).is_err() {
            debug!("Update receiver closed, replay stopped");
            break;
        }
        sent += 1;
        if !pace.is_zero() {
            tokio::time::sleep(pace).await;
        }
    }
    info!(sent, "Replay finished");
    Ok(sent)
}
