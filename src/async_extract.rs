#![cfg(feature = "async")]

use std::io;
use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::timeline::{TelemetryFrame, Timeline};
use crate::{extract, Error};

/// Extract a whole [`Timeline`] on a blocking thread.
///
/// Container parsing is a synchronous single pass over the file bytes, so
/// this simply wraps the sync extractor in `tokio::task::spawn_blocking`.
pub async fn timeline_from_path(path: impl Into<PathBuf>) -> Result<Timeline, Error> {
    let path = path.into();
    tokio::task::spawn_blocking(move || extract::timeline_from_path(path))
        .await
        .map_err(|e| Error::Io(io::Error::other(e)))?
}

/// Create a Tokio `Stream` of telemetry frames from a container file on disk.
///
/// The synchronous extraction runs in `spawn_blocking`; decoded frames are
/// forwarded in timestamp order over a bounded channel. A structural parse
/// failure arrives as a single `Err` item.
///
/// `buffer` controls the channel capacity. Larger buffers can improve
/// throughput if the consumer occasionally stalls.
pub fn stream_from_path(
    path: impl Into<PathBuf>,
    buffer: usize,
) -> ReceiverStream<Result<TelemetryFrame, Error>> {
    let path = path.into();
    let (tx, rx) = mpsc::channel(buffer.max(1));

    tokio::task::spawn_blocking(move || {
        let timeline = match extract::timeline_from_path(&path) {
            Ok(t) => t,
            Err(err) => {
                let _ = tx.blocking_send(Err(err));
                return;
            }
        };

        for frame in timeline.into_frames() {
            if tx.blocking_send(Ok(frame)).is_err() {
                break;
            }
        }
    });

    ReceiverStream::new(rx)
}
