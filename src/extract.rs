use std::fs;
use std::path::Path;

use crate::mp4::{find_box, read_media_timing};
use crate::scan::scan_media_data;
use crate::timeline::Timeline;
use crate::Error;

/// Extract the telemetry timeline from an in-memory container buffer.
///
/// This is a pure function over the buffer: it holds no shared state, so
/// callers may run one extraction per file concurrently without coordination.
pub fn timeline_from_bytes(buf: &[u8]) -> Result<Timeline, Error> {
    let timing = read_media_timing(buf)?;
    let mdat = find_box(buf, 0, buf.len(), b"mdat")?;
    let frames = scan_media_data(buf, mdat, &timing.durations_ms);
    Ok(Timeline::new(frames))
}

/// Read a container file into memory and extract its telemetry timeline.
pub fn timeline_from_path(path: impl AsRef<Path>) -> Result<Timeline, Error> {
    let buf = fs::read(path)?;
    timeline_from_bytes(&buf)
}
