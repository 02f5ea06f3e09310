use crate::mp4::BoxRange;
use crate::sei::decode_telemetry_sei;
use crate::timeline::TelemetryFrame;

// -----------------------------
// NAL bitstream scanning
// -----------------------------
//
// The media-data region is walked as 4-byte big-endian length-prefixed NAL
// units. A decoded telemetry SEI is held pending until the next coded slice,
// which marks one picture boundary and stamps the frame with the elapsed
// presentation time. Decode order is assumed to equal presentation order,
// which holds for streams without B-frame reordering; a reordered stream
// would be mis-timestamped rather than rejected.

const NAL_TYPE_SLICE: u8 = 1;
const NAL_TYPE_IDR: u8 = 5;
const NAL_TYPE_SEI: u8 = 6;

/// Duration charged to samples past the end of the stts table. Guards
/// against a duration-table/bitstream sample-count mismatch.
const FALLBACK_FRAME_MS: f64 = 33.333;

/// Walk the mdat content range and emit one frame per coded picture that was
/// preceded by a decodable telemetry SEI.
pub(crate) fn scan_media_data(
    buf: &[u8],
    mdat: BoxRange,
    durations_ms: &[f64],
) -> Vec<TelemetryFrame> {
    let end = mdat.content_end.min(buf.len());
    let mut pos = mdat.content_start;

    let mut frames = Vec::new();
    let mut pending = None;
    let mut elapsed_ms = 0.0f64;
    let mut sample_index = 0usize;

    while pos + 4 <= end {
        let len = u32::from_be_bytes([buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]]) as usize;
        // Truncated trailing data is the end of the usable stream, not an error.
        if len < 1 || len > end - (pos + 4) {
            break;
        }
        let nal = &buf[pos + 4..pos + 4 + len];

        match nal[0] & 0x1F {
            // Only the most recent SEI before a picture is kept; a failed
            // decode clears any earlier pending one.
            NAL_TYPE_SEI => pending = decode_telemetry_sei(nal),
            NAL_TYPE_SLICE | NAL_TYPE_IDR => {
                if let Some(record) = pending.take() {
                    frames.push(TelemetryFrame {
                        timestamp_ms: elapsed_ms,
                        record,
                    });
                }
                elapsed_ms += durations_ms
                    .get(sample_index)
                    .copied()
                    .unwrap_or(FALLBACK_FRAME_MS);
                sample_index += 1;
            }
            // SPS, PPS, AUD, filler and friends carry no telemetry.
            _ => {}
        }

        pos += 4 + len;
    }

    frames
}
