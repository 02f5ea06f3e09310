use std::env;

use crate::Error;

// -----------------------------
// MP4 parsing (minimal ISO-BMFF)
// -----------------------------
//
// No box tree is materialized. Each extractor composes `find_box` lookups
// along the fixed path it needs (moov -> trak -> mdia -> ...), mirroring the
// fixed schema the recorder writes.

/// Content range of one located box within the file buffer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BoxRange {
    pub(crate) content_start: usize,
    pub(crate) content_end: usize,
}

impl BoxRange {
    pub(crate) fn size(&self) -> usize {
        self.content_end - self.content_start
    }
}

/// Track timescale plus the expanded per-sample duration table.
#[derive(Debug, Clone)]
pub(crate) struct MediaTiming {
    #[allow(dead_code)]
    pub(crate) timescale: u32,
    /// One entry per coded sample in decode order, in milliseconds.
    pub(crate) durations_ms: Vec<f64>,
    /// Fourcc of the first `stsd` sample entry, when readable.
    #[allow(dead_code)]
    pub(crate) sample_entry: Option<[u8; 4]>,
}

fn fourcc_to_string(t: &[u8; 4]) -> String {
    // Best-effort display for diagnostics.
    t.iter()
        .map(|&c| if c.is_ascii_graphic() { c as char } else { '.' })
        .collect()
}

fn trace_enabled() -> bool {
    matches!(
        env::var("DASHCAM_TELEMETRY_TRACE").as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE") | Ok("yes") | Ok("YES")
    )
}

fn trace_box(target: &[u8; 4], pos: usize, typ: &[u8; 4], size: u64, limit: usize) {
    if trace_enabled() {
        eprintln!(
            "[mp4] seeking {}: pos={pos} typ={} size={size} limit={limit}",
            fourcc_to_string(target),
            fourcc_to_string(typ),
        );
    }
}

fn read_be_u32(buf: &[u8], pos: usize) -> Option<u32> {
    let b = buf.get(pos..pos + 4)?;
    Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

fn read_be_u64(buf: &[u8], pos: usize) -> Option<u64> {
    let b = buf.get(pos..pos + 8)?;
    Some(u64::from_be_bytes([
        b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
    ]))
}

fn truncated(context: &str, offset: usize) -> Error {
    Error::Truncated {
        context: context.to_string(),
        offset,
    }
}

/// Locate the first box named `name` at the top level of `buf[start..end]`.
///
/// Box headers are a 4-byte big-endian size and a 4-byte ASCII type.
/// size==1 means an 8-byte largesize follows (16-byte header); size==0 means
/// the box extends to `end`.
pub(crate) fn find_box(
    buf: &[u8],
    start: usize,
    end: usize,
    name: &[u8; 4],
) -> Result<BoxRange, Error> {
    let end = end.min(buf.len());
    let mut pos = start;

    while pos < end {
        if pos + 8 > end {
            return Err(truncated("box header", pos));
        }
        let size32 = read_be_u32(buf, pos).unwrap_or(0) as u64;
        let typ: [u8; 4] = buf[pos + 4..pos + 8].try_into().unwrap_or([0; 4]);

        let (size, header_len) = if size32 == 1 {
            if pos + 16 > end {
                return Err(truncated("box largesize", pos));
            }
            (read_be_u64(buf, pos + 8).unwrap_or(0), 16u64)
        } else {
            (size32, 8u64)
        };

        trace_box(name, pos, &typ, size, end);

        let box_end = if size == 0 {
            // Last box in the range.
            end
        } else {
            if size < header_len {
                return Err(truncated("box size", pos));
            }
            // Clamp to the containing range on malformed sizes.
            (pos as u64).saturating_add(size).min(end as u64) as usize
        };
        let content_start = pos + header_len as usize;
        if content_start > box_end {
            return Err(truncated("box content", pos));
        }

        if typ == *name {
            return Ok(BoxRange {
                content_start,
                content_end: box_end,
            });
        }

        // Guarantee forward progress.
        if box_end <= pos {
            return Err(truncated("box advance", pos));
        }
        pos = box_end;
    }

    Err(Error::BoxNotFound {
        name: fourcc_to_string(name),
    })
}

/// Walk the fixed moov path and return the track timescale plus the
/// per-sample duration table, expanded to milliseconds.
pub(crate) fn read_media_timing(buf: &[u8]) -> Result<MediaTiming, Error> {
    let moov = find_box(buf, 0, buf.len(), b"moov")?;
    let trak = find_box(buf, moov.content_start, moov.content_end, b"trak")?;
    let mdia = find_box(buf, trak.content_start, trak.content_end, b"mdia")?;

    let mdhd = find_box(buf, mdia.content_start, mdia.content_end, b"mdhd")?;
    let timescale = parse_mdhd_timescale(buf, mdhd)?;

    let minf = find_box(buf, mdia.content_start, mdia.content_end, b"minf")?;
    let stbl = find_box(buf, minf.content_start, minf.content_end, b"stbl")?;

    // The sample description is required to be present; its entry fourcc is
    // recorded for callers but an unexpected codec does not abort extraction.
    let stsd = find_box(buf, stbl.content_start, stbl.content_end, b"stsd")?;
    let sample_entry = parse_stsd_entry_type(buf, stsd);

    let stts = find_box(buf, stbl.content_start, stbl.content_end, b"stts")?;
    let durations_ms = parse_stts_durations(buf, stts, timescale)?;

    if trace_enabled() {
        eprintln!(
            "[mp4] media timing: timescale={timescale} samples={} entry={}",
            durations_ms.len(),
            sample_entry
                .map(|t| fourcc_to_string(&t))
                .unwrap_or_else(|| "?".to_string()),
        );
    }

    Ok(MediaTiming {
        timescale,
        durations_ms,
        sample_entry,
    })
}

/// mdhd: version byte selects the 32-bit (v0) vs 64-bit (v1) field layout
/// preceding the timescale.
fn parse_mdhd_timescale(buf: &[u8], mdhd: BoxRange) -> Result<u32, Error> {
    let base = mdhd.content_start;
    let version = *buf
        .get(base)
        .ok_or_else(|| truncated("mdhd version", base))?;

    // version/flags (4), then creation + modification times.
    let timescale_off = if version == 1 { base + 4 + 8 + 8 } else { base + 4 + 4 + 4 };
    if timescale_off + 4 > mdhd.content_end {
        return Err(truncated("mdhd timescale", timescale_off));
    }
    read_be_u32(buf, timescale_off).ok_or_else(|| truncated("mdhd timescale", timescale_off))
}

/// stsd: version/flags (4) + entry_count (4), then sample entries, each a
/// box-like size + fourcc. Only the first entry's fourcc is of interest.
fn parse_stsd_entry_type(buf: &[u8], stsd: BoxRange) -> Option<[u8; 4]> {
    let count = read_be_u32(buf, stsd.content_start + 4)?;
    if count == 0 {
        return None;
    }
    // Skip the first entry's own 4-byte size to land on its fourcc.
    let typ_off = stsd.content_start + 8 + 4;
    if typ_off + 4 > stsd.content_end {
        return None;
    }
    buf.get(typ_off..typ_off + 4)?.try_into().ok()
}

/// stts: version/flags (4) + entry_count (4) + entry_count x (count, delta).
/// The table is run-length encoded; each run expands to `count` repetitions
/// of `delta / timescale * 1000` milliseconds.
fn parse_stts_durations(buf: &[u8], stts: BoxRange, timescale: u32) -> Result<Vec<f64>, Error> {
    let base = stts.content_start;
    if base + 8 > stts.content_end {
        return Err(truncated("stts header", base));
    }
    let entry_count = read_be_u32(buf, base + 4).unwrap_or(0) as usize;

    // Zero timescale would poison every timestamp; treat 1 tick = 1 second.
    let ticks_per_second = timescale.max(1) as f64;

    let mut durations = Vec::new();
    let mut pos = base + 8;
    for _ in 0..entry_count {
        if pos + 8 > stts.content_end {
            return Err(truncated("stts entry", pos));
        }
        let sample_count = read_be_u32(buf, pos).unwrap_or(0) as usize;
        let sample_delta = read_be_u32(buf, pos + 4).unwrap_or(0);
        let duration_ms = sample_delta as f64 / ticks_per_second * 1000.0;
        durations.extend(std::iter::repeat_n(duration_ms, sample_count));
        pos += 8;
    }

    Ok(durations)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_box(name: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + payload.len());
        out.extend_from_slice(&((8 + payload.len()) as u32).to_be_bytes());
        out.extend_from_slice(name);
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn finds_first_matching_box() {
        let mut buf = plain_box(b"free", &[0xAA; 3]);
        buf.extend(plain_box(b"mdat", b"hello"));
        buf.extend(plain_box(b"mdat", b"later"));

        let r = find_box(&buf, 0, buf.len(), b"mdat").unwrap();
        assert_eq!(&buf[r.content_start..r.content_end], b"hello");
        assert_eq!(r.size(), 5);
    }

    #[test]
    fn missing_box_is_box_not_found() {
        let buf = plain_box(b"free", &[0; 4]);
        let err = find_box(&buf, 0, buf.len(), b"moov").unwrap_err();
        assert!(matches!(err, Error::BoxNotFound { name } if name == "moov"));
    }

    #[test]
    fn short_header_is_truncated() {
        let mut buf = plain_box(b"free", &[0; 4]);
        buf.extend_from_slice(&[0, 0, 0]); // 3 stray bytes, not a full header
        let err = find_box(&buf, 0, buf.len(), b"moov").unwrap_err();
        assert!(matches!(err, Error::Truncated { .. }));
    }

    #[test]
    fn largesize_header_is_honored() {
        let payload = b"payload";
        let mut buf = Vec::new();
        buf.extend_from_slice(&1u32.to_be_bytes());
        buf.extend_from_slice(b"mdat");
        buf.extend_from_slice(&((16 + payload.len()) as u64).to_be_bytes());
        buf.extend_from_slice(payload);

        let r = find_box(&buf, 0, buf.len(), b"mdat").unwrap();
        assert_eq!(&buf[r.content_start..r.content_end], payload);
    }

    #[test]
    fn zero_size_box_extends_to_range_end() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(b"mdat");
        buf.extend_from_slice(b"tail-data");

        let r = find_box(&buf, 0, buf.len(), b"mdat").unwrap();
        assert_eq!(&buf[r.content_start..r.content_end], b"tail-data");
    }

    fn mdhd_v0(timescale: u32) -> Vec<u8> {
        let mut p = Vec::new();
        p.extend_from_slice(&[0, 0, 0, 0]); // version 0 + flags
        p.extend_from_slice(&0u32.to_be_bytes()); // creation
        p.extend_from_slice(&0u32.to_be_bytes()); // modification
        p.extend_from_slice(&timescale.to_be_bytes());
        p.extend_from_slice(&0u32.to_be_bytes()); // duration
        p.extend_from_slice(&[0; 4]); // language + pre_defined
        plain_box(b"mdhd", &p)
    }

    fn mdhd_v1(timescale: u32) -> Vec<u8> {
        let mut p = Vec::new();
        p.extend_from_slice(&[1, 0, 0, 0]); // version 1 + flags
        p.extend_from_slice(&0u64.to_be_bytes()); // creation
        p.extend_from_slice(&0u64.to_be_bytes()); // modification
        p.extend_from_slice(&timescale.to_be_bytes());
        p.extend_from_slice(&0u64.to_be_bytes()); // duration
        p.extend_from_slice(&[0; 4]);
        plain_box(b"mdhd", &p)
    }

    #[test]
    fn mdhd_timescale_both_versions() {
        for mdhd in [mdhd_v0(90_000), mdhd_v1(90_000)] {
            let r = find_box(&mdhd, 0, mdhd.len(), b"mdhd").unwrap();
            assert_eq!(parse_mdhd_timescale(&mdhd, r).unwrap(), 90_000);
        }
    }

    #[test]
    fn stts_runs_expand_to_per_sample_milliseconds() {
        let mut p = Vec::new();
        p.extend_from_slice(&[0, 0, 0, 0]); // version/flags
        p.extend_from_slice(&2u32.to_be_bytes()); // entry_count
        p.extend_from_slice(&3u32.to_be_bytes()); // count=3
        p.extend_from_slice(&100u32.to_be_bytes()); // delta=100
        p.extend_from_slice(&1u32.to_be_bytes()); // count=1
        p.extend_from_slice(&50u32.to_be_bytes()); // delta=50
        let stts = plain_box(b"stts", &p);

        let r = find_box(&stts, 0, stts.len(), b"stts").unwrap();
        let d = parse_stts_durations(&stts, r, 1000).unwrap();
        assert_eq!(d, vec![100.0, 100.0, 100.0, 50.0]);
    }

    #[test]
    fn read_media_timing_walks_the_fixed_path() {
        let mut stsd = Vec::new();
        stsd.extend_from_slice(&[0, 0, 0, 0]); // version/flags
        stsd.extend_from_slice(&1u32.to_be_bytes()); // entry_count
        stsd.extend_from_slice(&16u32.to_be_bytes()); // entry size
        stsd.extend_from_slice(b"avc1");
        stsd.extend_from_slice(&[0; 8]);

        let mut stts = Vec::new();
        stts.extend_from_slice(&[0, 0, 0, 0]);
        stts.extend_from_slice(&1u32.to_be_bytes());
        stts.extend_from_slice(&2u32.to_be_bytes()); // count
        stts.extend_from_slice(&500u32.to_be_bytes()); // delta

        let stbl = plain_box(
            b"stbl",
            &[plain_box(b"stsd", &stsd), plain_box(b"stts", &stts)].concat(),
        );
        let minf = plain_box(b"minf", &stbl);
        let mdia = plain_box(b"mdia", &[mdhd_v0(1000), minf].concat());
        let trak = plain_box(b"trak", &mdia);
        let buf = plain_box(b"moov", &trak);

        let timing = read_media_timing(&buf).unwrap();
        assert_eq!(timing.timescale, 1000);
        assert_eq!(timing.sample_entry, Some(*b"avc1"));
        assert_eq!(timing.durations_ms, vec![500.0, 500.0]);
    }

    #[test]
    fn missing_path_box_is_fatal() {
        // moov -> trak -> mdia without an mdhd underneath.
        let mdia = plain_box(b"mdia", &plain_box(b"free", &[0; 2]));
        let trak = plain_box(b"trak", &mdia);
        let buf = plain_box(b"moov", &trak);

        let err = read_media_timing(&buf).unwrap_err();
        assert!(matches!(err, Error::BoxNotFound { name } if name == "mdhd"));
    }

    #[test]
    fn stts_entry_past_box_end_is_truncated() {
        let mut p = Vec::new();
        p.extend_from_slice(&[0, 0, 0, 0]);
        p.extend_from_slice(&2u32.to_be_bytes()); // claims 2 entries
        p.extend_from_slice(&1u32.to_be_bytes());
        p.extend_from_slice(&100u32.to_be_bytes()); // only 1 present
        let stts = plain_box(b"stts", &p);

        let r = find_box(&stts, 0, stts.len(), b"stts").unwrap();
        let err = parse_stts_durations(&stts, r, 1000).unwrap_err();
        assert!(matches!(err, Error::Truncated { .. }));
    }
}
