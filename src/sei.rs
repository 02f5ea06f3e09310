use crate::wire::{self, TelemetryRecord};

// -----------------------------
// SEI payload decoding
// -----------------------------
//
// The recorder wraps its telemetry message in a user-data SEI with a fixed
// vendor layout: NAL header, two marker bytes, a run of 0x42 padding bytes,
// the 0x69 payload-type byte, then the wire-format payload protected by
// start-code emulation prevention, closed by one RBSP trailing byte.

/// Padding sentinel preceding the payload-type byte.
const PAYLOAD_TYPE_MARKER: u8 = 0x42;

/// Application-defined "user data" payload type used by this recorder.
const TELEMETRY_PAYLOAD_TYPE: u8 = 0x69;

/// Decode one raw SEI NAL unit into a telemetry record.
///
/// Returns `None` when the unit is not a recognized telemetry SEI or its
/// payload is malformed; the caller treats that as "no SEI for this picture".
pub(crate) fn decode_telemetry_sei(nal: &[u8]) -> Option<TelemetryRecord> {
    if nal.len() < 4 {
        return None;
    }

    // NAL header byte plus the two fixed marker bytes of this layout.
    let mut i = 3;
    while i < nal.len() && nal[i] == PAYLOAD_TYPE_MARKER {
        i += 1;
    }
    if i >= nal.len() || nal[i] != TELEMETRY_PAYLOAD_TYPE {
        return None;
    }

    // Payload runs up to, but excluding, the RBSP trailing byte.
    let start = i + 1;
    let end = nal.len() - 1;
    if start >= end {
        return None;
    }

    let payload = remove_emulation_prevention(&nal[start..end]);
    wire::decode_record(&payload)
}

/// Remove 0x03 emulation-prevention bytes inserted after 0x00 0x00 runs.
pub(crate) fn remove_emulation_prevention(rbsp: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rbsp.len());
    let mut zeros = 0usize;

    for &b in rbsp {
        if zeros >= 2 && b == 0x03 {
            // The byte exists only to break up a start-code lookalike.
            zeros = 0;
            continue;
        }
        out.push(b);
        if b == 0x00 {
            zeros += 1;
        } else {
            zeros = 0;
        }
    }
    out
}


#[cfg(test)]
mod tests {
    use super::testnal::{insert_emulation_prevention, telemetry_sei_nal};
    use super::*;
    use crate::wire::testenc::sample_record;

    #[test]
    fn emulation_prevention_round_trips() {
        let data = [0x00, 0x00, 0x01, 0x42, 0x00, 0x00, 0x00, 0x69, 0x00, 0x00, 0x03];
        let stuffed = insert_emulation_prevention(&data);
        assert_ne!(stuffed, data);
        assert_eq!(remove_emulation_prevention(&stuffed), data);
    }

    #[test]
    fn emulation_prevention_removal_is_idempotent_on_clean_input() {
        let clean = [0x08, 0x01, 0x00, 0x00, 0x04, 0x10, 0x00];
        assert_eq!(remove_emulation_prevention(&clean), clean);
        let once = remove_emulation_prevention(&clean);
        assert_eq!(remove_emulation_prevention(&once), once);
    }

    #[test]
    fn valid_telemetry_sei_decodes() {
        let rec = sample_record();
        let nal = telemetry_sei_nal(&rec);
        assert_eq!(decode_telemetry_sei(&nal), Some(rec));
    }

    #[test]
    fn wrong_payload_type_byte_yields_none() {
        let mut nal = telemetry_sei_nal(&sample_record());
        // First non-marker byte after the fixed prefix is the payload type.
        let idx = 3 + nal[3..].iter().take_while(|&&b| b == 0x42).count();
        nal[idx] = 0x70;
        assert_eq!(decode_telemetry_sei(&nal), None);
    }

    #[test]
    fn undersized_nal_yields_none() {
        assert_eq!(decode_telemetry_sei(&[0x06, 0x05, 0x42]), None);
        assert_eq!(decode_telemetry_sei(&[]), None);
    }

    #[test]
    fn payload_type_with_no_payload_yields_none() {
        let nal = [0x06, 0x05, 0x01, 0x42, 0x69, 0x80];
        // Only the trailing byte remains after the type byte.
        assert_eq!(decode_telemetry_sei(&nal), None);
    }

    #[test]
    fn truncated_wire_payload_yields_none() {
        let mut nal = telemetry_sei_nal(&sample_record());
        nal.truncate(nal.len() - 6);
        nal.push(0x80);
        assert_eq!(decode_telemetry_sei(&nal), None);
    }
}
