use serde::Serialize;

// -----------------------------
// Telemetry wire format
// -----------------------------
//
// The SEI payload is a flat sequence of protobuf-style (tag, value) pairs.
// Unknown field numbers are valid and skipped by wire type; only a read that
// would run past the buffer end (or an unknown wire type) makes the payload
// malformed, in which case no partial record is returned.

const WIRE_VARINT: u64 = 0;
const WIRE_FIXED64: u64 = 1;
const WIRE_LEN_DELIMITED: u64 = 2;
const WIRE_FIXED32: u64 = 5;

/// Transmission gear selector state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Gear {
    #[default]
    Park = 0,
    Drive = 1,
    Reverse = 2,
    Neutral = 3,
}

impl Gear {
    fn from_raw(v: u64) -> Self {
        match v {
            1 => Gear::Drive,
            2 => Gear::Reverse,
            3 => Gear::Neutral,
            // Unrecognized values clamp to the default rather than failing.
            _ => Gear::Park,
        }
    }

    pub fn as_str_name(&self) -> &'static str {
        match self {
            Gear::Park => "GEAR_PARK",
            Gear::Drive => "GEAR_DRIVE",
            Gear::Reverse => "GEAR_REVERSE",
            Gear::Neutral => "GEAR_NEUTRAL",
        }
    }
}

/// Driver-assistance engagement state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum AutopilotState {
    #[default]
    None = 0,
    SelfDriving = 1,
    Autosteer = 2,
    AdaptiveCruise = 3,
}

impl AutopilotState {
    fn from_raw(v: u64) -> Self {
        match v {
            1 => AutopilotState::SelfDriving,
            2 => AutopilotState::Autosteer,
            3 => AutopilotState::AdaptiveCruise,
            _ => AutopilotState::None,
        }
    }

    pub fn as_str_name(&self) -> &'static str {
        match self {
            AutopilotState::None => "AUTOPILOT_NONE",
            AutopilotState::SelfDriving => "AUTOPILOT_SELF_DRIVING",
            AutopilotState::Autosteer => "AUTOPILOT_AUTOSTEER",
            AutopilotState::AdaptiveCruise => "AUTOPILOT_ADAPTIVE_CRUISE",
        }
    }
}

/// One decoded telemetry sample.
///
/// Fields absent from the wire keep their zero/default value; decoding never
/// fails solely because a field is missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TelemetryRecord {
    pub version: u32,
    pub gear_state: Gear,
    pub frame_seq_no: u64,
    pub vehicle_speed_mps: f32,
    pub accelerator_pedal_position: f32,
    pub steering_wheel_angle: f32,
    pub blinker_on_left: bool,
    pub blinker_on_right: bool,
    pub brake_applied: bool,
    pub autopilot_state: AutopilotState,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub heading_deg: f64,
    pub linear_acceleration_mps2_x: f64,
    pub linear_acceleration_mps2_y: f64,
    pub linear_acceleration_mps2_z: f64,
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Base-128 varint, little-endian group order, at most 10 groups.
    fn varint(&mut self) -> Option<u64> {
        let mut value = 0u64;
        for group in 0..10 {
            let b = *self.buf.get(self.pos)?;
            self.pos += 1;
            value |= u64::from(b & 0x7F) << (7 * group);
            if b & 0x80 == 0 {
                return Some(value);
            }
        }
        None
    }

    fn fixed32(&mut self) -> Option<f32> {
        let b = self.buf.get(self.pos..self.pos + 4)?;
        self.pos += 4;
        Some(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn fixed64(&mut self) -> Option<f64> {
        let b = self.buf.get(self.pos..self.pos + 8)?;
        self.pos += 8;
        Some(f64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    fn skip(&mut self, n: usize) -> Option<()> {
        self.buf.get(self.pos..self.pos.checked_add(n)?)?;
        self.pos += n;
        Some(())
    }
}

/// Decode an emulation-prevention-stripped SEI payload into a record.
///
/// Returns `None` only when the byte stream is malformed; unknown field
/// numbers are consumed and ignored.
pub(crate) fn decode_record(buf: &[u8]) -> Option<TelemetryRecord> {
    let mut r = Reader { buf, pos: 0 };
    let mut rec = TelemetryRecord::default();

    while !r.at_end() {
        let tag = r.varint()?;
        let field = tag >> 3;
        let wire = tag & 0x7;

        match (field, wire) {
            (1, WIRE_VARINT) => rec.version = r.varint()? as u32,
            (2, WIRE_VARINT) => rec.gear_state = Gear::from_raw(r.varint()?),
            (3, WIRE_VARINT) => rec.frame_seq_no = r.varint()?,
            (4, WIRE_FIXED32) => rec.vehicle_speed_mps = r.fixed32()?,
            (5, WIRE_FIXED32) => rec.accelerator_pedal_position = r.fixed32()?,
            (6, WIRE_FIXED32) => rec.steering_wheel_angle = r.fixed32()?,
            (7, WIRE_VARINT) => rec.blinker_on_left = r.varint()? != 0,
            (8, WIRE_VARINT) => rec.blinker_on_right = r.varint()? != 0,
            (9, WIRE_VARINT) => rec.brake_applied = r.varint()? != 0,
            (10, WIRE_VARINT) => rec.autopilot_state = AutopilotState::from_raw(r.varint()?),
            (11, WIRE_FIXED64) => rec.latitude_deg = r.fixed64()?,
            (12, WIRE_FIXED64) => rec.longitude_deg = r.fixed64()?,
            (13, WIRE_FIXED64) => rec.heading_deg = r.fixed64()?,
            (14, WIRE_FIXED64) => rec.linear_acceleration_mps2_x = r.fixed64()?,
            (15, WIRE_FIXED64) => rec.linear_acceleration_mps2_y = r.fixed64()?,
            (16, WIRE_FIXED64) => rec.linear_acceleration_mps2_z = r.fixed64()?,
            // Unrecognized field (or a known field with a surprising wire
            // type): skip by the wire type's length rule.
            (_, WIRE_VARINT) => {
                r.varint()?;
            }
            (_, WIRE_FIXED64) => r.skip(8)?,
            (_, WIRE_FIXED32) => r.skip(4)?,
            (_, WIRE_LEN_DELIMITED) => {
                let len = r.varint()?;
                r.skip(usize::try_from(len).ok()?)?;
            }
            _ => return None, // unknown wire type
        }
    }

    Some(rec)
}
