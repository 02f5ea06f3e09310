//! `dashcam-telemetry` extracts the vehicle telemetry a dashcam recorder
//! embeds in the video elementary stream of its MP4 clips.
//!
//! Telemetry (speed, gear, steering angle, blinkers, autopilot mode, GPS
//! position, linear acceleration) is carried as vendor SEI NAL units inside
//! the coded bitstream rather than as a separate track. This crate walks the
//! container boxes for the timing tables, scans the media data for SEI
//! units, decodes the embedded wire-format message, and returns a
//! time-indexed [`Timeline`] with a nearest-frame query for playback.
//!
//! ## Quick start (sync)
//! - Call [`timeline_from_path`] and query the returned [`Timeline`] with
//!   [`Timeline::closest`].
//!
//! ## Quick start (async)
//! - Use [`async_extract::stream_from_path`] for a Tokio `Stream` of frames,
//!   or [`async_extract::timeline_from_path`] for the whole timeline.
//!
//! ## Features
//! - `async` (default): enables the Tokio helpers.
//!
//! A file without telemetry (other camera angles, non-dashcam recordings) is
//! a normal outcome: extraction succeeds with an empty timeline. Only a
//! structurally broken container surfaces as an [`Error`].

pub mod error;

mod mp4;
mod scan;
mod sei;
mod wire;

pub mod extract;
pub mod timeline;

#[cfg(feature = "async")]
pub mod async_extract;

pub use error::Error;
pub use extract::{timeline_from_bytes, timeline_from_path};
pub use timeline::{TelemetryFrame, Timeline};
pub use wire::{AutopilotState, Gear, TelemetryRecord};
