use clap::{Parser, ValueEnum};
use serde::Serialize;
use serde_json::{Number, Value};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use dashcam_telemetry::{extract, Error, TelemetryFrame, Timeline};

#[derive(Debug, Serialize)]
struct Row {
    timestamp_ms: f64,
    version: u32,
    gear_state: Value,
    frame_seq_no: u64,
    vehicle_speed_mps: f32,
    accelerator_pedal_position: f32,
    steering_wheel_angle: f32,
    blinker_on_left: bool,
    blinker_on_right: bool,
    brake_applied: bool,
    autopilot_state: Value,
    latitude_deg: f64,
    longitude_deg: f64,
    heading_deg: f64,
    linear_acceleration_mps2_x: f64,
    linear_acceleration_mps2_y: f64,
    linear_acceleration_mps2_z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

fn csv_header() -> &'static str {
    "timestamp_ms,version,gear_state,frame_seq_no,vehicle_speed_mps,accelerator_pedal_position,steering_wheel_angle,blinker_on_left,blinker_on_right,brake_applied,autopilot_state,latitude_deg,longitude_deg,heading_deg,linear_acceleration_mps2_x,linear_acceleration_mps2_y,linear_acceleration_mps2_z"
}

#[derive(Parser, Debug)]
#[command(name = "dashcam-telemetry")]
#[command(about = "Extract embedded dashcam telemetry from MP4 clips", long_about = None)]
struct Cli {
    /// Input MP4 file
    #[arg(value_name = "INPUT.mp4")]
    input: PathBuf,

    /// Output file path (use '-' for stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Json, conflicts_with_all = ["csv", "json"])]
    format: OutputFormat,

    /// Alias for `--format csv`
    #[arg(long, conflicts_with_all = ["json", "format"], action = clap::ArgAction::SetTrue)]
    csv: bool,

    /// Alias for `--format json`
    #[arg(long, conflicts_with_all = ["csv", "format"], action = clap::ArgAction::SetTrue)]
    json: bool,

    /// Print enums as their string names (e.g. GEAR_DRIVE) instead of numeric values
    #[arg(short = 'e', long = "enum", action = clap::ArgAction::SetTrue)]
    enum_strings: bool,

    /// Print only the frame closest to this playback time (milliseconds), as JSON
    #[arg(long = "at", value_name = "MS")]
    at: Option<f64>,
}

fn resolve_format(cli: &Cli) -> OutputFormat {
    if cli.csv {
        OutputFormat::Csv
    } else if cli.json {
        OutputFormat::Json
    } else {
        cli.format
    }
}

fn should_write_to_stdout(output: &Option<PathBuf>) -> bool {
    match output {
        None => true,
        Some(p) => p.as_os_str() == "-",
    }
}

fn fmt_f32(v: f32) -> String {
    // Print with high decimal precision for downstream analysis; cast to f64
    // to expose the exact stored f32 value.
    format!("{:.15}", v as f64)
}

fn fmt_f64(v: f64) -> String {
    format!("{:.15}", v)
}

impl Row {
    fn from_frame(frame: &TelemetryFrame, enum_strings: bool) -> Self {
        let r = &frame.record;
        let (gear, autopilot) = if enum_strings {
            (
                Value::String(r.gear_state.as_str_name().to_string()),
                Value::String(r.autopilot_state.as_str_name().to_string()),
            )
        } else {
            (
                Value::Number(Number::from(r.gear_state as i32)),
                Value::Number(Number::from(r.autopilot_state as i32)),
            )
        };

        Row {
            timestamp_ms: frame.timestamp_ms,
            version: r.version,
            gear_state: gear,
            frame_seq_no: r.frame_seq_no,
            vehicle_speed_mps: r.vehicle_speed_mps,
            accelerator_pedal_position: r.accelerator_pedal_position,
            steering_wheel_angle: r.steering_wheel_angle,
            blinker_on_left: r.blinker_on_left,
            blinker_on_right: r.blinker_on_right,
            brake_applied: r.brake_applied,
            autopilot_state: autopilot,
            latitude_deg: r.latitude_deg,
            longitude_deg: r.longitude_deg,
            heading_deg: r.heading_deg,
            linear_acceleration_mps2_x: r.linear_acceleration_mps2_x,
            linear_acceleration_mps2_y: r.linear_acceleration_mps2_y,
            linear_acceleration_mps2_z: r.linear_acceleration_mps2_z,
        }
    }
}

fn write_csv(timeline: &Timeline, enum_strings: bool, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "{}", csv_header())?;

    for frame in timeline.frames() {
        let r = &frame.record;
        let gear = if enum_strings {
            r.gear_state.as_str_name().to_string()
        } else {
            (r.gear_state as i32).to_string()
        };
        let autopilot = if enum_strings {
            r.autopilot_state.as_str_name().to_string()
        } else {
            (r.autopilot_state as i32).to_string()
        };

        // Write rows as we go (lower memory, easy to stream).
        // NB: no quoting needed because values are numeric/bool/enum tokens.
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            fmt_f64(frame.timestamp_ms),
            r.version,
            gear,
            r.frame_seq_no,
            fmt_f32(r.vehicle_speed_mps),
            fmt_f32(r.accelerator_pedal_position),
            fmt_f32(r.steering_wheel_angle),
            r.blinker_on_left,
            r.blinker_on_right,
            r.brake_applied,
            autopilot,
            fmt_f64(r.latitude_deg),
            fmt_f64(r.longitude_deg),
            fmt_f64(r.heading_deg),
            fmt_f64(r.linear_acceleration_mps2_x),
            fmt_f64(r.linear_acceleration_mps2_y),
            fmt_f64(r.linear_acceleration_mps2_z)
        )?;
    }

    Ok(())
}

fn run_with_writer(
    input: &PathBuf,
    format: OutputFormat,
    enum_strings: bool,
    at: Option<f64>,
    out: &mut dyn Write,
) -> Result<(), Error> {
    let timeline = extract::timeline_from_path(input)?;

    if let Some(time_ms) = at {
        let row = timeline.closest(time_ms).map(|f| Row::from_frame(f, enum_strings));
        let json = serde_json::to_string_pretty(&row).expect("row serialization");
        writeln!(out, "{json}")?;
        return Ok(());
    }

    match format {
        OutputFormat::Csv => write_csv(&timeline, enum_strings, out)?,
        OutputFormat::Json => {
            let rows: Vec<Row> = timeline
                .frames()
                .iter()
                .map(|f| Row::from_frame(f, enum_strings))
                .collect();
            let json = serde_json::to_string_pretty(&rows).expect("row serialization");
            writeln!(out, "{json}")?;
        }
    }

    Ok(())
}

fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    let format = resolve_format(&cli);

    if should_write_to_stdout(&cli.output) {
        let stdout = io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        run_with_writer(&cli.input, format, cli.enum_strings, cli.at, &mut out)?;
        out.flush()?;
    } else {
        let path = cli.output.as_ref().unwrap();
        let file = File::create(path)?;
        let mut out = BufWriter::new(file);
        run_with_writer(&cli.input, format, cli.enum_strings, cli.at, &mut out)?;
        out.flush()?;
    }

    Ok(())
}
