use std::path::PathBuf;

use bytes::Bytes;
use clap::{Args, Subcommand, ValueEnum};
use framesync_frame::SyncMode;
use framesync_session::SessionConfig;

use crate::exit::{session_error, CliResult};
use crate::output::OutputFormat;

pub mod encode;
pub mod receive;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Receive frames from a serial device or a captured stream.
    Receive(ReceiveArgs),
    /// Encode a file into the wire stream a receiver accepts.
    Encode(EncodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Receive(args) => receive::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub enum SyncModeArg {
    /// Search for the preamble before every frame.
    #[default]
    PerFrame,
    /// Search once, then read frames back to back.
    PerSession,
}

impl From<SyncModeArg> for SyncMode {
    fn from(arg: SyncModeArg) -> Self {
        match arg {
            SyncModeArg::PerFrame => SyncMode::PerFrame,
            SyncModeArg::PerSession => SyncMode::PerSession,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub enum PayloadFormat {
    /// Payload bytes back to back.
    #[default]
    Raw,
    /// Native-endian u32 length before each payload.
    LengthPrefixed,
}

/// Protocol parameters shared by `receive` and `encode`. Unset flags keep
/// the session defaults.
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Start-of-frame marker text.
    #[arg(long, value_name = "TEXT")]
    pub preamble: Option<String>,
    /// Bytes per preamble scan window.
    #[arg(long, value_name = "BYTES")]
    pub scan_window: Option<usize>,
    /// Total frame length, footer included.
    #[arg(long, value_name = "BYTES")]
    pub frame_len: Option<usize>,
    /// Maximum bytes per read while filling a frame.
    #[arg(long, value_name = "BYTES")]
    pub fill_chunk: Option<usize>,
    /// Non-matching scan windows tolerated before reporting a sync timeout.
    #[arg(long, value_name = "N")]
    pub retry_budget: Option<usize>,
    /// Fill cycles that must see the trailer tag.
    #[arg(long, value_name = "N")]
    pub tag_confirmations: Option<usize>,
    /// Preamble before every frame, or once per session.
    #[arg(long, value_enum, default_value = "per-frame")]
    pub sync_mode: SyncModeArg,
}

impl SessionArgs {
    pub fn to_config(&self) -> CliResult<SessionConfig> {
        let defaults = SessionConfig::default();
        let config = SessionConfig {
            preamble: self
                .preamble
                .clone()
                .map(|text| Bytes::from(text.into_bytes()))
                .unwrap_or(defaults.preamble),
            scan_window: self.scan_window.unwrap_or(defaults.scan_window),
            fill_chunk: self.fill_chunk.unwrap_or(defaults.fill_chunk),
            retry_budget: self.retry_budget.unwrap_or(defaults.retry_budget),
            tag_confirmations: self.tag_confirmations.unwrap_or(defaults.tag_confirmations),
            frame_len: self.frame_len.unwrap_or(defaults.frame_len),
            sync_mode: self.sync_mode.into(),
        };
        config
            .validate()
            .map_err(|err| session_error("invalid configuration", err))?;
        Ok(config)
    }
}

#[derive(Args, Debug)]
pub struct ReceiveArgs {
    /// Serial character device to open read/write.
    #[arg(required_unless_present = "replay", conflicts_with = "replay")]
    pub device: Option<PathBuf>,
    /// Replay a captured inbound stream instead of a device.
    #[arg(long, value_name = "FILE")]
    pub replay: Option<PathBuf>,
    /// Write payloads to FILE instead of stdout.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,
    /// How payloads are written.
    #[arg(long, value_enum, default_value = "raw")]
    pub output_format: PayloadFormat,
    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// File to encode. Its base64 text must start with the preamble.
    pub input: PathBuf,
    /// Write the stream to FILE instead of stdout.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,
    /// Open the stream with the %IGNORE% control token.
    #[arg(long)]
    pub ignore_prefix: bool,
    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
