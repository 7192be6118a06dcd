use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use framesync_session::SessionStats;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct StatsOutput<'a> {
    schema_id: &'a str,
    source: &'a str,
    #[serde(flatten)]
    stats: SessionStats,
}

/// Summary of an `encode` run.
#[derive(Debug, Serialize)]
pub struct EncodeSummary {
    pub input_bytes: usize,
    pub frames: usize,
    pub stream_bytes: usize,
}

pub fn print_stats(stats: &SessionStats, source: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = StatsOutput {
                schema_id: "https://schemas.3leaps.dev/framesync/cli/v1/session-stats.schema.json",
                source,
                stats: *stats,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COUNTER", "VALUE"]);
            for (name, value) in stats_rows(stats) {
                table.add_row(vec![name.to_string(), value.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let line = stats_rows(stats)
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(" ");
            println!("source={source} {line}");
        }
    }
}

pub fn print_encode_summary(summary: &EncodeSummary, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(summary).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["INPUT BYTES", "FRAMES", "STREAM BYTES"])
                .add_row(vec![
                    summary.input_bytes.to_string(),
                    summary.frames.to_string(),
                    summary.stream_bytes.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!(
            "input_bytes={} frames={} stream_bytes={}",
            summary.input_bytes, summary.frames, summary.stream_bytes
        ),
    }
}

pub fn print_raw(data: &[u8]) -> std::io::Result<()> {
    let mut out = std::io::stdout().lock();
    out.write_all(data)?;
    out.flush()
}

fn stats_rows(stats: &SessionStats) -> [(&'static str, u64); 8] {
    [
        ("frames_accepted", stats.frames_accepted),
        ("frames_rejected", stats.frames_rejected),
        ("duplicates_suppressed", stats.duplicates_suppressed),
        ("resyncs", stats.resyncs),
        ("sync_timeouts", stats.sync_timeouts),
        ("decode_errors", stats.decode_errors),
        ("payloads_delivered", stats.payloads_delivered),
        ("payload_bytes", stats.payload_bytes),
    ]
}
