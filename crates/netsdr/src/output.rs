use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use netsdr_codec::{ControlItemCode, MessageType};
use netsdr_session::{StreamNotification, StreamOutcome, StreamStats};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
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
struct ReplyOutput<'a> {
    item: &'a str,
    item_code: u16,
    size: usize,
    body: String,
    timestamp: String,
}

pub fn print_reply(item_code: ControlItemCode, body: &[u8], format: OutputFormat) {
    let item = item_code.to_string();
    match format {
        OutputFormat::Json => {
            let out = ReplyOutput {
                item: &item,
                item_code: item_code.to_u16(),
                size: body.len(),
                body: hex(body),
                timestamp: now_unix_seconds(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ITEM", "CODE", "SIZE", "BODY"])
                .add_row(vec![
                    item,
                    format!("0x{:04X}", item_code.to_u16()),
                    body.len().to_string(),
                    hex(body),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "item={} code=0x{:04X} size={} body={}",
                item,
                item_code.to_u16(),
                body.len(),
                hex(body)
            );
        }
        OutputFormat::Raw => print_raw(body),
    }
}

#[derive(Serialize)]
struct NotificationOutput<'a> {
    stream: &'a str,
    sequence: u16,
    samples: Option<usize>,
    gap_expected: Option<u16>,
    gap_missing: Option<u16>,
    error: Option<String>,
}

/// One line per notification; table output prints the same lines as pretty.
pub fn print_notification(notification: &StreamNotification, format: OutputFormat) {
    let (samples, error) = match &notification.outcome {
        StreamOutcome::Samples(samples) => (Some(samples.len()), None),
        StreamOutcome::DecodeFailed(err) => (None, Some(err.to_string())),
    };

    match format {
        OutputFormat::Json => {
            let out = NotificationOutput {
                stream: notification.stream.name(),
                sequence: notification.sequence,
                samples,
                gap_expected: notification.gap.map(|gap| gap.expected),
                gap_missing: notification.gap.map(|gap| gap.missing()),
                error,
            };
            print_json(&out);
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            let mut line = format!(
                "stream={} seq={}",
                notification.stream, notification.sequence
            );
            if let Some(count) = samples {
                line.push_str(&format!(" samples={count}"));
            }
            if let Some(gap) = notification.gap {
                line.push_str(&format!(
                    " gap=expected:{},actual:{}",
                    gap.expected, gap.actual
                ));
            }
            if let Some(error) = error {
                line.push_str(&format!(" error=\"{error}\""));
            }
            println!("{line}");
        }
        OutputFormat::Raw => {
            if let Some(samples) = notification.samples() {
                let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
                print_raw(&bytes);
            }
        }
    }
}

#[derive(Serialize)]
struct StatsOutput<'a> {
    stream: &'a str,
    frames: u64,
    samples: u64,
    gaps: u64,
    dropped: u64,
    decode_failures: u64,
}

pub fn print_stats(stream: MessageType, stats: &StreamStats, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = StatsOutput {
                stream: stream.name(),
                frames: stats.frames,
                samples: stats.samples,
                gaps: stats.gaps,
                dropped: stats.dropped,
                decode_failures: stats.decode_failures,
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["STREAM", "FRAMES", "SAMPLES", "GAPS", "DROPPED", "DECODE FAILURES"])
                .add_row(vec![
                    stream.name().to_string(),
                    stats.frames.to_string(),
                    stats.samples.to_string(),
                    stats.gaps.to_string(),
                    stats.dropped.to_string(),
                    stats.decode_failures.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "stream={} frames={} samples={} gaps={} dropped={} decode_failures={}",
                stream, stats.frames, stats.samples, stats.gaps, stats.dropped, stats.decode_failures
            );
        }
        OutputFormat::Raw => {}
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn hex(data: &[u8]) -> String {
    data.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
