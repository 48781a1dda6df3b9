use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
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

/// One received message, as printed.
#[derive(Debug)]
pub struct Received<'a> {
    pub index: usize,
    pub source: &'a str,
    pub payload: &'a [u8],
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    index: usize,
    source: &'a str,
    size: usize,
    encoding: &'static str,
    payload: String,
    timestamp: String,
}

pub fn print_message(message: &Received<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&json_record(message)).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "SIZE", "SOURCE", "PAYLOAD"])
                .add_row(vec![
                    message.index.to_string(),
                    message.payload.len().to_string(),
                    message.source.to_string(),
                    payload_preview(message.payload),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "#{} size={} source={} payload={}",
                message.index,
                message.payload.len(),
                message.source,
                payload_preview(message.payload)
            );
        }
        OutputFormat::Raw => print_raw(message.payload),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout().lock();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn json_record<'a>(message: &Received<'a>) -> MessageOutput<'a> {
    let (encoding, payload) = match std::str::from_utf8(message.payload) {
        Ok(text) => ("utf8", text.to_string()),
        Err(_) => ("hex", hex(message.payload)),
    };
    MessageOutput {
        index: message.index,
        source: message.source,
        size: message.payload.len(),
        encoding,
        payload,
        timestamp: now_unix_seconds(),
    }
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;

    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
