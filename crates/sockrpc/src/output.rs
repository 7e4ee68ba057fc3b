use std::io::{IsTerminal, Write};
use std::net::SocketAddr;
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

#[derive(Serialize)]
struct ReplyOutput<'a> {
    schema_id: &'a str,
    service: &'a str,
    method: &'a str,
    payload_size: usize,
    payload: String,
    elapsed_ms: u128,
    timestamp: String,
}

#[derive(Serialize)]
struct ListeningOutput<'a> {
    schema_id: &'a str,
    listening: String,
    service: &'a str,
    methods: &'a [&'a str],
}

pub struct Reply<'a> {
    pub service: &'a str,
    pub method: &'a str,
    pub payload: &'a [u8],
    pub elapsed_ms: u128,
}

pub fn print_reply(reply: &Reply<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ReplyOutput {
                schema_id: "sockrpc.cli.call-reply.v1",
                service: reply.service,
                method: reply.method,
                payload_size: reply.payload.len(),
                payload: payload_preview(reply.payload),
                elapsed_ms: reply.elapsed_ms,
                timestamp: now_unix_seconds(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["METHOD", "SIZE", "ELAPSED", "PAYLOAD"])
                .add_row(vec![
                    format!("{}.{}", reply.service, reply.method),
                    reply.payload.len().to_string(),
                    format!("{}ms", reply.elapsed_ms),
                    payload_preview(reply.payload),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{}.{} size={} elapsed={}ms payload={}",
                reply.service,
                reply.method,
                reply.payload.len(),
                reply.elapsed_ms,
                payload_preview(reply.payload)
            );
        }
        OutputFormat::Raw => print_raw(reply.payload),
    }
}

/// Announce a bound server. Always a single line so callers can read the
/// chosen port from stdout.
pub fn print_listening(addr: SocketAddr, service: &str, methods: &[&str], format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Table => {
            let out = ListeningOutput {
                schema_id: "sockrpc.cli.server-listening.v1",
                listening: addr.to_string(),
                service,
                methods,
            };
            print_json(&out);
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!("listening on {addr} ({service}: {})", methods.join(", "));
        }
    }
    let _ = std::io::stdout().flush();
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json(value: &impl Serialize) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
