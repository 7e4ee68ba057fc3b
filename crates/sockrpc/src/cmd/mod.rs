use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use sockrpc_transport::Framing;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod call;
pub mod echo;
pub mod version;

/// Address used when neither `--addr` nor `SOCKRPC_ADDR` is given.
pub const DEFAULT_ADDR: &str = "localhost:8090";

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Call a remote method with a raw payload and print the reply.
    Call(CallArgs),
    /// Serve an echo service until interrupted.
    Echo(EchoArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Call(args) => call::run(args, format),
        Command::Echo(args) => echo::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Wire framing selectable from the command line.
#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub enum FramingArg {
    /// Write, then half-close (deployed wire format).
    #[default]
    HalfClose,
    /// Varint length prefix.
    LengthDelimited,
}

impl From<FramingArg> for Framing {
    fn from(arg: FramingArg) -> Self {
        match arg {
            FramingArg::HalfClose => Framing::HalfClose,
            FramingArg::LengthDelimited => Framing::LengthDelimited,
        }
    }
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Fully-qualified service name.
    pub service: String,
    /// Method name.
    pub method: String,
    /// Server address (host:port).
    #[arg(long, short = 'a', env = "SOCKRPC_ADDR", default_value = DEFAULT_ADDR)]
    pub addr: String,
    /// Raw string payload.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// How long to wait for the reply (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    /// Message framing; must match the server.
    #[arg(long, value_enum, default_value_t = FramingArg::HalfClose)]
    pub framing: FramingArg,
}

#[derive(Args, Debug)]
pub struct EchoArgs {
    /// Address to bind (host:port). Port 0 picks a free port.
    #[arg(long, short = 'a', env = "SOCKRPC_ADDR", default_value = DEFAULT_ADDR)]
    pub addr: String,
    /// Service name to register; its `Echo` method returns the payload.
    #[arg(long, default_value = "Echo")]
    pub service: String,
    /// Message framing; clients must match.
    #[arg(long, value_enum, default_value_t = FramingArg::HalfClose)]
    pub framing: FramingArg,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Split `host:port`, accepting bracketed IPv6 hosts.
pub fn parse_addr(input: &str) -> CliResult<(String, u16)> {
    let (host, port) = input
        .rsplit_once(':')
        .ok_or_else(|| CliError::new(USAGE, format!("address must be host:port: {input}")))?;
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    if host.is_empty() {
        return Err(CliError::new(USAGE, format!("address has no host: {input}")));
    }
    let port = port
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid port in address: {input}")))?;
    Ok((host.to_string(), port))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
