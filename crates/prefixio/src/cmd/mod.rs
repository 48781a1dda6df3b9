use std::io::{BufRead, Read};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use prefixio_transport::Endpoint;

use crate::exit::{io_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to an endpoint and send one frame per message.
    Send(SendArgs),
    /// Accept connections and print every frame received.
    Listen(ListenArgs),
    /// Write framed messages to stdout.
    Encode(EncodeArgs),
    /// Read framed messages from a file or stdin and print them.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

/// Settings shared by every subcommand.
#[derive(Debug, Clone, Copy)]
pub struct Context {
    pub format: OutputFormat,
    pub max_len: usize,
}

pub fn run(command: Command, ctx: Context) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, ctx),
        Command::Listen(args) => listen::run(args, ctx),
        Command::Encode(args) => encode::run(args, ctx),
        Command::Decode(args) => decode::run(args, ctx),
        Command::Version(args) => version::run(args),
    }
}

/// Where outgoing messages come from. With no flags, all of stdin is one message.
#[derive(Args, Debug, Default)]
pub struct MessageArgs {
    /// Message text. Repeat for several messages.
    #[arg(long, conflicts_with_all = ["file", "stdin_lines"])]
    pub data: Vec<String>,
    /// Send a file's contents as one message. Repeat for several.
    #[arg(long, conflicts_with_all = ["data", "stdin_lines"])]
    pub file: Vec<PathBuf>,
    /// Send each line of stdin as its own message (newline stripped).
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub stdin_lines: bool,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Endpoint to connect to (unix:<path>, tcp:<host:port>, or a socket path).
    pub endpoint: Endpoint,
    #[command(flatten)]
    pub messages: MessageArgs,
    /// Write timeout (e.g. 5s, 500ms).
    #[arg(long)]
    pub timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Endpoint to bind (unix:<path>, tcp:<host:port>, or a socket path).
    pub endpoint: Endpoint,
    /// Exit after receiving N messages (at least 1).
    #[arg(long, value_parser = parse_count)]
    pub count: Option<usize>,
    /// Drop a connection that stays silent this long (e.g. 30s, 500ms).
    #[arg(long)]
    pub idle_timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub messages: MessageArgs,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Read frames from this file instead of stdin.
    #[arg(long, short = 'i')]
    pub input: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn resolve_messages(args: &MessageArgs) -> CliResult<Vec<Vec<u8>>> {
    if !args.data.is_empty() {
        return Ok(args.data.iter().map(|s| s.as_bytes().to_vec()).collect());
    }
    if !args.file.is_empty() {
        return args
            .file
            .iter()
            .map(|path| {
                std::fs::read(path)
                    .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))
            })
            .collect();
    }

    let mut stdin = std::io::stdin().lock();
    if args.stdin_lines {
        return stdin
            .lines()
            .map(|line| {
                line.map(String::into_bytes)
                    .map_err(|err| io_error("failed reading stdin", err))
            })
            .collect();
    }

    let mut all = Vec::new();
    stdin
        .read_to_end(&mut all)
        .map_err(|err| io_error("failed reading stdin", err))?;
    Ok(vec![all])
}

fn parse_count(input: &str) -> Result<usize, String> {
    match input.parse::<usize>() {
        Ok(0) => Err("count must be at least 1".to_string()),
        Ok(count) => Ok(count),
        Err(err) => Err(err.to_string()),
    }
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(num) => (num, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
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
