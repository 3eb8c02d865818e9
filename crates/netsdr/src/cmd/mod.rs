use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use clap::{Args, Subcommand};
use netsdr_codec::{ControlItemCode, MessageType};
use netsdr_session::{connect_with_config, CaptureMode, Connection, SessionConfig};

use crate::exit::{io_error, session_error, CliError, CliResult};
use crate::output::OutputFormat;

pub mod send;
pub mod stream;
pub mod tune;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send one control item and print the receiver's reply.
    Send(SendArgs),
    /// Tune a receiver channel.
    Tune(TuneArgs),
    /// Start I/Q streaming and print one line per received frame.
    Stream(StreamArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat, config: Option<&Path>) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format, config),
        Command::Tune(args) => tune::run(args, format, config),
        Command::Stream(args) => stream::run(args, format, config),
        Command::Version(args) => version::run(args),
    }
}

/// Options shared by every command that talks to a receiver.
#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Receiver address (e.g. 192.168.0.20:50000).
    pub addr: SocketAddr,
    /// Local address to bind.
    #[arg(long, default_value = "0.0.0.0:0")]
    pub bind: SocketAddr,
    /// Command timeout (e.g. 2s, 500ms). Overrides the config file.
    #[arg(long)]
    pub timeout: Option<String>,
    /// Sample width in bits for every data stream. Overrides the config file.
    #[arg(long, value_name = "BITS")]
    pub sample_bits: Option<u16>,
}

impl ConnectArgs {
    /// Config file (or defaults) with command-line overrides applied.
    pub fn session_config(&self, path: Option<&Path>) -> CliResult<SessionConfig> {
        let mut config = match path {
            Some(path) => SessionConfig::from_json_file(path).map_err(|err| {
                session_error(&format!("failed loading {}", path.display()), err)
            })?,
            None => SessionConfig::default(),
        };

        if let Some(timeout) = &self.timeout {
            config = config.with_command_timeout(parse_duration(timeout)?);
        }
        if let Some(bits) = self.sample_bits {
            for stream in MessageType::DATA_ITEMS {
                config = config.with_sample_bits(stream, bits);
            }
        }

        config
            .validate()
            .map_err(|err| session_error("invalid configuration", err))?;
        Ok(config)
    }

    pub async fn connect(&self, config: &SessionConfig) -> CliResult<Connection> {
        connect_with_config(self.bind, self.addr, config)
            .await
            .map_err(|err| session_error("connect failed", err))
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Control item: a name (receiver-state, rf-filter, ...) or a code (0x18).
    #[arg(long, short = 'i')]
    pub item: String,
    /// Payload as hex (e.g. 80020101).
    #[arg(long, short = 'd')]
    pub data: Option<String>,
}

#[derive(Args, Debug)]
pub struct TuneArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Frequency in Hz.
    #[arg(long)]
    pub hz: u64,
    /// Receiver channel.
    #[arg(long, default_value = "0")]
    pub channel: u8,
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Exit after N notifications.
    #[arg(long)]
    pub count: Option<usize>,
    /// Listen only; do not send start/stop commands.
    #[arg(long)]
    pub no_start: bool,
    /// Capture mode for the start command.
    #[arg(long, default_value = "contiguous16")]
    pub capture: CaptureMode,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("runtime setup failed", err))
}

pub(crate) fn parse_item(input: &str) -> CliResult<ControlItemCode> {
    let input = input.trim();
    if let Some(hex) = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        return u16::from_str_radix(hex, 16)
            .map(ControlItemCode::from_u16)
            .map_err(|_| CliError::usage(format!("invalid item code: {input}")));
    }
    if let Ok(code) = input.parse::<u16>() {
        return Ok(ControlItemCode::from_u16(code));
    }

    let name: String = input.chars().filter(|c| *c != '-' && *c != '_').collect();
    ControlItemCode::from_name(&name)
        .ok_or_else(|| CliError::usage(format!("unknown control item: {input}")))
}

pub(crate) fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: Vec<u8> = input
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b':')
        .collect();
    if digits.len() % 2 != 0 {
        return Err(CliError::usage("hex payload must have an even number of digits"));
    }

    digits
        .chunks_exact(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| CliError::usage(format!("invalid hex payload: {input}")))
        })
        .collect()
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
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
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
