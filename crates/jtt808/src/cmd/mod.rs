use std::time::Duration;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod send;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Accept terminal connections, print each message and acknowledge it.
    Serve(ServeArgs),
    /// Connect to a server, send frames and print the acknowledgements.
    Send(SendArgs),
    /// Decode a single hex-encoded frame.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(default_value = "0.0.0.0:9090")]
    pub addr: String,
    /// Reject frames whose declared body length differs from the body.
    #[arg(long)]
    pub strict: bool,
    /// Close connections idle for this long (e.g. 30s, 500ms).
    #[arg(long)]
    pub idle_timeout: Option<String>,
    /// Largest frame accepted before the connection is dropped.
    #[arg(long, default_value_t = jtt808_frame::DEFAULT_MAX_FRAME_SIZE)]
    pub max_frame_size: usize,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Server address.
    #[arg(default_value = "127.0.0.1:9090")]
    pub addr: String,
    /// Frame to send, hex encoded with its 0x7e flags. Default: a sample
    /// location report.
    #[arg(long)]
    pub hex: Option<String>,
    /// Number of frames to send.
    #[arg(long, default_value_t = 1)]
    pub count: usize,
    /// Delay between frames (e.g. 1s, 250ms).
    #[arg(long, default_value = "1s")]
    pub interval: String,
    /// Maximum time to wait for each acknowledgement.
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame bytes as hex, with or without the 0x7e flags.
    pub hex: String,
    /// Reject frames whose declared body length differs from the body.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

/// Parse hex, tolerating whitespace and a `0x` prefix.
pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let cleaned: String = input.split_whitespace().collect();
    let cleaned = cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
        .unwrap_or(&cleaned);
    hex::decode(cleaned).map_err(|err| CliError::new(USAGE, format!("invalid hex input: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration(" ").is_err());
    }

    #[test]
    fn parse_hex_tolerates_spacing_and_prefix() {
        assert_eq!(parse_hex("0x7e 01\n02 7e").unwrap(), vec![0x7e, 0x01, 0x02, 0x7e]);
        assert_eq!(parse_hex("zz").unwrap_err().code, USAGE);
    }
}
