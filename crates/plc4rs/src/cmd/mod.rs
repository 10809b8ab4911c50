use std::time::Duration;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod parse;
pub mod selftest;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show version information.
    Version(VersionArgs),
    /// Parse a connection string and print its parts.
    Parse(ParseArgs),
    /// Run a connect/request/disconnect cycle over the loopback transport.
    Selftest(SelftestArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Version(args) => version::run(args),
        Command::Parse(args) => parse::run(args, format),
        Command::Selftest(args) => selftest::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Connection string, e.g. modbus:tcp://10.0.0.7:502?unit-identifier=1
    pub connection_string: String,
}

#[derive(Args, Debug)]
pub struct SelftestArgs {
    /// Number of items per request.
    #[arg(long, default_value_t = 3)]
    pub items: usize,
    /// Make the transport refuse the connection.
    #[arg(long)]
    pub refuse: bool,
    /// Connect and disconnect timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

/// Parse `5s`, `500ms` or a bare number of seconds.
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
        .map_err(|_| CliError::new(USAGE, format!("invalid duration: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
