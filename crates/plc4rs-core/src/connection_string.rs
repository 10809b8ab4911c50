//! Connection string grammar.
//!
//! ```text
//! {protocol-code}[:{transport-code}]://{transport-address}[?{parameters}]
//! ```
//!
//! `modbus:tcp://10.0.0.7:502?unit-identifier=1` names the `modbus` driver, the
//! `tcp` transport, the address `10.0.0.7:502` and the parameter text
//! `unit-identifier=1`. Parameters are kept verbatim; their meaning belongs
//! to the driver.

use std::fmt;
use std::str::FromStr;

use plc4rs_driver::is_valid_code;

/// A connection string that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid connection string '{input}': {reason}")]
pub struct ConnectionStringError {
    pub input: String,
    pub reason: &'static str,
}

/// Parsed form of a connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    protocol_code: String,
    transport_code: Option<String>,
    transport_address: String,
    parameters: String,
}

impl ConnectionString {
    pub fn parse(input: &str) -> Result<Self, ConnectionStringError> {
        let fail = |reason| ConnectionStringError {
            input: input.to_string(),
            reason,
        };

        let (scheme, rest) = input
            .split_once("://")
            .ok_or_else(|| fail("missing '://' separator"))?;

        let (protocol_code, transport_code) = match scheme.split_once(':') {
            Some((protocol, transport)) => (protocol, Some(transport)),
            None => (scheme, None),
        };
        if !is_valid_code(protocol_code) {
            return Err(fail("protocol code must be non-empty alphanumerics, '-' or '_'"));
        }
        if let Some(transport) = transport_code {
            if !is_valid_code(transport) {
                return Err(fail(
                    "transport code must be non-empty alphanumerics, '-' or '_'",
                ));
            }
        }

        let (transport_address, parameters) = match rest.split_once('?') {
            Some((address, parameters)) => (address, parameters),
            None => (rest, ""),
        };
        if transport_address.is_empty() {
            return Err(fail("transport address is empty"));
        }

        Ok(Self {
            protocol_code: protocol_code.to_string(),
            transport_code: transport_code.map(str::to_string),
            transport_address: transport_address.to_string(),
            parameters: parameters.to_string(),
        })
    }

    pub fn protocol_code(&self) -> &str {
        &self.protocol_code
    }

    /// Explicit transport code, if the string names one.
    pub fn transport_code(&self) -> Option<&str> {
        self.transport_code.as_deref()
    }

    pub fn transport_address(&self) -> &str {
        &self.transport_address
    }

    /// Raw parameter text after `?`. Empty when absent.
    pub fn parameters(&self) -> &str {
        &self.parameters
    }

    /// Iterate `key=value` pairs of the parameter text.
    ///
    /// Pairs are separated by `&`; a key without `=` yields an empty value.
    pub fn parameter_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parameters
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
    }
}

impl FromStr for ConnectionString {
    type Err = ConnectionStringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.protocol_code)?;
        if let Some(transport) = &self.transport_code {
            write!(f, ":{transport}")?;
        }
        write!(f, "://{}", self.transport_address)?;
        if !self.parameters.is_empty() {
            write!(f, "?{}", self.parameters)?;
        }
        Ok(())
    }
}

/// Address component of a raw connection string.
///
/// Strings that do not follow the grammar are treated as a bare address.
pub fn address_component(connection_string: &str) -> &str {
    let rest = connection_string
        .split_once("://")
        .map_or(connection_string, |(_, rest)| rest);
    rest.split_once('?').map_or(rest, |(address, _)| address)
}
