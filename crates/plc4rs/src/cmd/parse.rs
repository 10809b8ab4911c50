use plc4rs::core::ConnectionString;
use serde::Serialize;

use crate::cmd::ParseArgs;
use crate::exit::{core_error, CliResult, SUCCESS};
use crate::output::{print_json, table, OutputFormat};

#[derive(Serialize)]
struct Parameter<'a> {
    key: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct ParseOutput<'a> {
    protocol_code: &'a str,
    transport_code: Option<&'a str>,
    transport_address: &'a str,
    parameters: Vec<Parameter<'a>>,
}

pub fn run(args: ParseArgs, format: OutputFormat) -> CliResult<i32> {
    let parsed = ConnectionString::parse(&args.connection_string)
        .map_err(|err| core_error("parse", err.into()))?;

    let out = ParseOutput {
        protocol_code: parsed.protocol_code(),
        transport_code: parsed.transport_code(),
        transport_address: parsed.transport_address(),
        parameters: parsed
            .parameter_pairs()
            .map(|(key, value)| Parameter { key, value })
            .collect(),
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut t = table(vec!["FIELD", "VALUE"]);
            t.add_row(vec!["protocol", out.protocol_code]);
            t.add_row(vec!["transport", out.transport_code.unwrap_or("(driver default)")]);
            t.add_row(vec!["address", out.transport_address]);
            for p in &out.parameters {
                t.add_row(vec![format!("param {}", p.key), p.value.to_string()]);
            }
            println!("{t}");
        }
        OutputFormat::Pretty => {
            println!(
                "protocol={} transport={} address={}",
                out.protocol_code,
                out.transport_code.unwrap_or("-"),
                out.transport_address
            );
            for p in &out.parameters {
                println!("  {}={}", p.key, p.value);
            }
        }
    }

    Ok(SUCCESS)
}
