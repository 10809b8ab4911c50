use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use plc4rs::core::{
    build_read_request, build_write_request, Callbacks, Capabilities, CoreError, SystemConfig,
    SystemContext,
};
use plc4rs::driver::{AddressParseError, ByteOrder, Driver, PlcValue};
use plc4rs::transport::{LoopbackConfig, LoopbackTransport, LOOPBACK};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cmd::{parse_duration, SelftestArgs};
use crate::exit::{core_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{hex, print_json, table, OutputFormat};

const PROTOCOL: &str = "passthrough";
const CONNECTION_STRING: &str = "passthrough://selftest";

#[derive(Clone, Serialize)]
struct Event {
    event: &'static str,
    subject: String,
    detail: Option<String>,
}

#[derive(Serialize)]
struct SelftestOutput {
    connected: bool,
    read_items: usize,
    write_items: usize,
    bytes_sent: usize,
    bytes_received: usize,
    last_frame: String,
    events: Vec<Event>,
}

type EventLog = Arc<Mutex<Vec<Event>>>;

pub fn run(args: SelftestArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("runtime: {err}")))?;

    let log = EventLog::default();
    let outcome = runtime.block_on(exercise(&args, timeout, &log));

    let mut out = SelftestOutput {
        connected: false,
        read_items: 0,
        write_items: 0,
        bytes_sent: 0,
        bytes_received: 0,
        last_frame: String::new(),
        events: Vec::new(),
    };
    let failure = match outcome {
        Ok(stats) => {
            out.connected = true;
            out.read_items = stats.read_items;
            out.write_items = stats.write_items;
            out.bytes_sent = stats.bytes_sent;
            out.bytes_received = stats.bytes_received;
            out.last_frame = hex(&stats.last_frame);
            None
        }
        Err(err) => Some(err),
    };
    out.events = log.lock().clone();
    print(&out, format);

    match failure {
        None => Ok(SUCCESS),
        Some(err) => Err(err),
    }
}

#[derive(Default)]
struct Stats {
    read_items: usize,
    write_items: usize,
    bytes_sent: usize,
    bytes_received: usize,
    last_frame: Bytes,
}

async fn exercise(args: &SelftestArgs, timeout: Duration, log: &EventLog) -> CliResult<Stats> {
    let config = SystemConfig {
        connect_timeout: timeout,
        disconnect_timeout: timeout,
        io_timeout: timeout,
        ..SystemConfig::default()
    };
    let system = SystemContext::with_config(config, recording_callbacks(log));

    let driver = Driver::new(PROTOCOL, "Pass-through", LOOPBACK, |address: &str| {
        if address.trim().is_empty() {
            Err(AddressParseError::new(address, "address is empty"))
        } else {
            Ok(address.trim().to_string())
        }
    })
    .map_err(|err| core_error("driver", err.into()))?;
    system
        .register_driver(driver)
        .map_err(|err| core_error("driver", err))?;

    let transport = LoopbackTransport::new().with_config(LoopbackConfig {
        refuse_connections: args.refuse,
        ..LoopbackConfig::default()
    });
    system
        .register_transport(Arc::new(transport))
        .map_err(|err| core_error("transport", err))?;

    let cancel = CancellationToken::new();
    let connection = system
        .connect_str(CONNECTION_STRING, Capabilities::all(), &cancel)
        .await
        .map_err(|err| core_error("connect", err))?;

    let result = async {
        let items = (0..args.items)
            .map(|i| connection.parse_address(&format!("register/{i}")))
            .collect::<Result<Vec<_>, CoreError>>()?;
        let read = build_read_request(&connection, items.iter().cloned())?;
        let write = build_write_request(
            &connection,
            items
                .iter()
                .cloned()
                .zip((0..).map(|i: i32| PlcValue::Integer(i * 100))),
        )?;

        let mut stats = Stats {
            read_items: read.num_items(),
            write_items: write.num_items(),
            ..Stats::default()
        };
        for pair in write.items() {
            let frame = pair.value.to_bytes(ByteOrder::BigEndian);
            stats.bytes_sent += frame.len();
            connection.send(frame, &cancel).await?;
        }
        while stats.bytes_received < stats.bytes_sent {
            let chunk = connection.receive(&cancel).await?;
            stats.bytes_received += chunk.len();
            stats.last_frame = chunk;
        }
        Ok::<_, CoreError>(stats)
    }
    .await;

    let closed = system.disconnect(connection.handle()).await;
    let report = system.shutdown().await;
    info!(
        disconnected = report.disconnected,
        abandoned = report.abandoned,
        "selftest finished"
    );

    let stats = result.map_err(|err| core_error("exchange", err))?;
    closed.map_err(|err| core_error("disconnect", err))?;
    Ok(stats)
}

fn recording_callbacks(log: &EventLog) -> Callbacks {
    let record = |log: &EventLog| {
        let log = Arc::clone(log);
        move |event: &'static str, subject: String, detail: Option<String>| {
            log.lock().push(Event {
                event,
                subject,
                detail,
            });
        }
    };
    let driver_loaded = record(log);
    let driver_load_failed = record(log);
    let connected = record(log);
    let connect_failed = record(log);
    let disconnected = record(log);
    let disconnect_failed = record(log);

    Callbacks::new()
        .on_driver_load_success(move |driver| {
            driver_loaded("driver-loaded", driver.protocol_code().to_string(), None)
        })
        .on_driver_load_failure(move |code, err| {
            driver_load_failed("driver-load-failed", code.to_string(), Some(err.to_string()))
        })
        .on_connect_success(move |conn| {
            connected("connected", conn.connection_string().to_string(), Some(conn.handle().to_string()))
        })
        .on_connect_failure(move |cs, err| {
            connect_failed("connect-failed", cs.to_string(), Some(err.to_string()))
        })
        .on_disconnect_success(move |conn| {
            disconnected("disconnected", conn.connection_string().to_string(), Some(conn.handle().to_string()))
        })
        .on_disconnect_failure(move |conn, err| {
            disconnect_failed("disconnect-failed", conn.connection_string().to_string(), Some(err.to_string()))
        })
}

fn print(out: &SelftestOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut t = table(vec!["EVENT", "SUBJECT", "DETAIL"]);
            for e in &out.events {
                t.add_row(vec![
                    e.event.to_string(),
                    e.subject.clone(),
                    e.detail.clone().unwrap_or_default(),
                ]);
            }
            println!("{t}");
            if out.connected {
                println!(
                    "read={} write={} sent={}B received={}B last=[{}]",
                    out.read_items, out.write_items, out.bytes_sent, out.bytes_received, out.last_frame
                );
            }
        }
        OutputFormat::Pretty => {
            for e in &out.events {
                match &e.detail {
                    Some(detail) => println!("{} {} ({detail})", e.event, e.subject),
                    None => println!("{} {}", e.event, e.subject),
                }
            }
            if out.connected {
                println!(
                    "read_items={} write_items={} bytes_sent={} bytes_received={}",
                    out.read_items, out.write_items, out.bytes_sent, out.bytes_received
                );
            }
        }
    }
}
