use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use stdaq_serial::config::{Config, ConfigLoader};
use stdaq_serial::host::{narrow, widen};
use stdaq_serial::port::{list_ports, SystemPortOpener};
use stdaq_serial::session::SerialSession;
use stdaq_serial::{logging, AppError, AppResult, READ_BUFFER_CAPACITY};
use tracing::debug;

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "stdaq",
    version,
    about = "Exchange raw bytes with the stDAQ board over a serial port.",
    long_about = "Opens the device at 9600 baud 8N1 with a 1 ms timeout, performs the requested single-shot reads or writes, and closes it again. Byte values are given and printed as integers; values outside 0-255 are truncated to their low 8 bits."
)]
struct Args {
    /// Configuration file (defaults to the standard search path).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Serial device or alias, e.g. COM9 or /dev/ttyACM0.
    #[arg(short, long, global = true)]
    device: Option<String>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List serial devices visible to the OS.
    Ports,
    /// Write bytes in a single call.
    Write {
        #[arg(required = true, allow_negative_numbers = true)]
        bytes: Vec<i32>,
    },
    /// Read whatever arrives, one timeout-bounded call per attempt.
    Read {
        /// Stop once this many bytes have arrived.
        #[arg(short, long, default_value_t = READ_BUFFER_CAPACITY)]
        max: usize,
        /// Number of read calls to issue at most.
        #[arg(short, long, default_value_t = 1)]
        attempts: u32,
    },
    /// Write bytes, then read the reply.
    Transact {
        #[arg(required = true, allow_negative_numbers = true)]
        bytes: Vec<i32>,
        #[arg(short, long, default_value_t = READ_BUFFER_CAPACITY)]
        max: usize,
        #[arg(short, long, default_value_t = 100)]
        attempts: u32,
    },
}

#[derive(Serialize)]
struct WriteOutput {
    written: usize,
}

#[derive(Serialize)]
struct ReadOutput {
    received: usize,
    bytes: Vec<i32>,
}

impl ReadOutput {
    fn new(received: &[u8]) -> Self {
        Self {
            received: received.len(),
            bytes: widen(received),
        }
    }
}

#[derive(Serialize)]
struct TransactOutput {
    written: usize,
    #[serde(flatten)]
    read: ReadOutput,
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}

fn run(args: Args) -> AppResult<()> {
    let Args {
        config: config_path,
        device,
        json,
        command,
    } = args;

    let config = match config_path {
        Some(path) => ConfigLoader::load_from(path)?.into_config(),
        None => ConfigLoader::load()?.into_config(),
    };
    logging::init_logging(&config.logging)?;

    match command {
        Command::Ports => {
            let ports = list_ports()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&ports)?);
            } else if ports.is_empty() {
                println!("No serial devices found.");
            } else {
                for port in ports {
                    match port.product {
                        Some(product) => println!("{}\t{}\t{}", port.name, port.port_type, product),
                        None => println!("{}\t{}", port.name, port.port_type),
                    }
                }
            }
        }
        Command::Write { bytes } => {
            let mut session = open_session(&config, device.as_deref())?;
            let written = session.write(&narrow(&bytes))?;
            session.close();
            print_write(json, written)?;
        }
        Command::Read { max, attempts } => {
            let mut session = open_session(&config, device.as_deref())?;
            let received = read_up_to(&mut session, max, attempts)?;
            session.close();
            print_read(json, &received)?;
        }
        Command::Transact {
            bytes,
            max,
            attempts,
        } => {
            let mut session = open_session(&config, device.as_deref())?;
            let written = session.write(&narrow(&bytes))?;
            let received = read_up_to(&mut session, max, attempts)?;
            session.close();
            if json {
                let output = TransactOutput {
                    written,
                    read: ReadOutput::new(&received),
                };
                println!("{}", serde_json::to_string(&output)?);
            } else {
                print_write(false, written)?;
                print_read(false, &received)?;
            }
        }
    }

    Ok(())
}

fn open_session(config: &Config, device: Option<&str>) -> AppResult<SerialSession> {
    let device = config
        .serial
        .select_device(device)
        .ok_or(AppError::NoDevice)?;

    let mut session =
        SerialSession::new(SystemPortOpener).with_policy(config.serial.reopen_policy);
    session.open(&device)?;
    Ok(session)
}

/// Issue up to `attempts` single reads until `max` bytes have arrived.
fn read_up_to(session: &mut SerialSession, max: usize, attempts: u32) -> AppResult<Vec<u8>> {
    let mut received = Vec::with_capacity(max);
    let mut buffer = [0u8; READ_BUFFER_CAPACITY];

    for attempt in 0..attempts {
        let remaining = max - received.len();
        if remaining == 0 {
            break;
        }
        let cap = remaining.min(READ_BUFFER_CAPACITY);
        let n = session.read(&mut buffer[..cap])?;
        debug!(attempt, received = n, "read attempt");
        received.extend_from_slice(&buffer[..n]);
    }

    Ok(received)
}

fn print_write(json: bool, written: usize) -> AppResult<()> {
    if json {
        println!("{}", serde_json::to_string(&WriteOutput { written })?);
    } else {
        println!("wrote {written} byte(s)");
    }
    Ok(())
}

fn print_read(json: bool, received: &[u8]) -> AppResult<()> {
    let output = ReadOutput::new(received);
    if json {
        println!("{}", serde_json::to_string(&output)?);
    } else {
        let values: Vec<String> = output.bytes.iter().map(i32::to_string).collect();
        println!("received {} byte(s): [{}]", output.received, values.join(", "));
    }
    Ok(())
}
