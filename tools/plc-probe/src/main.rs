//! plc-probe - holding register probe for PLCs over Modbus TCP
//!
//! Reads and writes typed values, runs the write/read-back self test, and
//! doubles as an offline calculator for register encodings.

mod logging;
mod selftest;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use plc_codec::{ByteOrder, Number, RegisterFormat};
use plc_link::{LinkConfig, RegisterSession, TcpConnector};
use tracing::debug;

#[derive(Parser)]
#[command(name = "plc-probe")]
#[command(about = "Probe PLC holding registers over Modbus TCP")]
#[command(long_about = "Probe PLC holding registers over Modbus TCP

Formats: i16 u16 i32 u32 f32 i64 u64 f64 (or 'signed word', 'float', 'double', ...)
Byte orders: ABCD (big endian), DCBA (little endian), BADC (byte swap), CDAB (register swap)

Examples:
  plc-probe --host 192.168.0.10 read -a 100 -n 4 -f f32 -o CDAB
  plc-probe --host 192.168.0.10 write -a 100 -f i32 -- -123456789 42
  plc-probe --host 192.168.0.10 selftest
  plc-probe encode -f f64 -o DCBA 25.0")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    link: LinkArgs,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

/// Connection settings; flags override the config file and `PLC_LINK_*` variables
#[derive(Args, Debug, Default)]
struct LinkArgs {
    /// Config file (TOML, YAML or JSON)
    #[arg(short = 'c', long, global = true, env = "PLC_PROBE_CONFIG")]
    config: Option<PathBuf>,

    /// PLC host name or IP address
    #[arg(long, global = true)]
    host: Option<String>,

    /// Modbus TCP port
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Modbus unit id
    #[arg(long, global = true)]
    slave_id: Option<u8>,

    /// Connect attempts before giving up
    #[arg(long, global = true)]
    max_retries: Option<u32>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<f64>,
}

impl LinkArgs {
    fn resolve(&self) -> Result<LinkConfig> {
        let mut config = LinkConfig::load(self.config.as_deref())?;

        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(slave_id) = self.slave_id {
            config.slave_id = slave_id;
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Read values from holding registers
    Read {
        /// First register address
        #[arg(short, long)]
        address: u16,

        /// Number of values (not registers) to read
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,

        /// Value format (default: single word with the configured signedness)
        #[arg(short, long)]
        format: Option<RegisterFormat>,

        /// Byte order
        #[arg(short, long, default_value = "ABCD")]
        order: ByteOrder,
    },

    /// Write values to holding registers
    Write {
        /// First register address
        #[arg(short, long)]
        address: u16,

        /// Value format (default: single word with the configured signedness)
        #[arg(short, long)]
        format: Option<RegisterFormat>,

        /// Byte order
        #[arg(short, long, default_value = "ABCD")]
        order: ByteOrder,

        /// Values to write
        #[arg(required = true, allow_negative_numbers = true)]
        values: Vec<String>,
    },

    /// Write signed word and dword lists, read them back and compare
    Selftest {
        /// Register address both lists are written to
        #[arg(short, long, default_value_t = 0)]
        address: u16,

        /// Byte order
        #[arg(short, long, default_value = "ABCD")]
        order: ByteOrder,
    },

    /// Show the registers values encode to (offline)
    Encode {
        /// Value format
        #[arg(short, long)]
        format: RegisterFormat,

        /// Byte order
        #[arg(short, long, default_value = "ABCD")]
        order: ByteOrder,

        /// Values to encode
        #[arg(required = true, allow_negative_numbers = true)]
        values: Vec<String>,
    },

    /// Show the values registers decode to (offline)
    Decode {
        /// Value format
        #[arg(short, long)]
        format: RegisterFormat,

        /// Byte order
        #[arg(short, long, default_value = "ABCD")]
        order: ByteOrder,

        /// Register words, decimal or 0x-prefixed hex
        #[arg(required = true)]
        registers: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    logging::init(cli.verbose);

    match cli.command {
        Commands::Read {
            address,
            count,
            format,
            order,
        } => {
            let config = cli.link.resolve()?;
            let format = format.unwrap_or_else(|| RegisterFormat::word(config.signed));
            let session = connect(&config)?;

            let values = session.read_values(address, count, format, order)?;
            println!(
                "{} {} x {} ({}) at {}",
                "Read".bright_cyan(),
                values.len(),
                format,
                order.code(),
                address
            );
            let step = format.word_count() as u16;
            for (i, value) in values.iter().enumerate() {
                println!("  {:>5}  {}", address.wrapping_add(i as u16 * step), value);
            }
            session.close();
        },
        Commands::Write {
            address,
            format,
            order,
            values,
        } => {
            let config = cli.link.resolve()?;
            let format = format.unwrap_or_else(|| RegisterFormat::word(config.signed));
            let values = parse_values(&values, format)?;
            let session = connect(&config)?;

            session.write_values(address, &values, format, order)?;
            println!(
                "{} {} x {} ({}) at {}",
                "Wrote".bright_green(),
                values.len(),
                format,
                order.code(),
                address
            );
            session.close();
        },
        Commands::Selftest { address, order } => {
            let config = cli.link.resolve()?;
            let session = connect(&config)?;

            let report = selftest::run(&session, address, order)?;
            session.close();

            for case in &report.cases {
                let status = if case.passed() {
                    "ok".bright_green()
                } else {
                    "FAILED".bright_red()
                };
                println!("test {} {}", case.format, status);
                if !case.passed() {
                    println!("  wrote {}", join(&case.written));
                    println!("  read  {}", join(&case.read));
                }
            }
            if let Some(value) = report.float_probe {
                println!(
                    "float at {}: {}",
                    address.saturating_add(selftest::FLOAT_OFFSET),
                    value
                );
            }
            if !report.passed() {
                bail!("self test failed against {}", session.endpoint());
            }
        },
        Commands::Encode {
            format,
            order,
            values,
        } => {
            let values = parse_values(&values, format)?;
            let registers = plc_codec::encode(&values, format, order)?;
            for chunk in registers.chunks(format.word_count()) {
                let words: Vec<String> = chunk.iter().map(|r| format!("{r:#06x}")).collect();
                println!("{}", words.join(" "));
            }
        },
        Commands::Decode {
            format,
            order,
            registers,
        } => {
            let registers = registers
                .iter()
                .map(|text| parse_register(text))
                .collect::<Result<Vec<u16>>>()?;
            for value in plc_codec::decode(&registers, format, order)? {
                println!("{value}");
            }
        },
    }

    Ok(())
}

fn connect(config: &LinkConfig) -> Result<RegisterSession<TcpConnector>> {
    let session = RegisterSession::tcp(config)?;
    debug!("Connecting to {}", session.endpoint());
    if !session.connect() {
        bail!(
            "could not connect to {} after {} attempts, make sure a Modbus TCP slave is listening",
            session.endpoint(),
            config.max_retries
        );
    }
    Ok(session)
}

fn parse_values(texts: &[String], format: RegisterFormat) -> Result<Vec<Number>> {
    texts
        .iter()
        .map(|text| Ok(format.parse_value(text)?))
        .collect()
}

fn parse_register(text: &str) -> Result<u16> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => text.parse::<u16>(),
    };
    parsed.with_context(|| format!("invalid register word '{text}'"))
}

fn join(values: &[Number]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
