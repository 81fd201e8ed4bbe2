//! Console listener for a vessel module
//!
//! Loads a module, prints every message it emits and feeds it payloads from
//! the command line.
//!
//! Run with:
//!   cargo run -p vessel-bridge --example console_listener -- \
//!       crates/vessel-echo-guest/target/wasm32-unknown-unknown/release/vessel_echo_guest.wasm \
//!       --send hello --send world

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use vessel_bridge::{Bridge, BridgeConfig, BridgeRuntime};

#[derive(Parser)]
#[command(name = "console_listener")]
#[command(about = "Print everything a vessel module emits", long_about = None)]
struct Args {
    /// Path to the vessel module (.wasm or .wat)
    module: PathBuf,

    /// Bridge configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Payload to send, as UTF-8 text (repeatable)
    #[arg(short, long)]
    send: Vec<String>,

    /// Payload to send, as hex bytes (repeatable)
    #[arg(long)]
    hex: Vec<String>,

    /// Print bridge statistics as JSON on exit
    #[arg(long)]
    stats: bool,

    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let config = match &args.config {
        Some(path) => BridgeConfig::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => BridgeConfig::default(),
    };

    let runtime = BridgeRuntime::new(config)?;
    let mut bridge = Bridge::load(&runtime, &args.module)
        .await
        .with_context(|| format!("loading {}", args.module.display()))?;

    let mut count = 0usize;
    bridge.on_data(move |data| {
        count += 1;
        match std::str::from_utf8(&data) {
            Ok(text) => println!("[{}] {:?}", count, text),
            Err(_) => println!("[{}] {}", count, to_hex(&data)),
        }
    });

    let mut payloads: Vec<Vec<u8>> = args.send.iter().map(|s| s.as_bytes().to_vec()).collect();
    for hex in &args.hex {
        payloads.push(parse_hex(hex).with_context(|| format!("invalid hex payload '{}'", hex))?);
    }

    for payload in &payloads {
        let report = bridge.send(payload)?;
        tracing::info!(
            len = payload.len(),
            time_us = report.execution_time_us,
            fuel = ?report.fuel_consumed,
            "sent"
        );
    }

    while bridge.is_wake_scheduled() {
        bridge.run_pending()?;
    }

    if args.stats {
        println!("{}", serde_json::to_string_pretty(&bridge.stats())?);
    }

    Ok(())
}

fn parse_hex(s: &str) -> Result<Vec<u8>> {
    let digits: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    anyhow::ensure!(digits.is_ascii(), "non-ASCII characters");
    anyhow::ensure!(digits.len() % 2 == 0, "odd number of hex digits");
    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16).map_err(Into::into))
        .collect()
}

fn to_hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect()
}
