//! Portcullis host binary.
//!
//! # Usage
//!
//! ```bash
//! # Interactive: type keys on stdin, one or more per line
//! portcullis-host
//!
//! # Scripted: provision 12345, open the door, then stop
//! portcullis-host --keys "12345 12345 + 12345"
//!
//! # Fast clock for demos
//! portcullis-host --keys "12345 12345 + 12345" --tick-period-us 1000 --no-holds
//! ```

use std::time::Duration;

use clap::{Parser, ValueEnum};
use portcullis_core::{ApplianceConfig, CommitPolicy};
use portcullis_host::{Appliance, ApplianceRuntimeConfig, ConsolePanel};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Password store commit policy
#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// Overwrite the credential byte by byte
    InPlace,
    /// Write a staging slot, then flip a selector byte
    Staged,
}

impl From<PolicyArg> for CommitPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::InPlace => Self::InPlace,
            PolicyArg::Staged => Self::Staged,
        }
    }
}

/// Portcullis door-lock appliance
#[derive(Parser, Debug)]
#[command(name = "portcullis-host")]
#[command(about = "Run both nodes of the Portcullis door lock on this machine")]
#[command(version)]
struct Args {
    /// Key presses to replay (digits, '+', '-'); stdin is used when absent
    #[arg(short, long)]
    keys: Option<String>,

    /// Timer period in microseconds
    #[arg(long, default_value = "32768")]
    tick_period_us: u64,

    /// How a new password replaces the stored one
    #[arg(long, value_enum, default_value = "staged")]
    commit_policy: PolicyArg,

    /// Stop when the serial link is silent this long (milliseconds)
    #[arg(long)]
    link_timeout_ms: Option<u64>,

    /// Skip display holds and EEPROM settle delays
    #[arg(long)]
    no_holds: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let mut appliance = if args.no_holds {
        ApplianceConfig::without_delays()
    } else {
        ApplianceConfig::default()
    };
    appliance.store.policy = args.commit_policy.into();

    let config = ApplianceRuntimeConfig {
        tick_period: Duration::from_micros(args.tick_period_us),
        link_timeout: args.link_timeout_ms.map(Duration::from_millis),
        appliance,
    };

    let panel = match args.keys.as_deref() {
        Some(script) => ConsolePanel::scripted(script),
        None => ConsolePanel::stdin(),
    };
    let panel = if args.no_holds { panel.without_holds() } else { panel };

    tracing::info!("Portcullis starting");

    tokio::select! {
        result = Appliance::new(config, panel).run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted");
            // Node loops block on the keypad and link and cannot be cancelled.
            std::process::exit(130);
        },
    }

    Ok(())
}
