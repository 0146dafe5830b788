use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use onewol::config::{self, Config};
use onewol::dispatch;
use onewol::error::{StoreError, WakeError};
use onewol::iface;
use onewol::store::{self, AddressBook, JsonFileStore};

#[derive(Parser)]
#[command(version, about = "Wake registered devices on the local network")]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: String,

    /// Address book file, overrides the configured one
    #[arg(long, env = "ONEWOL_DATA")]
    data: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Broadcast a magic packet for a stored device name or a MAC address
    Wake { device: String },
    /// Show the interfaces packets would be sent from
    Network,
    /// List registered devices
    List,
    /// Register a device
    Add {
        mac: String,
        #[arg(short, long, default_value = "")]
        name: String,
    },
    /// Unregister a device
    Remove { mac: String },
    /// Change the name of a registered device
    Rename { mac: String, name: String },
}

/// Validation problems exit with 2, everything else with 1.
fn exit_code(err: &anyhow::Error) -> ExitCode {
    let client = err.downcast_ref::<WakeError>().is_some_and(WakeError::is_client_error)
        || err.downcast_ref::<StoreError>().is_some_and(StoreError::is_client_error);
    if client { ExitCode::from(2) } else { ExitCode::FAILURE }
}

fn init_logging(cli: &Cli, cfg: &Config) -> Result<()> {
    let level = match cli.verbose {
        0 => cfg.log_level(),
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    SimpleLogger::new()
        .with_level(level)
        .env()
        .init()
        .context("failed to install logger")
}

async fn wake(book: &dyn AddressBook, device: &str) -> Result<()> {
    let mac = match store::find_device(book, device)? {
        Some(d) => {
            log::debug!("resolved '{}' to {}", device, d.mac);
            d.mac
        }
        None => device.to_string(),
    };

    let report = dispatch::send_wake(&mac).await?;
    for target in &report.targets {
        println!("sent via {target}");
    }
    Ok(())
}

fn network() {
    let summary = iface::network_summary(&iface::survey_interfaces());
    if summary.is_empty() {
        log::warn!("no eligible IPv4 interfaces");
    }
    for net in summary {
        println!("{:<16} {:<15} {:<15} {}", net.name, net.address, net.netmask, net.cidr);
    }
}

fn list(book: &dyn AddressBook) -> Result<()> {
    for device in book.load()? {
        println!("{:<17} {}", device.mac, device.name);
    }
    Ok(())
}

async fn run(cli: Cli, cfg: Config) -> Result<()> {
    let store_path: PathBuf = match &cli.data {
        Some(path) => config::expand_path(path)?,
        None => cfg.store_path()?,
    };
    log::trace!("address book at {}", store_path.display());
    let book = JsonFileStore::new(store_path);

    match cli.cmd {
        Cmd::Wake { device } => wake(&book, &device).await?,
        Cmd::Network => network(),
        Cmd::List => list(&book)?,
        Cmd::Add { mac, name } => {
            store::add_device(&book, &mac, &name)?;
            log::info!("added {}", mac);
        }
        Cmd::Remove { mac } => {
            let removed = store::remove_device(&book, &mac)?;
            log::info!("removed {} {}", removed.mac, removed.name);
        }
        Cmd::Rename { mac, name } => {
            store::rename_device(&book, &mac, &name)?;
            log::info!("renamed {} to '{}'", mac, name);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let cfg = match config::expand_path(&cli.config).and_then(|p| Config::load(&p)) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e:#}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = init_logging(&cli, &cfg) {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }

    match run(cli, cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            exit_code(&e)
        }
    }
}
