//! Gabarito station binary.
//!
//! # Usage
//!
//! ```bash
//! # Registry in a file, console on stdin/stdout, devices from a feed
//! gabarito-station --store gabarito.bin --bench-feed feed.txt
//!
//! # Emulated 32 KiB EEPROM, single reader, long-kit deadline
//! gabarito-station --store-kind eeprom --store eeprom.bin --single-reader --timeout-secs 60
//! ```

use std::{path::PathBuf, time::Duration};

use clap::{Parser, ValueEnum};
use gabarito_core::{KioskConfig, ReaderId};
use gabarito_station::{
    EepromStorage, FileStorage, ImageFileByteStore, MemoryStorage, Station, StationConfig, Storage,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Where the registry image lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StoreKind {
    /// One image file, replaced atomically.
    File,
    /// Fixed-size byte medium emulating an EEPROM.
    Eeprom,
    /// Nothing survives the process.
    Memory,
}

/// Gabarito kit-verification station
#[derive(Parser, Debug)]
#[command(name = "gabarito-station")]
#[command(about = "Kit-verification kiosk station")]
#[command(version)]
struct Args {
    /// Registry image path
    #[arg(short, long, default_value = "gabarito.bin")]
    store: PathBuf,

    /// Storage backend
    #[arg(long, value_enum, default_value = "file")]
    store_kind: StoreKind,

    /// Medium size in bytes for the EEPROM backend
    #[arg(long, default_value = "32768")]
    capacity: usize,

    /// Maximum number of templates
    #[arg(long, default_value = "100")]
    max_templates: usize,

    /// Seconds allowed to present every piece of a kit
    #[arg(long, default_value = "20")]
    timeout_secs: u64,

    /// Read templates and pieces on the same reader
    #[arg(long)]
    single_reader: bool,

    /// Bench feed file or FIFO with simulated device input
    #[arg(long)]
    bench_feed: Option<PathBuf>,

    /// Device polling interval in milliseconds
    #[arg(long, default_value = "10")]
    tick_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    tracing::info!("Gabarito station starting");

    let config = StationConfig {
        kiosk: KioskConfig {
            verification_timeout: Duration::from_secs(args.timeout_secs),
            max_templates: args.max_templates,
            piece_reader: if args.single_reader { ReaderId::Primary } else { ReaderId::Secondary },
            ..KioskConfig::default()
        },
        tick: Duration::from_millis(args.tick_ms),
        feed: args.bench_feed,
    };

    match args.store_kind {
        StoreKind::File => {
            tracing::info!(path = %args.store.display(), "file storage");
            serve(config, FileStorage::new(args.store)).await?;
        },
        StoreKind::Eeprom => {
            tracing::info!(path = %args.store.display(), capacity = args.capacity, "EEPROM storage");
            let medium = ImageFileByteStore::open(args.store, args.capacity)?;
            serve(config, EepromStorage::new(medium)).await?;
        },
        StoreKind::Memory => {
            tracing::warn!("memory storage: registry is lost on exit");
            serve(config, MemoryStorage::new()).await?;
        },
    }

    Ok(())
}

async fn serve<S: Storage>(
    config: StationConfig,
    storage: S,
) -> Result<(), gabarito_station::StationError> {
    Station::boot(config, storage)?.run().await
}
