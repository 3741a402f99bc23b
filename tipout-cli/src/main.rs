//! Tipout Bin Indicator CLI
//!
//! This is the scan station binary. It uses the tipout-core library and
//! adds:
//! - CSV dataset loading (bin mapping + sales order indirection)
//! - TOML configuration
//! - The WS2812-over-SPI hardware strip
//! - Process wiring: render thread, stdin input loop, shutdown

use std::io;
use std::path::PathBuf;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use tipout_core::{input_loop, render_loop, BinMap, MemoryStrip, Resolver, ScanOutcome, SharedIllum};

mod config;
mod dataset;
mod hardware;

/// Tipout bin indicator - light bin locations from barcode scans
#[derive(Parser, Debug)]
#[command(name = "tipout-cli")]
#[command(about = "Light warehouse bin locations from barcode scans", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Bin mapping CSV (overrides the config file)
    #[arg(long, value_name = "FILE")]
    bins: Option<PathBuf>,

    /// Sales order CSV (overrides the config file)
    #[arg(long, value_name = "FILE")]
    orders: Option<PathBuf>,

    /// Run without hardware, rendering to an in-memory strip
    #[arg(long)]
    dry_run: bool,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    log::info!("Tipout bin indicator v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using core library v{}", tipout_core::VERSION);

    let config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => config::AppConfig::default(),
    };

    let bins_path = args
        .bins
        .clone()
        .or_else(|| config.data.bins.clone())
        .context("no bin mapping CSV specified (use --bins or [data] bins in the config)")?;
    let orders_path = args.orders.clone().or_else(|| config.data.orders.clone());

    let bin_rows = dataset::load_bins(&bins_path)?;
    let order_rows = match &orders_path {
        Some(path) => dataset::load_orders(path)?,
        None => Vec::new(),
    };

    let map = BinMap::build(&bin_rows, &order_rows, config.strip.led_count)
        .context("invalid bin mapping, refusing to start")?;
    let stats = map.stats();
    println!("═══════════════════════════════════════════════");
    println!("  Tipout Bin Indicator");
    println!("═══════════════════════════════════════════════");
    println!("  Bins:         {}", stats.num_bins);
    println!("  Sales orders: {}", stats.num_orders);
    println!("  Strip length: {} LEDs", map.strip_len());
    println!();

    let resolver = Resolver::new(map);
    let shared = SharedIllum::new();
    let opts = config.behavior.render_options();

    let render_shared = shared.clone();
    let render: thread::JoinHandle<()> = if args.dry_run {
        log::info!("Dry run: rendering to an in-memory strip");
        let strip = MemoryStrip::new(config.strip.led_count);
        thread::spawn(move || {
            render_loop(strip, &render_shared, &opts);
        })
    } else {
        let strip =
            hardware::SpiStrip::open(&config.strip).context("failed to open the LED strip")?;
        thread::spawn(move || {
            render_loop(strip, &render_shared, &opts);
        })
    };

    println!("Ready. Scan a code, or type 'exit' to quit.");
    let stdin = io::stdin();
    input_loop(stdin.lock(), &resolver, &shared, |outcome| match outcome {
        ScanOutcome::Lit { bin_id, event } => {
            println!(
                "✓ [{}] {} → bin {} lit",
                event.timestamp.format("%H:%M:%S"),
                event.raw_text.trim(),
                bin_id
            );
        }
        ScanOutcome::NoMatch { event } => {
            println!("✗ no match for {:?}", event.raw_text.trim());
        }
        ScanOutcome::Exit => {
            println!("Exit requested, shutting down...");
        }
    });

    render
        .join()
        .map_err(|_| anyhow::anyhow!("render thread panicked"))?;
    println!("Goodbye.");
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
