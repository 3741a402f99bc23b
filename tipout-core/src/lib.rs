//! Tipout Bin Indicator Library
//!
//! Maps scanned codes (SKU codes or Sales Order IDs) to physical bin
//! locations and drives the matching segment of an addressable LED strip.
//!
//! # Architecture
//!
//! This library is intentionally minimal and hardware-free:
//! - Builds and validates the code -> bin -> LED lookup table
//! - Classifies scanner lines (SKU / sales order / exit sentinel)
//! - Tracks which bin is lit and emits pixel diffs on every transition
//! - Runs the concurrent input and render loops over an `LedStrip` trait
//!
//! The library does NOT:
//! - Read spreadsheets or CSV files
//! - Talk to GPIO/SPI hardware
//! - Parse command lines or configuration files
//!
//! All of that is in the application layer (tipout-cli), which supplies
//! the dataset rows, the configuration and a concrete strip.
//!
//! # Example Usage
//!
//! ```no_run
//! use tipout_core::{
//!     binmap::BinMap, resolver::Resolver, runtime, strip::MemoryStrip,
//! };
//!
//! let map = BinMap::build(&[], &[], 55).unwrap();
//! let resolver = Resolver::new(map);
//! let shared = runtime::SharedIllum::new();
//! let opts = runtime::RenderOptions::default();
//!
//! let render_shared = shared.clone();
//! let render = std::thread::spawn(move || {
//!     runtime::render_loop(MemoryStrip::new(55), &render_shared, &opts)
//! });
//!
//! let stdin = std::io::stdin();
//! runtime::input_loop(stdin.lock(), &resolver, &shared, |outcome| {
//!     println!("{:?}", outcome);
//! });
//! render.join().unwrap();
//! ```

// Public modules
pub mod binmap;
pub mod resolver;
pub mod runtime;
pub mod state;
pub mod strip;
pub mod types;

// Re-export main types for convenience
pub use binmap::{BinMap, BinMapStats, BinRow, OrderRow};
pub use resolver::Resolver;
pub use runtime::{
    input_loop, render_loop, PulseOptions, RenderOptions, ScanOutcome, SharedIllum,
};
pub use state::{IllumState, PixelDiff};
pub use strip::{LedStrip, MemoryStrip, StripError};
pub use types::{BinEntry, MapError, Resolution, Result, ScanEvent, Timestamp};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
