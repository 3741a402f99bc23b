//! CSV dataset loading
//!
//! Reads the exported floor spreadsheet: one file mapping codes to bins
//! and LED segments, and an optional second file mapping sales order IDs
//! to codes. Validation of the values happens in `BinMap::build`; this
//! module only gets well-typed rows out of the files.

use std::path::Path;

use anyhow::{Context, Result};
use tipout_core::{BinRow, OrderRow};

/// Load the bin mapping rows (columns: code, bin_id, led_indices, color)
pub fn load_bins(path: &Path) -> Result<Vec<BinRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open bin mapping: {:?}", path))?;

    let mut rows = Vec::new();
    for (record_no, record) in reader.deserialize::<BinRow>().enumerate() {
        // +2: 1-based, after the header row
        let row = record
            .with_context(|| format!("{:?}: bad bin record on line {}", path, record_no + 2))?;
        rows.push(row);
    }

    log::info!("Loaded {} bin rows from {:?}", rows.len(), path);
    Ok(rows)
}

/// Load the sales order rows (columns: sales_order_id, code)
pub fn load_orders(path: &Path) -> Result<Vec<OrderRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open sales order mapping: {:?}", path))?;

    let mut rows = Vec::new();
    for (record_no, record) in reader.deserialize::<OrderRow>().enumerate() {
        let row = record
            .with_context(|| format!("{:?}: bad order record on line {}", path, record_no + 2))?;
        rows.push(row);
    }

    log::info!("Loaded {} sales order rows from {:?}", rows.len(), path);
    Ok(rows)
}
