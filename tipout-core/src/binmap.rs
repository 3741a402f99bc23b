//! Bin lookup table
//!
//! Combines the bin mapping rows and the sales-order indirection rows from
//! the floor dataset into a single queryable map. Built once at startup and
//! read-only for the lifetime of the process; every invariant (non-empty
//! index lists, indices within strip bounds, no duplicates, no dangling
//! order references) is checked here so the rest of the system never has
//! to re-validate.

use std::collections::HashMap;

use serde::Deserialize;

use crate::types::{color_from_name, BinEntry, MapError, Result};

/// One row of the bin mapping table, as it appears in the dataset
///
/// `led_indices` is a single column holding a comma- or space-separated
/// list of positions (e.g. "10,11,12").
#[derive(Debug, Clone, Deserialize)]
pub struct BinRow {
    pub code: String,
    pub bin_id: String,
    pub led_indices: String,
    pub color: String,
}

/// One row of the sales-order indirection table
#[derive(Debug, Clone, Deserialize)]
pub struct OrderRow {
    pub sales_order_id: String,
    pub code: String,
}

/// Summary counts for a built map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinMapStats {
    pub num_bins: usize,
    pub num_orders: usize,
}

/// The lookup table: code -> bin entry, plus sales order -> code
#[derive(Debug)]
pub struct BinMap {
    /// Keyed by normalized (trimmed, uppercased) code
    bins: HashMap<String, BinEntry>,
    /// Sales order ID -> normalized code
    orders: HashMap<String, String>,
    strip_len: u16,
}

/// Codes compare case-insensitively; scanners vary in what they emit.
fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

impl BinMap {
    /// Build and validate the map from dataset rows
    ///
    /// Fails with a `MapError` on any malformed row; the caller is expected
    /// to abort startup rather than run with a partial map.
    pub fn build(bins: &[BinRow], orders: &[OrderRow], strip_len: u16) -> Result<Self> {
        let mut bin_table = HashMap::with_capacity(bins.len());

        for (row_no, row) in bins.iter().enumerate() {
            let code = normalize_code(&row.code);
            if code.is_empty() {
                return Err(MapError::MissingField {
                    row: row_no + 1,
                    field: "code".to_string(),
                });
            }

            let led_indices = parse_indices(&code, &row.led_indices)?;
            if led_indices.is_empty() {
                return Err(MapError::EmptyIndices(code));
            }
            for &index in &led_indices {
                if index >= strip_len {
                    return Err(MapError::IndexOutOfRange {
                        code,
                        index,
                        strip_len,
                    });
                }
            }

            let color = color_from_name(&row.color).ok_or_else(|| MapError::UnknownColor {
                code: code.clone(),
                color: row.color.clone(),
            })?;

            let entry = BinEntry {
                bin_id: row.bin_id.trim().to_string(),
                led_indices,
                color,
            };
            if bin_table.insert(code.clone(), entry).is_some() {
                return Err(MapError::DuplicateCode(code));
            }
        }

        let mut order_table = HashMap::with_capacity(orders.len());
        for row in orders {
            let order_id = row.sales_order_id.trim().to_string();
            let code = normalize_code(&row.code);
            if order_id.is_empty() {
                continue; // blank trailing rows are common in exported sheets
            }
            if !bin_table.contains_key(&code) {
                return Err(MapError::DanglingOrder {
                    order: order_id,
                    code,
                });
            }
            if order_table.insert(order_id.clone(), code).is_some() {
                return Err(MapError::DuplicateOrder(order_id));
            }
        }

        log::info!(
            "Bin map built: {} bins, {} sales orders, strip length {}",
            bin_table.len(),
            order_table.len(),
            strip_len
        );

        Ok(Self {
            bins: bin_table,
            orders: order_table,
            strip_len,
        })
    }

    /// Look up a bin by SKU code (case-insensitive)
    pub fn lookup_by_code(&self, code: &str) -> Option<&BinEntry> {
        self.bins.get(&normalize_code(code))
    }

    /// Look up a bin by sales order ID, resolving order -> code -> bin
    ///
    /// A miss at either step is `None`, never an error; unknown scans are
    /// an expected, frequent outcome.
    pub fn lookup_by_sales_order(&self, order_id: &str) -> Option<&BinEntry> {
        let code = self.orders.get(order_id.trim())?;
        self.bins.get(code)
    }

    /// Iterate over all bin entries (used by validation tooling and tests)
    pub fn entries(&self) -> impl Iterator<Item = &BinEntry> {
        self.bins.values()
    }

    pub fn stats(&self) -> BinMapStats {
        BinMapStats {
            num_bins: self.bins.len(),
            num_orders: self.orders.len(),
        }
    }

    pub fn strip_len(&self) -> u16 {
        self.strip_len
    }
}

/// Parse the LED index column ("10,11,12" or "10 11 12") preserving order
fn parse_indices(code: &str, raw: &str) -> Result<Vec<u16>> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u16>().map_err(|_| MapError::InvalidIndex {
                code: code.to_string(),
                value: part.to_string(),
            })
        })
        .collect()
}
