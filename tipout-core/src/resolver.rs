//! Scan classification and lookup
//!
//! Turns a raw scanner line into a `Resolution`. The dispatch is a fixed
//! three-way decision, not a general parser: the exit sentinel, the SKU
//! shape, and the purely-numeric sales-order shape. Anything else falls
//! through to `Unrecognized`.

use crate::binmap::BinMap;
use crate::types::Resolution;

/// Typing or scanning this word (any case) requests shutdown
const EXIT_SENTINEL: &str = "exit";

/// Resolves scanned text to bins via the owned, read-only `BinMap`
pub struct Resolver {
    map: BinMap,
}

impl Resolver {
    pub fn new(map: BinMap) -> Self {
        Self { map }
    }

    pub fn map(&self) -> &BinMap {
        &self.map
    }

    /// Classify a raw line and look it up
    ///
    /// Classification policy:
    /// 1. trim surrounding whitespace; an empty line is `Unrecognized`
    /// 2. case-insensitive match against the exit sentinel
    /// 3. SKU shape (alphanumeric with hyphens, not purely numeric)
    ///    -> lookup by code
    /// 4. purely numeric -> lookup by sales order ID
    /// 5. any other shape, or a lookup miss -> `Unrecognized`
    pub fn resolve(&self, raw_text: &str) -> Resolution {
        let text = raw_text.trim();
        if text.is_empty() {
            return Resolution::Unrecognized(String::new());
        }
        if text.eq_ignore_ascii_case(EXIT_SENTINEL) {
            return Resolution::ExitRequested;
        }

        if is_sku_shape(text) {
            match self.map.lookup_by_code(text) {
                Some(entry) => Resolution::Matched(entry.clone()),
                None => Resolution::Unrecognized(text.to_string()),
            }
        } else if is_numeric(text) {
            match self.map.lookup_by_sales_order(text) {
                Some(entry) => Resolution::Matched(entry.clone()),
                None => Resolution::Unrecognized(text.to_string()),
            }
        } else {
            Resolution::Unrecognized(text.to_string())
        }
    }
}

fn is_numeric(text: &str) -> bool {
    text.chars().all(|c| c.is_ascii_digit())
}

/// SKU codes are ASCII alphanumerics with embedded hyphens and at least
/// one non-digit character (a purely numeric string is a sales order)
fn is_sku_shape(text: &str) -> bool {
    !is_numeric(text) && text.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}
