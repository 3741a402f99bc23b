//! Illumination state machine
//!
//! Tracks which bin is currently lit and turns every transition into a
//! `PixelDiff` - the set of pixels to switch off and the set to switch on.
//! Single-bin exclusivity: activating a new bin deactivates the previous
//! one, with indices shared by both bins recolored rather than blinked.

use std::time::{Duration, Instant};

use rgb::RGB8;

use crate::types::BinEntry;

/// A render request: pixels to turn off and pixels to set
///
/// Produced by state transitions, consumed by the render loop. Diffs merge
/// so that rapid successive transitions coalesce into their net effect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PixelDiff {
    /// Indices to set to black
    pub off: Vec<u16>,
    /// Indices to set, with their color
    pub on: Vec<(u16, RGB8)>,
}

impl PixelDiff {
    pub fn is_empty(&self) -> bool {
        self.off.is_empty() && self.on.is_empty()
    }

    /// Fold a later diff into this one; the later write wins per index
    pub fn merge(&mut self, newer: PixelDiff) {
        for index in newer.off {
            self.on.retain(|&(i, _)| i != index);
            if !self.off.contains(&index) {
                self.off.push(index);
            }
        }
        for (index, color) in newer.on {
            self.off.retain(|&i| i != index);
            match self.on.iter_mut().find(|(i, _)| *i == index) {
                Some(slot) => slot.1 = color,
                None => self.on.push((index, color)),
            }
        }
    }
}

/// Compute the pixel changes needed to go from one lit bin to another
///
/// Indices the previous bin used that the next bin reuses are not turned
/// off; they only appear in the `on` set with the new color.
pub fn diff(prev: Option<&BinEntry>, next: Option<&BinEntry>) -> PixelDiff {
    let mut result = PixelDiff::default();
    if let Some(prev) = prev {
        for &index in &prev.led_indices {
            let reused = next.is_some_and(|n| n.led_indices.contains(&index));
            if !reused {
                result.off.push(index);
            }
        }
    }
    if let Some(next) = next {
        for &index in &next.led_indices {
            result.on.push((index, next.color));
        }
    }
    result
}

/// The currently-lit bin, if any
///
/// Created empty (`Idle`) at startup; mutated only through `activate` and
/// `clear`. The runtime guards access with a mutex; this type itself is
/// synchronization-free.
#[derive(Debug)]
pub struct IllumState {
    active: Option<BinEntry>,
    last_change: Instant,
}

impl IllumState {
    pub fn new() -> Self {
        Self {
            active: None,
            last_change: Instant::now(),
        }
    }

    pub fn active(&self) -> Option<&BinEntry> {
        self.active.as_ref()
    }

    /// When the last transition (activate or clear) happened
    pub fn last_change(&self) -> Instant {
        self.last_change
    }

    /// Light a bin, deactivating the previous one
    ///
    /// Re-activating the bin that is already lit returns an empty diff but
    /// still refreshes the auto-clear timer, so rescanning keeps a bin lit.
    pub fn activate(&mut self, bin: BinEntry) -> PixelDiff {
        self.last_change = Instant::now();
        if self.active.as_ref() == Some(&bin) {
            return PixelDiff::default();
        }
        let result = diff(self.active.as_ref(), Some(&bin));
        self.active = Some(bin);
        result
    }

    /// Turn everything off
    pub fn clear(&mut self) -> PixelDiff {
        let result = diff(self.active.as_ref(), None);
        self.active = None;
        self.last_change = Instant::now();
        result
    }

    /// True if a bin is lit and has been for at least `timeout`
    pub fn expired(&self, timeout: Duration) -> bool {
        self.active.is_some() && self.last_change.elapsed() >= timeout
    }
}

impl Default for IllumState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREEN: RGB8 = RGB8 { r: 0, g: 255, b: 0 };
    const RED: RGB8 = RGB8 { r: 255, g: 0, b: 0 };

    fn bin(id: &str, indices: &[u16], color: RGB8) -> BinEntry {
        BinEntry {
            bin_id: id.to_string(),
            led_indices: indices.to_vec(),
            color,
        }
    }

    #[test]
    fn test_idle_to_active() {
        let mut state = IllumState::new();
        let d = state.activate(bin("D3", &[10, 11, 12], GREEN));
        assert!(d.off.is_empty());
        assert_eq!(d.on, vec![(10, GREEN), (11, GREEN), (12, GREEN)]);
        assert_eq!(state.active().unwrap().bin_id, "D3");
    }

    #[test]
    fn test_activate_is_idempotent() {
        let mut state = IllumState::new();
        let b = bin("D3", &[10, 11, 12], GREEN);
        let first = state.activate(b.clone());
        assert!(!first.is_empty());
        let second = state.activate(b);
        assert!(second.is_empty());
    }

    #[test]
    fn test_exclusivity_on_switch() {
        let mut state = IllumState::new();
        state.activate(bin("A1", &[0, 1, 2], RED));
        let d = state.activate(bin("D3", &[10, 11, 12], GREEN));

        assert_eq!(d.off, vec![0, 1, 2]);
        assert_eq!(d.on, vec![(10, GREEN), (11, GREEN), (12, GREEN)]);
        // No index may be both switched off and switched on
        assert!(d.off.iter().all(|i| d.on.iter().all(|(j, _)| j != i)));
    }

    #[test]
    fn test_shared_indices_are_recolored_not_blinked() {
        let mut state = IllumState::new();
        state.activate(bin("A1", &[5, 6], RED));
        let d = state.activate(bin("A2", &[6, 7], GREEN));

        assert_eq!(d.off, vec![5]);
        assert_eq!(d.on, vec![(6, GREEN), (7, GREEN)]);
    }

    #[test]
    fn test_clear() {
        let mut state = IllumState::new();
        state.activate(bin("D3", &[10, 11], GREEN));
        let d = state.clear();
        assert_eq!(d.off, vec![10, 11]);
        assert!(d.on.is_empty());
        assert!(state.active().is_none());

        // Clearing when idle is a no-op
        assert!(state.clear().is_empty());
    }

    #[test]
    fn test_expired() {
        let mut state = IllumState::new();
        assert!(!state.expired(Duration::ZERO)); // nothing lit
        state.activate(bin("D3", &[10], GREEN));
        assert!(state.expired(Duration::ZERO));
        assert!(!state.expired(Duration::from_secs(3600)));
    }

    #[test]
    fn test_activate_refreshes_last_change() {
        let mut state = IllumState::new();
        let before = state.last_change();
        std::thread::sleep(Duration::from_millis(2));
        state.activate(bin("D3", &[10], GREEN));
        assert!(state.last_change() > before);

        // Re-activating the same bin still moves the timestamp forward
        let mid = state.last_change();
        std::thread::sleep(Duration::from_millis(2));
        state.activate(bin("D3", &[10], GREEN));
        assert!(state.last_change() > mid);
    }

    #[test]
    fn test_merge_later_write_wins() {
        let mut acc = PixelDiff {
            off: vec![1, 2],
            on: vec![(3, RED)],
        };
        acc.merge(PixelDiff {
            off: vec![3],
            on: vec![(1, GREEN), (4, GREEN)],
        });

        assert_eq!(acc.off, vec![2, 3]);
        assert_eq!(acc.on, vec![(1, GREEN), (4, GREEN)]);
    }

    #[test]
    fn test_merge_coalesces_a_then_b() {
        // Scanning A then B faster than the render cadence must net out to
        // "A off, B on"
        let mut state = IllumState::new();
        let mut acc = PixelDiff::default();
        acc.merge(state.activate(bin("A1", &[0, 1], RED)));
        acc.merge(state.activate(bin("D3", &[10, 11], GREEN)));

        assert_eq!(acc.off, vec![0, 1]);
        assert_eq!(acc.on, vec![(10, GREEN), (11, GREEN)]);
    }
}
