//! Input and render loops
//!
//! Two concurrent activities share one synchronized resource:
//!
//! - the input loop blocks on line reads from the scanner, resolves each
//!   line and applies transitions to the shared illumination state
//! - the render loop waits on a change notification (with a tick timeout)
//!   and drives the LED strip
//!
//! The mutex guards only the state and the pending diff; all strip calls
//! happen outside the lock on a diff taken under it. Transitions arriving
//! faster than the render cadence merge into their net effect, so the
//! strip only ever renders the latest state. Shutdown is cooperative: a
//! flag observed by both loops, with the render loop woken through the
//! condvar and the input loop's blocking read ended by closing the source.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::resolver::Resolver;
use crate::state::{IllumState, PixelDiff};
use crate::strip::{apply_diff, scale_color, LedStrip};
use crate::types::{BinEntry, Resolution, ScanEvent};

struct Inner {
    state: IllumState,
    /// Render requests not yet consumed by the render loop
    pending: PixelDiff,
}

/// Handle to the shared illumination state
///
/// Clone freely; all clones refer to the same state. The input loop is the
/// writer, the render loop the reader.
#[derive(Clone)]
pub struct SharedIllum {
    inner: Arc<(Mutex<Inner>, Condvar)>,
    shutdown: Arc<AtomicBool>,
}

impl SharedIllum {
    pub fn new() -> Self {
        Self {
            inner: Arc::new((
                Mutex::new(Inner {
                    state: IllumState::new(),
                    pending: PixelDiff::default(),
                }),
                Condvar::new(),
            )),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    // A poisoned mutex means a panicked loop; the state itself is still
    // consistent (transitions are applied atomically under the lock), so
    // recover the guard rather than cascading the panic.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Light a bin and wake the render loop
    pub fn activate(&self, bin: BinEntry) {
        let mut inner = self.lock();
        let diff = inner.state.activate(bin);
        if !diff.is_empty() {
            inner.pending.merge(diff);
        }
        drop(inner);
        self.inner.1.notify_all();
    }

    /// Turn everything off and wake the render loop
    pub fn clear(&self) {
        let mut inner = self.lock();
        let diff = inner.state.clear();
        if !diff.is_empty() {
            inner.pending.merge(diff);
        }
        drop(inner);
        self.inner.1.notify_all();
    }

    /// Request cooperative shutdown of both loops
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.inner.1.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Snapshot the active bin without holding the lock across strip calls
    pub fn active_snapshot(&self) -> Option<BinEntry> {
        self.lock().state.active().cloned()
    }

    /// Snapshot the active bin together with when it was activated
    ///
    /// The instant feeds the pulse effect, so each (re-)activation starts a
    /// fresh breath cycle from dark.
    pub fn active_since(&self) -> Option<(BinEntry, Instant)> {
        let inner = self.lock();
        let since = inner.state.last_change();
        inner.state.active().cloned().map(|bin| (bin, since))
    }

    /// Clear the active bin if it has outlived `timeout`
    fn tick_auto_clear(&self, timeout: Duration) {
        let mut inner = self.lock();
        if inner.state.expired(timeout) {
            log::debug!("auto-clear timeout elapsed");
            let diff = inner.state.clear();
            inner.pending.merge(diff);
        }
    }

    /// Block until a render request is pending, the tick elapses, or
    /// shutdown is requested; then take whatever is pending
    fn wait_take_pending(&self, tick: Duration) -> PixelDiff {
        let (lock, condvar) = &*self.inner;
        let mut inner = match lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if inner.pending.is_empty() && !self.is_shutdown() {
            inner = match condvar.wait_timeout(inner, tick) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        std::mem::take(&mut inner.pending)
    }
}

impl Default for SharedIllum {
    fn default() -> Self {
        Self::new()
    }
}

/// Pulse (breathing) effect settings for the active bin
#[derive(Debug, Clone)]
pub struct PulseOptions {
    /// Duration of one complete breath cycle
    pub period: Duration,
    /// Frames per second while pulsing
    pub fps: u32,
}

/// Render loop behavior
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Upper bound on how long the loop sleeps between state checks
    pub tick: Duration,
    /// Automatically clear the active bin after this long, if set
    pub auto_clear: Option<Duration>,
    /// Turn the whole strip off when shutting down (otherwise the last
    /// state is left lit)
    pub clear_on_exit: bool,
    /// Breathing effect on the active bin, if set
    pub pulse: Option<PulseOptions>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(50),
            auto_clear: None,
            clear_on_exit: true,
            pulse: None,
        }
    }
}

/// Brightness envelope for the pulse effect: 0 at period boundaries,
/// 1 at the half-period mark
pub fn pulse_envelope(elapsed: Duration, period: Duration) -> f32 {
    if period.is_zero() {
        return 1.0;
    }
    let phase = (elapsed.as_secs_f32() / period.as_secs_f32()).fract();
    (1.0 - (std::f32::consts::TAU * phase).cos()) / 2.0
}

/// Drive the strip until shutdown, then return it
///
/// Strip failures are reported and retried on the next tick; they never
/// end the loop. Runs on its own thread in production; tests call it
/// directly after scripting the shared state.
pub fn render_loop<S: LedStrip>(mut strip: S, shared: &SharedIllum, opts: &RenderOptions) -> S {
    let tick = match &opts.pulse {
        Some(pulse) => Duration::from_secs(1) / pulse.fps.max(1),
        None => opts.tick,
    };
    // Holds a diff whose flush failed, retried on the next pass
    let mut carry = PixelDiff::default();

    loop {
        let fresh = shared.wait_take_pending(tick);
        let mut pending = std::mem::take(&mut carry);
        pending.merge(fresh);

        if !pending.is_empty() {
            log::debug!(
                "rendering diff: {} off, {} on",
                pending.off.len(),
                pending.on.len()
            );
            if let Err(e) = apply_diff(&mut strip, &pending) {
                log::warn!("LED strip update failed: {}", e);
                carry = pending;
            }
        }

        if shared.is_shutdown() {
            break;
        }

        if let Some(timeout) = opts.auto_clear {
            shared.tick_auto_clear(timeout);
        }

        if let Some(pulse) = &opts.pulse {
            if carry.is_empty() {
                // Phase runs from activation, so every bin starts its
                // breath from dark
                if let Some((bin, since)) = shared.active_since() {
                    let color =
                        scale_color(bin.color, pulse_envelope(since.elapsed(), pulse.period));
                    if let Err(e) = render_solid(&mut strip, &bin.led_indices, color) {
                        log::warn!("pulse frame failed: {}", e);
                    }
                }
            }
        }
    }

    if opts.clear_on_exit {
        if let Err(e) = strip.clear_all() {
            log::warn!("failed to clear strip on exit: {}", e);
        }
    }
    strip
}

fn render_solid(
    strip: &mut impl LedStrip,
    indices: &[u16],
    color: rgb::RGB8,
) -> Result<(), crate::strip::StripError> {
    for &index in indices {
        strip.set_pixel(index, color)?;
    }
    strip.show()
}

/// What the input loop reports back for user-visible acknowledgement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A bin was lit in response to this scan
    Lit { bin_id: String, event: ScanEvent },
    /// The scan matched nothing; state is unchanged
    NoMatch { event: ScanEvent },
    /// Shutdown was requested
    Exit,
}

/// Consume scanner lines until the exit sentinel or end of input
///
/// Each successfully resolved scan activates its bin; unrecognized scans
/// leave the current bin lit. Reaching end of input behaves like the exit
/// sentinel - closing the input source is the supported way to interrupt
/// the blocking read. Always requests shutdown before returning so the
/// render loop exits promptly.
pub fn input_loop<R, F>(reader: R, resolver: &Resolver, shared: &SharedIllum, mut on_outcome: F)
where
    R: BufRead,
    F: FnMut(&ScanOutcome),
{
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::warn!("input read failed: {}", e);
                break;
            }
        };
        let event = ScanEvent::new(line.as_str());

        match resolver.resolve(&line) {
            Resolution::Matched(bin) => {
                let bin_id = bin.bin_id.clone();
                log::info!("scan {:?} -> bin {}", line.trim(), bin_id);
                shared.activate(bin);
                on_outcome(&ScanOutcome::Lit { bin_id, event });
            }
            Resolution::Unrecognized(text) => {
                log::info!("no match for scan {:?}", text);
                on_outcome(&ScanOutcome::NoMatch { event });
            }
            Resolution::ExitRequested => {
                log::info!("exit requested by scan");
                on_outcome(&ScanOutcome::Exit);
                shared.request_shutdown();
                return;
            }
        }
    }

    log::info!("input source closed, shutting down");
    shared.request_shutdown();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strip::MemoryStrip;
    use rgb::RGB8;

    const GREEN: RGB8 = RGB8 { r: 0, g: 255, b: 0 };
    const RED: RGB8 = RGB8 { r: 255, g: 0, b: 0 };

    fn bin(id: &str, indices: &[u16], color: RGB8) -> BinEntry {
        BinEntry {
            bin_id: id.to_string(),
            led_indices: indices.to_vec(),
            color,
        }
    }

    fn no_exit_clear() -> RenderOptions {
        RenderOptions {
            tick: Duration::from_millis(1),
            clear_on_exit: false,
            ..RenderOptions::default()
        }
    }

    #[test]
    fn test_rapid_activations_coalesce_to_latest_state() {
        let shared = SharedIllum::new();
        shared.activate(bin("A1", &[0, 1], RED));
        shared.activate(bin("D3", &[10, 11], GREEN));
        shared.request_shutdown();

        let strip = render_loop(MemoryStrip::new(16), &shared, &no_exit_clear());

        // One coalesced render, only the latest bin lit
        assert_eq!(strip.show_count, 1);
        assert_eq!(strip.lit_indices(), vec![10, 11]);
        assert_eq!(strip.pixel(10), Some(GREEN));
    }

    #[test]
    fn test_explicit_clear_goes_idle() {
        let shared = SharedIllum::new();
        shared.activate(bin("A1", &[0, 1], RED));
        shared.clear();
        shared.request_shutdown();

        let strip = render_loop(MemoryStrip::new(8), &shared, &no_exit_clear());

        assert!(strip.lit_indices().is_empty());
        assert!(shared.active_snapshot().is_none());
    }

    #[test]
    fn test_clear_on_exit_blanks_the_strip() {
        let shared = SharedIllum::new();
        shared.activate(bin("D3", &[10, 11], GREEN));
        shared.request_shutdown();

        let opts = RenderOptions {
            tick: Duration::from_millis(1),
            ..RenderOptions::default()
        };
        let strip = render_loop(MemoryStrip::new(16), &shared, &opts);

        assert!(strip.lit_indices().is_empty());
        assert_eq!(strip.show_count, 2); // activation frame, then the clear
    }

    #[test]
    fn test_failed_show_is_retried_next_pass() {
        let shared = SharedIllum::new();
        shared.activate(bin("D3", &[3], GREEN));

        let mut strip = MemoryStrip::new(8);
        strip.fail_next_show = true;

        // End the loop after a couple of passes
        let stopper = shared.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            stopper.request_shutdown();
        });

        let strip = render_loop(strip, &shared, &no_exit_clear());
        handle.join().unwrap();

        // The first flush failed, the retry landed
        assert_eq!(strip.lit_indices(), vec![3]);
        assert!(strip.show_count >= 1);
    }

    #[test]
    fn test_auto_clear_extinguishes_after_timeout() {
        let shared = SharedIllum::new();
        shared.activate(bin("D3", &[5], GREEN));

        let stopper = shared.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            stopper.request_shutdown();
        });

        let opts = RenderOptions {
            tick: Duration::from_millis(1),
            auto_clear: Some(Duration::from_millis(5)),
            clear_on_exit: false,
            ..RenderOptions::default()
        };
        let strip = render_loop(MemoryStrip::new(8), &shared, &opts);
        handle.join().unwrap();

        assert!(strip.lit_indices().is_empty());
        assert!(shared.active_snapshot().is_none());
    }

    #[test]
    fn test_pulse_envelope_bounds() {
        let period = Duration::from_secs(5);
        for ms in (0..5000).step_by(100) {
            let k = pulse_envelope(Duration::from_millis(ms), period);
            assert!((0.0..=1.0).contains(&k), "envelope {} out of range", k);
        }
        assert!(pulse_envelope(Duration::ZERO, period) < 0.01);
        assert!(pulse_envelope(period, period) < 0.01);
        assert!(pulse_envelope(period / 2, period) > 0.99);
    }

    #[test]
    fn test_pulse_phase_restarts_at_activation() {
        let shared = SharedIllum::new();
        shared.activate(bin("A1", &[0], RED));
        let (_, first_since) = shared.active_since().unwrap();

        std::thread::sleep(Duration::from_millis(10));
        shared.activate(bin("D3", &[5], GREEN));
        let (active, since) = shared.active_since().unwrap();

        // Switching bins moves the anchor, so the new bin breathes from
        // dark instead of inheriting the old phase
        assert_eq!(active.bin_id, "D3");
        assert!(since > first_since);
        let k = pulse_envelope(since.elapsed(), Duration::from_secs(5));
        assert!(k < 0.05, "fresh activation should start near dark, got {}", k);
    }

    #[test]
    fn test_input_loop_outcomes() {
        use crate::binmap::{BinMap, BinRow};

        let rows = vec![BinRow {
            code: "ED-BB-TI-16g-D3".to_string(),
            bin_id: "D3".to_string(),
            led_indices: "10,11,12".to_string(),
            color: "Green".to_string(),
        }];
        let resolver = Resolver::new(BinMap::build(&rows, &[], 55).unwrap());
        let shared = SharedIllum::new();

        let input = "ED-BB-TI-16g-D3\nbogus!\nexit\nnever-read\n".as_bytes();
        let mut outcomes = Vec::new();
        input_loop(input, &resolver, &shared, |outcome| {
            outcomes.push(outcome.clone());
        });

        assert_eq!(outcomes.len(), 3);
        assert!(matches!(&outcomes[0], ScanOutcome::Lit { bin_id, .. } if bin_id == "D3"));
        assert!(matches!(&outcomes[1], ScanOutcome::NoMatch { .. }));
        assert_eq!(outcomes[2], ScanOutcome::Exit);
        assert!(shared.is_shutdown());
        // The unrecognized scan left the bin lit
        assert_eq!(shared.active_snapshot().unwrap().bin_id, "D3");
    }

    #[test]
    fn test_input_eof_requests_shutdown() {
        use crate::binmap::BinMap;

        let resolver = Resolver::new(BinMap::build(&[], &[], 55).unwrap());
        let shared = SharedIllum::new();
        input_loop(std::io::empty(), &resolver, &shared, |_| {});
        assert!(shared.is_shutdown());
    }
}
