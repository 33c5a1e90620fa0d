//! Progress reporting.
//!
//! Components report raw item counts to a [`ProgressTracker`], which maps
//! them onto a single fraction in `[0, 1]` for the whole scan, keeps that
//! fraction monotone and coalesces updates before handing them to a
//! [`ProgressCallback`]. The tracker is shared by the hashing pool, so the
//! callback sees at most one update per [`MIN_FRACTION_STEP`] no matter how
//! many threads are working.
//!
//! [`Progress`] is the terminal implementation used by the CLI, built on
//! `indicatif`.

use std::fmt;
use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Smallest fraction increase that triggers a callback (0.5 %).
pub const MIN_FRACTION_STEP: f64 = 0.005;

/// A stage of the scan pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Counting and matching files
    Walking,
    /// Computing content digests
    Hashing,
    /// Copying matched files
    Copying,
    /// Removing duplicates
    Deleting,
    /// Writing the report
    Reporting,
}

impl Phase {
    /// Short lowercase name of the phase.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Walking => "walking",
            Self::Hashing => "hashing",
            Self::Copying => "copying",
            Self::Deleting => "deleting",
            Self::Reporting => "reporting",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single coalesced progress notification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    /// Phase the counts refer to
    pub phase: Phase,
    /// Items processed in this phase
    pub processed: usize,
    /// Items expected in this phase (may undercount)
    pub total: usize,
    /// Overall scan progress in `[0, 1]`, never decreasing
    pub fraction: f64,
}

/// Receiver of scan progress.
///
/// Implement this trait in the presentation layer to drive a progress
/// indicator.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts with the number of items it expects.
    fn on_phase_start(&self, phase: Phase, total: usize);

    /// Called with a coalesced progress update.
    fn on_progress(&self, update: &ProgressUpdate);

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: Phase);

    /// Called with a free-form status message.
    fn on_message(&self, _message: &str) {}
}

#[derive(Debug)]
struct TrackerState {
    phase: Phase,
    processed: usize,
    total: usize,
    span: Range<f64>,
    last_emitted: f64,
    emitted_any: bool,
    finished: bool,
}

/// Maps per-phase counts onto a throttled, monotone overall fraction.
///
/// The callback is never invoked while the tracker state is locked, so a
/// slow callback does not stall counting and a callback may read
/// [`fraction`](Self::fraction). Intermediate updates that arrive while
/// another thread is inside the callback are dropped; phase ends and the
/// final `1.0` always get through.
pub struct ProgressTracker {
    callback: Option<Arc<dyn ProgressCallback>>,
    state: Mutex<TrackerState>,
    delivered: Mutex<Option<f64>>,
}

impl fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("callback", &self.callback.as_ref().map(|_| "<callback>"))
            .field("state", &self.state)
            .finish()
    }
}

impl ProgressTracker {
    /// Create a tracker forwarding to an optional callback.
    #[must_use]
    pub fn new(callback: Option<Arc<dyn ProgressCallback>>) -> Self {
        Self {
            callback,
            state: Mutex::new(TrackerState {
                phase: Phase::Walking,
                processed: 0,
                total: 0,
                span: 0.0..0.0,
                last_emitted: 0.0,
                emitted_any: false,
                finished: false,
            }),
            delivered: Mutex::new(None),
        }
    }

    /// A tracker that reports nowhere.
    #[must_use]
    pub fn silent() -> Self {
        Self::new(None)
    }

    /// Start a phase that will move the overall fraction across `span`.
    pub fn start_phase(&self, phase: Phase, total: usize, span: Range<f64>) {
        {
            let mut state = self.lock_state();
            state.phase = phase;
            state.processed = 0;
            state.total = total;
            state.span = span.start.clamp(0.0, 1.0)..span.end.clamp(0.0, 1.0);
        }
        log::debug!("Phase {} started ({} items)", phase, total);
        if let Some(ref callback) = self.callback {
            callback.on_phase_start(phase, total);
        }
    }

    /// Record `n` processed items in the current phase.
    pub fn advance(&self, n: usize) {
        let (update, complete) = {
            let mut state = self.lock_state();
            state.processed = state.processed.saturating_add(n);
            let complete = state.total > 0 && state.processed >= state.total;
            let fraction = phase_fraction(&state);
            (accept(&mut state, fraction, complete), complete)
        };
        self.deliver(update, complete);
    }

    /// Finish the current phase, moving the fraction to the end of its span.
    pub fn end_phase(&self) {
        let (phase, update) = {
            let mut state = self.lock_state();
            let end = state.span.end;
            let update = accept(&mut state, end, true);
            (state.phase, update)
        };
        self.deliver(update, true);
        log::debug!("Phase {} finished", phase);
        if let Some(ref callback) = self.callback {
            callback.on_phase_end(phase);
        }
    }

    /// Emit the final `1.0` exactly once.
    pub fn finish(&self) {
        let update = {
            let mut state = self.lock_state();
            if state.finished {
                return;
            }
            state.finished = true;
            state.phase = Phase::Reporting;
            state.processed = state.total;
            accept(&mut state, 1.0, true)
        };
        self.deliver(update, true);
    }

    /// Forward a free-form message.
    pub fn message(&self, message: &str) {
        if let Some(ref callback) = self.callback {
            callback.on_message(message);
        }
    }

    /// The last fraction accepted for delivery.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        self.lock_state().last_emitted
    }

    fn lock_state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hand an accepted update to the callback, outside the state lock.
    ///
    /// Updates computed concurrently may arrive here out of order; anything
    /// not above the last delivered fraction is dropped.
    fn deliver(&self, update: Option<ProgressUpdate>, force: bool) {
        let (Some(update), Some(callback)) = (update, self.callback.as_ref()) else {
            return;
        };
        let mut delivered = if force {
            self.delivered.lock().unwrap_or_else(PoisonError::into_inner)
        } else {
            match self.delivered.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(e)) => e.into_inner(),
                Err(TryLockError::WouldBlock) => return,
            }
        };
        if delivered.is_some_and(|last| update.fraction <= last) {
            return;
        }
        *delivered = Some(update.fraction);
        callback.on_progress(&update);
    }
}

/// Throttle and clamp; returns the update to deliver, if any.
fn accept(state: &mut TrackerState, fraction: f64, force: bool) -> Option<ProgressUpdate> {
    let fraction = fraction.clamp(0.0, 1.0).max(state.last_emitted);
    let step = fraction - state.last_emitted;
    let first = !state.emitted_any;
    if !(first || step >= MIN_FRACTION_STEP || (force && step > 0.0)) {
        return None;
    }
    state.last_emitted = fraction;
    state.emitted_any = true;
    Some(ProgressUpdate {
        phase: state.phase,
        processed: state.processed,
        total: state.total,
        fraction,
    })
}

fn phase_fraction(state: &TrackerState) -> f64 {
    let width = state.span.end - state.span.start;
    if state.total == 0 {
        return state.span.end;
    }
    let ratio = (state.processed as f64 / state.total as f64).min(1.0);
    state.span.start + width * ratio
}

/// Terminal progress reporter using indicatif.
///
/// One bar per phase; in quiet mode nothing is drawn.
pub struct Progress {
    multi: MultiProgress,
    current: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// ```
    /// use filesift::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            current: Mutex::new(None),
            quiet,
        }
    }

    fn bar_style(phase: Phase) -> ProgressStyle {
        let template = match phase {
            Phase::Hashing => {
                "[{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} ({percent}%) {msg} {per_sec}"
            }
            _ => "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        };
        ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█>-")
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: Phase, total: usize) {
        if self.quiet {
            return;
        }
        let pb = self.multi.add(ProgressBar::new(total as u64));
        pb.set_style(Self::bar_style(phase));
        pb.set_message(phase.to_string());
        if phase == Phase::Walking {
            pb.enable_steady_tick(Duration::from_millis(100));
        }
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current = Some(pb);
    }

    fn on_progress(&self, update: &ProgressUpdate) {
        if self.quiet {
            return;
        }
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(ref pb) = *current {
            if update.processed as u64 > pb.length().unwrap_or(0) {
                pb.set_length(update.processed as u64);
            }
            pb.set_position(update.processed as u64);
        }
    }

    fn on_phase_end(&self, phase: Phase) {
        if self.quiet {
            return;
        }
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pb) = current.take() {
            pb.finish_with_message(format!("{phase} complete"));
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(ref pb) = *current {
            pb.set_message(message.to_string());
        } else {
            let _ = self.multi.println(message);
        }
    }
}
