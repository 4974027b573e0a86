//! Wall-clock and peak-memory instrumentation for extraction calls.
//!
//! Memory is only measured when the embedding binary registers its
//! [`PeakAlloc`] global allocator through [`install_allocator`]; a library
//! cannot install a global allocator on its own. Without one, `memory_mb`
//! is reported as 0.0.
//!
//! The allocator's peak counter is process-wide, so concurrent extractions
//! (the batch runner) each see the peak of everything running alongside them.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use peak_alloc::PeakAlloc;

use crate::confidence::round2;

static ALLOCATOR: OnceLock<&'static PeakAlloc> = OnceLock::new();

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Register the global allocator used for memory accounting.
///
/// Returns `false` if an allocator was already registered.
///
/// ```ignore
/// use peak_alloc::PeakAlloc;
///
/// #[global_allocator]
/// static PEAK_ALLOC: PeakAlloc = PeakAlloc;
///
/// fn main() {
///     docex::instrument::install_allocator(&PEAK_ALLOC);
/// }
/// ```
pub fn install_allocator(allocator: &'static PeakAlloc) -> bool {
    ALLOCATOR.set(allocator).is_ok()
}

/// Whether memory accounting is active.
pub fn memory_tracking_enabled() -> bool {
    ALLOCATOR.get().is_some()
}

/// Timing and memory figures attached to a result record.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Measurement {
    /// Wall-clock seconds, 2 decimals
    pub time_taken: f64,
    /// Peak additional memory in MB, 2 decimals
    pub memory_mb: f64,
}

impl Measurement {
    /// A measurement that only carries elapsed time.
    pub fn elapsed_only(elapsed: Duration) -> Self {
        Self {
            time_taken: round2(elapsed.as_secs_f64()),
            memory_mb: 0.0,
        }
    }
}

/// Started at the top of an extraction call, finished when its result is built.
#[derive(Debug)]
pub struct Meter {
    started: Instant,
    baseline: usize,
}

impl Meter {
    /// Start measuring.
    pub fn start() -> Self {
        let baseline = match ALLOCATOR.get() {
            Some(alloc) => {
                alloc.reset_peak_usage();
                alloc.current_usage()
            }
            None => 0,
        };
        Self {
            started: Instant::now(),
            baseline,
        }
    }

    /// Stop measuring and report.
    pub fn finish(self) -> Measurement {
        let elapsed = self.started.elapsed();
        let memory_mb = match ALLOCATOR.get() {
            Some(alloc) => {
                let peak = alloc.peak_usage().saturating_sub(self.baseline);
                round2(peak as f64 / BYTES_PER_MB)
            }
            None => 0.0,
        };
        Measurement {
            time_taken: round2(elapsed.as_secs_f64()),
            memory_mb,
        }
    }
}
