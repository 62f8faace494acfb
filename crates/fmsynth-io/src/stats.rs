//! Lock-free render instrumentation.
//!
//! [`RenderStats`] is shared between the render thread, the sample queue and
//! whoever reports on them. Every counter is a relaxed atomic so recording
//! never blocks the audio path.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters for the render pipeline.
#[derive(Debug)]
pub struct RenderStats {
    block_period_ns: u64,
    blocks: AtomicU64,
    render_ns_total: AtomicU64,
    render_ns_max: AtomicU64,
    underruns: AtomicU64,
    missing_samples: AtomicU64,
    dropped_samples: AtomicU64,
}

impl RenderStats {
    /// Counters for blocks of `block_size` samples at `sample_rate`.
    pub fn new(block_size: usize, sample_rate: u32) -> Self {
        let block_period_ns = if sample_rate == 0 {
            0
        } else {
            block_size as u64 * 1_000_000_000 / u64::from(sample_rate)
        };
        Self {
            block_period_ns,
            blocks: AtomicU64::new(0),
            render_ns_total: AtomicU64::new(0),
            render_ns_max: AtomicU64::new(0),
            underruns: AtomicU64::new(0),
            missing_samples: AtomicU64::new(0),
            dropped_samples: AtomicU64::new(0),
        }
    }

    /// Wall-clock length of one block.
    pub fn block_period(&self) -> Duration {
        Duration::from_nanos(self.block_period_ns)
    }

    /// Record the time spent rendering one block.
    pub fn record_block(&self, elapsed: Duration) {
        let ns = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.blocks.fetch_add(1, Ordering::Relaxed);
        self.render_ns_total.fetch_add(ns, Ordering::Relaxed);
        self.render_ns_max.fetch_max(ns, Ordering::Relaxed);
    }

    /// Record an underrun of `missing` samples. Returns the underrun count
    /// including this one.
    pub fn record_underrun(&self, missing: usize) -> u64 {
        self.missing_samples
            .fetch_add(missing as u64, Ordering::Relaxed);
        self.underruns.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record samples the queue had no room for.
    pub fn record_dropped(&self, count: usize) {
        self.dropped_samples
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Blocks rendered so far.
    pub fn blocks(&self) -> u64 {
        self.blocks.load(Ordering::Relaxed)
    }

    /// Underruns so far.
    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }

    /// Samples dropped so far.
    pub fn dropped_samples(&self) -> u64 {
        self.dropped_samples.load(Ordering::Relaxed)
    }

    /// A consistent-enough copy of the counters with derived figures.
    pub fn snapshot(&self) -> StatsSnapshot {
        let blocks = self.blocks.load(Ordering::Relaxed);
        let total = self.render_ns_total.load(Ordering::Relaxed);
        let avg_ns = total.checked_div(blocks).unwrap_or(0);
        let utilisation = if self.block_period_ns == 0 {
            0.0
        } else {
            avg_ns as f64 / self.block_period_ns as f64
        };

        StatsSnapshot {
            blocks,
            avg_render: Duration::from_nanos(avg_ns),
            max_render: Duration::from_nanos(self.render_ns_max.load(Ordering::Relaxed)),
            utilisation,
            underruns: self.underruns.load(Ordering::Relaxed),
            missing_samples: self.missing_samples.load(Ordering::Relaxed),
            dropped_samples: self.dropped_samples.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`RenderStats`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    /// Blocks rendered.
    pub blocks: u64,
    /// Mean render time per block.
    pub avg_render: Duration,
    /// Slowest block.
    pub max_render: Duration,
    /// Mean render time as a fraction of the block period.
    pub utilisation: f64,
    /// Audio callbacks that ran short of samples.
    pub underruns: u64,
    /// Samples replaced by silence.
    pub missing_samples: u64,
    /// Rendered samples the queue had no room for.
    pub dropped_samples: u64,
}

impl std::fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} blocks, avg {:.1} us, max {:.1} us, {:.1}% of budget, {} underruns ({} samples), {} dropped",
            self.blocks,
            self.avg_render.as_secs_f64() * 1e6,
            self.max_render.as_secs_f64() * 1e6,
            self.utilisation * 100.0,
            self.underruns,
            self.missing_samples,
            self.dropped_samples,
        )
    }
}
