//! Bounded single-producer single-consumer sample queue.
//!
//! The render thread pushes mono [`Fp32`] blocks; the audio callback pops
//! them into interleaved device buffers. Neither side ever blocks:
//!
//! - samples that do not fit are dropped and counted
//! - a callback that finds too few samples pads with silence, counts an
//!   underrun and reports [`FillStatus::Underrun`]
//! - once the producer has finished and the queue is drained, fills report
//!   [`FillStatus::Finished`]

use crate::stats::RenderStats;
use fmsynth_core::Fp32;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Underruns between repeated warnings.
const UNDERRUN_LOG_INTERVAL: u64 = 100;

/// Outcome of filling a device buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillStatus {
    /// Every frame came from the queue.
    Complete,
    /// `missing` frames were padded with silence.
    Underrun {
        /// Frames that had no sample.
        missing: usize,
    },
    /// The producer has finished and nothing is left.
    Finished,
}

#[derive(Debug)]
struct Shared {
    finished: AtomicBool,
    stats: Arc<RenderStats>,
}

/// Create a queue holding up to `capacity` samples.
///
/// ```rust
/// use std::sync::Arc;
/// use fmsynth_core::Fp32;
/// use fmsynth_io::{FillStatus, RenderStats, sample_queue};
///
/// let stats = Arc::new(RenderStats::new(4, 48000));
/// let (mut tx, mut rx) = sample_queue(8, stats);
/// tx.push(&[Fp32::ONE; 4]);
///
/// let mut out = [0.0f32; 8];
/// assert_eq!(rx.fill_f32(&mut out, 2), FillStatus::Complete);
/// assert_eq!(out, [1.0; 8]);
/// ```
pub fn sample_queue(capacity: usize, stats: Arc<RenderStats>) -> (SampleProducer, SampleConsumer) {
    let (producer, consumer) = HeapRb::<Fp32>::new(capacity.max(1)).split();
    let shared = Arc::new(Shared {
        finished: AtomicBool::new(false),
        stats,
    });
    (
        SampleProducer {
            inner: producer,
            shared: Arc::clone(&shared),
        },
        SampleConsumer {
            inner: consumer,
            shared,
        },
    )
}

/// Render-thread end of the queue.
pub struct SampleProducer {
    inner: HeapProd<Fp32>,
    shared: Arc<Shared>,
}

impl SampleProducer {
    /// Free space in samples.
    pub fn vacant_len(&self) -> usize {
        self.inner.vacant_len()
    }

    /// Total capacity in samples.
    pub fn capacity(&self) -> usize {
        self.inner.capacity().get()
    }

    /// Push a block; whatever does not fit is dropped. Returns the number of
    /// samples queued.
    pub fn push(&mut self, samples: &[Fp32]) -> usize {
        let written = self.inner.push_slice(samples);
        let dropped = samples.len() - written;
        if dropped > 0 {
            self.shared.stats.record_dropped(dropped);
            tracing::debug!(dropped, "sample queue full");
        }
        written
    }

    /// Mark the stream finished. The consumer reports
    /// [`FillStatus::Finished`] once it has drained what is left.
    pub fn finish(&self) {
        self.shared.finished.store(true, Ordering::Release);
    }

    /// Whether [`finish`](Self::finish) has been called.
    pub fn is_finished(&self) -> bool {
        self.shared.finished.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for SampleProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleProducer")
            .field("capacity", &self.capacity())
            .field("vacant", &self.vacant_len())
            .finish_non_exhaustive()
    }
}

/// Audio-callback end of the queue.
pub struct SampleConsumer {
    inner: HeapCons<Fp32>,
    shared: Arc<Shared>,
}

impl SampleConsumer {
    /// Queued samples.
    pub fn occupied_len(&self) -> usize {
        self.inner.occupied_len()
    }

    /// Fill an interleaved f32 buffer, duplicating each sample across
    /// `channels`.
    pub fn fill_f32(&mut self, out: &mut [f32], channels: usize) -> FillStatus {
        self.fill(out, channels, 0.0, Fp32::to_f32)
    }

    /// Fill an interleaved i16 buffer, duplicating each sample across
    /// `channels`.
    pub fn fill_i16(&mut self, out: &mut [i16], channels: usize) -> FillStatus {
        self.fill(out, channels, 0, Fp32::to_i16)
    }

    fn fill<T: Copy>(
        &mut self,
        out: &mut [T],
        channels: usize,
        silence: T,
        convert: impl Fn(Fp32) -> T,
    ) -> FillStatus {
        // Read before popping: a finished producer has already pushed its last sample.
        let finished = self.shared.finished.load(Ordering::Acquire);
        let mut missing = 0;

        for frame in out.chunks_mut(channels.max(1)) {
            let value = match self.inner.try_pop() {
                Some(sample) => convert(sample),
                None => {
                    missing += 1;
                    silence
                }
            };
            frame.fill(value);
        }

        if missing == 0 {
            FillStatus::Complete
        } else if finished {
            FillStatus::Finished
        } else {
            let count = self.shared.stats.record_underrun(missing);
            if count == 1 || count % UNDERRUN_LOG_INTERVAL == 0 {
                tracing::warn!(underruns = count, missing, "audio underrun");
            }
            FillStatus::Underrun { missing }
        }
    }
}

impl std::fmt::Debug for SampleConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleConsumer")
            .field("occupied", &self.occupied_len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue(capacity: usize) -> (SampleProducer, SampleConsumer, Arc<RenderStats>) {
        let stats = Arc::new(RenderStats::new(16, 48000));
        let (tx, rx) = sample_queue(capacity, Arc::clone(&stats));
        (tx, rx, stats)
    }

    #[test]
    fn test_push_drops_overflow() {
        let (mut tx, rx, stats) = queue(8);
        assert_eq!(tx.push(&[Fp32::ONE; 6]), 6);
        assert_eq!(tx.push(&[Fp32::ONE; 6]), 2);
        assert_eq!(tx.vacant_len(), 0);
        assert_eq!(rx.occupied_len(), 8);
        assert_eq!(stats.dropped_samples(), 4);
    }

    #[test]
    fn test_fill_i16_duplicates_channels() {
        let (mut tx, mut rx, _) = queue(8);
        tx.push(&[Fp32::ONE, Fp32::MINUS_ONE, Fp32::ZERO]);

        let mut out = [7i16; 6];
        assert_eq!(rx.fill_i16(&mut out, 2), FillStatus::Complete);
        assert_eq!(out, [i16::MAX, i16::MAX, i16::MIN, i16::MIN, 0, 0]);
    }

    #[test]
    fn test_underrun_pads_with_silence() {
        let (mut tx, mut rx, stats) = queue(8);
        tx.push(&[Fp32::ONE; 2]);

        let mut out = [9.0f32; 4];
        assert_eq!(
            rx.fill_f32(&mut out, 1),
            FillStatus::Underrun { missing: 2 }
        );
        assert_eq!(out, [1.0, 1.0, 0.0, 0.0]);
        assert_eq!(stats.underruns(), 1);
    }

    #[test]
    fn test_finished_after_drain() {
        let (mut tx, mut rx, stats) = queue(8);
        tx.push(&[Fp32::ONE; 2]);
        tx.finish();
        assert!(tx.is_finished());

        let mut out = [0.0f32; 2];
        assert_eq!(rx.fill_f32(&mut out, 1), FillStatus::Complete);
        assert_eq!(rx.fill_f32(&mut out, 1), FillStatus::Finished);
        assert_eq!(out, [0.0, 0.0]);
        assert_eq!(stats.underruns(), 0);
    }

    #[test]
    fn test_zero_channels_treated_as_mono() {
        let (mut tx, mut rx, _) = queue(4);
        tx.push(&[Fp32::ONE; 4]);
        let mut out = [0.0f32; 4];
        assert_eq!(rx.fill_f32(&mut out, 0), FillStatus::Complete);
        assert_eq!(rx.occupied_len(), 0);
    }

    #[test]
    fn test_threaded_handoff_preserves_order() {
        let (mut tx, mut rx, _) = queue(64);
        let producer = std::thread::spawn(move || {
            let mut next = 1i16;
            while next <= 1000 {
                if tx.vacant_len() == 0 {
                    std::thread::yield_now();
                    continue;
                }
                tx.push(&[Fp32::from_int(next)]);
                next += 1;
            }
            tx.finish();
        });

        let mut received = Vec::new();
        let mut out = [0.0f32; 16];
        loop {
            let status = rx.fill_f32(&mut out, 1);
            received.extend(out.iter().copied().filter(|s| *s != 0.0));
            if status == FillStatus::Finished {
                break;
            }
            std::thread::yield_now();
        }
        producer.join().unwrap();

        let expected: Vec<f32> = (1..=1000).map(|i| i as f32).collect();
        assert_eq!(received, expected);
    }
}
