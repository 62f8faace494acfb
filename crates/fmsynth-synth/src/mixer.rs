//! Fixed-attenuation mixer for voice outputs.

use fmsynth_core::Fp32;

/// Default scratch length in samples; longer blocks are mixed in chunks.
pub const DEFAULT_SCRATCH_LEN: usize = 512;

/// Anything that renders a block of samples.
pub trait Source {
    /// Fill `out` with the next samples.
    fn render(&mut self, out: &mut [Fp32]);
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn render(&mut self, out: &mut [Fp32]) {
        (**self).render(out);
    }
}

/// Sums N channels, each scaled by `1/N` and a per-channel level.
///
/// The `1/N` attenuation is rounded down, so N full-scale inputs at unit
/// level sum to at most full scale.
///
/// ```rust
/// use fmsynth_core::Fp32;
/// use fmsynth_synth::{Mixer, Source};
///
/// struct Dc(Fp32);
/// impl Source for Dc {
///     fn render(&mut self, out: &mut [Fp32]) {
///         out.fill(self.0);
///     }
/// }
///
/// let mut mixer = Mixer::new(4);
/// let mut sources = [Dc(Fp32::ONE), Dc(Fp32::ONE), Dc(Fp32::ONE), Dc(Fp32::ONE)];
/// let mut out = [Fp32::ZERO; 32];
/// mixer.render(&mut sources, &mut out);
/// assert!(out.iter().all(|s| *s <= Fp32::ONE));
/// ```
#[derive(Debug, Clone)]
pub struct Mixer {
    levels: Vec<Fp32>,
    atten: Fp32,
    scratch: Vec<Fp32>,
}

impl Mixer {
    /// A mixer for `channels` sources at unit level.
    pub fn new(channels: usize) -> Self {
        Self::with_scratch(channels, DEFAULT_SCRATCH_LEN)
    }

    /// A mixer with an explicit scratch length (at least one sample).
    pub fn with_scratch(channels: usize, scratch_len: usize) -> Self {
        let divisor = channels.max(1) as i32;
        Self {
            levels: vec![Fp32::ONE; channels],
            atten: Fp32::from_raw(Fp32::ONE.raw() / divisor),
            scratch: vec![Fp32::ZERO; scratch_len.max(1)],
        }
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.levels.len()
    }

    /// Per-channel attenuation, `1/N`.
    pub fn atten(&self) -> Fp32 {
        self.atten
    }

    /// Level of channel `index`.
    pub fn level(&self, index: usize) -> Option<Fp32> {
        self.levels.get(index).copied()
    }

    /// Set the level of channel `index`. Returns `false` if out of range.
    pub fn set_level(&mut self, index: usize, level: Fp32) -> bool {
        match self.levels.get_mut(index) {
            Some(slot) => {
                *slot = level;
                true
            }
            None => false,
        }
    }

    /// Mix `sources` into `out`, overwriting it.
    ///
    /// Source `i` feeds channel `i`; sources beyond the channel count are not
    /// rendered. Each source renders every output sample exactly once.
    pub fn render<S: Source>(&mut self, sources: &mut [S], out: &mut [Fp32]) {
        out.fill(Fp32::ZERO);
        let chunk_len = self.scratch.len();

        for chunk in out.chunks_mut(chunk_len) {
            let scratch = &mut self.scratch[..chunk.len()];
            for (source, &level) in sources.iter_mut().zip(&self.levels) {
                let gain = self.atten.mul(level);
                source.render(scratch);
                for (acc, &sample) in chunk.iter_mut().zip(scratch.iter()) {
                    *acc += sample.mul(gain);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dc(Fp32);

    impl Source for Dc {
        fn render(&mut self, out: &mut [Fp32]) {
            out.fill(self.0);
        }
    }

    /// Counts rendered samples to prove each is produced once.
    struct Counter {
        rendered: usize,
    }

    impl Source for Counter {
        fn render(&mut self, out: &mut [Fp32]) {
            for s in out.iter_mut() {
                self.rendered += 1;
                *s = Fp32::from_int(self.rendered as i16);
            }
        }
    }

    #[test]
    fn test_four_full_scale_channels_stay_in_range() {
        let mut mixer = Mixer::new(4);
        let mut sources: Vec<Dc> = (0..4).map(|_| Dc(Fp32::ONE)).collect();
        let mut out = vec![Fp32::ZERO; 128];
        mixer.render(&mut sources, &mut out);
        assert!(out.iter().all(|s| *s == Fp32::ONE));
    }

    #[test]
    fn test_odd_channel_count_rounds_down() {
        let mut mixer = Mixer::new(3);
        let mut sources: Vec<Dc> = (0..3).map(|_| Dc(Fp32::MINUS_ONE)).collect();
        let mut out = vec![Fp32::ZERO; 16];
        mixer.render(&mut sources, &mut out);
        assert!(out.iter().all(|s| s.abs() <= Fp32::ONE));

        let mut positive: Vec<Dc> = (0..3).map(|_| Dc(Fp32::ONE)).collect();
        mixer.render(&mut positive, &mut out);
        assert!(out.iter().all(|s| *s <= Fp32::ONE && *s > Fp32::from_f64(0.99)));
    }

    #[test]
    fn test_level_scales_channel() {
        let mut mixer = Mixer::new(2);
        assert!(mixer.set_level(1, Fp32::ZERO));
        assert!(!mixer.set_level(2, Fp32::ZERO));
        let mut sources = [Dc(Fp32::ONE), Dc(Fp32::ONE)];
        let mut out = [Fp32::ZERO; 8];
        mixer.render(&mut sources, &mut out);
        assert!(out.iter().all(|s| *s == Fp32::from_f64(0.5)));
    }

    #[test]
    fn test_long_block_rendered_in_chunks_once() {
        let mut mixer = Mixer::with_scratch(1, 16);
        let mut sources = [Counter { rendered: 0 }];
        let mut out = vec![Fp32::ZERO; 100];
        mixer.render(&mut sources, &mut out);
        assert_eq!(sources[0].rendered, 100);
        for (i, s) in out.iter().enumerate() {
            assert_eq!(*s, Fp32::from_int(i as i16 + 1));
        }
    }

    #[test]
    fn test_render_overwrites_output() {
        let mut mixer = Mixer::new(1);
        let mut sources = [Dc(Fp32::ZERO)];
        let mut out = [Fp32::ONE; 8];
        mixer.render(&mut sources, &mut out);
        assert!(out.iter().all(|s| s.is_zero()));
    }

    #[test]
    fn test_zero_channels_is_silent() {
        let mut mixer = Mixer::new(0);
        let mut sources: [Dc; 0] = [];
        let mut out = [Fp32::ONE; 8];
        mixer.render(&mut sources, &mut out);
        assert!(out.iter().all(|s| s.is_zero()));
    }
}
