//! Offline rendering of a note sequence to WAV.

use super::common::{EngineOverrides, build_engine, load_config};
use crate::sequence::{DEFAULT_SEQUENCE, Sequence, TimedMessage, parse_tail};
use clap::Args;
use fmsynth_core::Fp32;
use fmsynth_io::write_wav_fp32;
use fmsynth_synth::Engine;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct RenderArgs {
    /// Output WAV file (16-bit mono)
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Notes as note:velocity:start:duration, comma-separated (seconds)
    #[arg(short, long, default_value = DEFAULT_SEQUENCE)]
    notes: Sequence,

    /// Seconds rendered after the last note-off
    #[arg(long, default_value = "0.5", value_parser = parse_tail)]
    tail: f64,

    #[command(flatten)]
    engine: EngineOverrides,
}

pub fn run(args: RenderArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path, &args.engine)?;
    let mut engine = build_engine(&config, &args.engine)?;
    let sample_rate = config.audio.sample_rate;
    let block_size = config.audio.block_size as usize;

    let timeline = args.notes.timeline(sample_rate);
    let total = ((args.notes.end() + args.tail) * f64::from(sample_rate)).ceil() as usize;
    let total = total.max(timeline.last().map_or(0, |t| t.sample as usize + 1));

    println!(
        "Rendering {} note(s), {:.2}s at {} Hz ({}, {} voices)",
        args.notes.events().len(),
        total as f64 / f64::from(sample_rate),
        sample_rate,
        engine.layout(),
        engine.voice_count()
    );

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );

    let samples = render_timeline(&mut engine, &timeline, total, block_size, |done| {
        pb.set_position(done as u64);
    });
    pb.finish_with_message("done");

    write_wav_fp32(&args.output, &samples, sample_rate)?;

    let peak = samples.iter().map(|s| s.abs()).max().unwrap_or(Fp32::ZERO);
    println!("\nPeak: {:.3}", peak.to_f32());
    println!("Wrote {} samples to {}", samples.len(), args.output.display());
    Ok(())
}

/// Render `total` samples, applying each message at its exact sample
/// offset. Blocks are split at message boundaries.
fn render_timeline(
    engine: &mut Engine,
    timeline: &[TimedMessage],
    total: usize,
    block_size: usize,
    mut progress: impl FnMut(usize),
) -> Vec<Fp32> {
    let mut out = vec![Fp32::ZERO; total];
    let mut pending = timeline.iter().peekable();
    let mut pos = 0;

    while pos < total {
        while let Some(event) = pending.next_if(|t| t.sample as usize <= pos) {
            engine.handle_midi(event.message);
        }

        let mut end = (pos + block_size.max(1)).min(total);
        if let Some(next) = pending.peek() {
            end = end.min(next.sample as usize);
        }
        engine.render(&mut out[pos..end]);
        pos = end;
        progress(pos);
    }
    out
}
