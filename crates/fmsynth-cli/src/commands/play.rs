//! Real-time playback of a note sequence.

use super::common::{EngineOverrides, build_engine, load_config};
use crate::sequence::{DEFAULT_SEQUENCE, Sequence, parse_tail};
use clap::Args;
use fmsynth_io::{
    AudioBackend, BackendStreamConfig, CpalBackend, EngineCommand, RenderStats, RenderThread,
    play_queue, sample_queue,
};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Longest sleep between checks for Ctrl+C.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Args)]
pub struct PlayArgs {
    /// Notes as note:velocity:start:duration, comma-separated (seconds)
    #[arg(short, long, default_value = DEFAULT_SEQUENCE)]
    notes: Sequence,

    /// Seconds to keep playing after the last note-off
    #[arg(long, default_value = "0.5", value_parser = parse_tail)]
    tail: f64,

    /// Output device name (partial match)
    #[arg(long)]
    device: Option<String>,

    #[command(flatten)]
    engine: EngineOverrides,
}

pub fn run(args: PlayArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let mut config = load_config(config_path, &args.engine)?;
    if args.device.is_some() {
        config.audio.device.clone_from(&args.device);
    }
    let engine = build_engine(&config, &args.engine)?;
    let audio = &config.audio;
    let block_size = audio.block_size as usize;

    let backend = CpalBackend::new();
    let output_name = match &audio.device {
        Some(name) => name.clone(),
        None => backend
            .default_output_device()?
            .unwrap_or_else(|| "none".to_string()),
    };

    println!(
        "Playing {} note(s) with {} voices ({})",
        args.notes.events().len(),
        engine.voice_count(),
        engine.layout()
    );
    println!("  Output: {}", output_name);
    println!("  Sample rate: {} Hz", audio.sample_rate);
    println!(
        "  Block size: {} samples, queue {} blocks",
        audio.block_size, audio.queue_blocks
    );
    println!("\nPress Ctrl+C to stop...\n");

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        println!("\nStopping...");
        r.store(false, Ordering::SeqCst);
    })?;

    let stats = Arc::new(RenderStats::new(block_size, audio.sample_rate));
    let (producer, consumer) = sample_queue(audio.queue_capacity(), Arc::clone(&stats));
    let render = RenderThread::spawn(engine, producer, block_size, Arc::clone(&stats))?;

    let stream_config = BackendStreamConfig {
        sample_rate: audio.sample_rate,
        buffer_size: audio.block_size,
        channels: audio.channels,
        device_name: audio.device.clone(),
    };
    let stream = play_queue(&backend, &stream_config, consumer)?;

    // Events are scheduled against the wall clock; the queue adds a fixed
    // latency of at most `queue_blocks` blocks.
    let rate = f64::from(audio.sample_rate);
    let started = Instant::now();
    for event in args.notes.timeline(audio.sample_rate) {
        let due = started + Duration::from_secs_f64(event.sample as f64 / rate);
        if !wait_until(due, &running) {
            break;
        }
        if !render.send(EngineCommand::Midi(event.message)) {
            tracing::warn!(message = ?event.message, "render thread not accepting commands");
        }
    }
    let end = started + Duration::from_secs_f64(args.notes.end() + args.tail);
    wait_until(end, &running);

    render.send(EngineCommand::AllNotesOff);
    let engine = render.stop();
    drop(stream);

    if engine.is_none() {
        anyhow::bail!("render thread panicked");
    }

    println!("Render stats:");
    println!("  {}", stats.snapshot());
    Ok(())
}

/// Sleep until `deadline`. Returns `false` if Ctrl+C arrived first.
fn wait_until(deadline: Instant, running: &AtomicBool) -> bool {
    loop {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep((deadline - now).min(POLL_INTERVAL));
    }
}
