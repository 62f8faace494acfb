//! The render thread: owns the engine and keeps the sample queue topped up.
//!
//! Each pass drains pending [`EngineCommand`]s, then renders one block if the
//! queue has room for it. Commands only land between blocks, so a note-on
//! never arrives halfway through an envelope step. When the queue is full the
//! thread sleeps for [`IDLE_SLEEP`].

use crate::queue::SampleProducer;
use crate::stats::RenderStats;
use crate::{Error, Result};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use fmsynth_core::Fp32;
use fmsynth_synth::{Engine, MidiMessage};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Sleep between checks while the queue is full.
pub const IDLE_SLEEP: Duration = Duration::from_micros(100);

/// Commands that can be pending at once.
pub const COMMAND_QUEUE_CAPACITY: usize = 1024;

/// Work for the render thread, applied at the next block boundary.
///
/// Commands still queued when the thread stops are applied before it exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCommand {
    /// A decoded MIDI message.
    Midi(MidiMessage),
    /// Release every voice.
    AllNotesOff,
}

impl EngineCommand {
    /// Decode a raw MIDI message into a command.
    pub fn from_midi_bytes(bytes: &[u8]) -> Option<Self> {
        MidiMessage::from_bytes(bytes).map(Self::Midi)
    }

    fn apply(self, engine: &mut Engine) {
        match self {
            Self::Midi(message) => engine.handle_midi(message),
            Self::AllNotesOff => engine.all_notes_off(),
        }
    }
}

/// Handle to a running render thread.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use fmsynth_io::{EngineCommand, RenderStats, RenderThread, sample_queue};
/// use fmsynth_synth::{Engine, MidiMessage, OperatorLayout};
///
/// let engine = Engine::new(48000, 8, OperatorLayout::FourOp).unwrap();
/// let stats = Arc::new(RenderStats::new(256, 48000));
/// let (producer, _consumer) = sample_queue(256 * 8, Arc::clone(&stats));
///
/// let render = RenderThread::spawn(engine, producer, 256, stats).unwrap();
/// render.send(EngineCommand::Midi(MidiMessage::NoteOn { channel: 0, note: 69, velocity: 100 }));
/// let _engine = render.stop();
/// ```
#[derive(Debug)]
pub struct RenderThread {
    commands: Sender<EngineCommand>,
    running: Arc<AtomicBool>,
    stats: Arc<RenderStats>,
    handle: Option<JoinHandle<Engine>>,
}

impl RenderThread {
    /// Start rendering `engine` into `producer` in blocks of `block_size`.
    pub fn spawn(
        engine: Engine,
        producer: SampleProducer,
        block_size: usize,
        stats: Arc<RenderStats>,
    ) -> Result<Self> {
        let block_size = block_size.max(1);
        let (commands, rx) = bounded(COMMAND_QUEUE_CAPACITY);
        let running = Arc::new(AtomicBool::new(true));

        let handle = std::thread::Builder::new()
            .name("fmsynth-render".into())
            .spawn({
                let running = Arc::clone(&running);
                let stats = Arc::clone(&stats);
                move || render_loop(engine, producer, &rx, block_size, &running, &stats)
            })
            .map_err(Error::ThreadSpawn)?;

        tracing::info!(block_size, "render thread started");
        Ok(Self {
            commands,
            running,
            stats,
            handle: Some(handle),
        })
    }

    /// Queue a command without blocking. Returns `false` if the queue is
    /// full or the thread has stopped.
    pub fn send(&self, command: EngineCommand) -> bool {
        match self.commands.try_send(command) {
            Ok(()) => true,
            Err(TrySendError::Full(command)) => {
                tracing::warn!(?command, "command queue full, dropping");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// A sender other threads can use to queue commands.
    pub fn commands(&self) -> Sender<EngineCommand> {
        self.commands.clone()
    }

    /// Shared render statistics.
    pub fn stats(&self) -> &Arc<RenderStats> {
        &self.stats
    }

    /// Whether the thread is still rendering.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
            && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the thread, mark the queue finished and hand back the engine.
    /// Returns `None` if the thread panicked.
    pub fn stop(mut self) -> Option<Engine> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Option<Engine> {
        self.running.store(false, Ordering::Release);
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(engine) => {
                tracing::info!(stats = %self.stats.snapshot(), "render thread stopped");
                Some(engine)
            }
            Err(_) => {
                tracing::error!("render thread panicked");
                None
            }
        }
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn render_loop(
    mut engine: Engine,
    mut producer: SampleProducer,
    commands: &Receiver<EngineCommand>,
    block_size: usize,
    running: &AtomicBool,
    stats: &RenderStats,
) -> Engine {
    let mut block = vec![Fp32::ZERO; block_size];

    while running.load(Ordering::Acquire) {
        for command in commands.try_iter() {
            command.apply(&mut engine);
        }

        if producer.vacant_len() < block_size {
            std::thread::sleep(IDLE_SLEEP);
            continue;
        }

        let start = Instant::now();
        engine.render(&mut block);
        stats.record_block(start.elapsed());
        producer.push(&block);
    }

    // commands sent before the stop still count
    for command in commands.try_iter() {
        command.apply(&mut engine);
    }
    producer.finish();
    engine
}
