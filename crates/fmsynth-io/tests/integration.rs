//! Integration tests for fmsynth-io: render pipeline and WAV export.

use fmsynth_core::Fp32;
use fmsynth_io::{
    EngineCommand, FillStatus, RenderStats, RenderThread, read_wav_i16, sample_queue,
    write_wav_fp32,
};
use fmsynth_synth::{Engine, MidiMessage, OperatorLayout};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

const SR: u32 = 48000;
const BLOCK: usize = 128;

// ---------------------------------------------------------------------------
// Real-time pipeline
// ---------------------------------------------------------------------------

#[test]
fn note_flows_from_command_to_callback_buffer() {
    let engine = Engine::new(SR, 4, OperatorLayout::FourOp).unwrap();
    let stats = Arc::new(RenderStats::new(BLOCK, SR));
    let (producer, mut consumer) = sample_queue(BLOCK * 8, Arc::clone(&stats));
    let render = RenderThread::spawn(engine, producer, BLOCK, Arc::clone(&stats)).unwrap();

    let on = MidiMessage::NoteOn {
        channel: 0,
        note: 69,
        velocity: 100,
    };
    assert!(render.send(EngineCommand::Midi(on)));

    // stereo device buffer: both channels carry the same mono sample
    let mut buffer = vec![0.0f32; BLOCK * 2];
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut heard = false;
    while Instant::now() < deadline && !heard {
        if consumer.fill_f32(&mut buffer, 2) == FillStatus::Complete {
            heard = buffer.iter().any(|s| *s != 0.0);
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    assert!(heard, "note never reached the output");
    for frame in buffer.chunks(2) {
        assert_eq!(frame[0], frame[1]);
        assert!(frame[0].abs() <= 1.0);
    }

    let engine = render.stop().unwrap();
    assert_eq!(engine.owner(69), Some(0));
    assert!(stats.snapshot().blocks > 0);
}

#[test]
fn dropping_render_thread_finishes_stream() {
    let engine = Engine::new(SR, 2, OperatorLayout::TwoOp).unwrap();
    let stats = Arc::new(RenderStats::new(BLOCK, SR));
    let (producer, mut consumer) = sample_queue(BLOCK * 2, Arc::clone(&stats));
    drop(RenderThread::spawn(engine, producer, BLOCK, stats).unwrap());

    let mut buffer = vec![0i16; BLOCK];
    let mut finished = false;
    for _ in 0..8 {
        if consumer.fill_i16(&mut buffer, 1) == FillStatus::Finished {
            finished = true;
            break;
        }
    }
    assert!(finished);
}

// ---------------------------------------------------------------------------
// Offline render to WAV
// ---------------------------------------------------------------------------

#[test]
fn offline_render_round_trips_through_wav() {
    let mut engine = Engine::new(SR, 4, OperatorLayout::FourOp).unwrap();
    engine.note_on(60, 100);
    engine.note_on(64, 100);

    let mut samples = vec![Fp32::ZERO; SR as usize / 10];
    for block in samples.chunks_mut(BLOCK) {
        engine.render(block);
    }

    let file = NamedTempFile::new().unwrap();
    write_wav_fp32(file.path(), &samples, SR).unwrap();

    let (pcm, rate) = read_wav_i16(file.path()).unwrap();
    assert_eq!(rate, SR);
    assert_eq!(pcm.len(), samples.len());
    for (a, b) in samples.iter().zip(&pcm) {
        assert_eq!(a.to_i16(), *b);
    }
    assert!(pcm.iter().any(|&s| s != 0));
}
