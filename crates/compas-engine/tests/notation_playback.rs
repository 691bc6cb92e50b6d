//! Integration tests for the notation processor.
//!
//! Drives whole play cycles through the public API and verifies them at the
//! signal level: key-on/key-off bookkeeping over note lifecycles, and
//! zero-crossing frequency measurements on the rendered streams to pin the
//! note-to-frequency mapping end to end.

use compas_engine::{Notation, NotationProcessor, Note, PortValue};

const SAMPLERATE: u32 = 48000;
const BUFFER_SIZE: usize = 512;

/// A one-channel processor at an integer periods-per-offset tempo.
fn processor_with_delay(delay: f64) -> NotationProcessor {
    let mut processor = NotationProcessor::new(SAMPLERATE, BUFFER_SIZE, 1).unwrap();
    processor.set_delay(delay);
    processor
}

/// Places one note on channel 0.
fn add_note(processor: &mut NotationProcessor, note: Note) {
    processor
        .add_notation(Notation::new(0))
        .unwrap()
        .lock()
        .unwrap()
        .add_note(note);
}

/// Runs periods until every voice released, with a hard cap.
fn run_to_completion(processor: &mut NotationProcessor, max_periods: usize) {
    for _ in 0..max_periods {
        processor.run_inter();

        if processor.key_on_total() > 0 && processor.active_voice_count() == 0 {
            return;
        }
    }

    panic!("voices still active after {max_periods} periods");
}

/// Concatenates the stream of the first signal on channel 0.
fn collect_stream(processor: &NotationProcessor) -> Vec<f64> {
    let recycling = processor.recycling(0).unwrap().lock().unwrap();
    let signal = recycling.audio_signals()[0].lock().unwrap();

    let mut samples = Vec::with_capacity(signal.stream_len() * BUFFER_SIZE);
    for index in 0..signal.stream_len() {
        samples.extend_from_slice(signal.stream_buffer(index).unwrap());
    }

    samples
}

/// Frequency estimate from sign changes, in Hz.
fn measured_frequency(signal: &[f64], samplerate: f64) -> f64 {
    let crossings = signal
        .windows(2)
        .filter(|pair| (pair[0] < 0.0) != (pair[1] < 0.0))
        .count();

    crossings as f64 / 2.0 * samplerate / signal.len() as f64
}

// ============================================================================
// 1. Voice lifecycle
// ============================================================================

#[test]
fn single_note_keys_on_and_off_exactly_once() {
    let mut processor = processor_with_delay(2.0);
    add_note(&mut processor, Note::new(0, 4, 69));

    run_to_completion(&mut processor, 32);

    assert_eq!(processor.key_on_total(), 1);
    assert_eq!(processor.key_off_total(), 1);
    assert_eq!(processor.active_voice_count(), 0);
    assert_eq!(processor.key_on_count(0, 48), 0);

    // The full span landed in one signal: 4 offsets of 2 periods each.
    let recycling = processor.recycling(0).unwrap().lock().unwrap();
    assert_eq!(recycling.len(), 1);
    assert_eq!(
        recycling.audio_signals()[0].lock().unwrap().frame_count(),
        4 * 2 * BUFFER_SIZE
    );
}

#[test]
fn overlapping_notes_of_one_pitch_count_separately() {
    let mut processor = processor_with_delay(2.0);

    {
        let notation = processor.add_notation(Notation::new(0)).unwrap();
        let mut notation = notation.lock().unwrap();
        notation.add_note(Note::new(0, 2, 69));
        notation.add_note(Note::new(1, 3, 69));
    }

    // Offset 1 plays inside both spans.
    for _ in 0..3 {
        processor.run_inter();
    }
    assert_eq!(processor.key_on_count(0, 48), 2);

    for _ in 0..7 {
        processor.run_inter();
    }

    assert_eq!(processor.key_on_total(), 2);
    assert_eq!(processor.key_off_total(), 2);
    assert_eq!(processor.key_on_count(0, 48), 0);
}

#[test]
fn chord_notes_key_on_together() {
    let mut processor = processor_with_delay(2.0);

    {
        let notation = processor.add_notation(Notation::new(0)).unwrap();
        let mut notation = notation.lock().unwrap();
        notation.add_note(Note::new(0, 1, 69));
        notation.add_note(Note::new(0, 1, 64));
    }

    processor.run_inter();

    assert_eq!(processor.active_voice_count(), 2);
    assert_eq!(processor.key_on_count(0, 48), 1);
    assert_eq!(processor.key_on_count(0, 43), 1);

    let recycling = processor.recycling(0).unwrap().lock().unwrap();
    assert_eq!(recycling.len(), 2);
}

#[test]
fn loop_totals_stay_balanced() {
    let mut processor = processor_with_delay(2.0);
    processor.set_loop(true, 0, 4);
    add_note(&mut processor, Note::new(0, 2, 69));

    for _ in 0..64 {
        processor.run_inter();
    }

    // Every pass keys the note on once and releases it once.
    assert!(processor.key_on_total() > 1);
    assert_eq!(processor.key_on_total(), processor.key_off_total());
    assert_eq!(processor.key_on_count(0, 48), 0);
}

// ============================================================================
// 2. Rendered signal
// ============================================================================

#[test]
fn row_69_renders_440_hz() {
    // Integer delay keeps consecutive period windows contiguous, so the
    // whole stream is one continuous sine.
    let mut processor = processor_with_delay(12.0);
    add_note(&mut processor, Note::new(0, 8, 69));

    run_to_completion(&mut processor, 256);

    let samples = collect_stream(&processor);
    assert!(samples.len() >= SAMPLERATE as usize);

    let frequency = measured_frequency(&samples[..SAMPLERATE as usize], f64::from(SAMPLERATE));
    assert!(
        (frequency - 440.0).abs() < 1.5,
        "row 69 should render 440 Hz, measured {frequency:.1} Hz"
    );
}

#[test]
fn row_60_renders_middle_c() {
    let mut processor = processor_with_delay(12.0);
    add_note(&mut processor, Note::new(0, 8, 60));

    run_to_completion(&mut processor, 256);

    let samples = collect_stream(&processor);
    let frequency = measured_frequency(&samples[..SAMPLERATE as usize], f64::from(SAMPLERATE));

    let expected = 440.0 * f64::exp2((60.0 - 69.0) / 12.0);
    assert!(
        (frequency - expected).abs() < 1.5,
        "row 60 should render {expected:.1} Hz, measured {frequency:.1} Hz"
    );
}

#[test]
fn zero_oscillator_volume_renders_silence() {
    let mut processor = processor_with_delay(2.0);
    processor.ports().synth[0]
        .volume
        .safe_write(PortValue::F64(0.0));

    add_note(&mut processor, Note::new(0, 1, 69));
    run_to_completion(&mut processor, 16);

    let samples = collect_stream(&processor);
    assert!(samples.iter().all(|&s| s == 0.0));
}

#[test]
fn chorus_stage_renders_signal() {
    let mut processor = processor_with_delay(2.0);
    processor
        .ports()
        .chorus_depth
        .safe_write(PortValue::F64(0.5));

    add_note(&mut processor, Note::new(0, 2, 69));
    run_to_completion(&mut processor, 16);

    let samples = collect_stream(&processor);
    let energy: f64 = samples.iter().map(|s| s * s).sum();
    assert!(energy > 0.0);
}

#[test]
fn noise_stage_thickens_the_voice() {
    let mut clean = processor_with_delay(2.0);
    add_note(&mut clean, Note::new(0, 1, 69));
    run_to_completion(&mut clean, 16);

    let mut noisy = processor_with_delay(2.0);
    noisy.ports().noise_gain.safe_write(PortValue::F64(0.5));
    add_note(&mut noisy, Note::new(0, 1, 69));
    run_to_completion(&mut noisy, 16);

    let clean_samples = collect_stream(&clean);
    let noisy_samples = collect_stream(&noisy);

    assert_eq!(clean_samples.len(), noisy_samples.len());
    assert!(
        clean_samples
            .iter()
            .zip(&noisy_samples)
            .any(|(a, b)| a != b),
        "noise gain should change the rendered stream"
    );
}
