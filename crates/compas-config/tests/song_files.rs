//! A song file read from disk drives the engine end to end.

use compas_config::Song;
use tempfile::TempDir;

const SONG: &str = r#"
name = "integration"
bpm = 120.0

[engine]
samplerate = 48000
buffer_size = 512
pcm_channels = 1

[[engine.synth.oscillators]]
waveform = "square"
volume = 0.5

[[tracks]]
audio_channel = 0
notes = [[0, 2, 60]]
"#;

#[test]
fn loaded_song_plays_notes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("demo.toml");
    std::fs::write(&path, SONG).unwrap();

    let song = Song::load(&path).unwrap();
    let mut processor = song.build_processor().unwrap();

    // The first note starts at offset zero, so the very first period
    // triggers it.
    processor.run_inter();
    assert_eq!(processor.key_on_total(), 1);
    assert_eq!(processor.active_voice_count(), 1);

    let recycling = processor.recycling(0).unwrap();
    let signal = recycling.lock().unwrap().audio_signals()[0].clone();
    let locked = signal.lock().unwrap();
    let buffer = locked.stream_buffer(0).unwrap();
    assert!(buffer.iter().any(|&sample| sample != 0.0));
}

#[test]
fn edited_song_survives_a_save() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("demo.toml");

    let mut song = Song::from_toml(SONG).unwrap();
    song.bpm = 96.0;
    song.tracks[0].notes.push((2, 4, 67));
    song.save(&path).unwrap();

    let reloaded = Song::load(&path).unwrap();
    assert_eq!(reloaded, song);
    assert_eq!(reloaded.end_offset(), 4);
}
