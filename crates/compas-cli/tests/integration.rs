//! Integration tests for compas-cli.
//!
//! Tests cover CLI binary invocation and end-to-end song rendering.

use std::process::Command;

/// Helper to get the path to the `compas` binary built by cargo.
fn compas_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_compas"))
}

const DEMO_SONG: &str = r#"
name = "cli demo"
bpm = 120.0

[engine]
samplerate = 48000
buffer_size = 512
pcm_channels = 1

[[tracks]]
audio_channel = 0
notes = [[0, 2, 60]]
"#;

// ---------------------------------------------------------------------------
// CLI binary tests -- help and version
// ---------------------------------------------------------------------------

#[test]
fn cli_help_works() {
    let output = compas_bin()
        .arg("--help")
        .output()
        .expect("failed to run compas --help");

    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("compas sequencer engine CLI"));
    assert!(stdout.contains("render"));
    assert!(stdout.contains("play"));
    assert!(stdout.contains("devices"));
}

#[test]
fn cli_version_works() {
    let output = compas_bin()
        .arg("--version")
        .output()
        .expect("failed to run compas --version");

    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("compas"),
        "version output should contain 'compas'"
    );
}

// ---------------------------------------------------------------------------
// CLI binary tests -- `compas render` (end-to-end song rendering)
// ---------------------------------------------------------------------------

#[test]
fn cli_render_song_to_wav() {
    use tempfile::TempDir;

    let dir = TempDir::new().unwrap();
    let song_path = dir.path().join("demo.toml");
    let output_path = dir.path().join("demo.wav");

    std::fs::write(&song_path, DEMO_SONG).unwrap();

    let output = compas_bin()
        .args([
            "render",
            song_path.to_str().unwrap(),
            output_path.to_str().unwrap(),
        ])
        .output()
        .expect("failed to run compas render");

    assert!(
        output.status.success(),
        "compas render failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    assert!(output_path.exists(), "output WAV should exist");

    let (samples, spec) = compas_io::read_wav(&output_path).unwrap();
    assert_eq!(spec.sample_rate, 48000);
    assert_eq!(spec.channels, 1);
    assert!(samples.iter().any(|&s| s != 0.0), "render should be audible");
}

#[test]
fn cli_render_ignores_loop_regions() {
    use tempfile::TempDir;

    let dir = TempDir::new().unwrap();
    let song_path = dir.path().join("looped.toml");
    let output_path = dir.path().join("looped.wav");

    let song = format!("loop_region = [0, 8]\n{DEMO_SONG}");
    std::fs::write(&song_path, song).unwrap();

    let output = compas_bin()
        .args([
            "render",
            song_path.to_str().unwrap(),
            output_path.to_str().unwrap(),
        ])
        .output()
        .expect("failed to run compas render");

    assert!(
        output.status.success(),
        "compas render failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Ignoring loop region"));
    assert!(output_path.exists());
}

#[test]
fn cli_render_empty_song_fails() {
    use tempfile::TempDir;

    let dir = TempDir::new().unwrap();
    let song_path = dir.path().join("empty.toml");
    std::fs::write(&song_path, "name = \"empty\"\n").unwrap();

    let output = compas_bin()
        .args([
            "render",
            song_path.to_str().unwrap(),
            dir.path().join("empty.wav").to_str().unwrap(),
        ])
        .output()
        .expect("failed to run compas render");

    assert!(!output.status.success(), "should fail for an empty song");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("no notes"),
        "error should mention missing notes, got: {stderr}"
    );
}

#[test]
fn cli_render_invalid_song_fails() {
    use tempfile::TempDir;

    let dir = TempDir::new().unwrap();
    let song_path = dir.path().join("broken.toml");
    std::fs::write(
        &song_path,
        "[engine]\nsamplerate = 0\n\n[[tracks]]\naudio_channel = 0\nnotes = [[0, 2, 60]]\n",
    )
    .unwrap();

    let output = compas_bin()
        .args([
            "render",
            song_path.to_str().unwrap(),
            dir.path().join("broken.wav").to_str().unwrap(),
        ])
        .output()
        .expect("failed to run compas render");

    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("samplerate"),
        "error should name the bad field, got: {stderr}"
    );
}
