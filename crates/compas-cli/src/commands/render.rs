//! Offline song rendering command.

use clap::Args;
use compas_config::Song;
use compas_io::{PeriodMixer, WavSpec, write_wav};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

#[derive(Args)]
pub struct RenderArgs {
    /// Song file (TOML)
    #[arg(value_name = "SONG")]
    song: PathBuf,

    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value = "32")]
    bit_depth: u16,
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    println!("Reading {}...", args.song.display());
    let mut song = Song::load(&args.song)?;

    if song.end_offset() == 0 {
        anyhow::bail!("song has no notes");
    }
    if song.loop_region.take().is_some() {
        println!("Ignoring loop region for offline render.");
    }

    let samplerate = song.engine.samplerate;
    let buffer_size = song.engine.buffer_size;
    let pcm_channels = song.engine.pcm_channels;
    let mut processor = song.build_processor()?;

    let note_periods = (song.end_offset() as f64 * processor.delay()).ceil() as u64;
    println!(
        "  \"{}\": {} track(s), {} offsets, {:.0} BPM",
        song.name,
        song.tracks.len(),
        song.end_offset(),
        song.bpm
    );
    println!("Rendering {note_periods} periods at {samplerate} Hz...");

    let pb = ProgressBar::new(note_periods);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap()
            .progress_chars("##-"),
    );

    let mut mixer = PeriodMixer::new(usize::from(pcm_channels));
    let mut samples = Vec::new();
    let mut period = vec![0.0f64; buffer_size * usize::from(pcm_channels)];
    let mut rendered = 0u64;

    // Run past the last note until every voice has drained.
    while processor.offset_counter() < song.end_offset() || !mixer.is_idle() {
        processor.run_inter();
        mixer.mix_period(&processor, &mut period);
        samples.extend_from_slice(&period);
        rendered += 1;
        pb.set_position(rendered.min(note_periods));
    }

    pb.finish_with_message("done");

    let output_rms = rms(&samples);
    let output_peak = peak(&samples);
    println!("\nStats:");
    println!(
        "  Output: RMS {:.1} dB, Peak {:.1} dB",
        linear_to_db(output_rms),
        linear_to_db(output_peak)
    );

    let spec = WavSpec {
        channels: pcm_channels,
        sample_rate: samplerate,
        bits_per_sample: args.bit_depth,
    };

    println!("\nWriting {}...", args.output.display());
    write_wav(&args.output, &samples, spec)?;
    println!("Done!");

    Ok(())
}

fn rms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f64).sqrt()
}

fn peak(samples: &[f64]) -> f64 {
    samples.iter().map(|s| s.abs()).fold(0.0, f64::max)
}

fn linear_to_db(linear: f64) -> f64 {
    if linear <= 0.0 { -120.0 } else { 20.0 * linear.log10() }
}
