//! Live playback command.

use clap::Args;
use compas_config::Song;
use compas_io::{AppBufferRing, OutputStream, PeriodHandshake, PeriodMixer, StreamConfig};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Args)]
pub struct PlayArgs {
    /// Song file (TOML)
    #[arg(value_name = "SONG")]
    song: PathBuf,

    /// Output device name or index (overrides the song's device)
    #[arg(long)]
    device: Option<String>,
}

pub fn run(args: PlayArgs) -> anyhow::Result<()> {
    let song = Song::load(&args.song)?;

    if song.end_offset() == 0 {
        anyhow::bail!("song has no notes");
    }

    let mut processor = song.build_processor()?;
    let engine = &song.engine;

    let config = StreamConfig {
        sample_rate: engine.samplerate,
        buffer_size: engine.buffer_size as u32,
        pcm_channels: engine.pcm_channels,
        device: args.device.or_else(|| engine.device.clone()),
    };
    let mut stream = OutputStream::new(config)?;

    println!("Playing \"{}\"", song.name);
    println!("  Device: {}", stream.device_name()?);
    println!("  Sample rate: {} Hz", engine.samplerate);
    println!("  Buffer size: {} frames", engine.buffer_size);
    if song.loop_region.is_some() {
        println!("  Looping until interrupted");
    }
    println!("\nPress Ctrl+C to stop...\n");

    let ring = Arc::new(Mutex::new(AppBufferRing::new(
        usize::from(engine.pcm_channels),
        engine.buffer_size,
    )));
    let handshake = Arc::new(PeriodHandshake::new());

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        let handshake = Arc::clone(&handshake);
        ctrlc::set_handler(move || {
            println!("\nStopping...");
            running.store(false, Ordering::SeqCst);
            handshake.unblock();
        })?;
    }

    stream.start(Arc::clone(&ring), Arc::clone(&handshake))?;

    let mut mixer = PeriodMixer::new(usize::from(engine.pcm_channels));
    let end_offset = song.end_offset();
    let looping = song.loop_region.is_some();

    // One song period per ring period, in lockstep with the device.
    while running.load(Ordering::SeqCst) {
        if !looping && processor.offset_counter() >= end_offset && mixer.is_idle() {
            break;
        }
        processor.run_inter();
        {
            let mut ring = ring.lock().unwrap();
            let buffer = ring.next_buffer_mut();
            mixer.mix_period(&processor, buffer);
            ring.tic();
        }
        handshake.period_produced();
        handshake.wait_consumed();
    }

    stream.stop();
    println!("Done!");
    Ok(())
}
