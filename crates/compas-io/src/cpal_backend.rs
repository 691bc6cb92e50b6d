//! cpal-backed soundcard client.
//!
//! The device callback never renders audio: it copies whole periods out of
//! the [`AppBufferRing`](crate::ring::AppBufferRing) under the two-phase
//! [`PeriodHandshake`]. The callback clears its output region first and only
//! then copies, so a missed handshake comes out as silence rather than a
//! stale buffer.
//!
//! ```rust,ignore
//! use compas_io::{AppBufferRing, OutputStream, PeriodHandshake, StreamConfig};
//! use std::sync::{Arc, Mutex};
//!
//! let config = StreamConfig::default();
//! let ring = Arc::new(Mutex::new(AppBufferRing::new(2, 512)));
//! let handshake = Arc::new(PeriodHandshake::new());
//!
//! let mut stream = OutputStream::new(config)?;
//! stream.start(Arc::clone(&ring), Arc::clone(&handshake))?;
//! // audio loop: mix into ring.next_buffer_mut(), tic(),
//! // period_produced(), wait_consumed() ...
//! stream.stop();
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use compas_core::copy;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Host, Stream};

use crate::handshake::PeriodHandshake;
use crate::ring::{AppBufferRing, SharedAppBufferRing};
use crate::{IoError, Result};

/// Periods of slack before a callback treats the audio loop as stalled.
const CALLBACK_TIMEOUT_PERIODS: f64 = 4.0;

/// Human-readable device name via `description()` (cpal 0.17+).
fn device_name(device: &Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

/// Output device information.
#[derive(Debug, Clone)]
pub struct AudioDevice {
    /// Human-readable device name.
    pub name: String,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
    /// Channel count of the default output configuration.
    pub channels: u16,
}

/// Stream shape requested from the soundcard.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Period length in frames.
    pub buffer_size: u32,
    /// Interleaved output channels.
    pub pcm_channels: u16,
    /// Output device name or index (uses the default device if `None`).
    pub device: Option<String>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            buffer_size: 512,
            pcm_channels: 2,
            device: None,
        }
    }
}

/// List all available output devices.
pub fn list_output_devices() -> Result<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    if let Ok(outputs) = host.output_devices() {
        for device in outputs {
            if let Ok(name) = device_name(&device) {
                let (default_sample_rate, channels) = device
                    .default_output_config()
                    .map(|c| (c.sample_rate(), c.channels()))
                    .unwrap_or((48000, 2));

                devices.push(AudioDevice {
                    name,
                    default_sample_rate,
                    channels,
                });
            }
        }
    }

    Ok(devices)
}

/// The default output device, if the platform has one.
pub fn default_output_device() -> Result<Option<AudioDevice>> {
    let host = cpal::default_host();

    Ok(host.default_output_device().and_then(|device| {
        device_name(&device).ok().map(|name| {
            let (default_sample_rate, channels) = device
                .default_output_config()
                .map(|c| (c.sample_rate(), c.channels()))
                .unwrap_or((48000, 2));

            AudioDevice {
                name,
                default_sample_rate,
                channels,
            }
        })
    }))
}

/// Find an output device by index, exact name, or fuzzy match.
///
/// `name_or_index` can be a numeric index (e.g. "0"), an exact device name,
/// or a case-insensitive partial name.
fn find_output_device(host: &Host, name_or_index: &str) -> Result<Device> {
    let devices: Vec<_> = host
        .output_devices()
        .map_err(|e| IoError::Stream(e.to_string()))?
        .collect();

    // Try parsing as index first
    if let Ok(index) = name_or_index.parse::<usize>() {
        return devices.get(index).cloned().ok_or_else(|| {
            IoError::DeviceNotFound(format!(
                "output device index {index} (only {} devices available)",
                devices.len()
            ))
        });
    }

    // Try exact match
    for device in &devices {
        if device_name(device).is_ok_and(|n| n == name_or_index) {
            return Ok(device.clone());
        }
    }

    // Try case-insensitive partial match
    let search_lower = name_or_index.to_lowercase();
    let mut matches: Vec<_> = devices
        .iter()
        .filter_map(|device| {
            device_name(device).ok().and_then(|name| {
                if name.to_lowercase().contains(&search_lower) {
                    Some((device.clone(), name))
                } else {
                    None
                }
            })
        })
        .collect();

    match matches.len() {
        0 => Err(IoError::DeviceNotFound(format!(
            "no output device matching '{name_or_index}'"
        ))),
        1 => Ok(matches.remove(0).0),
        _ => {
            let names: Vec<_> = matches.iter().map(|(_, n)| n.as_str()).collect();
            tracing::warn!(
                search = name_or_index,
                ?names,
                chosen = names[0],
                "multiple output devices match, using first"
            );
            Ok(matches.remove(0).0)
        }
    }
}

/// Device-side period copy: clear, wait for the handoff, convert.
///
/// Returns `false` when the period was missed; `data` is left zeroed.
pub fn run_device_period(
    data: &mut [f32],
    ring: &Mutex<AppBufferRing>,
    handshake: &PeriodHandshake,
    timeout: Duration,
) -> bool {
    data.fill(0.0);
    if !handshake.wait_period_timeout(timeout) {
        return false;
    }

    {
        let ring = ring.lock().unwrap();
        let app = ring.current_buffer();
        let count = data.len().min(app.len());
        copy(data, 1, app, 1, count);
    }

    handshake.period_consumed();
    true
}

/// Soundcard client streaming ring periods to an output device.
///
/// The stream stays alive while this struct exists; [`stop`](Self::stop)
/// silences the callback and releases any parked thread, dropping the
/// struct tears the stream down.
pub struct OutputStream {
    device: Device,
    config: StreamConfig,
    running: Arc<AtomicBool>,
    handshake: Option<Arc<PeriodHandshake>>,
    _stream: Option<Stream>,
}

impl OutputStream {
    /// Resolves the configured device without opening a stream yet.
    pub fn new(config: StreamConfig) -> Result<Self> {
        if config.pcm_channels == 0 {
            return Err(IoError::UnsupportedFormat(
                "stream with zero channels".into(),
            ));
        }

        let host = cpal::default_host();
        let device = match &config.device {
            Some(name) => find_output_device(&host, name)?,
            None => host.default_output_device().ok_or(IoError::NoDevice)?,
        };

        Ok(Self {
            device,
            config,
            running: Arc::new(AtomicBool::new(false)),
            handshake: None,
            _stream: None,
        })
    }

    /// Name of the resolved output device.
    pub fn device_name(&self) -> Result<String> {
        device_name(&self.device).map_err(|e| IoError::Stream(e.to_string()))
    }

    /// The configured sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// The configured channel count.
    pub fn pcm_channels(&self) -> u16 {
        self.config.pcm_channels
    }

    /// Opens the device stream and starts the callback.
    ///
    /// Each callback waits for one handed-off ring period, copies it
    /// through the codec, and acknowledges it. Non-blocking; the audio
    /// loop keeps feeding `ring` under `handshake` from its own thread.
    pub fn start(
        &mut self,
        ring: SharedAppBufferRing,
        handshake: Arc<PeriodHandshake>,
    ) -> Result<()> {
        let stream_config = cpal::StreamConfig {
            channels: self.config.pcm_channels,
            sample_rate: self.config.sample_rate,
            buffer_size: cpal::BufferSize::Fixed(self.config.buffer_size),
        };

        let timeout = Duration::from_secs_f64(
            CALLBACK_TIMEOUT_PERIODS * f64::from(self.config.buffer_size)
                / f64::from(self.config.sample_rate.max(1)),
        );

        let running = Arc::clone(&self.running);
        self.running.store(true, Ordering::SeqCst);
        self.handshake = Some(Arc::clone(&handshake));

        let stream = self
            .device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if !running.load(Ordering::SeqCst) {
                        data.fill(0.0);
                        return;
                    }
                    run_device_period(data, &ring, &handshake, timeout);
                },
                move |err| {
                    tracing::error!("output stream error: {err}");
                },
                None,
            )
            .map_err(|e| IoError::Stream(e.to_string()))?;

        stream.play().map_err(|e| IoError::Stream(e.to_string()))?;
        tracing::info!(
            channels = self.config.pcm_channels,
            sample_rate = self.config.sample_rate,
            buffer_size = self.config.buffer_size,
            "output stream started"
        );

        self._stream = Some(stream);
        Ok(())
    }

    /// Silences the callback and releases any thread parked on the
    /// handshake; the stream is torn down on drop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handshake) = &self.handshake {
            handshake.unblock();
        }
        tracing::info!("output stream stopped");
    }

    /// Whether the callback is live.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
