//! Notation-driven voice scheduler.
//!
//! [`NotationProcessor`] walks a sixteenth-note grid at a tempo expressed as
//! soundcard periods per grid offset. Each period it keys on the notes whose
//! region starts at the current offset, renders one buffer for every active
//! voice through the per-channel operator chain, and advances the tempo
//! counters. Rendered buffers land in per-channel [`Recycling`] containers
//! where a soundcard bridge or file writer picks them up.

use std::sync::{Arc, Mutex};

use compas_core::{FilterType, Interpolation, SampleFormat, Waveform, clear, copy};
use tracing::{debug, trace};

use crate::audio_signal::{AudioSignal, SharedAudioSignal};
use crate::channel_data::{ChannelData, KEY_COUNT, ScopeData};
use crate::error::{EngineError, Result};
use crate::notation::{Notation, SharedNotation};
use crate::note::Note;
use crate::port::{Port, PortValue, SharedPort};
use crate::recall_id::{RecallId, SoundScope};
use crate::recycling::{Recycling, SharedRecycling};
use crate::timestamp::Timestamp;

/// Tempo the processor starts out with.
pub const DEFAULT_BPM: f64 = 120.0;

/// Grid rows below this index fall outside the MIDI range by default.
///
/// With the companion [`DEFAULT_MIDI_START_MAPPING`] of zero, row `y` maps
/// to MIDI note `y - 21`, which puts row 69 at 440 Hz.
pub const DEFAULT_AUDIO_START_MAPPING: u32 = 21;

/// First MIDI note covered by the grid, paired with
/// [`DEFAULT_AUDIO_START_MAPPING`].
pub const DEFAULT_MIDI_START_MAPPING: u32 = 0;

/// Soundcard periods per sixteenth note at the given tempo.
pub fn delay_for_bpm(samplerate: u32, buffer_size: usize, bpm: f64) -> f64 {
    (f64::from(samplerate) / buffer_size as f64) * (60.0 / (4.0 * bpm))
}

/// Control ports of one of the three FM oscillators.
///
/// Specifiers follow the `synth-<n>-...` naming so a control surface can
/// address them uniformly.
#[derive(Debug)]
pub struct OscillatorPorts {
    /// Waveform selector, an index into [`Waveform::ALL`].
    pub oscillator: SharedPort,
    /// Octave shift added to the note key.
    pub octave: SharedPort,
    /// Semitone shift added to the note key.
    pub key: SharedPort,
    /// Start phase in frames.
    pub phase: SharedPort,
    /// Linear gain the oscillator sums onto the voice.
    pub volume: SharedPort,
    /// LFO waveform selector, an index into [`Waveform::ALL`].
    pub lfo_oscillator: SharedPort,
    /// LFO rate in Hz.
    pub lfo_frequency: SharedPort,
    /// Frequency modulation depth.
    pub lfo_depth: SharedPort,
    /// Detune in cents.
    pub tuning: SharedPort,
}

impl OscillatorPorts {
    fn new(index: usize) -> Self {
        // Only the first oscillator sounds out of the box.
        let volume = if index == 0 { 1.0 } else { 0.0 };

        OscillatorPorts {
            oscillator: shared_port(format!("synth-{index}-oscillator"), PortValue::U64(0)),
            octave: shared_port(format!("synth-{index}-octave"), PortValue::F64(0.0)),
            key: shared_port(format!("synth-{index}-key"), PortValue::F64(0.0)),
            phase: shared_port(format!("synth-{index}-phase"), PortValue::F64(0.0)),
            volume: shared_port(format!("synth-{index}-volume"), PortValue::F64(volume)),
            lfo_oscillator: shared_port(
                format!("synth-{index}-lfo-oscillator"),
                PortValue::U64(0),
            ),
            lfo_frequency: shared_port(format!("synth-{index}-lfo-frequency"), PortValue::F64(6.0)),
            lfo_depth: shared_port(format!("synth-{index}-lfo-depth"), PortValue::F64(0.0)),
            tuning: shared_port(format!("synth-{index}-tuning"), PortValue::F64(0.0)),
        }
    }

    fn snapshot(&self) -> OscillatorSnapshot {
        OscillatorSnapshot {
            waveform: waveform_port(&self.oscillator),
            octave: float_port(&self.octave, 0.0),
            key: float_port(&self.key, 0.0),
            phase: float_port(&self.phase, 0.0),
            volume: float_port(&self.volume, 0.0),
            lfo_waveform: waveform_port(&self.lfo_oscillator),
            lfo_frequency: float_port(&self.lfo_frequency, 6.0),
            lfo_depth: float_port(&self.lfo_depth, 0.0),
            tuning: float_port(&self.tuning, 0.0),
        }
    }
}

/// The full control rack of the synth chain.
///
/// Every field is a [`SharedPort`], so a control surface or automation
/// thread writes values concurrently while the processor reads a consistent
/// snapshot once per period.
#[derive(Debug)]
pub struct SynthPorts {
    /// The three additive FM oscillators.
    pub synth: [OscillatorPorts; 3],
    /// White noise gain, `0.0` keeps the stage out of the chain.
    pub noise_gain: SharedPort,
    /// Pitch interpolation selector, an index into [`Interpolation::ALL`].
    pub pitch_type: SharedPort,
    /// Pitch shift in cents, `0.0` keeps the stage out of the chain.
    pub pitch_tuning: SharedPort,
    /// Enables vibrato inside the pitch stage.
    pub vibrato_enabled: SharedPort,
    /// Vibrato intensity.
    pub vibrato_gain: SharedPort,
    /// Vibrato LFO depth.
    pub vibrato_lfo_depth: SharedPort,
    /// Vibrato LFO rate in Hz.
    pub vibrato_lfo_freq: SharedPort,
    /// Enables the low-pass filter stage.
    pub low_pass_enabled: SharedPort,
    /// Low-pass resonance as linear Q.
    pub low_pass_q_lin: SharedPort,
    /// Low-pass output gain.
    pub low_pass_filter_gain: SharedPort,
    /// Enables the high-pass filter stage.
    pub high_pass_enabled: SharedPort,
    /// High-pass resonance as linear Q.
    pub high_pass_q_lin: SharedPort,
    /// High-pass output gain.
    pub high_pass_filter_gain: SharedPort,
    /// Enables the chorus stage.
    pub chorus_enabled: SharedPort,
    /// Chorus LFO waveform selector, an index into [`Waveform::ALL`].
    pub chorus_lfo_oscillator: SharedPort,
    /// Chorus LFO rate in Hz.
    pub chorus_lfo_frequency: SharedPort,
    /// Chorus detune depth, `0.0` keeps the stage out of the chain.
    pub chorus_depth: SharedPort,
    /// Dry/wet balance.
    pub chorus_mix: SharedPort,
    /// Chorus delay amount.
    pub chorus_delay: SharedPort,
}

impl SynthPorts {
    fn new() -> Self {
        SynthPorts {
            synth: core::array::from_fn(OscillatorPorts::new),
            noise_gain: shared_port("noise-gain", PortValue::F64(0.0)),
            pitch_type: shared_port("pitch-type", PortValue::U64(2)),
            pitch_tuning: shared_port("pitch-tuning", PortValue::F64(0.0)),
            vibrato_enabled: shared_port("vibrato-enabled", PortValue::Bool(false)),
            vibrato_gain: shared_port("vibrato-gain", PortValue::F64(1.0)),
            vibrato_lfo_depth: shared_port("vibrato-lfo-depth", PortValue::F64(1.0)),
            vibrato_lfo_freq: shared_port("vibrato-lfo-freq", PortValue::F64(8.172)),
            low_pass_enabled: shared_port("low-pass-enabled", PortValue::Bool(false)),
            low_pass_q_lin: shared_port("low-pass-q-lin", PortValue::F64(1.0)),
            low_pass_filter_gain: shared_port("low-pass-filter-gain", PortValue::F64(1.0)),
            high_pass_enabled: shared_port("high-pass-enabled", PortValue::Bool(false)),
            high_pass_q_lin: shared_port("high-pass-q-lin", PortValue::F64(1.0)),
            high_pass_filter_gain: shared_port("high-pass-filter-gain", PortValue::F64(1.0)),
            chorus_enabled: shared_port("chorus-enabled", PortValue::Bool(true)),
            chorus_lfo_oscillator: shared_port("chorus-lfo-oscillator", PortValue::U64(0)),
            chorus_lfo_frequency: shared_port("chorus-lfo-frequency", PortValue::F64(10.0)),
            chorus_depth: shared_port("chorus-depth", PortValue::F64(0.0)),
            chorus_mix: shared_port("chorus-mix", PortValue::F64(0.5)),
            chorus_delay: shared_port("chorus-delay", PortValue::F64(0.0)),
        }
    }

    /// Reads every port once. Voices rendered in the same period all see the
    /// same values no matter how the control side writes meanwhile.
    fn snapshot(&self) -> SynthSnapshot {
        SynthSnapshot {
            oscillators: core::array::from_fn(|i| self.synth[i].snapshot()),
            noise_gain: float_port(&self.noise_gain, 0.0),
            pitch_type: Interpolation::from_index(index_port(&self.pitch_type))
                .unwrap_or_default(),
            pitch_tuning: float_port(&self.pitch_tuning, 0.0),
            vibrato_enabled: switch_port(&self.vibrato_enabled),
            vibrato_gain: float_port(&self.vibrato_gain, 1.0),
            vibrato_lfo_depth: float_port(&self.vibrato_lfo_depth, 1.0),
            vibrato_lfo_freq: float_port(&self.vibrato_lfo_freq, 8.172),
            low_pass_enabled: switch_port(&self.low_pass_enabled),
            low_pass_q_lin: float_port(&self.low_pass_q_lin, 1.0),
            low_pass_filter_gain: float_port(&self.low_pass_filter_gain, 1.0),
            high_pass_enabled: switch_port(&self.high_pass_enabled),
            high_pass_q_lin: float_port(&self.high_pass_q_lin, 1.0),
            high_pass_filter_gain: float_port(&self.high_pass_filter_gain, 1.0),
            chorus_enabled: switch_port(&self.chorus_enabled),
            chorus_lfo_oscillator: waveform_port(&self.chorus_lfo_oscillator),
            chorus_lfo_frequency: float_port(&self.chorus_lfo_frequency, 10.0),
            chorus_depth: float_port(&self.chorus_depth, 0.0),
            chorus_mix: float_port(&self.chorus_mix, 0.5),
            chorus_delay: float_port(&self.chorus_delay, 0.0),
        }
    }
}

impl Default for SynthPorts {
    fn default() -> Self {
        SynthPorts::new()
    }
}

fn shared_port(specifier: impl Into<String>, value: PortValue) -> SharedPort {
    Arc::new(Port::new(specifier, value))
}

fn float_port(port: &SharedPort, fallback: f64) -> f64 {
    port.safe_read().as_f64().unwrap_or(fallback)
}

fn switch_port(port: &SharedPort) -> bool {
    port.safe_read().as_bool().unwrap_or(false)
}

fn index_port(port: &SharedPort) -> usize {
    port.safe_read().as_u64().unwrap_or(0) as usize
}

fn waveform_port(port: &SharedPort) -> Waveform {
    Waveform::from_index(index_port(port)).unwrap_or_default()
}

#[derive(Debug, Clone)]
struct OscillatorSnapshot {
    waveform: Waveform,
    octave: f64,
    key: f64,
    phase: f64,
    volume: f64,
    lfo_waveform: Waveform,
    lfo_frequency: f64,
    lfo_depth: f64,
    tuning: f64,
}

#[derive(Debug, Clone)]
struct SynthSnapshot {
    oscillators: [OscillatorSnapshot; 3],
    noise_gain: f64,
    pitch_type: Interpolation,
    pitch_tuning: f64,
    vibrato_enabled: bool,
    vibrato_gain: f64,
    vibrato_lfo_depth: f64,
    vibrato_lfo_freq: f64,
    low_pass_enabled: bool,
    low_pass_q_lin: f64,
    low_pass_filter_gain: f64,
    high_pass_enabled: bool,
    high_pass_q_lin: f64,
    high_pass_filter_gain: f64,
    chorus_enabled: bool,
    chorus_lfo_oscillator: Waveform,
    chorus_lfo_frequency: f64,
    chorus_depth: f64,
    chorus_mix: f64,
    chorus_delay: f64,
}

/// One sounding note and the stream it renders into.
#[derive(Debug)]
struct ActiveVoice {
    note: Note,
    audio_channel: u32,
    midi_note: u32,
    recall_id: RecallId,
    audio_signal: SharedAudioSignal,
}

/// Plays notation pages through the per-channel synth chain.
///
/// Drive it by calling [`run_inter`](NotationProcessor::run_inter) once per
/// soundcard period. Everything else, keying voices on and off and the tempo
/// counters, follows from that call.
#[derive(Debug)]
pub struct NotationProcessor {
    samplerate: u32,
    buffer_size: usize,
    format: SampleFormat,
    audio_channels: u32,
    scope: SoundScope,
    delay: f64,
    delay_counter: f64,
    offset_counter: u64,
    looping: bool,
    loop_start: u64,
    loop_end: u64,
    audio_start_mapping: u32,
    midi_start_mapping: u32,
    reverse_mapping: bool,
    notation: Vec<SharedNotation>,
    recycling: Vec<SharedRecycling>,
    scope_data: [ScopeData; SoundScope::COUNT],
    ports: SynthPorts,
    active_voices: Vec<ActiveVoice>,
    total_key_on: u64,
    total_key_off: u64,
}

impl NotationProcessor {
    /// Creates a processor playing in the [`SoundScope::Notation`] scope.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoAudioChannels`] when `audio_channels` is
    /// zero.
    pub fn new(samplerate: u32, buffer_size: usize, audio_channels: u32) -> Result<Self> {
        Self::with_scope(samplerate, buffer_size, audio_channels, SoundScope::default())
    }

    /// Creates a processor whose voices carry the given scope in their
    /// recall ids.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoAudioChannels`] when `audio_channels` is
    /// zero.
    pub fn with_scope(
        samplerate: u32,
        buffer_size: usize,
        audio_channels: u32,
        scope: SoundScope,
    ) -> Result<Self> {
        if audio_channels == 0 {
            return Err(EngineError::NoAudioChannels);
        }

        let recycling = (0..audio_channels)
            .map(|audio_channel| Arc::new(Mutex::new(Recycling::new(audio_channel))))
            .collect();

        Ok(NotationProcessor {
            samplerate,
            buffer_size,
            format: SampleFormat::F64,
            audio_channels,
            scope,
            delay: delay_for_bpm(samplerate, buffer_size, DEFAULT_BPM),
            delay_counter: 0.0,
            offset_counter: 0,
            looping: false,
            loop_start: 0,
            loop_end: 64,
            audio_start_mapping: DEFAULT_AUDIO_START_MAPPING,
            midi_start_mapping: DEFAULT_MIDI_START_MAPPING,
            reverse_mapping: false,
            notation: Vec::new(),
            recycling,
            scope_data: core::array::from_fn(|_| {
                ScopeData::new(audio_channels, samplerate, buffer_size)
            }),
            ports: SynthPorts::new(),
            active_voices: Vec::new(),
            total_key_on: 0,
            total_key_off: 0,
        })
    }

    /// Sample rate in Hz.
    pub fn samplerate(&self) -> u32 {
        self.samplerate
    }

    /// Frames per soundcard period.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Format stamped onto the audio signals this processor creates.
    pub fn format(&self) -> SampleFormat {
        self.format
    }

    /// Sets the format stamped onto newly created audio signals.
    pub fn set_format(&mut self, format: SampleFormat) {
        self.format = format;
    }

    /// Number of audio channels.
    pub fn audio_channels(&self) -> u32 {
        self.audio_channels
    }

    /// Scope the voices play in.
    pub fn scope(&self) -> SoundScope {
        self.scope
    }

    /// Soundcard periods per grid offset.
    pub fn delay(&self) -> f64 {
        self.delay
    }

    /// Sets the tempo as periods per grid offset, floored at one period.
    pub fn set_delay(&mut self, delay: f64) {
        self.delay = delay.max(1.0);
    }

    /// Sets the tempo in beats per minute.
    pub fn set_bpm(&mut self, bpm: f64) {
        self.set_delay(delay_for_bpm(self.samplerate, self.buffer_size, bpm));
    }

    /// Current grid offset.
    pub fn offset_counter(&self) -> u64 {
        self.offset_counter
    }

    /// Periods played within the current grid offset.
    pub fn delay_counter(&self) -> f64 {
        self.delay_counter
    }

    /// Enables or disables looping over `[loop_start, loop_end)`.
    ///
    /// An empty or inverted region disables looping.
    pub fn set_loop(&mut self, looping: bool, loop_start: u64, loop_end: u64) {
        if looping && loop_start >= loop_end {
            debug!(loop_start, loop_end, "refusing empty loop region");
            self.looping = false;
            return;
        }

        self.looping = looping;
        self.loop_start = loop_start;
        self.loop_end = loop_end;
    }

    /// Sets how grid rows translate to MIDI notes.
    ///
    /// `midi = y - audio_start + midi_start`, or mirrored top to bottom when
    /// `reverse` is set. Rows mapping outside `0..128` stay silent.
    pub fn set_mapping(&mut self, audio_start_mapping: u32, midi_start_mapping: u32, reverse: bool) {
        self.audio_start_mapping = audio_start_mapping;
        self.midi_start_mapping = midi_start_mapping;
        self.reverse_mapping = reverse;
    }

    /// The control rack.
    pub fn ports(&self) -> &SynthPorts {
        &self.ports
    }

    /// Notation pages attached so far.
    pub fn notation(&self) -> &[SharedNotation] {
        &self.notation
    }

    /// Recycling container of one audio channel.
    pub fn recycling(&self, audio_channel: u32) -> Option<&SharedRecycling> {
        self.recycling.get(audio_channel as usize)
    }

    /// Attaches a notation page.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ChannelOutOfRange`] when the page addresses a
    /// channel this processor does not have.
    pub fn add_notation(&mut self, notation: Notation) -> Result<SharedNotation> {
        if notation.audio_channel() >= self.audio_channels {
            return Err(EngineError::channel_out_of_range(
                notation.audio_channel(),
                self.audio_channels,
            ));
        }

        let shared = Arc::new(Mutex::new(notation));
        self.notation.push(Arc::clone(&shared));

        Ok(shared)
    }

    /// Voices currently sounding.
    pub fn active_voice_count(&self) -> usize {
        self.active_voices.len()
    }

    /// Voices keyed on since construction.
    pub fn key_on_total(&self) -> u64 {
        self.total_key_on
    }

    /// Voices keyed off since construction.
    pub fn key_off_total(&self) -> u64 {
        self.total_key_off
    }

    /// Sounding voices of one MIDI note on one channel, in the processor's
    /// scope.
    pub fn key_on_count(&self, audio_channel: u32, midi_note: u32) -> u32 {
        if audio_channel >= self.audio_channels || midi_note as usize >= KEY_COUNT {
            return 0;
        }

        self.scope_data[self.scope.index()]
            .channel_data(audio_channel as usize)
            .input_data(midi_note as usize)
            .key_on()
    }

    /// Runs one soundcard period.
    ///
    /// On the first period of a grid offset the due notes key on. Every
    /// period each active voice renders one buffer, then the tempo counters
    /// advance.
    pub fn run_inter(&mut self) {
        if self.delay_counter == 0.0 {
            self.play();
        }

        self.feed();
        self.counter_change();
    }

    /// Keys on every audible note starting at the current offset.
    fn play(&mut self) {
        let timestamp = Timestamp::from_offset(self.offset_counter);

        let mut starting: Vec<(u32, Note)> = Vec::new();

        for audio_channel in 0..self.audio_channels {
            let Some(page) = Notation::find_near_timestamp(&self.notation, audio_channel, timestamp)
            else {
                continue;
            };

            let notes = { page.lock().unwrap().find_offset(self.offset_counter) };

            starting.extend(
                notes
                    .into_iter()
                    .filter(|note| note.is_audible())
                    .map(|note| (audio_channel, note)),
            );
        }

        for (audio_channel, note) in starting {
            self.key_on(audio_channel, note);
        }
    }

    fn key_on(&mut self, audio_channel: u32, note: Note) {
        let Some(midi_note) = self.midi_note_for(note.y) else {
            debug!(y = note.y, "grid row maps outside the MIDI range");
            return;
        };

        let recall_id = RecallId::new(self.scope, audio_channel);

        self.scope_data[self.scope.index()]
            .channel_data_mut(audio_channel as usize)
            .input_data_mut(midi_note as usize)
            .increment_key_on();

        let frame_count = (self.buffer_size as f64 * self.delay * note.width() as f64) as usize;

        let mut audio_signal = AudioSignal::new(self.samplerate, self.buffer_size, self.format);
        audio_signal.set_delay(self.delay);
        audio_signal.set_recall_id(Some(recall_id));
        audio_signal.feed(frame_count);

        let audio_signal = Arc::new(Mutex::new(audio_signal));

        self.recycling[audio_channel as usize]
            .lock()
            .unwrap()
            .add_audio_signal(Arc::clone(&audio_signal));

        self.total_key_on += 1;

        debug!(
            audio_channel,
            midi_note,
            x0 = note.x0,
            x1 = note.x1,
            frame_count,
            "key on"
        );

        self.active_voices.push(ActiveVoice {
            note,
            audio_channel,
            midi_note,
            recall_id,
            audio_signal,
        });
    }

    fn key_off(&mut self, voice: &ActiveVoice) {
        self.scope_data[voice.recall_id.scope.index()]
            .channel_data_mut(voice.audio_channel as usize)
            .input_data_mut(voice.midi_note as usize)
            .decrement_key_on();

        self.total_key_off += 1;

        debug!(
            audio_channel = voice.audio_channel,
            midi_note = voice.midi_note,
            "key off"
        );
    }

    /// Releases notes whose region ended, then renders one buffer per
    /// remaining voice.
    fn feed(&mut self) {
        let mut index = 0;
        while index < self.active_voices.len() {
            if self.offset_counter >= self.active_voices[index].note.x1 {
                let voice = self.active_voices.remove(index);
                self.key_off(&voice);
            } else {
                index += 1;
            }
        }

        let mut voices = std::mem::take(&mut self.active_voices);

        let mut index = 0;
        while index < voices.len() {
            if self.stream_feed(&voices[index]) {
                index += 1;
            } else {
                let voice = voices.remove(index);
                self.key_off(&voice);
            }
        }

        self.active_voices = voices;
    }

    /// Renders one period of one voice. Returns `false` once the stream is
    /// used up and the voice should be released.
    fn stream_feed(&mut self, voice: &ActiveVoice) -> bool {
        let snapshot = self.ports.snapshot();

        let buffer_size = self.buffer_size;
        let elapsed = self.offset_counter.saturating_sub(voice.note.x0) as f64 * self.delay
            + self.delay_counter;

        let frame_offset = (elapsed * buffer_size as f64).floor() as usize;
        let frame_end = ((elapsed + 1.0) * buffer_size as f64).floor() as usize;

        let midi_key = f64::from(voice.midi_note) - 48.0;

        let channel_data = self.scope_data[voice.recall_id.scope.index()]
            .channel_data_mut(voice.audio_channel as usize);

        let mut signal = voice.audio_signal.lock().unwrap();

        let total = signal.frame_count();
        if frame_offset >= total {
            return false;
        }

        let Some(buffer) = signal.current_buffer_mut() else {
            return false;
        };

        let frames = (frame_end - frame_offset)
            .min(total - frame_offset)
            .min(buffer.len());
        let buffer = &mut buffer[..frames];

        render_voice(channel_data, &snapshot, midi_key, frame_offset as u64, buffer);

        signal.next();

        true
    }

    /// Advances the tempo counters, wrapping at the loop end.
    fn counter_change(&mut self) {
        if self.delay_counter + 1.0 >= self.delay {
            self.delay_counter = 0.0;

            if self.looping && self.offset_counter + 1 >= self.loop_end {
                trace!(
                    offset_counter = self.offset_counter,
                    loop_start = self.loop_start,
                    "loop wrap"
                );

                self.offset_counter = self.loop_start;
                self.flush_voices();
            } else {
                self.offset_counter += 1;
            }
        } else {
            self.delay_counter += 1.0;
        }
    }

    /// Keys off every active voice. Runs on loop wrap so no voice outlives
    /// the region it was keyed on in.
    fn flush_voices(&mut self) {
        let voices = std::mem::take(&mut self.active_voices);

        for voice in &voices {
            self.key_off(voice);
        }
    }

    fn midi_note_for(&self, y: u32) -> Option<u32> {
        let mapped = if self.reverse_mapping {
            KEY_COUNT as i64 - i64::from(y) - 1 - i64::from(self.audio_start_mapping)
                + i64::from(self.midi_start_mapping)
        } else {
            i64::from(y) - i64::from(self.audio_start_mapping)
                + i64::from(self.midi_start_mapping)
        };

        (0..KEY_COUNT as i64)
            .contains(&mapped)
            .then_some(mapped as u32)
    }
}

/// Runs the operator chain for one period.
///
/// Stage order is fixed: the three oscillators sum onto the buffer, then
/// noise, pitch, low-pass, high-pass and chorus each rewrite it in place
/// when their ports enable them.
fn render_voice(
    channel_data: &mut ChannelData,
    snapshot: &SynthSnapshot,
    midi_key: f64,
    frame_offset: u64,
    buffer: &mut [f64],
) {
    for (oscillator, params) in channel_data.synth.iter_mut().zip(&snapshot.oscillators) {
        oscillator.set_waveform(params.waveform);
        oscillator
            .set_frequency(((params.octave * 12.0 + params.key + midi_key) / 12.0).exp2() * 440.0);
        oscillator.set_phase(params.phase);
        oscillator.set_volume(params.volume);
        oscillator.set_lfo_waveform(params.lfo_waveform);
        oscillator.set_lfo_frequency(params.lfo_frequency);
        oscillator.set_lfo_depth(params.lfo_depth);
        oscillator.set_tuning(params.tuning);
        oscillator.set_offset(frame_offset);
        oscillator.compute(buffer);
    }

    if snapshot.noise_gain != 0.0 {
        let noise = &mut channel_data.noise;
        noise.set_volume(snapshot.noise_gain);
        noise.set_frequency((midi_key / 12.0).exp2() * 440.0);
        noise.set_offset(frame_offset);
        noise.compute(buffer);
    }

    if snapshot.pitch_tuning != 0.0 {
        let pitch = &mut channel_data.pitch;
        pitch.set_interpolation(snapshot.pitch_type);
        pitch.set_base_key(midi_key);
        pitch.set_tuning(snapshot.pitch_tuning);
        pitch.set_vibrato_enabled(snapshot.vibrato_enabled);
        pitch.set_vibrato_gain(snapshot.vibrato_gain);
        pitch.set_vibrato_lfo_depth(snapshot.vibrato_lfo_depth);
        pitch.set_vibrato_lfo_freq(snapshot.vibrato_lfo_freq);
        pitch.compute(buffer);
    }

    if snapshot.low_pass_enabled {
        let low_pass = &mut channel_data.low_pass;
        low_pass.set_filter_type(FilterType::Lowpass);
        low_pass.set_q_lin(snapshot.low_pass_q_lin);
        low_pass.set_filter_gain(snapshot.low_pass_filter_gain);
        low_pass.compute(buffer);
    }

    if snapshot.high_pass_enabled {
        let high_pass = &mut channel_data.high_pass;
        high_pass.set_filter_type(FilterType::Highpass);
        high_pass.set_q_lin(snapshot.high_pass_q_lin);
        high_pass.set_filter_gain(snapshot.high_pass_filter_gain);
        high_pass.compute(buffer);
    }

    if snapshot.chorus_enabled && snapshot.chorus_depth != 0.0 {
        let mut destination = channel_data.take_chorus_destination();
        destination.resize(buffer.len(), 0.0);

        let chorus = &mut channel_data.chorus;
        chorus.set_base_key(midi_key);
        chorus.set_lfo_oscillator(snapshot.chorus_lfo_oscillator);
        chorus.set_lfo_frequency(snapshot.chorus_lfo_frequency);
        chorus.set_depth(snapshot.chorus_depth);
        chorus.set_mix(snapshot.chorus_mix);
        chorus.set_delay(snapshot.chorus_delay);
        chorus.set_offset(frame_offset);
        chorus.compute_into(&mut destination, buffer);

        let count = buffer.len();
        clear(buffer, 1, count);
        copy(buffer, 1, &destination, 1, count);

        channel_data.restore_chorus_destination(destination);
    }
}
