//! Compás Engine - notation data model and voice signal processor
//!
//! This crate turns notes placed on a sequencer grid into rendered audio
//! streams, one soundcard period at a time.
//!
//! # Data Model
//!
//! - [`Note`] - one `[x0, x1)` span at a vertical key index
//! - [`Notation`] - a sorted page of notes for one audio channel, bucketed
//!   by [`Timestamp`]
//! - [`AudioSignal`] - the buffer stream a voice renders into, with a
//!   monotonic playback cursor
//! - [`Recycling`] - per-channel container the rendered signals land in
//! - [`Port`] - thread-safe control cell a UI or automation thread writes
//!   while the processor plays
//!
//! # Processing
//!
//! [`NotationProcessor`] is driven by [`run_inter`](NotationProcessor::run_inter)
//! once per period. On the first period of each grid offset it keys on the
//! notes starting there; every period it renders one buffer per active voice
//! through the operator chain from `compas-core` (three FM oscillators, then
//! noise, pitch, the two filters and chorus as their ports enable them) and
//! advances the tempo counters.
//!
//! The [`plugin`] module hosts external instrument implementations behind
//! safe LADSPA-shaped traits as an alternative sound source.
//!
//! # Example
//!
//! ```rust
//! use compas_engine::{Notation, NotationProcessor, Note};
//!
//! let mut processor = NotationProcessor::new(48000, 512, 1)?;
//! processor.set_delay(4.0);
//!
//! processor
//!     .add_notation(Notation::new(0))?
//!     .lock()
//!     .unwrap()
//!     .add_note(Note::new(0, 4, 69));
//!
//! // One soundcard period: key on, render, advance.
//! processor.run_inter();
//! assert_eq!(processor.active_voice_count(), 1);
//! # Ok::<(), compas_engine::EngineError>(())
//! ```

pub mod audio_signal;
pub mod channel_data;
pub mod error;
pub mod notation;
pub mod note;
pub mod plugin;
pub mod port;
pub mod processor;
pub mod recall_id;
pub mod recycling;
pub mod timestamp;

// Re-export main types at crate root
pub use audio_signal::{AudioSignal, SharedAudioSignal};
pub use channel_data::{ChannelData, InputData, KEY_COUNT, ScopeData};
pub use error::{EngineError, Result};
pub use notation::{Notation, SharedNotation};
pub use note::Note;
pub use port::{LinearConversion, Port, PortValue, SharedPort};
pub use processor::{
    DEFAULT_AUDIO_START_MAPPING, DEFAULT_BPM, DEFAULT_MIDI_START_MAPPING, NotationProcessor,
    OscillatorPorts, SynthPorts, delay_for_bpm,
};
pub use recall_id::{RecallId, SoundScope};
pub use recycling::{Recycling, SharedRecycling};
pub use timestamp::{NOTATION_DEFAULT_OFFSET, Timestamp};
