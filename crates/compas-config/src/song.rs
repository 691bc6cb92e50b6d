//! Song files: engine parameters, a synth rack and note tracks in one TOML
//! document, buildable into a ready-to-run processor.

use std::collections::BTreeMap;
use std::path::Path;

use compas_engine::{KEY_COUNT, Notation, NotationProcessor, Note, Timestamp};
use serde::{Deserialize, Serialize};

use crate::engine::EngineConfig;
use crate::error::ConfigError;

/// One track of notes bound to an audio channel.
///
/// Notes are `[x0, x1, y]` triples: start offset, end offset and key number
/// on the sequencer grid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Track {
    /// Audio channel the notes play on.
    pub audio_channel: u32,
    /// Notes as `[x0, x1, y]` triples.
    pub notes: Vec<(u64, u64, u32)>,
}

/// A complete song file.
///
/// ```toml
/// name = "demo"
/// bpm = 140.0
/// loop_region = [0, 64]
///
/// [engine]
/// samplerate = 48000
/// buffer_size = 512
///
/// [[engine.synth.oscillators]]
/// waveform = "sawtooth"
///
/// [[tracks]]
/// audio_channel = 0
/// notes = [[0, 4, 60], [4, 8, 64], [8, 16, 67]]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Song {
    /// Song title.
    pub name: String,
    /// Tempo in beats per minute.
    pub bpm: f64,
    /// Loop region as `[start, end)` grid offsets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loop_region: Option<[u64; 2]>,
    /// Engine parameters.
    pub engine: EngineConfig,
    /// Note tracks.
    pub tracks: Vec<Track>,
}

impl Default for Song {
    fn default() -> Self {
        Self {
            name: "Untitled".into(),
            bpm: 120.0,
            loop_region: None,
            engine: EngineConfig::default(),
            tracks: Vec::new(),
        }
    }
}

impl Song {
    /// Loads a song from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&contents)
    }

    /// Saves the song to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Parses a song from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serializes the song to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Number of audio channels the song needs, always at least one.
    pub fn audio_channels(&self) -> u32 {
        self.tracks
            .iter()
            .map(|track| track.audio_channel)
            .max()
            .map_or(1, |highest| highest + 1)
    }

    /// Grid offset one past the last note, `0` for an empty song.
    pub fn end_offset(&self) -> u64 {
        self.tracks
            .iter()
            .flat_map(|track| track.notes.iter())
            .map(|&(_, x1, _)| x1)
            .max()
            .unwrap_or(0)
    }

    /// Checks the whole document, engine parameters included.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;

        if !self.bpm.is_finite() || self.bpm <= 0.0 {
            return Err(ConfigError::invalid_value(
                "bpm",
                self.bpm,
                "must be greater than zero",
            ));
        }
        if let Some([start, end]) = self.loop_region
            && start >= end
        {
            return Err(ConfigError::invalid_value(
                "loop_region",
                format!("[{start}, {end}]"),
                "loop end must lie after loop start",
            ));
        }
        for (index, track) in self.tracks.iter().enumerate() {
            for &(x0, x1, y) in &track.notes {
                if x1 < x0 {
                    return Err(ConfigError::invalid_value(
                        format!("tracks[{index}].notes"),
                        format!("[{x0}, {x1}, {y}]"),
                        "note end must not lie before note start",
                    ));
                }
                if y as usize >= KEY_COUNT {
                    return Err(ConfigError::invalid_value(
                        format!("tracks[{index}].notes"),
                        format!("[{x0}, {x1}, {y}]"),
                        "key number must be below 128",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Builds a processor playing this song: notes paged into notation,
    /// tempo, loop and synth rack applied.
    pub fn build_processor(&self) -> Result<NotationProcessor, ConfigError> {
        self.validate()?;

        let mut processor = NotationProcessor::new(
            self.engine.samplerate,
            self.engine.buffer_size,
            self.audio_channels(),
        )?;
        processor.set_format(self.engine.format.sample_format());
        processor.set_bpm(self.bpm);
        if let Some([start, end]) = self.loop_region {
            processor.set_loop(true, start, end);
        }

        // One notation page per (channel, bucket) pair, so lookups by
        // timestamp find every note of the window.
        let mut pages: BTreeMap<(u32, u64), Vec<Note>> = BTreeMap::new();
        for track in &self.tracks {
            for &(x0, x1, y) in &track.notes {
                let bucket = Timestamp::from_offset(x0).offset();
                pages
                    .entry((track.audio_channel, bucket))
                    .or_default()
                    .push(Note::new(x0, x1, y));
            }
        }
        for ((audio_channel, bucket), notes) in pages {
            let mut notation =
                Notation::with_timestamp(audio_channel, Timestamp::from_offset(bucket));
            for note in notes {
                notation.add_note(note);
            }
            processor.add_notation(notation)?;
        }

        self.engine.synth.apply(processor.ports());
        Ok(processor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::WaveformConfig;
    use compas_engine::delay_for_bpm;
    use tempfile::TempDir;

    fn two_track_song() -> Song {
        Song {
            name: "demo".into(),
            bpm: 140.0,
            loop_region: Some([0, 64]),
            tracks: vec![
                Track {
                    audio_channel: 0,
                    notes: vec![(0, 4, 60), (4, 8, 64)],
                },
                Track {
                    audio_channel: 1,
                    notes: vec![(0, 16, 48)],
                },
            ],
            ..Song::default()
        }
    }

    // --- document shape ---

    #[test]
    fn default_song_is_valid_and_empty() {
        let song = Song::default();
        assert!(song.validate().is_ok());
        assert_eq!(song.audio_channels(), 1);
        assert_eq!(song.end_offset(), 0);
    }

    #[test]
    fn doc_example_parses() {
        let song = Song::from_toml(
            r#"
            name = "demo"
            bpm = 140.0
            loop_region = [0, 64]

            [engine]
            samplerate = 48000
            buffer_size = 512

            [[engine.synth.oscillators]]
            waveform = "sawtooth"

            [[tracks]]
            audio_channel = 0
            notes = [[0, 4, 60], [4, 8, 64], [8, 16, 67]]
            "#,
        )
        .unwrap();

        assert_eq!(song.name, "demo");
        assert_eq!(song.loop_region, Some([0, 64]));
        assert_eq!(song.tracks[0].notes.len(), 3);
        assert_eq!(
            song.engine.synth.oscillators[0].waveform,
            WaveformConfig::Sawtooth
        );
        assert!(song.validate().is_ok());
    }

    #[test]
    fn toml_round_trip_preserves_everything() {
        let song = two_track_song();
        let parsed = Song::from_toml(&song.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, song);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("songs").join("demo.toml");

        let song = two_track_song();
        song.save(&path).unwrap();
        assert_eq!(Song::load(&path).unwrap(), song);
    }

    #[test]
    fn channel_count_spans_all_tracks() {
        let mut song = two_track_song();
        song.tracks.push(Track {
            audio_channel: 4,
            notes: vec![(0, 1, 60)],
        });
        assert_eq!(song.audio_channels(), 5);
        assert_eq!(song.end_offset(), 16);
    }

    // --- validation ---

    #[test]
    fn out_of_range_keys_are_rejected() {
        let song = Song {
            tracks: vec![Track {
                audio_channel: 0,
                notes: vec![(0, 4, 128)],
            }],
            ..Song::default()
        };
        let err = song.validate().unwrap_err();
        assert!(err.to_string().contains("tracks[0].notes"));
    }

    #[test]
    fn backwards_notes_are_rejected() {
        let song = Song {
            tracks: vec![Track {
                audio_channel: 0,
                notes: vec![(8, 4, 60)],
            }],
            ..Song::default()
        };
        assert!(song.validate().is_err());
    }

    #[test]
    fn empty_loop_region_is_rejected() {
        let song = Song {
            loop_region: Some([64, 64]),
            ..Song::default()
        };
        assert!(song.validate().is_err());
    }

    #[test]
    fn non_positive_bpm_is_rejected() {
        for bpm in [0.0, -120.0, f64::NAN] {
            let song = Song {
                bpm,
                ..Song::default()
            };
            assert!(song.validate().is_err(), "accepted bpm {bpm}");
        }
    }

    // --- processor construction ---

    #[test]
    fn build_applies_tempo_channels_and_rack() {
        let mut song = two_track_song();
        song.engine.synth.noise.gain = 0.25;

        let processor = song.build_processor().unwrap();
        assert_eq!(processor.audio_channels(), 2);
        assert_eq!(processor.delay(), delay_for_bpm(48_000, 512, 140.0));
        assert_eq!(
            processor.ports().noise_gain.safe_read().as_f64(),
            Some(0.25)
        );
    }

    #[test]
    fn notes_page_into_timestamp_buckets() {
        let song = Song {
            tracks: vec![Track {
                audio_channel: 0,
                notes: vec![(0, 4, 60), (5000, 5004, 62)],
            }],
            ..Song::default()
        };

        let processor = song.build_processor().unwrap();
        let pages = processor.notation();
        assert_eq!(pages.len(), 2);

        let offsets: Vec<u64> = pages
            .iter()
            .map(|page| page.lock().unwrap().timestamp().offset())
            .collect();
        assert_eq!(offsets, vec![0, 4096]);
    }

    #[test]
    fn invalid_songs_do_not_build() {
        let song = Song {
            bpm: 0.0,
            ..Song::default()
        };
        assert!(song.build_processor().is_err());
    }
}
