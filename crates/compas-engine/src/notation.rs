//! Per-channel ordered note containers keyed by coarse timestamps.

use std::sync::{Arc, Mutex};

use crate::note::Note;
use crate::timestamp::Timestamp;

/// Shared handle to a notation page.
///
/// The editor mutates pages while the processor reads them; both sides go
/// through the page's own mutex and copy data out before doing anything
/// slow.
pub type SharedNotation = Arc<Mutex<Notation>>;

/// An ordered run of notes for one audio channel.
///
/// Notes stay sorted by `(x0, y)` so windowed lookups and overlap scans
/// read forward. Each page is tagged with the bucket [`Timestamp`] of the
/// region it covers.
#[derive(Debug, Clone)]
pub struct Notation {
    audio_channel: u32,
    timestamp: Timestamp,
    notes: Vec<Note>,
}

impl Notation {
    /// Empty notation for `audio_channel`, bucket zero.
    pub fn new(audio_channel: u32) -> Self {
        Self::with_timestamp(audio_channel, Timestamp::new())
    }

    /// Empty notation for `audio_channel` at a specific bucket.
    pub fn with_timestamp(audio_channel: u32, timestamp: Timestamp) -> Self {
        Self {
            audio_channel,
            timestamp,
            notes: Vec::new(),
        }
    }

    /// The audio channel these notes play on.
    pub fn audio_channel(&self) -> u32 {
        self.audio_channel
    }

    /// Bucket timestamp of this page.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// All notes, sorted by `(x0, y)`.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Inserts `note` keeping the `(x0, y)` ordering.
    pub fn add_note(&mut self, note: Note) {
        let at = self
            .notes
            .partition_point(|existing| existing.position() <= note.position());
        self.notes.insert(at, note);
    }

    /// Removes the first note equal to `note`. Returns whether one was found.
    pub fn remove_note(&mut self, note: &Note) -> bool {
        if let Some(at) = self.notes.iter().position(|existing| existing == note) {
            self.notes.remove(at);
            true
        } else {
            false
        }
    }

    /// All notes starting exactly at `x0`, in key order.
    pub fn find_offset(&self, x0: u64) -> Vec<Note> {
        let from = self.notes.partition_point(|note| note.x0 < x0);
        self.notes[from..]
            .iter()
            .take_while(|note| note.x0 == x0)
            .copied()
            .collect()
    }

    /// First page in `list` for `audio_channel` whose bucket falls inside
    /// the window starting at `timestamp`.
    ///
    /// Pages are locked one at a time; the match is cloned out so no lock
    /// is held across the caller's follow-up work.
    pub fn find_near_timestamp(
        list: &[SharedNotation],
        audio_channel: u32,
        timestamp: Timestamp,
    ) -> Option<SharedNotation> {
        for shared in list {
            let hit = {
                let notation = shared.lock().unwrap();
                notation.audio_channel == audio_channel
                    && notation.timestamp.in_window(timestamp.offset())
            };

            if hit {
                return Some(Arc::clone(shared));
            }
        }

        None
    }
}
