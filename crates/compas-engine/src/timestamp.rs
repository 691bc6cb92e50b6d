//! Coarse playback position buckets used to page notation.

/// Width of one notation bucket in sequencer offsets.
pub const NOTATION_DEFAULT_OFFSET: u64 = 1024;

/// A coarse offset bucket.
///
/// Notation pages are tagged with the bucket-aligned offset of their first
/// note so the processor can find the page covering the current playback
/// position without walking every note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Timestamp {
    offset: u64,
}

impl Timestamp {
    /// Timestamp at offset zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamp of the bucket containing `offset`.
    pub fn from_offset(offset: u64) -> Self {
        Self {
            offset: NOTATION_DEFAULT_OFFSET * (offset / NOTATION_DEFAULT_OFFSET),
        }
    }

    /// Raw bucket offset.
    pub fn offset(self) -> u64 {
        self.offset
    }

    /// Replaces the raw offset without realignment.
    pub fn set_offset(&mut self, offset: u64) {
        self.offset = offset;
    }

    /// True when this timestamp lies in `[start, start + bucket width)`.
    pub fn in_window(self, start: u64) -> bool {
        self.offset >= start && self.offset < start + NOTATION_DEFAULT_OFFSET
    }
}
