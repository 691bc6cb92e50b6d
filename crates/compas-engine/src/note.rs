//! Note events placed on the sequencer grid.

/// One note span on an audio channel's grid.
///
/// `x0`/`x1` are sequencer offsets (start inclusive, end exclusive); a note
/// is audible only when `x1 > x0`. `y` is the vertical key index that the
/// processor's note mapping turns into a MIDI note. The optional 256th
/// fields carry sub-offset timing for note onsets finer than the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    /// Start offset.
    pub x0: u64,
    /// End offset, exclusive.
    pub x1: u64,
    /// Vertical key index.
    pub y: u32,
    /// Set while the editor has this note selected.
    pub selected: bool,
    /// Keeps the audio signal feeding past the span end.
    pub feed: bool,
    /// 256th-resolution start, when finer than `x0` is needed.
    pub x0_256th: Option<u64>,
    /// 256th-resolution end.
    pub x1_256th: Option<u64>,
}

impl Note {
    /// A plain note spanning `[x0, x1)` at key index `y`.
    pub fn new(x0: u64, x1: u64, y: u32) -> Self {
        Self {
            x0,
            x1,
            y,
            selected: false,
            feed: false,
            x0_256th: None,
            x1_256th: None,
        }
    }

    /// True when the span has nonzero width.
    pub fn is_audible(&self) -> bool {
        self.x1 > self.x0
    }

    /// Span width in offsets.
    pub fn width(&self) -> u64 {
        self.x1.saturating_sub(self.x0)
    }

    /// Sort position: start offset first, then key index.
    pub(crate) fn position(&self) -> (u64, u32) {
        (self.x0, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_width_notes_are_silent() {
        assert!(!Note::new(4, 4, 60).is_audible());
        assert!(Note::new(4, 5, 60).is_audible());
    }

    #[test]
    fn width_saturates_on_inverted_span() {
        assert_eq!(Note::new(8, 4, 0).width(), 0);
        assert_eq!(Note::new(4, 8, 0).width(), 4);
    }
}
