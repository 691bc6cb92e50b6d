//! Identity tags for concurrent playback passes.

/// The playback scopes a pass can run under.
///
/// The same channel can be played by several passes at once (a looping
/// notation render plus a live MIDI pass, say); everything a pass produces
/// is tagged with its scope so the passes never mix state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SoundScope {
    /// Direct playback of existing audio.
    Playback,
    /// Pattern sequencer pass.
    Sequencer,
    /// Notation (piano roll) pass.
    #[default]
    Notation,
    /// Wave-form playback pass.
    Wave,
    /// Live MIDI input pass.
    Midi,
}

impl SoundScope {
    /// Number of scopes.
    pub const COUNT: usize = 5;

    /// All scopes, in index order.
    pub const ALL: [SoundScope; Self::COUNT] = [
        SoundScope::Playback,
        SoundScope::Sequencer,
        SoundScope::Notation,
        SoundScope::Wave,
        SoundScope::Midi,
    ];

    /// Stable index for per-scope state arrays.
    pub fn index(self) -> usize {
        match self {
            SoundScope::Playback => 0,
            SoundScope::Sequencer => 1,
            SoundScope::Notation => 2,
            SoundScope::Wave => 3,
            SoundScope::Midi => 4,
        }
    }
}

/// Tags an audio signal with the pass and channel that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecallId {
    /// Scope of the producing pass.
    pub scope: SoundScope,
    /// Audio channel the signal belongs to.
    pub audio_channel: u32,
}

impl RecallId {
    /// Recall id for one scope and channel.
    pub fn new(scope: SoundScope, audio_channel: u32) -> Self {
        Self {
            scope,
            audio_channel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_indexes_are_dense() {
        for (i, scope) in SoundScope::ALL.iter().enumerate() {
            assert_eq!(scope.index(), i);
        }
    }
}
