//! Streamed sample storage for one playback voice.

use std::sync::{Arc, Mutex};

use compas_core::SampleFormat;

use crate::recall_id::RecallId;

/// Shared handle to an audio signal.
pub type SharedAudioSignal = Arc<Mutex<AudioSignal>>;

/// An append-only stream of fixed-size sample buffers.
///
/// The stream grows lazily as a note's span becomes known and a single
/// cursor (`stream_current`) walks it forward, one buffer per processing
/// period. The cursor never rewinds during a pass; a voice that has
/// consumed its last buffer is done.
#[derive(Debug)]
pub struct AudioSignal {
    samplerate: u32,
    buffer_size: usize,
    format: SampleFormat,
    delay: f64,
    attack: usize,
    frame_count: usize,
    loop_start: usize,
    loop_end: usize,
    stream: Vec<Box<[f64]>>,
    stream_current: Option<usize>,
    recall_id: Option<RecallId>,
}

impl AudioSignal {
    /// An empty signal; buffers are appended by [`feed`](Self::feed) or
    /// [`add_stream`](Self::add_stream).
    pub fn new(samplerate: u32, buffer_size: usize, format: SampleFormat) -> Self {
        Self {
            samplerate,
            buffer_size,
            format,
            delay: 0.0,
            attack: 0,
            frame_count: 0,
            loop_start: 0,
            loop_end: 0,
            stream: Vec::new(),
            stream_current: None,
            recall_id: None,
        }
    }

    /// Sample rate the stream was rendered at.
    pub fn samplerate(&self) -> u32 {
        self.samplerate
    }

    /// Frames per stream buffer.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Storage format the soundcard edge converts to.
    pub fn format(&self) -> SampleFormat {
        self.format
    }

    /// Periods per sequencer offset at creation time.
    pub fn delay(&self) -> f64 {
        self.delay
    }

    /// Sets the creation-time delay.
    pub fn set_delay(&mut self, delay: f64) {
        self.delay = delay;
    }

    /// Frame offset of the onset inside the first buffer.
    pub fn attack(&self) -> usize {
        self.attack
    }

    /// Sets the onset frame offset.
    pub fn set_attack(&mut self, attack: usize) {
        self.attack = attack;
    }

    /// Total frames this signal will render.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Loop region start frame.
    pub fn loop_start(&self) -> usize {
        self.loop_start
    }

    /// Loop region end frame.
    pub fn loop_end(&self) -> usize {
        self.loop_end
    }

    /// Sets the loop region in frames.
    pub fn set_loop(&mut self, loop_start: usize, loop_end: usize) {
        self.loop_start = loop_start;
        self.loop_end = loop_end;
    }

    /// The pass that produced this signal.
    pub fn recall_id(&self) -> Option<RecallId> {
        self.recall_id
    }

    /// Tags the signal with its producing pass.
    pub fn set_recall_id(&mut self, recall_id: Option<RecallId>) {
        self.recall_id = recall_id;
    }

    /// Number of stream buffers.
    pub fn stream_len(&self) -> usize {
        self.stream.len()
    }

    /// Cursor position, `None` when empty or exhausted.
    pub fn stream_current(&self) -> Option<usize> {
        self.stream_current
    }

    /// Appends one zeroed buffer; the cursor latches onto the first one.
    pub fn add_stream(&mut self) {
        self.stream
            .push(vec![0.0; self.buffer_size].into_boxed_slice());

        if self.stream_current.is_none() && self.stream.len() == 1 {
            self.stream_current = Some(0);
        }
    }

    /// Grows or truncates the stream to `length` buffers.
    ///
    /// The cursor latches onto the first buffer when the stream was empty;
    /// an exhausted cursor stays exhausted (it never rewinds).
    pub fn stream_resize(&mut self, length: usize) {
        let was_empty = self.stream.is_empty();

        while self.stream.len() < length {
            self.stream
                .push(vec![0.0; self.buffer_size].into_boxed_slice());
        }
        self.stream.truncate(length);

        match self.stream_current {
            Some(index) if index >= length => self.stream_current = None,
            None if was_empty && length > 0 => self.stream_current = Some(0),
            _ => {}
        }
    }

    /// Sizes the stream for a span of `frame_count` frames.
    ///
    /// One buffer beyond the span is kept so a partially filled final
    /// period still has storage.
    pub fn feed(&mut self, frame_count: usize) {
        self.frame_count = frame_count;

        let needed = frame_count.div_ceil(self.buffer_size) + 1;
        if needed > self.stream.len() {
            self.stream_resize(needed);
        }
    }

    /// Extends an already-fed stream from `old_frame_count` frames to
    /// `frame_count` frames, appending only the additional buffers.
    pub fn open_feed(&mut self, frame_count: usize, old_frame_count: usize) {
        self.frame_count = frame_count;

        let old_needed = old_frame_count.div_ceil(self.buffer_size);
        let needed = frame_count.div_ceil(self.buffer_size);
        for _ in old_needed..needed {
            self.add_stream();
        }
    }

    /// Buffer under the cursor.
    pub fn current_buffer(&self) -> Option<&[f64]> {
        self.stream_current.map(|index| &*self.stream[index])
    }

    /// Mutable buffer under the cursor.
    pub fn current_buffer_mut(&mut self) -> Option<&mut [f64]> {
        let index = self.stream_current?;
        Some(&mut self.stream[index])
    }

    /// Buffer at `index`, for offline render paths.
    pub fn stream_buffer(&self, index: usize) -> Option<&[f64]> {
        self.stream.get(index).map(|buffer| &**buffer)
    }

    /// Advances the cursor one buffer; exhausts past the end.
    pub fn next(&mut self) {
        self.stream_current = match self.stream_current {
            Some(index) if index + 1 < self.stream.len() => Some(index + 1),
            _ => None,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal() -> AudioSignal {
        AudioSignal::new(48000, 256, SampleFormat::F64)
    }

    #[test]
    fn cursor_latches_on_first_buffer() {
        let mut signal = signal();
        assert_eq!(signal.stream_current(), None);
        assert!(signal.current_buffer().is_none());

        signal.add_stream();
        assert_eq!(signal.stream_current(), Some(0));
        assert_eq!(signal.current_buffer().map(<[f64]>::len), Some(256));

        signal.add_stream();
        assert_eq!(signal.stream_current(), Some(0), "cursor stays put");
    }

    #[test]
    fn feed_sizes_one_buffer_past_the_span() {
        let mut signal = signal();
        signal.feed(1000);
        assert_eq!(signal.frame_count(), 1000);
        // ceil(1000 / 256) = 4, plus the spare.
        assert_eq!(signal.stream_len(), 5);

        // Feeding a smaller span never shrinks the stream.
        signal.feed(100);
        assert_eq!(signal.stream_len(), 5);
    }

    #[test]
    fn open_feed_appends_the_difference() {
        let mut signal = signal();
        signal.feed(512);
        let before = signal.stream_len();

        signal.open_feed(1024, 512);
        assert_eq!(signal.stream_len(), before + 2);
        assert_eq!(signal.frame_count(), 1024);
    }

    #[test]
    fn next_walks_forward_and_exhausts() {
        let mut signal = signal();
        signal.stream_resize(3);

        assert_eq!(signal.stream_current(), Some(0));
        signal.next();
        assert_eq!(signal.stream_current(), Some(1));
        signal.next();
        assert_eq!(signal.stream_current(), Some(2));
        signal.next();
        assert_eq!(signal.stream_current(), None);

        // Exhausted stays exhausted even as more buffers arrive.
        signal.add_stream();
        signal.next();
        assert_eq!(signal.stream_current(), None);
    }

    #[test]
    fn resize_truncation_exhausts_a_passed_cursor() {
        let mut signal = signal();
        signal.stream_resize(4);
        signal.next();
        signal.next();
        assert_eq!(signal.stream_current(), Some(2));

        signal.stream_resize(2);
        assert_eq!(signal.stream_current(), None);
    }
}
