//! Rotating application buffers between the audio loop and the device.

use std::sync::{Arc, Mutex};

/// Shared handle to an app buffer ring.
pub type SharedAppBufferRing = Arc<Mutex<AppBufferRing>>;

/// Which of the four app buffers the device callback reads this period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppBufferMode {
    /// First buffer.
    #[default]
    Buffer0,
    /// Second buffer.
    Buffer1,
    /// Third buffer.
    Buffer2,
    /// Fourth buffer.
    Buffer3,
}

impl AppBufferMode {
    /// Number of app buffers in the ring.
    pub const COUNT: usize = 4;

    /// Position of this buffer in the ring.
    pub fn index(self) -> usize {
        match self {
            AppBufferMode::Buffer0 => 0,
            AppBufferMode::Buffer1 => 1,
            AppBufferMode::Buffer2 => 2,
            AppBufferMode::Buffer3 => 3,
        }
    }

    /// The buffer after this one, wrapping back to the first.
    pub fn next(self) -> Self {
        match self {
            AppBufferMode::Buffer0 => AppBufferMode::Buffer1,
            AppBufferMode::Buffer1 => AppBufferMode::Buffer2,
            AppBufferMode::Buffer2 => AppBufferMode::Buffer3,
            AppBufferMode::Buffer3 => AppBufferMode::Buffer0,
        }
    }
}

/// Four interleaved sample buffers rotated between producer and consumer.
///
/// The audio loop mixes one period into [`next_buffer_mut`](Self::next_buffer_mut)
/// and rotates with [`tic`](Self::tic); the device callback reads
/// [`current_buffer`](Self::current_buffer). The period handshake serializes
/// the two sides, so the reader never observes a buffer mid-write.
#[derive(Debug)]
pub struct AppBufferRing {
    pcm_channels: usize,
    buffer_size: usize,
    mode: AppBufferMode,
    buffers: [Box<[f64]>; AppBufferMode::COUNT],
}

impl AppBufferRing {
    /// A ring of four zeroed `pcm_channels x buffer_size` buffers.
    pub fn new(pcm_channels: usize, buffer_size: usize) -> Self {
        let samples = pcm_channels * buffer_size;

        Self {
            pcm_channels,
            buffer_size,
            mode: AppBufferMode::default(),
            buffers: std::array::from_fn(|_| vec![0.0; samples].into_boxed_slice()),
        }
    }

    /// Interleaved channels per frame.
    pub fn pcm_channels(&self) -> usize {
        self.pcm_channels
    }

    /// Frames per app buffer.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// The buffer the device callback reads this period.
    pub fn mode(&self) -> AppBufferMode {
        self.mode
    }

    /// Device-facing buffer for the current period.
    pub fn current_buffer(&self) -> &[f64] {
        &self.buffers[self.mode.index()]
    }

    /// The buffer the audio loop fills next.
    pub fn next_buffer(&self) -> &[f64] {
        &self.buffers[self.mode.next().index()]
    }

    /// Mutable view of the buffer the audio loop fills next.
    pub fn next_buffer_mut(&mut self) -> &mut [f64] {
        &mut self.buffers[self.mode.next().index()]
    }

    /// Rotates the ring; the buffer just written becomes current.
    pub fn tic(&mut self) {
        self.mode = self.mode.next();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_wraps_after_four_tics() {
        let mut ring = AppBufferRing::new(2, 16);
        assert_eq!(ring.mode(), AppBufferMode::Buffer0);

        ring.tic();
        assert_eq!(ring.mode(), AppBufferMode::Buffer1);
        ring.tic();
        ring.tic();
        assert_eq!(ring.mode(), AppBufferMode::Buffer3);
        ring.tic();
        assert_eq!(ring.mode(), AppBufferMode::Buffer0);
    }

    #[test]
    fn written_buffer_becomes_current_on_tic() {
        let mut ring = AppBufferRing::new(1, 4);

        ring.next_buffer_mut().fill(0.5);
        assert!(ring.current_buffer().iter().all(|&s| s == 0.0));

        ring.tic();
        assert!(ring.current_buffer().iter().all(|&s| s == 0.5));
        assert!(ring.next_buffer().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn buffers_hold_one_interleaved_period() {
        let ring = AppBufferRing::new(2, 512);
        assert_eq!(ring.current_buffer().len(), 1024);
        assert_eq!(ring.pcm_channels(), 2);
        assert_eq!(ring.buffer_size(), 512);
    }
}
