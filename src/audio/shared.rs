//! Cross-thread handoff between the audio callback, the analysis worker and
//! the render thread.
//!
//! The window buffers and the bar levels are independent exclusive sections;
//! none is ever held while another lock is taken, and none is held during
//! the FFT.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, TryLockError};

/// Latest sensitivity scalar, published with release/acquire ordering.
///
/// Readers always see a whole value (never torn), possibly a stale one.
#[derive(Debug, Default)]
pub struct SharedLevel {
    bits: AtomicU32,
}

impl SharedLevel {
    pub fn new(value: f32) -> Self {
        Self {
            bits: AtomicU32::new(value.to_bits()),
        }
    }

    pub fn store(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Release);
    }

    pub fn load(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }
}

const INDEX_MASK: usize = 1;
const FRESH: usize = 2;

/// Double-buffered handoff of completed sample windows.
///
/// `published` holds the index of the buffer with the newest window plus a
/// fresh flag. The producer (audio callback) writes into the other buffer
/// and publishes it; the consumer only ever holds one buffer at a time, so
/// the producer always finds a free one and never waits. A fresh window that
/// was never taken is overwritten by the next one.
pub struct WindowSlot {
    buffers: [Mutex<Box<[f32]>>; 2],
    published: AtomicUsize,
    dropped: AtomicU64,
}

impl WindowSlot {
    pub fn new(window_size: usize) -> Self {
        let buffer = || Mutex::new(vec![0.0; window_size].into_boxed_slice());
        Self {
            buffers: [buffer(), buffer()],
            published: AtomicUsize::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Publish a completed window without blocking or allocating.
    ///
    /// Returns `false` when an unconsumed predecessor was overwritten.
    pub fn offer(&self, window: &[f32]) -> bool {
        let back = 1 - (self.published.load(Ordering::Acquire) & INDEX_MASK);

        let Some(index) = [back, 1 - back]
            .into_iter()
            .find(|&index| self.write(index, window))
        else {
            // Both buffers contended; only possible with a second producer
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };

        let previous = self.published.swap(index | FRESH, Ordering::AcqRel);
        if previous & FRESH != 0 {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        true
    }

    fn write(&self, index: usize, window: &[f32]) -> bool {
        let mut buffer = match self.buffers[index].try_lock() {
            Ok(buffer) => buffer,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return false,
        };
        let len = buffer.len().min(window.len());
        buffer[..len].copy_from_slice(&window[..len]);
        buffer[len..].fill(0.0);
        true
    }

    /// Copy the newest unconsumed window into `out` and mark it consumed.
    ///
    /// Returns `false` if no new window arrived since the last take.
    pub fn take_into(&self, out: &mut [f32]) -> bool {
        let published = self.published.fetch_and(!FRESH, Ordering::AcqRel);
        if published & FRESH == 0 {
            return false;
        }
        let buffer = self.buffers[published & INDEX_MASK]
            .lock()
            .unwrap_or_else(|p| p.into_inner());
        let len = buffer.len().min(out.len());
        out[..len].copy_from_slice(&buffer[..len]);
        true
    }

    /// Windows lost to backpressure since creation
    pub fn dropped_windows(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Latest perceptually spaced bar levels
pub struct SharedBars {
    levels: Mutex<Vec<f32>>,
}

impl SharedBars {
    pub fn new(count: usize) -> Self {
        Self {
            levels: Mutex::new(vec![0.0; count]),
        }
    }

    pub fn store(&self, levels: &[f32]) {
        let mut shared = self.levels.lock().unwrap_or_else(|p| p.into_inner());
        let len = shared.len().min(levels.len());
        shared[..len].copy_from_slice(&levels[..len]);
    }

    /// Copy the current levels into `out` (extra slots are zeroed)
    pub fn load_into(&self, out: &mut [f32]) {
        let shared = self.levels.lock().unwrap_or_else(|p| p.into_inner());
        let len = shared.len().min(out.len());
        out[..len].copy_from_slice(&shared[..len]);
        out[len..].fill(0.0);
    }
}
