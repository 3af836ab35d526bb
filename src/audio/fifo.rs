//! Fixed-capacity sample FIFO that accumulates one analysis window.

/// Result of pushing one sample into the FIFO
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The window is not full yet
    Accumulating,
    /// This push completed a window; it stays readable until the next push
    WindowReady,
}

/// Circular buffer of raw samples sized to one analysis window.
///
/// The buffer is allocated once at construction; `push` never allocates,
/// never blocks and never fails.
pub struct SpectrumFifo {
    samples: Box<[f32]>,
    cursor: usize,
}

impl SpectrumFifo {
    /// Create a FIFO holding `window_size` samples (must be non-zero)
    pub fn new(window_size: usize) -> Self {
        Self {
            samples: vec![0.0; window_size.max(1)].into_boxed_slice(),
            cursor: 0,
        }
    }

    /// Store `sample` at the write cursor and advance it.
    ///
    /// The push that fills the last slot reports `WindowReady` and resets the
    /// cursor to 0, so exactly one window completes per `window_size` pushes.
    pub fn push(&mut self, sample: f32) -> PushOutcome {
        self.samples[self.cursor] = sample;
        self.cursor += 1;

        if self.cursor == self.samples.len() {
            self.cursor = 0;
            PushOutcome::WindowReady
        } else {
            PushOutcome::Accumulating
        }
    }

    /// The most recently completed window.
    ///
    /// Only meaningful directly after a `WindowReady` push; later pushes
    /// start overwriting it from the front.
    pub fn completed_window(&self) -> &[f32] {
        &self.samples
    }

    /// Current write position, always in `[0, window_size)`
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn window_size(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exactly_one_window_per_n_pushes() {
        let mut fifo = SpectrumFifo::new(1024);
        let mut ready = 0;

        for i in 0..1024 {
            if fifo.push(i as f32) == PushOutcome::WindowReady {
                ready += 1;
                assert_eq!(i, 1023, "window must complete on the Nth push");
            }
        }

        assert_eq!(ready, 1);
        assert_eq!(fifo.cursor(), 0);
    }

    #[test]
    fn test_n_plus_one_pushes() {
        let mut fifo = SpectrumFifo::new(8);
        let outcomes: Vec<_> = (0..9).map(|i| fifo.push(i as f32)).collect();

        assert_eq!(outcomes[7], PushOutcome::WindowReady);
        assert_eq!(outcomes[8], PushOutcome::Accumulating);
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| **o == PushOutcome::WindowReady)
                .count(),
            1
        );
        assert_eq!(fifo.cursor(), 1);
    }

    #[test]
    fn test_completed_window_holds_samples_in_order() {
        let mut fifo = SpectrumFifo::new(4);
        for s in [1.0, 2.0, 3.0] {
            assert_eq!(fifo.push(s), PushOutcome::Accumulating);
        }
        assert_eq!(fifo.push(4.0), PushOutcome::WindowReady);
        assert_eq!(fifo.completed_window(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_cursor_stays_in_range() {
        let mut fifo = SpectrumFifo::new(16);
        for i in 0..1000 {
            fifo.push(i as f32);
            assert!(fifo.cursor() < fifo.window_size());
        }
    }
}
