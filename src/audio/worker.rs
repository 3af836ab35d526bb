//! Analysis worker: drains the window slot, runs the FFT and publishes levels.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use super::fft::{bar_levels, SpectrumAnalyzer};
use super::shared::{SharedBars, SharedLevel, WindowSlot};
use crate::params::{AnalysisConfig, ConfigError};
use crate::task::PeriodicTask;

/// Levels published by the analysis worker for the render thread
pub struct SpectrumLevels {
    sensitivity: SharedLevel,
    bars: SharedBars,
    bar_count: usize,
}

impl SpectrumLevels {
    pub fn new(bar_count: usize) -> Self {
        Self {
            sensitivity: SharedLevel::new(0.0),
            bars: SharedBars::new(bar_count),
            bar_count,
        }
    }

    /// Latest sensitivity scalar in `[0, 1]`
    pub fn sensitivity(&self) -> f32 {
        self.sensitivity.load()
    }

    /// Copy the latest bar levels into `out`
    pub fn bars_into(&self, out: &mut [f32]) {
        self.bars.load_into(out);
    }

    pub fn bar_count(&self) -> usize {
        self.bar_count
    }
}

/// Consumer side of the window handoff.
///
/// Owns the analyzer and its scratch buffers; the slot lock is only held
/// while copying the window out, never during the transform.
pub struct AnalysisWorker {
    analyzer: SpectrumAnalyzer,
    window: Vec<f32>,
    bars: Vec<f32>,
    slot: Arc<WindowSlot>,
    levels: Arc<SpectrumLevels>,
}

impl AnalysisWorker {
    pub fn new(
        config: &AnalysisConfig,
        slot: Arc<WindowSlot>,
        levels: Arc<SpectrumLevels>,
    ) -> Result<Self, ConfigError> {
        let analyzer = SpectrumAnalyzer::new(config)?;
        Ok(Self {
            window: vec![0.0; analyzer.window_size()],
            bars: vec![0.0; levels.bar_count()],
            analyzer,
            slot,
            levels,
        })
    }

    /// Analyse the newest completed window, if any. Returns whether one was found.
    pub fn run_once(&mut self) -> bool {
        if !self.slot.take_into(&mut self.window) {
            return false;
        }

        let sensitivity = self.analyzer.analyze(&self.window);
        bar_levels(self.analyzer.frame(), &mut self.bars);

        self.levels.sensitivity.store(sensitivity);
        self.levels.bars.store(&self.bars);
        true
    }

    /// Move the worker onto a periodic thread ticking at the configured interval
    pub fn spawn(mut self, config: &AnalysisConfig) -> io::Result<PeriodicTask> {
        let period = Duration::from_millis(config.analysis_interval_ms);
        let mut analysed: u64 = 0;
        PeriodicTask::spawn("spectrum-analysis", period, move || {
            if self.run_once() {
                analysed += 1;
                if analysed % 600 == 0 {
                    let frame = self.analyzer.frame();
                    log::debug!(
                        "Analysed {} windows ({} dropped), sensitivity {:.3}, low bins {:.2e}..{:.2e}",
                        analysed,
                        self.slot.dropped_windows(),
                        self.levels.sensitivity(),
                        frame.min(),
                        frame.max()
                    );
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::fifo::{PushOutcome, SpectrumFifo};

    fn worker(config: &AnalysisConfig) -> (AnalysisWorker, Arc<WindowSlot>, Arc<SpectrumLevels>) {
        let slot = Arc::new(WindowSlot::new(config.fft_size()));
        let levels = Arc::new(SpectrumLevels::new(config.bar_count));
        let worker = AnalysisWorker::new(config, Arc::clone(&slot), Arc::clone(&levels)).unwrap();
        (worker, slot, levels)
    }

    #[test]
    fn test_no_window_no_update() {
        let (mut worker, _slot, levels) = worker(&AnalysisConfig::default());
        assert!(!worker.run_once());
        assert_eq!(levels.sensitivity(), 0.0);
    }

    #[test]
    fn test_zero_window_publishes_floor() {
        let config = AnalysisConfig::default();
        let (mut worker, slot, levels) = worker(&config);
        levels.sensitivity.store(0.9);

        let mut fifo = SpectrumFifo::new(config.fft_size());
        let mut ready = 0;
        for _ in 0..config.fft_size() {
            if fifo.push(0.0) == PushOutcome::WindowReady {
                slot.offer(fifo.completed_window());
                ready += 1;
            }
        }
        assert_eq!(ready, 1);

        assert!(worker.run_once());
        assert_eq!(levels.sensitivity(), 0.0);
        assert!(!worker.run_once());
    }

    #[test]
    fn test_loud_window_publishes_bars() {
        let config = AnalysisConfig::default();
        let (mut worker, slot, levels) = worker(&config);

        let mut impulse = vec![0.0; config.fft_size()];
        impulse[0] = 1.0;
        slot.offer(&impulse);
        assert!(worker.run_once());

        assert!(levels.sensitivity() > 0.0);
        let mut bars = vec![0.0; config.bar_count];
        levels.bars_into(&mut bars);
        assert!(bars.iter().all(|b| *b > 0.99));
    }

    #[test]
    fn test_producer_keeps_publishing_while_worker_analyses() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::thread;

        let config = AnalysisConfig {
            fft_order: 14,
            ..AnalysisConfig::default()
        };
        let (mut worker, slot, levels) = worker(&config);
        let stop = Arc::new(AtomicBool::new(false));

        let consumer = {
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                while !stop.load(Ordering::Acquire) {
                    worker.run_once();
                }
                worker
            })
        };

        let silence = vec![0.0; config.fft_size()];
        for _ in 0..200 {
            slot.offer(&silence);
        }
        // The last window is the only loud one and must reach the analysis
        let mut impulse = silence.clone();
        impulse[0] = 1.0;
        slot.offer(&impulse);

        stop.store(true, Ordering::Release);
        let mut worker = consumer.join().unwrap();
        worker.run_once();

        assert!(levels.sensitivity() > 0.0);
        assert!(!worker.run_once());
    }
}
