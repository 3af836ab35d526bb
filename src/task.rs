//! Periodic worker threads with an explicit start/stop lifecycle.

use std::io;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

/// Handle to a named thread that runs a closure once per period.
///
/// The wait between runs is a condition-variable timeout, so `stop()` wakes
/// the thread immediately instead of waiting out the period. Dropping the
/// handle stops and joins the thread.
pub struct PeriodicTask {
    name: String,
    signal: Arc<StopSignal>,
    handle: Option<thread::JoinHandle<()>>,
}

impl PeriodicTask {
    /// Spawn `tick` on a new thread, invoked every `period` until stopped
    pub fn spawn<F>(name: &str, period: Duration, mut tick: F) -> io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let signal = Arc::new(StopSignal {
            stopped: Mutex::new(false),
            wake: Condvar::new(),
        });
        let thread_signal = Arc::clone(&signal);

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut next = Instant::now();
                loop {
                    {
                        let mut stopped = thread_signal
                            .stopped
                            .lock()
                            .unwrap_or_else(|p| p.into_inner());
                        loop {
                            if *stopped {
                                return;
                            }
                            let now = Instant::now();
                            if now >= next {
                                break;
                            }
                            stopped = thread_signal
                                .wake
                                .wait_timeout(stopped, next - now)
                                .map(|(guard, _)| guard)
                                .unwrap_or_else(|p| p.into_inner().0);
                        }
                    }

                    tick();

                    next += period;
                    // Skip missed periods instead of bursting to catch up
                    let now = Instant::now();
                    if next < now {
                        next = now + period;
                    }
                }
            })?;

        log::debug!("Started periodic task '{}' ({:?})", name, period);

        Ok(Self {
            name: name.to_string(),
            signal,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal the thread to stop and wait for it to exit
    pub fn stop(&mut self) {
        {
            let mut stopped = self
                .signal
                .stopped
                .lock()
                .unwrap_or_else(|p| p.into_inner());
            *stopped = true;
        }
        self.signal.wake.notify_all();

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Periodic task '{}' panicked", self.name);
            } else {
                log::debug!("Stopped periodic task '{}'", self.name);
            }
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_task_ticks_until_stopped() {
        let count = Arc::new(AtomicUsize::new(0));
        let task_count = Arc::clone(&count);

        let mut task = PeriodicTask::spawn("test-ticker", Duration::from_millis(1), move || {
            task_count.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while count.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        task.stop();

        let after_stop = count.load(Ordering::SeqCst);
        assert!(after_stop >= 3);
        assert!(!task.is_running());

        thread::sleep(Duration::from_millis(10));
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn test_stop_does_not_wait_out_long_period() {
        let mut task =
            PeriodicTask::spawn("test-slow", Duration::from_secs(3600), || {}).unwrap();
        let start = Instant::now();
        task.stop();
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_drop_stops_task() {
        let count = Arc::new(AtomicUsize::new(0));
        let task_count = Arc::clone(&count);
        {
            let _task = PeriodicTask::spawn("test-drop", Duration::from_millis(1), move || {
                task_count.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
            thread::sleep(Duration::from_millis(5));
        }
        let after_drop = count.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(10));
        assert_eq!(count.load(Ordering::SeqCst), after_drop);
    }
}
