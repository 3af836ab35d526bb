//! Deferred shader hot-swap.
//!
//! Any thread may queue a source pair through a [`ShaderSwapHandle`]; only
//! the thread that owns the GPU context compiles it, at the start of its next
//! frame, via [`ShaderSwapController::resolve_pending`].

use std::sync::{Arc, Mutex, MutexGuard};

use super::{ShaderError, ShaderSources};

/// Turns a source pair into a backend program
pub trait ShaderCompiler {
    type Program;

    fn compile(&mut self, sources: &ShaderSources) -> Result<Self::Program, ShaderError>;
}

/// Where the most recent swap request stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStatus {
    /// No request seen yet
    Idle,
    /// Sources queued, waiting for the render thread
    PendingCompile,
    /// Last request compiled and is now active
    Compiled,
    /// Last request failed; the previous program stays active
    CompileFailed,
}

/// What `resolve_pending` did this frame
#[derive(Debug, Clone, PartialEq)]
pub enum SwapOutcome {
    NothingPending,
    Swapped,
    Failed(ShaderError),
}

#[derive(Debug)]
struct PendingState {
    sources: Option<ShaderSources>,
    status: ShaderStatus,
    last_error: String,
}

type Shared = Arc<Mutex<PendingState>>;

fn lock(shared: &Shared) -> MutexGuard<'_, PendingState> {
    // State is plain data, so a panic elsewhere cannot leave it half-written
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Cloneable, `Send` handle for queueing swaps from other threads
#[derive(Debug, Clone)]
pub struct ShaderSwapHandle {
    shared: Shared,
}

impl ShaderSwapHandle {
    /// Queue a source pair. A newer request replaces an uncompiled older one.
    pub fn request_swap(&self, vertex: impl Into<String>, fragment: impl Into<String>) {
        self.request(ShaderSources::new(vertex, fragment));
    }

    pub fn request(&self, sources: ShaderSources) {
        let mut state = lock(&self.shared);
        if state.sources.replace(sources).is_some() {
            log::debug!("Replacing uncompiled shader request");
        }
        state.status = ShaderStatus::PendingCompile;
    }

    /// Diagnostic from the last failed compile, empty after a success
    pub fn last_error(&self) -> String {
        lock(&self.shared).last_error.clone()
    }

    pub fn status(&self) -> ShaderStatus {
        lock(&self.shared).status
    }
}

/// Owns the active program and applies queued swaps on the render thread
#[derive(Debug)]
pub struct ShaderSwapController<P> {
    shared: Shared,
    active: Option<P>,
    active_sources: Option<ShaderSources>,
    swaps: u64,
}

impl<P> Default for ShaderSwapController<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> ShaderSwapController<P> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(PendingState {
                sources: None,
                status: ShaderStatus::Idle,
                last_error: String::new(),
            })),
            active: None,
            active_sources: None,
            swaps: 0,
        }
    }

    pub fn handle(&self) -> ShaderSwapHandle {
        ShaderSwapHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn request_swap(&self, vertex: impl Into<String>, fragment: impl Into<String>) {
        self.handle().request_swap(vertex, fragment);
    }

    /// Compile the queued request, if any.
    ///
    /// The lock is held only to take the sources, never across the compile.
    /// On success the previous program is dropped; on failure it stays active
    /// and the diagnostic is kept for [`Self::last_error`]. Either way the
    /// request is consumed.
    pub fn resolve_pending<C>(&mut self, compiler: &mut C) -> SwapOutcome
    where
        C: ShaderCompiler<Program = P>,
    {
        let Some(sources) = lock(&self.shared).sources.take() else {
            return SwapOutcome::NothingPending;
        };

        match compiler.compile(&sources) {
            Ok(program) => {
                drop(self.active.replace(program));
                self.active_sources = Some(sources);
                self.swaps += 1;

                let mut state = lock(&self.shared);
                state.last_error.clear();
                state.status = if state.sources.is_some() {
                    ShaderStatus::PendingCompile
                } else {
                    ShaderStatus::Compiled
                };
                log::info!("Shader program swapped (#{})", self.swaps);
                SwapOutcome::Swapped
            }
            Err(err) => {
                let message = err.to_string();
                log::warn!("Shader compile failed, keeping previous program: {}", message);

                let mut state = lock(&self.shared);
                state.last_error = message;
                state.status = if state.sources.is_some() {
                    ShaderStatus::PendingCompile
                } else {
                    ShaderStatus::CompileFailed
                };
                SwapOutcome::Failed(err)
            }
        }
    }

    pub fn active(&self) -> Option<&P> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut P> {
        self.active.as_mut()
    }

    /// Sources of the program currently in use
    pub fn active_sources(&self) -> Option<&ShaderSources> {
        self.active_sources.as_ref()
    }

    pub fn last_error(&self) -> String {
        lock(&self.shared).last_error.clone()
    }

    pub fn status(&self) -> ShaderStatus {
        lock(&self.shared).status
    }

    /// Number of successful swaps so far
    pub fn swap_count(&self) -> u64 {
        self.swaps
    }

    /// Drop the active program after its context went away and queue its
    /// sources again, unless a newer request is already waiting.
    pub fn requeue_active(&mut self) {
        self.active = None;
        if let Some(sources) = self.active_sources.take() {
            let mut state = lock(&self.shared);
            if state.sources.is_none() {
                state.sources = Some(sources);
                state.status = ShaderStatus::PendingCompile;
            }
        }
    }

    /// Release the active program (shutdown)
    pub fn release(&mut self) -> Option<P> {
        self.active_sources = None;
        self.active.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    /// Program that counts how many instances were dropped
    #[derive(Debug)]
    struct FakeProgram {
        id: usize,
        dropped: Arc<AtomicUsize>,
    }

    impl Drop for FakeProgram {
        fn drop(&mut self) {
            self.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Accepts any source pair whose stages contain their entry attribute
    #[derive(Default)]
    struct FakeCompiler {
        compiled: usize,
        dropped: Arc<AtomicUsize>,
    }

    impl ShaderCompiler for FakeCompiler {
        type Program = FakeProgram;

        fn compile(&mut self, sources: &ShaderSources) -> Result<FakeProgram, ShaderError> {
            if !sources.vertex.contains("@vertex") {
                return Err(ShaderError::Link("vertex stage missing".into()));
            }
            if !sources.fragment.contains("@fragment") {
                return Err(ShaderError::Link("fragment stage missing".into()));
            }
            self.compiled += 1;
            Ok(FakeProgram {
                id: self.compiled,
                dropped: Arc::clone(&self.dropped),
            })
        }
    }

    /// Queues a follow-up request from inside its first compile, the way a
    /// watcher thread would while the render thread is busy compiling
    struct RequestingCompiler {
        inner: FakeCompiler,
        handle: ShaderSwapHandle,
        follow_up: Option<(&'static str, &'static str)>,
    }

    impl ShaderCompiler for RequestingCompiler {
        type Program = FakeProgram;

        fn compile(&mut self, sources: &ShaderSources) -> Result<FakeProgram, ShaderError> {
            if let Some((vertex, fragment)) = self.follow_up.take() {
                self.handle.request_swap(vertex, fragment);
            }
            self.inner.compile(sources)
        }
    }

    const VS: &str = "@vertex fn vs_main() {}";
    const FS: &str = "@fragment fn fs_main() {}";

    #[test]
    fn test_nothing_pending() {
        let mut controller = ShaderSwapController::<FakeProgram>::new();
        let mut compiler = FakeCompiler::default();

        assert_eq!(controller.resolve_pending(&mut compiler), SwapOutcome::NothingPending);
        assert_eq!(controller.status(), ShaderStatus::Idle);
        assert!(controller.active().is_none());
    }

    #[test]
    fn test_valid_swap_becomes_active() {
        let mut controller = ShaderSwapController::new();
        let mut compiler = FakeCompiler::default();

        controller.request_swap(VS, FS);
        assert_eq!(controller.status(), ShaderStatus::PendingCompile);
        // Nothing compiles until the render thread resolves
        assert!(controller.active().is_none());

        assert_eq!(controller.resolve_pending(&mut compiler), SwapOutcome::Swapped);
        assert!(controller.active().is_some());
        assert_eq!(controller.last_error(), "");
        assert_eq!(controller.status(), ShaderStatus::Compiled);
        assert_eq!(controller.active_sources(), Some(&ShaderSources::new(VS, FS)));
    }

    #[test]
    fn test_garbage_keeps_previous_program() {
        let mut controller = ShaderSwapController::new();
        let mut compiler = FakeCompiler::default();
        controller.request_swap(VS, FS);
        controller.resolve_pending(&mut compiler);

        controller.request_swap("garbage", "garbage");
        let outcome = controller.resolve_pending(&mut compiler);

        assert!(matches!(outcome, SwapOutcome::Failed(_)));
        assert_eq!(controller.active().map(|p| p.id), Some(1));
        assert!(!controller.last_error().is_empty());
        assert_eq!(controller.status(), ShaderStatus::CompileFailed);

        // The failed request was consumed
        assert_eq!(controller.resolve_pending(&mut compiler), SwapOutcome::NothingPending);
    }

    #[test]
    fn test_success_clears_last_error() {
        let mut controller = ShaderSwapController::new();
        let mut compiler = FakeCompiler::default();

        controller.request_swap(VS, "nope");
        controller.resolve_pending(&mut compiler);
        assert!(!controller.last_error().is_empty());
        assert!(controller.active().is_none());

        controller.request_swap(VS, FS);
        controller.resolve_pending(&mut compiler);
        assert_eq!(controller.last_error(), "");
    }

    #[test]
    fn test_swap_releases_old_program() {
        let mut controller = ShaderSwapController::new();
        let mut compiler = FakeCompiler::default();
        let dropped = Arc::clone(&compiler.dropped);

        controller.request_swap(VS, FS);
        controller.resolve_pending(&mut compiler);
        controller.request_swap(VS, FS);
        controller.resolve_pending(&mut compiler);

        assert_eq!(dropped.load(Ordering::SeqCst), 1);
        assert_eq!(controller.active().map(|p| p.id), Some(2));
        assert_eq!(controller.swap_count(), 2);

        drop(controller.release());
        assert_eq!(dropped.load(Ordering::SeqCst), 2);
        assert!(controller.active().is_none());
    }

    #[test]
    fn test_latest_request_wins() {
        let mut controller = ShaderSwapController::new();
        let mut compiler = FakeCompiler::default();

        controller.request_swap("garbage", "garbage");
        controller.request_swap(VS, FS);

        assert_eq!(controller.resolve_pending(&mut compiler), SwapOutcome::Swapped);
        assert_eq!(compiler.compiled, 1);
    }

    #[test]
    fn test_request_from_another_thread() {
        let mut controller = ShaderSwapController::new();
        let mut compiler = FakeCompiler::default();
        let handle = controller.handle();

        thread::spawn(move || handle.request_swap(VS, FS))
            .join()
            .unwrap();

        assert_eq!(controller.resolve_pending(&mut compiler), SwapOutcome::Swapped);
        assert_eq!(controller.handle().status(), ShaderStatus::Compiled);
    }

    #[test]
    fn test_request_during_compile_is_kept() {
        let mut controller = ShaderSwapController::new();
        let mut compiler = RequestingCompiler {
            inner: FakeCompiler::default(),
            handle: controller.handle(),
            follow_up: Some((VS, "@fragment fn fs_main() { /* v2 */ }")),
        };

        controller.request_swap(VS, FS);
        assert_eq!(controller.resolve_pending(&mut compiler), SwapOutcome::Swapped);
        assert_eq!(controller.active().map(|p| p.id), Some(1));
        assert_eq!(controller.status(), ShaderStatus::PendingCompile);

        assert_eq!(controller.resolve_pending(&mut compiler), SwapOutcome::Swapped);
        assert_eq!(controller.active().map(|p| p.id), Some(2));
        assert!(controller
            .active_sources()
            .is_some_and(|s| s.fragment.contains("v2")));
        assert_eq!(controller.status(), ShaderStatus::Compiled);
    }

    #[test]
    fn test_request_during_failed_compile_is_kept() {
        let mut controller = ShaderSwapController::new();
        let mut compiler = RequestingCompiler {
            inner: FakeCompiler::default(),
            handle: controller.handle(),
            follow_up: Some((VS, FS)),
        };

        controller.request_swap("garbage", "garbage");
        assert!(matches!(
            controller.resolve_pending(&mut compiler),
            SwapOutcome::Failed(_)
        ));
        assert_eq!(controller.status(), ShaderStatus::PendingCompile);
        assert!(!controller.last_error().is_empty());

        assert_eq!(controller.resolve_pending(&mut compiler), SwapOutcome::Swapped);
        assert_eq!(controller.status(), ShaderStatus::Compiled);
    }

    #[test]
    fn test_requeue_after_context_loss() {
        let mut controller = ShaderSwapController::new();
        let mut compiler = FakeCompiler::default();
        controller.request_swap(VS, FS);
        controller.resolve_pending(&mut compiler);

        controller.requeue_active();
        assert!(controller.active().is_none());
        assert_eq!(controller.status(), ShaderStatus::PendingCompile);

        assert_eq!(controller.resolve_pending(&mut compiler), SwapOutcome::Swapped);
        assert_eq!(controller.active().map(|p| p.id), Some(2));
    }

    #[test]
    fn test_requeue_does_not_override_newer_request() {
        let mut controller = ShaderSwapController::new();
        let mut compiler = FakeCompiler::default();
        controller.request_swap(VS, FS);
        controller.resolve_pending(&mut compiler);

        controller.request_swap(VS, "broken");
        controller.requeue_active();

        assert!(matches!(
            controller.resolve_pending(&mut compiler),
            SwapOutcome::Failed(_)
        ));
    }
}
