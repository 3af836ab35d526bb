//! Custom shader files, re-requested whenever they change on disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::shader::{ShaderSources, ShaderSwapHandle};
use crate::task::PeriodicTask;

/// Vertex/fragment WGSL file pair
#[derive(Debug, Clone)]
pub struct ShaderFiles {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
}

impl ShaderFiles {
    pub fn new(vertex: impl Into<PathBuf>, fragment: impl Into<PathBuf>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    pub fn read(&self) -> io::Result<ShaderSources> {
        Ok(ShaderSources::new(
            fs::read_to_string(&self.vertex)?,
            fs::read_to_string(&self.fragment)?,
        ))
    }

    fn modified(&self) -> io::Result<(SystemTime, SystemTime)> {
        Ok((mtime(&self.vertex)?, mtime(&self.fragment)?))
    }
}

fn mtime(path: &Path) -> io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}

/// Polls a file pair and requests a swap after each change
pub struct ShaderFilePoller {
    files: ShaderFiles,
    handle: ShaderSwapHandle,
    seen: Option<(SystemTime, SystemTime)>,
}

impl ShaderFilePoller {
    pub fn new(files: ShaderFiles, handle: ShaderSwapHandle) -> Self {
        Self {
            files,
            handle,
            seen: None,
        }
    }

    /// Request the files if they changed since the last successful read.
    /// Returns true when a swap was requested.
    pub fn poll(&mut self) -> bool {
        let stamps = match self.files.modified() {
            Ok(stamps) => stamps,
            // Editors often replace files; the next poll sees the new one
            Err(e) => {
                log::debug!("Shader files unavailable: {}", e);
                return false;
            }
        };
        if self.seen == Some(stamps) {
            return false;
        }

        match self.files.read() {
            Ok(sources) => {
                self.seen = Some(stamps);
                log::info!(
                    "Reloading shaders from {} and {}",
                    self.files.vertex.display(),
                    self.files.fragment.display()
                );
                self.handle.request(sources);
                true
            }
            Err(e) => {
                log::warn!("Failed to read shader files: {}", e);
                false
            }
        }
    }
}

/// Background thread running a [`ShaderFilePoller`]
pub struct ShaderWatcher {
    _task: PeriodicTask,
}

impl ShaderWatcher {
    pub fn spawn(mut poller: ShaderFilePoller, period: Duration) -> io::Result<Self> {
        let task = PeriodicTask::spawn("shader-watch", period, move || {
            poller.poll();
        })?;
        Ok(Self { _task: task })
    }
}
