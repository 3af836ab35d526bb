//! wgpu rendering: surface/device setup and the scene backend.

mod backend;
mod gpu;
mod resources;

pub use backend::{WgpuBackend, WgpuProgram};
pub use gpu::{FrameTarget, GpuContext, DEPTH_FORMAT};
pub use resources::{GpuMesh, GpuTexture};
