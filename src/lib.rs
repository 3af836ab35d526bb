//! Vibecrate library - audio-reactive 3D crate with hot-swappable shaders

pub mod animation;
pub mod audio;
pub mod camera;
pub mod cli;
pub mod mesh;
pub mod params;
pub mod renderer;
pub mod rendering;
pub mod shader;
pub mod task;
pub mod texture;
pub mod watch;
