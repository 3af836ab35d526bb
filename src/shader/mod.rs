//! Shader sources, compile diagnostics, hot-swapping and presets.

pub mod presets;
pub mod reflect;
mod swap;

use std::fmt;
use thiserror::Error;

pub use presets::{find_preset, presets, ShaderPreset};
pub use reflect::{reflect_program, ProgramInterface, SceneBindings, VertexAttribute};
pub use swap::{ShaderCompiler, ShaderStatus, ShaderSwapController, ShaderSwapHandle, SwapOutcome};

/// A vertex/fragment WGSL source pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSources {
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }
}

/// Pipeline stage a diagnostic refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Vertex,
    Fragment,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Vertex => write!(f, "vertex"),
            Stage::Fragment => write!(f, "fragment"),
        }
    }
}

/// Why a source pair could not become a usable program
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ShaderError {
    #[error("{stage} shader parse error:\n{message}")]
    Parse { stage: Stage, message: String },

    #[error("{stage} shader validation error: {message}")]
    Validation { stage: Stage, message: String },

    #[error("{stage} shader has no @{stage} entry point")]
    MissingEntryPoint { stage: Stage },

    #[error("{stage} shader uses @group({group}) @binding({binding}), which the scene does not provide")]
    UnsupportedBinding {
        stage: Stage,
        group: u32,
        binding: u32,
    },

    #[error("vertex shader reads @location({0}), which the mesh does not provide")]
    UnsupportedVertexInput(u32),

    #[error("link error: {0}")]
    Link(String),
}
