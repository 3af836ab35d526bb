//! Per-frame scene state machine, independent of the graphics API.
//!
//! [`SceneRenderer`] owns everything tied to the rendering context (mesh
//! geometry, texture, the active shader program) and drives a
//! [`RenderBackend`] once per display frame.

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

use crate::animation::AnimationState;
use crate::camera::CameraMatrices;
use crate::mesh::MeshData;
use crate::params::CameraParams;
use crate::shader::{ShaderCompiler, ShaderStatus, ShaderSwapController, ShaderSwapHandle};
use crate::texture::TextureImage;

/// Bar levels carried in the uniform block
pub const UNIFORM_BARS: usize = 16;

/// Uniform block shared with every shader (`@group(0) @binding(0)`)
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SceneUniforms {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub light_position: [f32; 4],
    pub bouncing_number: f32,
    pub sensitivity: f32,
    pub _padding: [f32; 2], // bars start on a 16-byte boundary
    pub bars: [[f32; 4]; UNIFORM_BARS / 4],
}

impl SceneUniforms {
    pub fn new(
        camera: &CameraMatrices,
        light_position: [f32; 4],
        animation: &AnimationState,
        sensitivity: f32,
        bars: &[f32],
    ) -> Self {
        let mut packed = [[0.0; 4]; UNIFORM_BARS / 4];
        for (i, level) in bars.iter().take(UNIFORM_BARS).enumerate() {
            packed[i / 4][i % 4] = *level;
        }
        Self {
            projection: camera.projection.to_cols_array_2d(),
            view: camera.view.to_cols_array_2d(),
            light_position,
            bouncing_number: animation.bounce_value,
            sensitivity,
            _padding: [0.0; 2],
            bars: packed,
        }
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("no suitable GPU adapter")]
    NoAdapter,

    #[error("GPU setup failed: {0}")]
    Setup(String),

    #[error("surface unavailable: {0}")]
    Surface(String),

    #[error("geometry upload failed: {0}")]
    Geometry(String),

    #[error("texture upload failed: {0}")]
    Texture(String),

    #[error("draw failed: {0}")]
    Draw(String),
}

/// Graphics API seam.
///
/// Compiling doubles as [`ShaderCompiler`] so the swap controller can hand a
/// backend its queued sources directly.
pub trait RenderBackend: ShaderCompiler {
    type Geometry;
    type Texture;
    /// Per-frame render target
    type Frame;

    fn upload_geometry(&mut self, mesh: &MeshData) -> Result<Self::Geometry, BackendError>;

    fn upload_texture(&mut self, image: &TextureImage) -> Result<Self::Texture, BackendError>;

    /// Clear the target and draw the mesh with `program`. Scene inputs the
    /// program does not read are skipped.
    fn draw(
        &mut self,
        frame: &mut Self::Frame,
        program: &mut Self::Program,
        geometry: &Self::Geometry,
        texture: Option<&Self::Texture>,
        uniforms: &SceneUniforms,
    ) -> Result<(), BackendError>;

    /// Clear the target without drawing
    fn clear(&mut self, frame: &mut Self::Frame) -> Result<(), BackendError>;
}

/// Everything one frame depends on besides the context-owned resources
#[derive(Debug, Clone, Copy)]
pub struct FrameInputs<'a> {
    /// Viewport width / height
    pub aspect_ratio: f32,
    pub sensitivity: f32,
    pub animation: AnimationState,
    pub bars: &'a [f32],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Drawn,
    /// No program compiled yet; the target was only cleared
    SkippedNoProgram,
}

pub struct SceneRenderer<B: RenderBackend> {
    camera: CameraParams,
    light_position: [f32; 4],
    mesh: MeshData,
    geometry: Option<B::Geometry>,
    shaders: ShaderSwapController<B::Program>,
    texture: Option<B::Texture>,
    texture_source: Option<TextureImage>,
    pending_texture: Option<TextureImage>,
    frames_drawn: u64,
}

impl<B: RenderBackend> SceneRenderer<B> {
    pub fn new(camera: CameraParams, light_position: [f32; 4], mesh: MeshData) -> Self {
        Self {
            camera,
            light_position,
            mesh,
            geometry: None,
            shaders: ShaderSwapController::new(),
            texture: None,
            texture_source: None,
            pending_texture: None,
            frames_drawn: 0,
        }
    }

    /// Handle for queueing shader swaps from any thread
    pub fn shader_handle(&self) -> ShaderSwapHandle {
        self.shaders.handle()
    }

    pub fn request_swap(&self, vertex: impl Into<String>, fragment: impl Into<String>) {
        self.shaders.request_swap(vertex, fragment);
    }

    pub fn shader_status(&self) -> ShaderStatus {
        self.shaders.status()
    }

    pub fn last_error(&self) -> String {
        self.shaders.last_error()
    }

    pub fn has_program(&self) -> bool {
        self.shaders.active().is_some()
    }

    pub fn has_geometry(&self) -> bool {
        self.geometry.is_some()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Queue a texture; it replaces the current one on the next frame
    pub fn set_texture(&mut self, image: TextureImage) {
        self.pending_texture = Some(image);
    }

    /// Render one frame.
    ///
    /// Geometry is uploaded on first use, then queued shader and texture
    /// changes are applied. Without an active program the frame is cleared
    /// and skipped. Errors only affect this frame.
    pub fn render_frame(
        &mut self,
        backend: &mut B,
        frame: &mut B::Frame,
        inputs: &FrameInputs<'_>,
    ) -> Result<FrameOutcome, BackendError> {
        if self.geometry.is_none() {
            let geometry = backend.upload_geometry(&self.mesh)?;
            log::debug!(
                "Uploaded mesh ({} vertices, {} indices)",
                self.mesh.vertices.len(),
                self.mesh.indices.len()
            );
            self.geometry = Some(geometry);
        }

        if let Some(image) = self.pending_texture.take() {
            match backend.upload_texture(&image) {
                Ok(texture) => {
                    log::info!("Texture {} ({}x{})", image.name, image.width, image.height);
                    drop(self.texture.replace(texture));
                    self.texture_source = Some(image);
                }
                Err(e) => log::warn!("Keeping previous texture: {}", e),
            }
        }

        self.shaders.resolve_pending(backend);

        let (Some(program), Some(geometry)) = (self.shaders.active_mut(), self.geometry.as_ref())
        else {
            backend.clear(frame)?;
            return Ok(FrameOutcome::SkippedNoProgram);
        };

        let camera = CameraMatrices::derive(
            &self.camera,
            inputs.aspect_ratio,
            inputs.sensitivity,
            &inputs.animation,
        );
        let uniforms = SceneUniforms::new(
            &camera,
            self.light_position,
            &inputs.animation,
            inputs.sensitivity,
            inputs.bars,
        );

        backend.draw(frame, program, geometry, self.texture.as_ref(), &uniforms)?;
        self.frames_drawn += 1;
        Ok(FrameOutcome::Drawn)
    }

    /// Forget every context-owned resource after the context was recreated.
    /// The next frame re-uploads geometry and texture and recompiles the last
    /// good shader pair.
    pub fn invalidate_context(&mut self) {
        self.geometry = None;
        self.texture = None;
        if self.pending_texture.is_none() {
            self.pending_texture = self.texture_source.take();
        }
        self.shaders.requeue_active();
        log::info!("Rendering context invalidated");
    }

    /// Release program, texture and geometry. Call while the context is
    /// still alive.
    pub fn shutdown(&mut self) {
        drop(self.shaders.release());
        self.texture = None;
        self.geometry = None;
        log::info!("Scene renderer shut down after {} frames", self.frames_drawn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{PushOutcome, SpectrumAnalyzer, SpectrumFifo};
    use crate::params::AnalysisConfig;
    use crate::shader::{find_preset, reflect_program, ProgramInterface, ShaderError, ShaderSources};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        UploadGeometry(usize),
        UploadTexture(String),
        Compile,
        Clear,
        Draw { program: usize, textured: bool },
    }

    /// Backend that compiles with naga and records every call
    #[derive(Default)]
    struct RecordingBackend {
        calls: Vec<Call>,
        programs: usize,
        last_uniforms: Option<SceneUniforms>,
        fail_textures: bool,
    }

    #[derive(Debug)]
    struct MockProgram {
        id: usize,
        interface: ProgramInterface,
    }

    impl ShaderCompiler for RecordingBackend {
        type Program = MockProgram;

        fn compile(&mut self, sources: &ShaderSources) -> Result<MockProgram, ShaderError> {
            self.calls.push(Call::Compile);
            let interface = reflect_program(sources)?;
            self.programs += 1;
            Ok(MockProgram {
                id: self.programs,
                interface,
            })
        }
    }

    impl RenderBackend for RecordingBackend {
        type Geometry = u32;
        type Texture = String;
        type Frame = ();

        fn upload_geometry(&mut self, mesh: &MeshData) -> Result<u32, BackendError> {
            self.calls.push(Call::UploadGeometry(mesh.vertices.len()));
            Ok(mesh.index_count())
        }

        fn upload_texture(&mut self, image: &TextureImage) -> Result<String, BackendError> {
            if self.fail_textures {
                return Err(BackendError::Texture("out of memory".into()));
            }
            self.calls.push(Call::UploadTexture(image.name.clone()));
            Ok(image.name.clone())
        }

        fn draw(
            &mut self,
            _frame: &mut (),
            program: &mut MockProgram,
            _geometry: &u32,
            texture: Option<&String>,
            uniforms: &SceneUniforms,
        ) -> Result<(), BackendError> {
            let textured = program.interface.bindings().texture && texture.is_some();
            self.calls.push(Call::Draw {
                program: program.id,
                textured,
            });
            self.last_uniforms = Some(*uniforms);
            Ok(())
        }

        fn clear(&mut self, _frame: &mut ()) -> Result<(), BackendError> {
            self.calls.push(Call::Clear);
            Ok(())
        }
    }

    fn renderer() -> SceneRenderer<RecordingBackend> {
        SceneRenderer::new(
            CameraParams::default(),
            [-15.0, 10.0, 15.0, 0.0],
            MeshData::cube(5.0, [0.0, 0.5, 0.0, 1.0]),
        )
    }

    fn inputs(sensitivity: f32) -> FrameInputs<'static> {
        FrameInputs {
            aspect_ratio: 1.0,
            sensitivity,
            animation: AnimationState::default(),
            bars: &[],
        }
    }

    fn request_preset(renderer: &SceneRenderer<RecordingBackend>, name: &str) {
        let (_, preset) = find_preset(name).unwrap();
        renderer.request_swap(preset.vertex, preset.fragment);
    }

    #[test]
    fn test_uniform_layout() {
        assert_eq!(std::mem::size_of::<SceneUniforms>(), 224);
        assert_eq!(std::mem::offset_of!(SceneUniforms, bouncing_number), 144);
        assert_eq!(std::mem::offset_of!(SceneUniforms, bars), 160);
    }

    #[test]
    fn test_uniform_bars_packed_and_truncated() {
        let camera = CameraMatrices::derive(&CameraParams::default(), 1.0, 0.0, &AnimationState::default());
        let bars: Vec<f32> = (0..20).map(|i| i as f32).collect();
        let uniforms = SceneUniforms::new(&camera, [0.0; 4], &AnimationState::default(), 0.0, &bars);

        assert_eq!(uniforms.bars[0], [0.0, 1.0, 2.0, 3.0]);
        assert_eq!(uniforms.bars[3], [12.0, 13.0, 14.0, 15.0]);
    }

    #[test]
    fn test_no_program_skips_draw() {
        let mut renderer = renderer();
        let mut backend = RecordingBackend::default();

        let outcome = renderer.render_frame(&mut backend, &mut (), &inputs(0.0)).unwrap();

        assert_eq!(outcome, FrameOutcome::SkippedNoProgram);
        assert_eq!(backend.calls, vec![Call::UploadGeometry(24), Call::Clear]);
        assert_eq!(renderer.frames_drawn(), 0);
    }

    #[test]
    fn test_geometry_uploaded_once() {
        let mut renderer = renderer();
        let mut backend = RecordingBackend::default();
        request_preset(&renderer, "Flat Colour");

        for _ in 0..3 {
            let outcome = renderer.render_frame(&mut backend, &mut (), &inputs(0.0)).unwrap();
            assert_eq!(outcome, FrameOutcome::Drawn);
        }

        let uploads = backend
            .calls
            .iter()
            .filter(|c| matches!(c, Call::UploadGeometry(_)))
            .count();
        assert_eq!(uploads, 1);
        assert_eq!(renderer.frames_drawn(), 3);
    }

    #[test]
    fn test_silent_window_leaves_dolly_at_base_distance() {
        let config = AnalysisConfig::default();
        let mut fifo = SpectrumFifo::new(config.fft_size());
        let mut analyzer = SpectrumAnalyzer::new(&config).unwrap();

        let mut sensitivity = f32::NAN;
        for _ in 0..1024 {
            if fifo.push(0.0) == PushOutcome::WindowReady {
                sensitivity = analyzer.analyze(fifo.completed_window());
            }
        }
        assert_eq!(sensitivity, 0.0);

        let mut renderer = renderer();
        let mut backend = RecordingBackend::default();
        request_preset(&renderer, "Simple Light");
        renderer
            .render_frame(&mut backend, &mut (), &inputs(sensitivity))
            .unwrap();

        let uniforms = backend.last_uniforms.unwrap();
        assert_eq!(uniforms.view[3][2], -CameraParams::default().base_distance);
        assert_eq!(uniforms.sensitivity, 0.0);
    }

    #[test]
    fn test_failed_swap_keeps_drawing_previous_program() {
        let mut renderer = renderer();
        let mut backend = RecordingBackend::default();
        request_preset(&renderer, "Rainbow");
        renderer.render_frame(&mut backend, &mut (), &inputs(0.1)).unwrap();

        renderer.request_swap("garbage", "garbage");
        let outcome = renderer.render_frame(&mut backend, &mut (), &inputs(0.1)).unwrap();

        assert_eq!(outcome, FrameOutcome::Drawn);
        assert_eq!(
            backend.calls.last(),
            Some(&Call::Draw {
                program: 1,
                textured: false
            })
        );
        assert!(!renderer.last_error().is_empty());
        assert_eq!(renderer.shader_status(), ShaderStatus::CompileFailed);
    }

    #[test]
    fn test_texture_replaced_on_next_frame() {
        let mut renderer = renderer();
        let mut backend = RecordingBackend::default();
        request_preset(&renderer, "Textured");

        let white = [255; 4];
        let black = [0, 0, 0, 255];
        renderer.set_texture(TextureImage::checkerboard(8, 2, white, black));
        renderer.render_frame(&mut backend, &mut (), &inputs(0.0)).unwrap();

        assert!(backend.calls.contains(&Call::UploadTexture("checkerboard".into())));
        assert_eq!(
            backend.calls.last(),
            Some(&Call::Draw {
                program: 1,
                textured: true
            })
        );
    }

    #[test]
    fn test_failed_texture_upload_is_not_fatal() {
        let mut renderer = renderer();
        let mut backend = RecordingBackend {
            fail_textures: true,
            ..Default::default()
        };
        request_preset(&renderer, "Textured");
        renderer.set_texture(TextureImage::checkerboard(8, 2, [255; 4], [0; 4]));

        let outcome = renderer.render_frame(&mut backend, &mut (), &inputs(0.0)).unwrap();
        assert_eq!(outcome, FrameOutcome::Drawn);
        assert_eq!(
            backend.calls.last(),
            Some(&Call::Draw {
                program: 1,
                textured: false
            })
        );
    }

    #[test]
    fn test_invalidate_reuploads_and_recompiles() {
        let mut renderer = renderer();
        let mut backend = RecordingBackend::default();
        request_preset(&renderer, "Textured");
        renderer.set_texture(TextureImage::checkerboard(8, 2, [255; 4], [0; 4]));
        renderer.render_frame(&mut backend, &mut (), &inputs(0.0)).unwrap();

        renderer.invalidate_context();
        assert!(!renderer.has_geometry());
        assert!(!renderer.has_program());

        backend.calls.clear();
        let outcome = renderer.render_frame(&mut backend, &mut (), &inputs(0.0)).unwrap();

        assert_eq!(outcome, FrameOutcome::Drawn);
        assert_eq!(
            backend.calls,
            vec![
                Call::UploadGeometry(24),
                Call::UploadTexture("checkerboard".into()),
                Call::Compile,
                Call::Draw {
                    program: 2,
                    textured: true
                },
            ]
        );
    }

    #[test]
    fn test_shutdown_releases_resources() {
        let mut renderer = renderer();
        let mut backend = RecordingBackend::default();
        request_preset(&renderer, "Toon Shader");
        renderer.render_frame(&mut backend, &mut (), &inputs(0.0)).unwrap();
        assert!(renderer.has_program());

        renderer.shutdown();

        assert!(!renderer.has_program());
        assert!(!renderer.has_geometry());
    }

    #[test]
    fn test_bars_and_bounce_reach_uniforms() {
        let mut renderer = renderer();
        let mut backend = RecordingBackend::default();
        request_preset(&renderer, "Spectrum Bands");

        let bars = [0.5; UNIFORM_BARS];
        let frame = FrameInputs {
            aspect_ratio: 1.0,
            sensitivity: 0.25,
            animation: AnimationState {
                rotation_angle: 1.0,
                bounce_value: 0.75,
            },
            bars: &bars,
        };
        renderer.render_frame(&mut backend, &mut (), &frame).unwrap();

        let uniforms = backend.last_uniforms.unwrap();
        assert_eq!(uniforms.bouncing_number, 0.75);
        assert_eq!(uniforms.bars, [[0.5; 4]; 4]);
        assert_eq!(uniforms.light_position, [-15.0, 10.0, 15.0, 0.0]);
    }
}
