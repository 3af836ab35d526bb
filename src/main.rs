//! Vibecrate - a spinning crate that leans into the music
//!
//! Live audio is spectrum-analysed in the background; the loudest bin pulls
//! the camera closer while the crate spins, and the shader can be swapped at
//! any time without interrupting rendering.

use anyhow::Context;
use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use vibecrate::animation::AnimationClock;
use vibecrate::audio::device::{input_device_names, log_device_event};
use vibecrate::audio::{AudioSystem, DeviceEvent, DeviceListener, SpectrumLevels};
use vibecrate::cli::Args;
use vibecrate::mesh::MeshData;
use vibecrate::params::*;
use vibecrate::renderer::{FrameInputs, SceneRenderer};
use vibecrate::rendering::{GpuContext, WgpuBackend};
use vibecrate::shader::{presets, ShaderStatus};
use vibecrate::texture::TextureImage;
use vibecrate::watch::{ShaderFilePoller, ShaderWatcher};

const CRATE_COLOUR: [f32; 4] = [0.0, 0.5, 0.0, 1.0];
const WATCH_PERIOD: Duration = Duration::from_millis(500);

/// Logs device events and flags a lost device so the main loop can reopen it
struct RestartOnLoss {
    lost: Arc<AtomicBool>,
}

impl DeviceListener for RestartOnLoss {
    fn on_device_changed(&self, event: &DeviceEvent) {
        log_device_event(event);
        if *event == DeviceEvent::Lost {
            self.lost.store(true, Ordering::Release);
        }
    }
}

/// Main application state
struct App {
    // Window and rendering
    window: Option<Arc<Window>>,
    backend: Option<WgpuBackend>,
    renderer: SceneRenderer<WgpuBackend>,

    // Animation and audio
    clock: AnimationClock,
    audio: Option<AudioSystem>,
    levels: Option<Arc<SpectrumLevels>>,
    bars: Vec<f32>,
    device_lost: Arc<AtomicBool>,

    // Shader selection (None while custom files are in use)
    preset: Option<usize>,
    _watcher: Option<ShaderWatcher>,

    // Configuration
    args: Args,
    render_config: RenderConfig,
    analysis_config: AnalysisConfig,
    animation_params: AnimationParams,

    // Time tracking
    last_frame: Instant,
    title: String,
}

impl App {
    fn new(args: Args) -> anyhow::Result<Self> {
        let render_config = RenderConfig::default();
        let camera_params = CameraParams::default();
        let analysis_config = args.analysis_config();
        let animation_params = args.animation_params();

        render_config.validate().context("invalid render config")?;
        camera_params.validate().context("invalid camera params")?;
        analysis_config.validate().context("invalid analysis config")?;

        let mut renderer = SceneRenderer::new(
            camera_params,
            render_config.light_position,
            MeshData::cube(5.0, CRATE_COLOUR),
        );

        let texture = match &args.texture {
            Some(path) => TextureImage::load(path).unwrap_or_else(|e| {
                log::warn!("{}, using checkerboard", e);
                default_texture()
            }),
            None => default_texture(),
        };
        renderer.set_texture(texture);
        let clock = AnimationClock::new(&animation_params).context("invalid animation params")?;

        let mut app = Self {
            window: None,
            backend: None,
            renderer,
            clock,
            audio: None,
            levels: None,
            bars: Vec::new(),
            device_lost: Arc::new(AtomicBool::new(false)),
            preset: None,
            _watcher: None,
            args,
            render_config,
            analysis_config,
            animation_params,
            last_frame: Instant::now(),
            title: String::new(),
        };
        app.request_initial_shaders()?;
        Ok(app)
    }

    /// Custom shader files if given (optionally watched), the chosen preset otherwise
    fn request_initial_shaders(&mut self) -> anyhow::Result<()> {
        if let Some(files) = self.args.shader_files() {
            let mut poller = ShaderFilePoller::new(files, self.renderer.shader_handle());
            if poller.poll() {
                if self.args.watch {
                    self._watcher = Some(
                        ShaderWatcher::spawn(poller, WATCH_PERIOD)
                            .context("failed to start shader watcher")?,
                    );
                }
                return Ok(());
            }
            log::warn!("Custom shaders unreadable, falling back to presets");
        }
        self.select_preset(self.args.preset_index());
        Ok(())
    }

    fn select_preset(&mut self, index: usize) {
        let all = presets();
        if all.is_empty() {
            return;
        }
        let index = index % all.len();
        let preset = &all[index];
        self.preset = Some(index);
        log::info!("Shader preset: {}", preset.name);
        self.renderer.request_swap(preset.vertex, preset.fragment);
    }

    fn step_preset(&mut self, forward: bool) {
        let count = presets().len();
        let next = match (self.preset, forward) {
            (Some(i), true) => i + 1,
            (Some(i), false) => i + count - 1,
            (None, _) => 0,
        };
        self.select_preset(next);
    }

    fn start_audio(&mut self) {
        let listener = Arc::new(RestartOnLoss {
            lost: Arc::clone(&self.device_lost),
        });
        match AudioSystem::start(&self.analysis_config, self.args.device.as_deref(), listener) {
            Ok(audio) => {
                let levels = audio.levels();
                self.bars = vec![0.0; levels.bar_count()];
                self.levels = Some(levels);
                self.audio = Some(audio);
            }
            Err(e) => {
                log::warn!("Running without audio: {}", e);
                self.levels = None;
            }
        }
    }

    fn create_backend(&mut self, window: Arc<Window>) -> anyhow::Result<()> {
        let gpu = pollster::block_on(GpuContext::new(window, self.render_config.vsync))
            .context("failed to initialise GPU")?;
        let backend = WgpuBackend::new(gpu, &self.render_config)
            .context("failed to create scene backend")?;
        self.backend = Some(backend);
        Ok(())
    }

    fn update_title(&mut self) {
        let Some(window) = &self.window else {
            return;
        };
        let name = match self.preset {
            Some(i) => presets().get(i).map_or("?", |p| p.name),
            None => "custom shaders",
        };
        let status = match self.renderer.shader_status() {
            ShaderStatus::Idle | ShaderStatus::PendingCompile => "compiling".to_string(),
            ShaderStatus::Compiled => "ok".to_string(),
            ShaderStatus::CompileFailed => self
                .renderer
                .last_error()
                .lines()
                .next()
                .unwrap_or("compile failed")
                .to_string(),
        };
        let title = match &self.audio {
            Some(audio) => format!("Vibecrate - {} [{}] - {}", name, status, audio.device_name()),
            None => format!("Vibecrate - {} [{}]", name, status),
        };
        if title != self.title {
            window.set_title(&title);
            self.title = title;
        }
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        let worker_died = self.audio.as_ref().is_some_and(|audio| !audio.is_analysing());
        if self.device_lost.swap(false, Ordering::Acquire) || worker_died {
            log::info!("Reopening audio input");
            self.audio = None;
            self.start_audio();
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let window = match &self.window {
            Some(window) => Arc::clone(window),
            None => {
                let window_attributes = Window::default_attributes()
                    .with_title("Vibecrate")
                    .with_inner_size(winit::dpi::LogicalSize::new(
                        self.render_config.window_width,
                        self.render_config.window_height,
                    ));
                match event_loop.create_window(window_attributes) {
                    Ok(window) => Arc::new(window),
                    Err(e) => {
                        log::error!("Failed to create window: {}", e);
                        event_loop.exit();
                        return;
                    }
                }
            }
        };

        if self.backend.is_none() {
            if let Err(e) = self.create_backend(Arc::clone(&window)) {
                log::error!("{:#}", e);
                event_loop.exit();
                return;
            }
        }
        if self.audio.is_none() {
            self.start_audio();
        }

        self.window = Some(window);
        self.last_frame = Instant::now();
        log::info!("Vibecrate is running (arrows / 1-9 switch shaders, ESC quits)");
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        // Release GPU resources while the device still exists
        self.renderer.invalidate_context();
        self.backend = None;
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(backend) = &mut self.backend {
                    backend.gpu_mut().resize(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        ..
                    },
                ..
            } => match code {
                KeyCode::Escape => event_loop.exit(),
                KeyCode::ArrowRight | KeyCode::ArrowDown => self.step_preset(true),
                KeyCode::ArrowLeft | KeyCode::ArrowUp => self.step_preset(false),
                other => {
                    if let Some(index) = digit_index(other) {
                        self.select_preset(index);
                    }
                }
            },
            WindowEvent::RedrawRequested => self.render_frame(event_loop),
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(audio) = &self.audio {
            log::debug!("Dropped {} analysis windows", audio.dropped_windows());
        }
        self.renderer.shutdown();
        self.backend = None;
        self.audio = None;
    }
}

impl App {
    /// Render a single frame
    fn render_frame(&mut self, event_loop: &ActiveEventLoop) {
        let Some(backend) = self.backend.as_mut() else {
            return;
        };

        let now = Instant::now();
        let elapsed_s = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        let animation = self
            .clock
            .tick(elapsed_s, self.animation_params.rotation_speed_rad_per_s);

        let sensitivity = match &self.levels {
            Some(levels) => {
                levels.bars_into(&mut self.bars);
                levels.sensitivity()
            }
            None => 0.0,
        };

        let mut frame = match backend.begin_frame() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                backend.gpu_mut().reconfigure();
                return;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("GPU out of memory");
                event_loop.exit();
                return;
            }
            Err(e) => {
                log::warn!("Skipping frame: {}", e);
                return;
            }
        };

        let inputs = FrameInputs {
            aspect_ratio: backend.gpu().aspect_ratio(),
            sensitivity,
            animation,
            bars: &self.bars,
        };
        if let Err(e) = self.renderer.render_frame(backend, &mut frame, &inputs) {
            log::warn!("Frame skipped: {}", e);
        }
        backend.present(frame);

        self.update_title();
    }
}

/// Number keys 1-9 map to preset indices 0-8
fn digit_index(code: KeyCode) -> Option<usize> {
    const DIGITS: [KeyCode; 9] = [
        KeyCode::Digit1,
        KeyCode::Digit2,
        KeyCode::Digit3,
        KeyCode::Digit4,
        KeyCode::Digit5,
        KeyCode::Digit6,
        KeyCode::Digit7,
        KeyCode::Digit8,
        KeyCode::Digit9,
    ];
    DIGITS.iter().position(|&d| d == code)
}

fn default_texture() -> TextureImage {
    TextureImage::checkerboard(256, 8, [230, 200, 150, 255], [120, 80, 40, 255])
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if args.list_presets {
        for (i, preset) in presets().iter().enumerate() {
            println!("{:>2}. {}", i + 1, preset.name);
        }
        return Ok(());
    }
    if args.list_devices {
        for name in input_device_names().context("failed to list input devices")? {
            println!("{}", name);
        }
        return Ok(());
    }

    let mut app = App::new(args)?;
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.run_app(&mut app).context("event loop failed")?;
    Ok(())
}
