// =============================================================================
// VRE - VULKAN RENDERING ENGINE
// =============================================================================
//
// A minimal real-time rendering core: one device, one swapchain, one
// pipeline, one frame in flight.
//
// ARCHITECTURE OVERVIEW:
// ┌─────────────────────────────────────────────────────────────────┐
// │  winit event loop (window, close signal)                        │
// │    └── Renderer (backend chosen from config)                    │
// │          └── VulkanDevice + Surface + Queues                     │
// │                └── Swapchain + image views                      │
// │                      └── Pipeline (dynamic rendering)           │
// │                            └── Frame (command buffer, sync)     │
// └─────────────────────────────────────────────────────────────────┘
//
// FRAME FLOW (once per loop iteration):
// 1. Wait for the device to go idle
// 2. Acquire swapchain image
// 3. Record the triangle into the single command buffer
// 4. Submit, then block on the in-flight fence
// 5. Present rendered image to screen
//
// =============================================================================

mod backend;
mod config;
mod error;
mod renderer;

use anyhow::Context;
use config::Config;
use error::RenderError;
use renderer::{FramebufferSize, RenderApi, Renderer};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowAttributes},
};

/// Exit code for failures outside the engine core (event loop, window).
const GENERIC_FAILURE: u8 = 1;

// =============================================================================
// ENTRY POINT
// =============================================================================

fn main() -> ExitCode {
    let (config, config_error) = load_config(Path::new(config::CONFIG_FILE));

    init_logging(&config);
    if let Some(e) = config_error {
        log::warn!("Failed to load {}: {:#}. Using defaults.", config::CONFIG_FILE, e);
    }
    log::debug!("Config: {:?}", config);
    log::info!("Starting VRE");
    log::info!(
        "Window: {}x{} \"{}\"",
        config.window.width,
        config.window.height,
        config.window.title
    );

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}

fn run(config: Config) -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app).context("Event loop failed")?;
    app.finish()
}

/// Load the config file, keeping the error for after the logger is up.
fn load_config(path: &Path) -> (Config, Option<anyhow::Error>) {
    match Config::load_from_path(path) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    }
}

/// Map a top-level failure to the process exit code.
fn exit_code_for(error: &anyhow::Error) -> u8 {
    error
        .downcast_ref::<RenderError>()
        .map(|e| e.kind().exit_code())
        .unwrap_or(GENERIC_FAILURE)
}

/// Initialize logging; RUST_LOG overrides the configured level
fn init_logging(config: &Config) {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or(config.debug.log_level.as_str()))
        .format_timestamp_millis()
        .init();
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

/// Window collaborator plus the renderer driven from it.
///
/// IMPORTANT: `renderer` is declared before `window` so the surface is
/// destroyed while the window still exists.
struct App {
    config: Config,
    renderer: Option<Renderer>,
    window: Option<Arc<Window>>,
    /// Latched by a close request; checked once per loop iteration
    should_close: bool,
    /// First fatal error, reported after the event loop returns
    fatal: Option<anyhow::Error>,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            renderer: None,
            window: None,
            should_close: false,
            fatal: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        if self.fatal.is_none() {
            self.fatal = Some(error);
        }
        self.should_close = true;
        self.shutdown();
        event_loop.exit();
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window_attributes = WindowAttributes::default()
            .with_title(&self.config.window.title)
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ))
            .with_resizable(false);

        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("Failed to create window")?,
        );

        let size = window.inner_size();
        let framebuffer = FramebufferSize {
            width: size.width,
            height: size.height,
        };

        let renderer = Renderer::new(window.as_ref(), framebuffer, &self.config)?;
        log::info!("Renderer ready ({:?})", renderer.api());

        self.renderer = Some(renderer);
        self.window = Some(window);
        Ok(())
    }

    /// Tear down the renderer (device idle first), then the window.
    fn shutdown(&mut self) {
        if let Some(renderer) = self.renderer.take() {
            if let Err(e) = renderer.wait_idle() {
                log::error!("Device did not go idle: {}", e);
            }
            log::info!("Presented {} frames", renderer.frames_presented());
        }
        self.window = None;
    }

    fn finish(mut self) -> anyhow::Result<()> {
        self.shutdown();
        match self.fatal.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

// =============================================================================
// EVENT HANDLING
// =============================================================================

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.should_close {
            return;
        }

        if let Err(e) = self.init(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down...");
                self.should_close = true;
            }

            WindowEvent::KeyboardInput { event, .. } => {
                use winit::keyboard::{KeyCode, PhysicalKey};

                if event.state.is_pressed()
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape)
                {
                    log::info!("ESC pressed, exiting...");
                    self.should_close = true;
                }
            }

            WindowEvent::RedrawRequested => {
                if self.should_close {
                    return;
                }
                if let Some(renderer) = self.renderer.as_mut() {
                    if let Err(e) = renderer.draw_frame() {
                        self.fail(event_loop, anyhow::Error::new(e));
                    }
                }
            }

            _ => {}
        }
    }

    /// End of one loop iteration: honor the close signal or ask for the next frame.
    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_close {
            self.shutdown();
            event_loop.exit();
            return;
        }

        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_keep_their_exit_codes() {
        let err = anyhow::Error::new(RenderError::NoSuitableDevice);
        assert_eq!(exit_code_for(&err), 2);

        let missing = RenderError::MissingLayer("VK_LAYER_KHRONOS_validation".into());
        let err = anyhow::Error::new(missing).context("Failed to initialize renderer");
        assert_eq!(exit_code_for(&err), 2);
    }

    #[test]
    fn other_errors_exit_with_generic_failure() {
        let err = anyhow::anyhow!("event loop exploded");
        assert_eq!(exit_code_for(&err), GENERIC_FAILURE);
    }

    #[test]
    fn broken_config_file_falls_back_and_keeps_the_error() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[window\nwidth = ").unwrap();

        let (config, error) = load_config(file.path());
        assert_eq!(config.window.width, config::WINDOW_WIDTH);
        let error = error.expect("malformed file must be reported");
        assert!(format!("{:#}", error).contains("Failed to parse config file"));
    }

    #[test]
    fn absent_config_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (config, error) = load_config(&dir.path().join(config::CONFIG_FILE));
        assert!(error.is_none());
        assert_eq!(config.window.title, config::WINDOW_TITLE);
    }

    #[test]
    fn finish_without_failure_is_clean() {
        let app = App::new(Config::default());
        assert!(app.finish().is_ok());
    }

    #[test]
    fn finish_reports_first_failure() {
        let mut app = App::new(Config::default());
        app.fatal = Some(anyhow::Error::new(RenderError::FrameTimeout(5)));
        let err = app.finish().unwrap_err();
        assert_eq!(exit_code_for(&err), 5);
    }
}
