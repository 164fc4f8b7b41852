//! Window and event loop.
//!
//! [`run`] opens a window, builds the scene and then steps it once per
//! redraw:
//!
//! 1. render the current state and present it
//! 2. take the time since the previous frame from the [`Timer`]
//! 3. update the scene with that delta and the keys seen so far
//! 4. quit if Escape was hit, otherwise request the next redraw

use std::sync::Arc;

use anyhow::{Context as _, bail};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::KeyCode,
    window::{Window, WindowId},
};

use crate::{
    context::{Context, InitContext},
    input::Input,
    scene::{Frame, Scene, description::SceneDescription},
    timer::Timer,
};

pub const WINDOW_TITLE: &str = "parallax-ngin";
pub const WINDOW_WIDTH: u32 = 1024;
pub const WINDOW_HEIGHT: u32 = 768;

/// Key that ends the program.
pub const QUIT_KEY: KeyCode = KeyCode::Escape;

struct AppState {
    ctx: Context,
    gpu: InitContext,
    scene: Scene,
}

impl AppState {
    async fn new(window: Arc<Window>, description: SceneDescription) -> anyhow::Result<Self> {
        let mut ctx = Context::new(window).await?;
        // The clone in into() leverages the internal Arcs of Device and Queue and thus only clones the ref
        let gpu: InitContext = (&ctx).into();
        let scene = Scene::init(&gpu, description).await?;
        ctx.clear_colour = scene.background();
        let size = ctx.window().inner_size();
        ctx.resize(size.width, size.height);
        Ok(Self { ctx, gpu, scene })
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        // Rendering requires the surface to be configured
        if !self.ctx.is_surface_configured() {
            return Ok(());
        }

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.scene.render(
            &self.gpu,
            Frame {
                colour: &view,
                depth: self.ctx.depth_view(),
                clear_colour: self.ctx.clear_colour,
            },
        );
        output.present();
        Ok(())
    }
}

pub struct App {
    async_runtime: tokio::runtime::Runtime,
    // Taken once the window exists
    description: Option<SceneDescription>,
    state: Option<AppState>,
    input: Input,
    timer: Timer,
    startup_failed: bool,
}

impl App {
    pub fn new(description: SceneDescription) -> anyhow::Result<Self> {
        let async_runtime =
            tokio::runtime::Runtime::new().context("could not start the async runtime")?;
        Ok(Self {
            async_runtime,
            description: Some(description),
            state: None,
            input: Input::new(),
            timer: Timer::new(),
            startup_failed: false,
        })
    }

    pub fn startup_failed(&self) -> bool {
        self.startup_failed
    }

    fn fail_startup(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("Startup failed: {error:#}");
        self.startup_failed = true;
        event_loop.exit();
    }

    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        let Some(state) = &mut self.state else {
            return;
        };

        match state.render() {
            Ok(()) => {}
            // Reconfigure the surface if it's lost or outdated
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = state.ctx.window().inner_size();
                state.ctx.resize(size.width, size.height);
            }
            Err(e) => log::error!("Unable to render {}", e),
        }

        let dt = self.timer.lap_time();
        state.scene.update(dt, &mut self.input);

        if self.input.key_hit(QUIT_KEY) {
            event_loop.exit();
            return;
        }
        state.ctx.window().request_redraw();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(description) = self.description.take() else {
            return;
        };

        let window_attributes = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(PhysicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT));
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                let error = anyhow::Error::new(e).context("could not open a window");
                self.fail_startup(event_loop, error);
                return;
            }
        };

        match self
            .async_runtime
            .block_on(AppState::new(window, description))
        {
            Ok(state) => {
                state.ctx.window().request_redraw();
                self.state = Some(state);
                self.timer.reset();
            }
            Err(e) => self.fail_startup(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.state.is_none() {
            return;
        }
        self.input.handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(state) = &mut self.state {
                    state.ctx.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => self.frame(event_loop),
            _ => {}
        }
    }
}

/// Run the demo scene until the window is closed or Escape is hit.
pub fn run() -> anyhow::Result<()> {
    run_scene(SceneDescription::default())
}

pub fn run_scene(description: SceneDescription) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let event_loop = EventLoop::new()?;
    let mut app = App::new(description)?;
    event_loop.run_app(&mut app)?;

    if app.startup_failed() {
        bail!("the scene could not be started");
    }
    Ok(())
}
