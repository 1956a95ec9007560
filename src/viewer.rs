//! Viewer lifecycle and the event loop.
//!
//! The [`Viewer`] owns the GPU context, the scene, the redirector and the
//! in-flight model load. Everything runs on the event loop thread:
//!
//! 1. [`Viewer::new`] runs the initial width check and starts listening for
//!    the spacebar, so redirects work even if the GPU never comes up
//! 2. `resumed` creates the window and the GPU context, composes the scene and
//!    starts the model load
//! 3. window events feed the redirector, the orbit controller and the viewport
//! 4. every `RedrawRequested` polls the redirect debounce and the load, updates
//!    the controller once, renders and asks for the next frame. Without a
//!    context `about_to_wait` polls the debounce instead
//! 5. [`Viewer::dispose`] stops the frame loop, aborts the load and exits

use std::sync::Arc;

use instant::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

use crate::{
    config::ViewerConfig,
    context::Context,
    indicator::{self, ProgressIndicator},
    loader::ModelLoad,
    redirect::Redirector,
    resources::{upload_model, AssetSource},
    scene::Scene,
};

#[cfg(not(target_arch = "wasm32"))]
type PageNavigator = crate::redirect::DesktopNavigator;
#[cfg(target_arch = "wasm32")]
type PageNavigator = crate::redirect::BrowserNavigator;

/// Initial size of the desktop window.
#[cfg(not(target_arch = "wasm32"))]
const WINDOW_SIZE: LogicalSize<f64> = LogicalSize::new(1280.0, 800.0);

pub enum ViewerEvent {
    /// The GPU context finished initializing (web only, where setup is async).
    #[allow(dead_code)]
    Initialized(Box<Context>),
    #[allow(dead_code)]
    InitFailed(String),
    /// Spacebar pressed anywhere on the page.
    #[allow(dead_code)]
    SpacePressed,
    Exit,
}

impl std::fmt::Debug for ViewerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(_) => f.write_str("Initialized"),
            Self::InitFailed(err) => f.debug_tuple("InitFailed").field(err).finish(),
            Self::SpacePressed => f.write_str("SpacePressed"),
            Self::Exit => f.write_str("Exit"),
        }
    }
}

pub struct Viewer {
    config: ViewerConfig,
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<ViewerEvent>,
    window: Option<Arc<Window>>,
    context: Option<Context>,
    scene: Option<Scene>,
    redirector: Redirector<PageNavigator>,
    indicator: Box<dyn ProgressIndicator>,
    load: Option<ModelLoad>,
    #[cfg(target_arch = "wasm32")]
    key_listener: Option<crate::redirect::KeyListener>,
    last_frame: Instant,
    initializing: bool,
    running: bool,
}

impl Viewer {
    pub fn new(event_loop: &EventLoop<ViewerEvent>, config: ViewerConfig) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();

        #[cfg(not(target_arch = "wasm32"))]
        let (async_runtime, navigator, indicator) = (
            tokio::runtime::Runtime::new()?,
            crate::redirect::DesktopNavigator::new(WINDOW_SIZE.width),
            Box::new(indicator::LogIndicator::default()) as Box<dyn ProgressIndicator>,
        );
        #[cfg(target_arch = "wasm32")]
        let (navigator, indicator) = (
            crate::redirect::BrowserNavigator,
            Box::new(indicator::DomIndicator::default()) as Box<dyn ProgressIndicator>,
        );

        let redirector = Redirector::start(config.redirect.clone(), navigator);

        #[cfg(target_arch = "wasm32")]
        let key_listener = {
            let proxy = proxy.clone();
            crate::redirect::KeyListener::on_space(move || {
                if proxy.send_event(ViewerEvent::SpacePressed).is_err() {
                    log::warn!("Event loop closed, ignoring key press");
                }
            })
            .map_err(|err| log::warn!("Cannot listen for key presses: {err:?}"))
            .ok()
        };

        Ok(Self {
            config,
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            window: None,
            context: None,
            scene: None,
            redirector,
            indicator,
            load: None,
            #[cfg(target_arch = "wasm32")]
            key_listener,
            last_frame: Instant::now(),
            initializing: false,
            running: true,
        })
    }

    /// Stop rendering, abort the model load and leave the event loop.
    pub fn dispose(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        if let Some(load) = &self.load {
            load.cancel();
        }
        self.redirector.cancel();
        #[cfg(target_arch = "wasm32")]
        {
            self.key_listener = None;
        }
        if self.proxy.send_event(ViewerEvent::Exit).is_err() {
            log::debug!("Event loop already closed");
        }
        log::info!("Viewer disposed");
    }

    fn window_attributes(&self) -> winit::window::WindowAttributes {
        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("vitrine");

        #[cfg(not(target_arch = "wasm32"))]
        {
            window_attributes = window_attributes.with_inner_size(WINDOW_SIZE);
        }

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            let canvas = self.config.viewport.canvas_id.as_deref().and_then(|id| {
                web_sys::window()
                    .and_then(|window| window.document())
                    .and_then(|document| document.get_element_by_id(id))
                    .map(|element| element.unchecked_into())
            });
            window_attributes = match canvas {
                Some(canvas) => window_attributes.with_canvas(Some(canvas)),
                None => window_attributes.with_append(true),
            };
        }

        window_attributes
    }

    fn on_initialized(&mut self, ctx: Context) {
        let scene = Scene::compose(
            &ctx.device,
            &ctx.queue,
            &ctx.renderer.material_layout,
            &self.config,
        );

        self.start_model_load();
        ctx.window.request_redraw();
        self.scene = Some(scene);
        self.context = Some(ctx);
        self.last_frame = Instant::now();
        log::info!("Viewer ready");
    }

    fn start_model_load(&mut self) {
        let path = self.config.model.path();
        log::info!("Loading model {path}");
        let (load, task) = ModelLoad::new(AssetSource::default(), path);

        #[cfg(not(target_arch = "wasm32"))]
        self.async_runtime.spawn(task);
        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(task);

        self.load = Some(load);
    }

    fn on_init_failed(&mut self, event_loop: &ActiveEventLoop, err: &str) {
        log::error!("Viewer initialization failed: {err}");
        // the page keeps its redirect listeners, only the desktop window has nothing left to do
        #[cfg(not(target_arch = "wasm32"))]
        event_loop.exit();
        #[cfg(target_arch = "wasm32")]
        let _ = event_loop;
    }

    /// The width check follows window resizes with or without a GPU context.
    fn on_resized(&mut self, size: PhysicalSize<u32>) {
        if let Some(ctx) = self.context.as_mut() {
            ctx.resize(size.width, size.height);
        }
        if size.width == 0 || size.height == 0 {
            return;
        }
        #[cfg(not(target_arch = "wasm32"))]
        if let Some(window) = &self.window {
            let width = size.to_logical::<f64>(window.scale_factor()).width;
            self.redirector.navigator_mut().set_width(width);
        }
        self.redirector.on_resize(Instant::now());
    }

    /// Forward progress to the indicator and attach the model once it arrives.
    fn poll_load(&mut self) {
        let Some(load) = self.load.as_mut() else {
            return;
        };
        if let Some(progress) = load.poll_progress() {
            self.indicator.set_progress(progress);
        }
        let Some(result) = load.try_result() else {
            return;
        };
        let path = load.path().to_string();
        self.load = None;

        let (context, scene, model) = (self.context.as_ref(), self.scene.as_mut(), &self.config.model);
        indicator::finish_load(self.indicator.as_mut(), &path, result, |asset| {
            let (Some(ctx), Some(scene)) = (context, scene) else {
                anyhow::bail!("no scene to attach {} to", asset.path);
            };
            let node = upload_model(
                &asset,
                &ctx.device,
                &ctx.queue,
                &ctx.renderer.material_layout,
            )?;
            Ok(scene.attach_model(node, model))
        });
    }

    fn frame(&mut self) {
        if !self.running {
            return;
        }
        let now = Instant::now();
        let dt = now - self.last_frame;
        self.last_frame = now;

        self.redirector.poll(now);
        self.poll_load();

        let (Some(ctx), Some(scene)) = (self.context.as_mut(), self.scene.as_mut()) else {
            return;
        };
        ctx.renderer.update(&ctx.queue, scene, dt);
        match ctx.render(scene) {
            Ok(()) => (),
            // Reconfigure the surface if it's lost or outdated
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = ctx.window.inner_size();
                ctx.resize(size.width, size.height);
            }
            Err(e) => log::error!("Unable to render {}", e),
        }
        ctx.window.request_redraw();
    }
}

impl Drop for Viewer {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl ApplicationHandler<ViewerEvent> for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if !self.running || self.initializing || self.window.is_some() {
            return;
        }

        let window = match event_loop.create_window(self.window_attributes()) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                self.on_init_failed(event_loop, &format!("cannot create the viewer window: {err}"));
                return;
            }
        };
        self.window = Some(window.clone());

        let config = self.config.clone();
        let init_future = async move { Context::new(window, &config).await };

        #[cfg(not(target_arch = "wasm32"))]
        match self.async_runtime.block_on(init_future) {
            Ok(ctx) => self.on_initialized(ctx),
            Err(err) => self.on_init_failed(event_loop, &format!("{err:#}")),
        }

        #[cfg(target_arch = "wasm32")]
        {
            self.initializing = true;
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match init_future.await {
                    Ok(ctx) => ViewerEvent::Initialized(Box::new(ctx)),
                    Err(err) => ViewerEvent::InitFailed(format!("{err:#}")),
                };
                if proxy.send_event(event).is_err() {
                    log::warn!("Event loop closed before the viewer was ready");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Initialized(ctx) => {
                // This is the message from our wasm `spawn_local`
                self.initializing = false;
                if !self.running {
                    return;
                }
                let mut ctx = *ctx;
                let size = ctx.window.inner_size();
                ctx.resize(size.width, size.height);
                self.on_initialized(ctx);
            }
            ViewerEvent::InitFailed(err) => {
                self.initializing = false;
                self.on_init_failed(event_loop, &err);
            }
            ViewerEvent::SpacePressed => {
                self.redirector.on_key(PhysicalKey::Code(KeyCode::Space));
            }
            ViewerEvent::Exit => event_loop.exit(),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match &event {
            WindowEvent::CloseRequested => {
                self.dispose();
                event_loop.exit();
                return;
            }
            WindowEvent::Resized(size) => self.on_resized(*size),
            // the page-wide listener handles keys on the web
            #[cfg(not(target_arch = "wasm32"))]
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed && !event.repeat =>
            {
                self.redirector.on_key(event.physical_key);
            }
            _ => (),
        }

        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        ctx.renderer.camera.controller.handle_window_events(&event);

        match event {
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                ctx.set_pixel_ratio(scale_factor);
            }
            WindowEvent::RedrawRequested => self.frame(),
            _ => (),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        // frames poll the debounce once the context is up
        if self.context.is_some() || !self.running {
            event_loop.set_control_flow(ControlFlow::Wait);
            return;
        }
        let now = Instant::now();
        self.redirector.poll(now);
        let control_flow = match self.redirector.next_deadline() {
            Some(deadline) if deadline > now => ControlFlow::wait_duration(deadline - now),
            Some(_) => ControlFlow::Poll,
            None => ControlFlow::Wait,
        };
        event_loop.set_control_flow(control_flow);
    }
}

/// Run the viewer with the default showcase configuration.
pub fn run() -> anyhow::Result<()> {
    run_with(ViewerConfig::default())
}

pub fn run_with(config: ViewerConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&JsValue::from_str(&format!(
                "Could not initialize logger: {e}"
            )));
        }
    }

    let event_loop: EventLoop<ViewerEvent> = EventLoop::with_user_event().build()?;
    let viewer = Viewer::new(&event_loop, config)?;

    #[cfg(not(target_arch = "wasm32"))]
    {
        let mut viewer = viewer;
        event_loop.run_app(&mut viewer)?;
    }

    #[cfg(target_arch = "wasm32")]
    {
        use winit::platform::web::EventLoopExtWebSys;
        event_loop.spawn_app(viewer);
    }

    Ok(())
}
