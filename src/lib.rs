use std::sync::{Arc, Mutex};

use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;
#[cfg(target_arch = "wasm32")]
use winit::event_loop::EventLoopProxy;

mod app_state;
mod color;
mod models;
pub mod scene;
mod viewport;

use app_state::State;

/// Fired once the (possibly async) GPU state is ready and frames can start.
#[derive(Debug)]
pub enum AppEvent {
    StateReady,
}

struct App {
    window: Option<Arc<Window>>,
    // Wrapped in Arc<Mutex> so the WASM path can hand it to an async
    // initialization task.
    state: Arc<Mutex<Option<State>>>,
    #[cfg(target_arch = "wasm32")]
    proxy: Option<EventLoopProxy<AppEvent>>,
}

impl App {
    fn new(#[cfg(target_arch = "wasm32")] event_loop: &EventLoop<AppEvent>) -> Self {
        Self {
            window: None,
            state: Arc::new(Mutex::new(None)),
            #[cfg(target_arch = "wasm32")]
            proxy: Some(event_loop.create_proxy()),
        }
    }
}

impl ApplicationHandler<AppEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let mut window_attributes = Window::default_attributes().with_title("evograph");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "system-canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = Arc::new(event_loop.create_window(window_attributes).unwrap());
        self.window = Some(window.clone());

        #[cfg(not(target_arch = "wasm32"))]
        {
            let mut state = pollster::block_on(State::new(window)).unwrap();
            let current_size = self.window.as_ref().unwrap().inner_size();
            state.resize(current_size.width, current_size.height);
            self.state.lock().unwrap().replace(state);
            self.window.as_ref().unwrap().request_redraw();
        }

        #[cfg(target_arch = "wasm32")]
        {
            let state_arc_for_spawn = self.state.clone();
            let window_for_state_new = window.clone();
            let proxy_for_init_notification =
                self.proxy.as_ref().expect("App proxy not set").clone();

            wasm_bindgen_futures::spawn_local(async move {
                match State::new(window_for_state_new.clone()).await {
                    Ok(mut state_instance) => {
                        let initial_size = window_for_state_new.inner_size();
                        state_instance.resize(initial_size.width, initial_size.height);
                        state_arc_for_spawn.lock().unwrap().replace(state_instance);
                        if proxy_for_init_notification
                            .send_event(AppEvent::StateReady)
                            .is_err()
                        {
                            log::error!("Failed to send StateReady event.");
                        }
                    }
                    Err(e) => log::error!("Failed to create State in WASM: {:?}", e),
                }
            });
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: AppEvent) {
        match event {
            AppEvent::StateReady => {
                log::info!("GPU state initialized, starting frames.");
                if let Some(w_handle) = self.window.as_ref() {
                    w_handle.request_redraw();
                }
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = &mut *self.state.lock().unwrap() else {
            log::warn!("Window event received before State was initialized, ignoring.");
            return;
        };

        let window_handle = self.window.as_ref().unwrap();

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                state.resize(size.width, size.height);
                window_handle.request_redraw();
            }
            WindowEvent::RedrawRequested => {
                state.update();
                match state.render() {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => {
                        state.resize(state.config.width, state.config.height)
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => event_loop.exit(),
                    Err(e) => log::error!("{:?}", e),
                }
                // The effect runs for the lifetime of the window: each frame
                // schedules the next.
                window_handle.request_redraw();
            }
            _ => {}
        }
    }
}

pub fn run() -> anyhow::Result<()> {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "wasm32")] {
            console_error_panic_hook::set_once();
            console_log::init_with_level(log::Level::Info).unwrap_throw();
            log::info!("Starting evograph.");
        } else {
            env_logger::init();
        }
    }

    let event_loop = EventLoop::with_user_event().build()?;
    let mut app = App::new(
        #[cfg(target_arch = "wasm32")]
        &event_loop,
    );
    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), wasm_bindgen::JsValue> {
    run().unwrap_throw();
    Ok(())
}
