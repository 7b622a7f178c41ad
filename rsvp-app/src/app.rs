use crate::config::AppConfig;
use crate::ports::{AdvanceFlag, JsonResultSink, JsonSessionStore, SharedView, WindowFullscreen};
use crate::screen;
use crate::text::TextPainter;
use anyhow::{Context, Result};
use pixels::{Pixels, SurfaceTexture};
use rand::rngs::ThreadRng;
use rsvp_core::{SessionStore, TrialState, View};
use rsvp_experiment::{Ports, TrialController, TrialEvent};
use rsvp_timing::FrameClock;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;
use tiny_skia::Pixmap;
use tracing::{error, info};
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Fullscreen, Window, WindowId},
};

type Controller = TrialController<FrameClock, ThreadRng>;

pub struct App {
    config: AppConfig,
    painter: TextPainter,
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    canvas: Option<Pixmap>,
    controller: Option<Controller>,
    shared_view: SharedView,
    advance: AdvanceFlag,
    results: Rc<RefCell<BTreeMap<String, String>>>,
    trial_index: usize,
    fullscreen_active: bool,
    typed: String,
    fatal: Option<String>,
    should_exit: bool,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let painter = TextPainter::load(config.font_path.as_deref())?;
        Ok(Self {
            config,
            painter,
            window: None,
            pixels: None,
            canvas: None,
            controller: None,
            shared_view: SharedView::new(),
            advance: AdvanceFlag::new(),
            results: Rc::new(RefCell::new(BTreeMap::new())),
            trial_index: 0,
            fullscreen_active: false,
            typed: String::new(),
            fatal: None,
            should_exit: false,
        })
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        info!(trials = self.config.sentences.len(), "starting RSVP session");
        event_loop.run_app(&mut self)?;
        Ok(())
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window_attributes = Window::default_attributes()
            .with_title("RSVP Reading Trial")
            .with_inner_size(LogicalSize::new(1280.0, 720.0))
            .with_resizable(false);

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let physical_size = window.inner_size();

        let surface_texture =
            SurfaceTexture::new(physical_size.width, physical_size.height, window.clone());
        self.pixels = Some(Pixels::new(
            physical_size.width,
            physical_size.height,
            surface_texture,
        )?);
        self.canvas = Some(
            Pixmap::new(physical_size.width, physical_size.height).context("frame canvas")?,
        );

        window.request_redraw();
        self.window = Some(window);

        self.start_trial();
        Ok(())
    }

    /// Build and launch the controller for the current sentence. Each trial
    /// gets fresh collaborators; only the session file carries over.
    fn start_trial(&mut self) {
        let Some(window) = &self.window else { return };
        let Some(sentence) = self.config.sentences.get(self.trial_index).cloned() else {
            self.should_exit = true;
            return;
        };
        info!(trial = self.trial_index, "starting trial");

        let mut session_store = JsonSessionStore::new(self.config.session_path.clone());
        let session = session_store.load();
        let ports = Ports {
            surface: Box::new(self.shared_view.clone()),
            guardian: Box::new(WindowFullscreen(window.clone())),
            sink: Box::new(JsonResultSink::new(
                self.config.results_path.clone(),
                format!("trial_{:02}", self.trial_index),
                self.results.clone(),
            )),
            host: Box::new(self.advance.clone()),
            session_store: Box::new(session_store),
        };

        match TrialController::new(
            self.config.trial.clone(),
            &sentence,
            session,
            ports,
            FrameClock::new(),
            rand::rng(),
        ) {
            Ok(mut controller) => {
                controller.start();
                self.typed.clear();
                self.controller = Some(controller);
            }
            Err(err) => {
                error!(%err, trial = self.trial_index, "trial refused to start");
                self.fatal = Some(err.to_string());
                self.controller = None;
            }
        }
        self.fullscreen_active = window.fullscreen().is_some();
    }

    /// Once per frame: detect fullscreen edges, pump timers, and roll over
    /// to the next trial when the finished one asked to advance.
    fn tick(&mut self) {
        if let (Some(window), Some(controller)) = (&self.window, &mut self.controller) {
            let active = window.fullscreen().is_some();
            if active != self.fullscreen_active {
                self.fullscreen_active = active;
                if !active {
                    self.typed.clear();
                }
                controller.handle_event(TrialEvent::FullscreenChanged(active));
            }
            controller.pump();
        }

        if self.advance.take() {
            if let Some(mut finished) = self.controller.take() {
                finished.teardown();
            }
            self.trial_index += 1;
            if self.trial_index >= self.config.sentences.len() {
                info!(results = %self.config.results_path.display(), "all trials complete");
                self.should_exit = true;
            } else {
                self.start_trial();
            }
        }
    }

    fn render(&mut self) -> Result<()> {
        let pixels = self.pixels.as_mut().context("no surface")?;
        let canvas = self.canvas.as_mut().context("no canvas")?;

        if let Some(message) = &self.fatal {
            screen::draw_error(canvas, &self.painter, message);
        } else {
            let view = self.shared_view.snapshot();
            screen::draw(canvas, &self.painter, &self.config.trial, view.as_ref());
        }

        pixels.frame_mut().copy_from_slice(canvas.data());
        pixels.render()?;
        Ok(())
    }

    fn handle_key(&mut self, event: KeyEvent, event_loop: &ActiveEventLoop) {
        if matches!(event.logical_key, Key::Named(NamedKey::Escape)) {
            self.cleanup_and_exit(event_loop);
            return;
        }
        let Some(state) = self.controller.as_ref().map(|c| c.state()) else {
            return;
        };
        let timed_out = matches!(
            self.shared_view.snapshot(),
            Some(View::RecallTimedOut { .. })
        );

        // "F" doubles as a typeable character during recall; everywhere else
        // it is the fullscreen affordance, like F11.
        let fullscreen_key = matches!(event.logical_key, Key::Named(NamedKey::F11))
            || (state != TrialState::FreeRecall
                && matches!(&event.logical_key, Key::Character(c) if c.eq_ignore_ascii_case("f")));
        if fullscreen_key
            && matches!(
                state,
                TrialState::Instructions | TrialState::FullscreenPrompt | TrialState::Paused
            )
        {
            self.request_fullscreen();
            return;
        }

        let enter = matches!(event.logical_key, Key::Named(NamedKey::Enter));
        let space = matches!(event.logical_key, Key::Named(NamedKey::Space));

        let trial_event = match state {
            TrialState::Instructions if enter || space => Some(TrialEvent::StartClicked),
            TrialState::ReadyConfirmation if enter || space => Some(TrialEvent::ContinueClicked),
            TrialState::DigitQuestion => match &event.logical_key {
                Key::Character(c) if c.eq_ignore_ascii_case("y") => Some(TrialEvent::YesClicked),
                Key::Character(c) if c.eq_ignore_ascii_case("n") => Some(TrialEvent::NoClicked),
                _ => None,
            },
            TrialState::FreeRecall if timed_out && enter => Some(TrialEvent::ContinueClicked),
            TrialState::FreeRecall if enter => Some(TrialEvent::TextSubmitted(self.typed.clone())),
            TrialState::FreeRecall => match &event.logical_key {
                Key::Named(NamedKey::Backspace) => {
                    self.typed.pop();
                    Some(TrialEvent::DraftChanged(self.typed.clone()))
                }
                _ => match &event.text {
                    Some(text) => {
                        let mut changed = false;
                        for ch in text.chars() {
                            if !ch.is_control() {
                                self.typed.push(ch);
                                changed = true;
                            }
                        }
                        changed.then(|| TrialEvent::DraftChanged(self.typed.clone()))
                    }
                    None => None,
                },
            },
            _ => None,
        };

        if let (Some(trial_event), Some(controller)) = (trial_event, &mut self.controller) {
            controller.handle_event(trial_event);
        }
    }

    fn request_fullscreen(&self) {
        if let Some(window) = &self.window {
            if window.fullscreen().is_none() {
                window.set_fullscreen(Some(Fullscreen::Borderless(None)));
            }
        }
    }

    fn handle_resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        if let Some(pixels) = &mut self.pixels {
            if let Err(err) = pixels.resize_surface(new_size.width, new_size.height) {
                error!(%err, "surface resize failed");
            }
            if let Err(err) = pixels.resize_buffer(new_size.width, new_size.height) {
                error!(%err, "buffer resize failed");
            }
        }
        self.canvas = Pixmap::new(new_size.width, new_size.height);
    }

    fn cleanup_and_exit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut controller) = self.controller.take() {
            controller.teardown();
        }
        info!("session closed");
        self.should_exit = true;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(err) = self.create_window_and_surface(event_loop) {
                error!(%err, "window setup failed");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.cleanup_and_exit(event_loop),
            WindowEvent::RedrawRequested => {
                self.tick();
                if let Err(err) = self.render() {
                    error!(%err, "render failed");
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                self.handle_key(event, event_loop);
            }
            WindowEvent::Resized(size) => self.handle_resize(size),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            event_loop.exit();
        }
    }
}
