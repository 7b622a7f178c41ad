use rsvp_core::{
    FullscreenGuardian, HostPage, ResultSink, SessionContext, SessionStore, SinkError, Surface,
    View,
};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use tracing::warn;
use winit::window::{Fullscreen, Window};

/// The surface the controller pushes into: a cell holding the latest view,
/// redrawn by the frame loop.
#[derive(Clone)]
pub struct SharedView(pub Rc<RefCell<Option<View>>>);

impl SharedView {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(None)))
    }

    pub fn snapshot(&self) -> Option<View> {
        self.0.borrow().clone()
    }
}

impl Surface for SharedView {
    fn render(&mut self, view: &View) {
        *self.0.borrow_mut() = Some(view.clone());
    }

    fn clear(&mut self) {
        *self.0.borrow_mut() = None;
    }
}

/// Fullscreen control backed by the real window. Change events are detected
/// by the frame loop polling `is_active` and forwarded to the controller.
pub struct WindowFullscreen(pub Arc<Window>);

impl FullscreenGuardian for WindowFullscreen {
    fn is_active(&self) -> bool {
        self.0.fullscreen().is_some()
    }

    fn request(&mut self) {
        self.0.set_fullscreen(Some(Fullscreen::Borderless(None)));
    }

    fn exit(&mut self) {
        self.0.set_fullscreen(None);
    }
}

/// Durable answers, one JSON object for the whole run. Each trial gets its
/// own key prefix so consecutive trials never collide.
pub struct JsonResultSink {
    path: PathBuf,
    prefix: String,
    entries: Rc<RefCell<BTreeMap<String, String>>>,
}

impl JsonResultSink {
    pub fn new(
        path: PathBuf,
        prefix: String,
        entries: Rc<RefCell<BTreeMap<String, String>>>,
    ) -> Self {
        Self {
            path,
            prefix,
            entries,
        }
    }
}

impl ResultSink for JsonResultSink {
    fn store(&mut self, key: &str, value: &str) -> Result<(), SinkError> {
        self.entries
            .borrow_mut()
            .insert(format!("{}.{key}", self.prefix), value.to_owned());
        let json = serde_json::to_string_pretty(&*self.entries.borrow())
            .map_err(|e| SinkError::new(key, e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| SinkError::new(key, e.to_string()))
    }
}

/// Session context persisted as a small JSON file, the file-backed stand-in
/// for per-session browser storage.
pub struct JsonSessionStore {
    path: PathBuf,
}

impl JsonSessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SessionStore for JsonSessionStore {
    fn load(&mut self) -> SessionContext {
        match fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            Err(_) => SessionContext::default(),
        }
    }

    fn save(&mut self, ctx: &SessionContext) {
        let json = match serde_json::to_string(ctx) {
            Ok(json) => json,
            Err(err) => {
                warn!(%err, "session context not serializable");
                return;
            }
        };
        if let Err(err) = fs::write(&self.path, json) {
            warn!(%err, path = %self.path.display(), "session write failed");
        }
    }
}

/// Advance signal from the controller to the frame loop: the loop tears the
/// finished trial down and starts the next one.
#[derive(Clone)]
pub struct AdvanceFlag(pub Rc<Cell<bool>>);

impl AdvanceFlag {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(false)))
    }

    pub fn take(&self) -> bool {
        self.0.replace(false)
    }
}

impl HostPage for AdvanceFlag {
    fn request_advance(&mut self) {
        self.0.set(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_view_holds_latest_render() {
        let mut surface = SharedView::new();
        let reader = surface.clone();
        surface.render(&View::Ready);
        assert_eq!(reader.snapshot(), Some(View::Ready));
        surface.clear();
        assert_eq!(reader.snapshot(), None);
    }

    #[test]
    fn advance_flag_is_consumed_once() {
        let flag = AdvanceFlag::new();
        let mut host: Box<dyn HostPage> = Box::new(flag.clone());
        host.request_advance();
        assert!(flag.take());
        assert!(!flag.take());
    }

    #[test]
    fn session_store_round_trips() {
        let path = std::env::temp_dir().join("rsvp-session-store-test.json");
        let mut store = JsonSessionStore::new(path.clone());
        store.save(&SessionContext {
            has_entered_fullscreen: true,
        });
        assert!(store.load().has_entered_fullscreen);
        let _ = fs::remove_file(path);
    }
}
