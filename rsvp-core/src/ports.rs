use crate::error::SinkError;
use crate::session::SessionContext;
use crate::view::View;

/// Where the current stimulus is drawn. The controller only pushes; it never
/// queries rendered content back.
pub trait Surface {
    fn render(&mut self, view: &View);
    fn clear(&mut self);
}

/// Fullscreen state of the host environment. Change notifications arrive at
/// the controller as events, not through this trait.
pub trait FullscreenGuardian {
    fn is_active(&self) -> bool;
    fn request(&mut self);
    fn exit(&mut self);
}

/// Durable destination for the trial's final answers. The controller calls
/// `store` exactly once per key and does not retry on failure.
pub trait ResultSink {
    fn store(&mut self, key: &str, value: &str) -> Result<(), SinkError>;
}

/// The page or shell hosting the trial; `request_advance` is called exactly
/// once, when the trial reaches its terminal state.
pub trait HostPage {
    fn request_advance(&mut self);
}

/// Read/write home of the cross-trial session context.
pub trait SessionStore {
    fn load(&mut self) -> SessionContext;
    fn save(&mut self, ctx: &SessionContext);
}
