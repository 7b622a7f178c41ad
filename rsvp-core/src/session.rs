use serde::{Deserialize, Serialize};

/// Cross-trial participant context. Injected into the controller at
/// construction and written back through a [`crate::ports::SessionStore`]
/// whenever fullscreen is newly entered; absent on a fresh session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    #[serde(default)]
    pub has_entered_fullscreen: bool,
}
