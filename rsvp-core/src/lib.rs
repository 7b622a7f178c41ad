pub mod error;
pub mod ports;
pub mod response;
pub mod session;
pub mod state;
pub mod view;

pub use error::{SinkError, TrialError};
pub use ports::{FullscreenGuardian, HostPage, ResultSink, SessionStore, Surface};
pub use response::{DigitAnswer, KEY_DIGIT_RESPONSE, KEY_RECALL, RECALL_TIMEOUT_SENTINEL};
pub use session::SessionContext;
pub use state::{ResumePolicy, TrialState};
pub use view::{TrialSummary, View};
