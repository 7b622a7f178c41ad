pub mod config;
pub mod controller;
pub mod digits;

pub use config::{TrialConfig, TrialTexts};
pub use controller::{Ports, TrialController, TrialEvent};
pub use digits::{DIGIT_WORDS, DigitProbe};
