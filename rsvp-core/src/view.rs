use crate::response::DigitAnswer;
use serde::{Deserialize, Serialize};

/// One variant per screen the trial can show. Carries only the dynamic data;
/// static texts and symbols come from the trial configuration, so a surface
/// renders a view together with the config it was built against.
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Instructions {
        start_enabled: bool,
        fullscreen_notice: bool,
    },
    FullscreenPrompt,
    ReadyConfirmation,
    Ready,
    Fixation,
    Word(String),
    Mask,
    DigitSet(String),
    PercentSigns,
    SpelledDigit(String),
    DigitQuestion {
        spelled: String,
        answered: Option<DigitAnswer>,
    },
    FreeRecall {
        remaining_secs: u32,
        draft: String,
        show_empty_error: bool,
    },
    RecallTimedOut {
        draft: String,
    },
    Paused,
    End(TrialSummary),
}

/// End-screen report of everything the trial collected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSummary {
    pub sentence: String,
    pub recall: String,
    pub digits: String,
    pub spelled: String,
    pub present: bool,
    pub answer: DigitAnswer,
}

impl TrialSummary {
    /// A "yes" is correct iff the probe really was among the displayed
    /// digits.
    pub fn answer_correct(&self) -> bool {
        match self.answer {
            DigitAnswer::Yes => self.present,
            DigitAnswer::No => !self.present,
        }
    }
}
