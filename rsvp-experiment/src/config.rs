use rsvp_core::TrialError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// All durations, symbols, and display texts for one trial variant. The
/// controller is parameterized on this struct; experiment variants differ
/// only in the values, never in the state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialConfig {
    /// Each word displays for this long.
    pub word_duration_ms: u64,
    /// Gap between words; the word tick is duration + gap.
    pub word_gap_ms: u64,
    pub ready_duration_ms: u64,
    pub asterisks_duration_ms: u64,
    pub blank_duration_ms: u64,
    pub mask_duration_ms: u64,
    pub digits_duration_ms: u64,
    pub percent_duration_ms: u64,
    pub spelled_duration_ms: u64,
    /// Hold after a yes/no click, buttons disabled, before free recall.
    pub answer_hold_ms: u64,
    /// Free-recall countdown budget in seconds.
    pub recall_budget_secs: u32,

    pub fixation_symbol: String,
    pub mask_symbol: String,
    pub percent_symbol: String,

    pub texts: TrialTexts,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            word_duration_ms: 200,
            word_gap_ms: 40,
            ready_duration_ms: 1000,
            asterisks_duration_ms: 300,
            blank_duration_ms: 100,
            mask_duration_ms: 100,
            digits_duration_ms: 533,
            percent_duration_ms: 100,
            spelled_duration_ms: 500,
            answer_hold_ms: 600,
            recall_budget_secs: 60,
            fixation_symbol: "*****".into(),
            mask_symbol: "####".into(),
            percent_symbol: "%%%%%".into(),
            texts: TrialTexts::default(),
        }
    }
}

impl TrialConfig {
    /// Interval of the repeating word timer.
    pub fn word_tick(&self) -> Duration {
        Duration::from_millis(self.word_duration_ms + self.word_gap_ms)
    }

    pub fn validate(&self) -> Result<(), TrialError> {
        if self.word_duration_ms + self.word_gap_ms == 0 {
            return Err(TrialError::InvalidConfig(
                "word tick must be longer than zero".into(),
            ));
        }
        if self.recall_budget_secs == 0 {
            return Err(TrialError::InvalidConfig(
                "recall budget must be at least one second".into(),
            ));
        }
        Ok(())
    }
}

/// Every participant-facing string. Kept apart from the timing knobs so a
/// study can rewrite the wording without touching the schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialTexts {
    pub instruction_title: String,
    pub instruction_lines: Vec<String>,
    pub fullscreen_instruction: String,
    pub fullscreen_button: String,
    pub fullscreen_exited: String,
    pub return_to_fullscreen: String,
    pub start_button: String,
    pub start_needs_fullscreen: String,
    pub ready: String,
    pub confirm_ready: String,
    pub confirm_ready_button: String,
    /// `{spelled}` is replaced with the probe word.
    pub digit_question: String,
    pub yes_button: String,
    pub no_button: String,
    pub recall_title: String,
    pub recall_prompt: String,
    pub submit_button: String,
    pub continue_button: String,
    pub empty_recall_error: String,
    pub time_remaining: String,
    pub timeout_notice: String,
    pub paused_title: String,
    pub end_title: String,
}

impl Default for TrialTexts {
    fn default() -> Self {
        Self {
            instruction_title: "RSVP Test".into(),
            instruction_lines: vec![
                "You will see a headline presented one word at a time in the center of the screen.".into(),
                "Each word will appear for a brief moment before the next word appears.".into(),
                "After reading the entire headline, you'll complete a digits task.".into(),
                "Finally, you'll be asked to re-type the headline as best you can.".into(),
            ],
            fullscreen_instruction: "This experiment requires full-screen mode. Please enter full-screen mode to continue.".into(),
            fullscreen_button: "Enter Full-Screen Mode".into(),
            fullscreen_exited: "You have exited full-screen mode. Please return to full-screen to continue the experiment.".into(),
            return_to_fullscreen: "Return to Full-Screen".into(),
            start_button: "Click to Start".into(),
            start_needs_fullscreen: "Please enter full-screen mode before starting the experiment.".into(),
            ready: "Ready?".into(),
            confirm_ready: "Click to move to next headline:".into(),
            confirm_ready_button: "Continue".into(),
            digit_question: "Was the word \"{spelled}\" among the digits you saw?".into(),
            yes_button: "Yes".into(),
            no_button: "No".into(),
            recall_title: "Recall".into(),
            recall_prompt: "Please type the headline you saw as exactly as you can:".into(),
            submit_button: "Submit".into(),
            continue_button: "Continue".into(),
            empty_recall_error: "Please type your recall of the headline before continuing.".into(),
            time_remaining: "Time remaining: {secs} seconds".into(),
            timeout_notice: "Time has run out. Click to proceed.".into(),
            paused_title: "Experiment Paused".into(),
            end_title: "All Done!".into(),
        }
    }
}

impl TrialTexts {
    pub fn digit_question_for(&self, spelled: &str) -> String {
        self.digit_question.replace("{spelled}", spelled)
    }

    pub fn time_remaining_for(&self, secs: u32) -> String {
        self.time_remaining.replace("{secs}", &secs.to_string())
    }
}
