use serde::{Deserialize, Serialize};

/// Trial presentation stages, in presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialState {
    Instructions,
    FullscreenPrompt,
    ReadyConfirmation,
    Ready,
    Asterisks,
    Blank,
    Rsvp,
    Mask,
    DistractorDigits,
    PercentSigns,
    SpelledDigit,
    DigitQuestion,
    FreeRecall,
    End,
    Paused,
}

/// Where a paused trial picks up once fullscreen is restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePolicy {
    /// Re-enter the interrupted state unchanged.
    Reenter,
    /// Restart the strictly-timed presentation sequence from `Ready`.
    RestartSequence,
}

impl TrialState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TrialState::End)
    }

    /// Losing fullscreen in these states interrupts the trial. Instructional
    /// screens and the terminal state carry on regardless.
    pub fn is_pausable(&self) -> bool {
        !matches!(
            self,
            TrialState::Instructions
                | TrialState::FullscreenPrompt
                | TrialState::Paused
                | TrialState::End
        )
    }

    /// The strictly-timed stimulus sequence cannot be resumed mid-flight
    /// without breaking timing fidelity; user-driven stages can.
    pub fn resume_policy(&self) -> ResumePolicy {
        match self {
            TrialState::ReadyConfirmation | TrialState::DigitQuestion | TrialState::FreeRecall => {
                ResumePolicy::Reenter
            }
            _ => ResumePolicy::RestartSequence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timed_stages_restart_from_ready() {
        for state in [
            TrialState::Ready,
            TrialState::Asterisks,
            TrialState::Blank,
            TrialState::Rsvp,
            TrialState::Mask,
            TrialState::DistractorDigits,
            TrialState::PercentSigns,
            TrialState::SpelledDigit,
        ] {
            assert_eq!(state.resume_policy(), ResumePolicy::RestartSequence);
            assert!(state.is_pausable());
        }
    }

    #[test]
    fn user_driven_stages_reenter() {
        for state in [
            TrialState::ReadyConfirmation,
            TrialState::DigitQuestion,
            TrialState::FreeRecall,
        ] {
            assert_eq!(state.resume_policy(), ResumePolicy::Reenter);
        }
    }

    #[test]
    fn instructional_and_terminal_states_never_pause() {
        for state in [
            TrialState::Instructions,
            TrialState::FullscreenPrompt,
            TrialState::Paused,
            TrialState::End,
        ] {
            assert!(!state.is_pausable());
        }
    }
}
