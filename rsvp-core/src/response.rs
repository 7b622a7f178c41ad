use serde::{Deserialize, Serialize};

/// Reserved marker written when the recall window expires with nothing
/// typed. Distinct from genuine empty input, which never finalizes.
pub const RECALL_TIMEOUT_SENTINEL: &str = "TIME_OUT";

/// Result-sink key for the recalled sentence.
pub const KEY_RECALL: &str = "recall";

/// Result-sink key for the digit-probe judgment.
pub const KEY_DIGIT_RESPONSE: &str = "digit_response";

/// Present/absent judgment on the spelled probe digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigitAnswer {
    Yes,
    No,
}

impl DigitAnswer {
    pub fn as_str(&self) -> &'static str {
        match self {
            DigitAnswer::Yes => "yes",
            DigitAnswer::No => "no",
        }
    }
}
