use rand::Rng;
use rand::seq::SliceRandom;

/// Spelled-word forms of the digit population, indexed by digit - 1.
pub const DIGIT_WORDS: [&str; 9] = [
    "one", "two", "three", "four", "five", "six", "seven", "eight", "nine",
];

/// Distractor material for one trial: five distinct digits to display and a
/// probe that is either among them or drawn from the complement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitProbe {
    pub shown: [u8; 5],
    pub probe: u8,
    pub present: bool,
}

impl DigitProbe {
    /// Fisher-Yates shuffle of {1..9}; the first five are displayed. An
    /// unbiased coin decides whether the probe names a member of the
    /// displayed set (uniform over the five) or of the complement (uniform
    /// over the remaining four).
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        let mut pool: [u8; 9] = [1, 2, 3, 4, 5, 6, 7, 8, 9];
        pool.shuffle(rng);

        let shown = [pool[0], pool[1], pool[2], pool[3], pool[4]];
        let present = rng.random_bool(0.5);
        let probe = if present {
            shown[rng.random_range(0..5)]
        } else {
            pool[5 + rng.random_range(0..4)]
        };

        Self {
            shown,
            probe,
            present,
        }
    }

    pub fn spelled(&self) -> &'static str {
        DIGIT_WORDS[(self.probe - 1) as usize]
    }

    /// Display form of the digit set, e.g. "3 7 1 9 5".
    pub fn shown_line(&self) -> String {
        self.shown
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
