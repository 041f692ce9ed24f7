use serde::{Deserialize, Serialize};

use super::detail_record::DetailRecord;

/// Nice classes that turn a live filing into a red flag.
pub const FLAGGED_CLASSES: [&str; 3] = ["009", "028", "041"];

const GREEN_EXPLANATION: &str = "No live trademark registrations were found.";
const RED_EXPLANATION: &str =
    "At least one live trademark is registered in class 009, 028 or 041.";
const YELLOW_EXPLANATION: &str =
    "Live trademarks exist, but none are registered in class 009, 028 or 041.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Score {
    Green,
    Yellow,
    Red,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub score: Score,
    pub explanation: String,
}

pub fn is_flagged_class(class: &str) -> bool {
    FLAGGED_CLASSES.contains(&class)
}

/// Order-independent reduction of a name's filings into a score.
/// Records carrying an error are ignored.
pub fn classify<'a, I>(records: I) -> Verdict
where
    I: IntoIterator<Item = &'a DetailRecord>,
{
    let (has_live, has_red_class) = records
        .into_iter()
        .filter(|record| record.is_live())
        .fold((false, false), |(_, red), record| {
            (true, red || record.classes.iter().any(|c| is_flagged_class(c)))
        });

    let (score, explanation) = match (has_live, has_red_class) {
        (false, _) => (Score::Green, GREEN_EXPLANATION),
        (true, true) => (Score::Red, RED_EXPLANATION),
        (true, false) => (Score::Yellow, YELLOW_EXPLANATION),
    };

    Verdict {
        score,
        explanation: explanation.to_string(),
    }
}
