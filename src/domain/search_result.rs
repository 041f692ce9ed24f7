use serde::{Deserialize, Serialize};

use super::{
    detail_record::DetailRecord,
    risk::{classify, Score},
};

/// Outcome of checking one name against the registry.
///
/// Serializes to `{score, explanation, details}` or `{error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchResult {
    Scored {
        score: Score,
        explanation: String,
        details: Vec<DetailRecord>,
    },
    Failed {
        error: String,
    },
}

impl SearchResult {
    /// Scores the successfully resolved records; `details` keeps error-only
    /// entries too, in discovery order.
    pub fn from_details(details: Vec<DetailRecord>) -> Self {
        let verdict = classify(details.iter().filter(|d| !d.is_error()));
        SearchResult::Scored {
            score: verdict.score,
            explanation: verdict.explanation,
            details,
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        SearchResult::Failed {
            error: error.to_string(),
        }
    }

    pub fn score(&self) -> Option<Score> {
        match self {
            SearchResult::Scored { score, .. } => Some(*score),
            SearchResult::Failed { .. } => None,
        }
    }

    pub fn details(&self) -> &[DetailRecord] {
        match self {
            SearchResult::Scored { details, .. } => details,
            SearchResult::Failed { .. } => &[],
        }
    }
}
