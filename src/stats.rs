use crate::format::{PLACEHOLDER, format_date, format_number};
use crate::model::StatsResponse;
use serde::Serialize;

/// Display strings for the index statistics panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsPanel {
    pub documents: String,
    pub avg_doc_length: String,
    pub terms: String,
    pub last_full_build: String,
}

impl Default for StatsPanel {
    fn default() -> Self {
        Self {
            documents: PLACEHOLDER.to_string(),
            avg_doc_length: PLACEHOLDER.to_string(),
            terms: PLACEHOLDER.to_string(),
            last_full_build: PLACEHOLDER.to_string(),
        }
    }
}

impl StatsPanel {
    pub fn apply(&mut self, stats: &StatsResponse) {
        self.apply_with(stats, format_date);
    }

    pub(crate) fn apply_with(&mut self, stats: &StatsResponse, date: impl Fn(&str) -> String) {
        self.documents = format_number(stats.documents);
        self.avg_doc_length = stats
            .avg_doc_length
            .filter(|avg| *avg != 0.0 && !avg.is_nan())
            .map(|avg| format!("{} tokens", format_number(Some(avg.round()))))
            .unwrap_or_else(|| PLACEHOLDER.to_string());
        self.terms = format_number(stats.terms);
        self.last_full_build = stats
            .last_full_build
            .as_deref()
            .filter(|value| !value.is_empty())
            .map(date)
            .unwrap_or_else(|| PLACEHOLDER.to_string());
    }

    /// Failed loads only reset the document count; the other fields keep
    /// whatever they last showed.
    pub fn mark_unavailable(&mut self) {
        self.documents = PLACEHOLDER.to_string();
    }
}
