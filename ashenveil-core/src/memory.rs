//! Event memory and chronicle summarization bookkeeping.
//!
//! Events are appended each turn. Once `SUMMARIZE_EVERY` events accumulate,
//! the engine compresses them into a single chronicle paragraph (via the DM)
//! and clears the live log. This keeps the prompt context lean without
//! losing narrative continuity.

use serde::{Deserialize, Serialize};

/// Compress after every N events.
pub const SUMMARIZE_EVERY: usize = 5;

/// Rolling log of notable game events plus compressed chronicle chapters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chronicle {
    /// Raw recent events, cleared into a summary at the threshold.
    pub events: Vec<String>,
    /// Compressed summaries of older events, oldest first.
    pub summaries: Vec<String>,
}

impl Chronicle {
    /// Append a notable event to the live log.
    pub fn record(&mut self, event: impl Into<String>) {
        self.events.push(event.into());
    }

    /// True when enough events have accumulated to warrant compression.
    pub fn should_summarize(&self) -> bool {
        self.events.len() >= SUMMARIZE_EVERY
    }

    /// Take all current events, clearing the live log.
    pub fn drain_events(&mut self) -> Vec<String> {
        std::mem::take(&mut self.events)
    }

    /// Append a finished chronicle chapter.
    pub fn push_summary(&mut self, summary: impl Into<String>) {
        self.summaries.push(summary.into());
    }

    /// Formatted memory block for insertion into the DM prompt.
    pub fn context_block(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        if !self.summaries.is_empty() {
            parts.push("=== Chronicle of Past Events ===".to_string());
            for (i, summary) in self.summaries.iter().enumerate() {
                parts.push(format!("[Chapter {}] {}", i + 1, summary));
            }
        }

        if !self.events.is_empty() {
            parts.push("=== Recent Events ===".to_string());
            for event in &self.events {
                parts.push(format!("* {event}"));
            }
        }

        if parts.is_empty() {
            "No significant events recorded yet.".to_string()
        } else {
            parts.join("\n")
        }
    }
}
