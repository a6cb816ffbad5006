//! Run-scoped history of scored rounds
//!
//! The history is owned by one configurator for one run. Entries are only
//! ever appended; the single permitted mutation is recording the suggestion
//! made from the most recent entry.

use crate::configurator::Suggestion;
use gann_model::{Error, Result, Settings};

/// Maximum characters of an instruction shown in the rendered history
pub const INSTRUCTION_PREVIEW_CHARS: usize = 120;

/// One scored round
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry<S> {
    pub instruction: String,
    pub settings_used: Settings,
    pub score: f64,
    /// Value suggested for the round after this one, if a suggestion was made
    pub suggested_next: Option<S>,
}

impl<S> HistoryEntry<S> {
    pub fn new(instruction: impl Into<String>, settings_used: Settings, score: f64) -> Self {
        Self {
            instruction: instruction.into(),
            settings_used,
            score,
            suggested_next: None,
        }
    }
}

/// Ordered, append-only sequence of [`HistoryEntry`] values
#[derive(Debug, Clone)]
pub struct History<S> {
    entries: Vec<HistoryEntry<S>>,
}

impl<S> Default for History<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> History<S> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Append an entry, returning its zero-based position
    pub fn append(&mut self, entry: HistoryEntry<S>) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    /// Record the suggestion made from the most recent entry.
    ///
    /// Fails if the history is empty or the latest entry already carries a
    /// suggestion.
    pub fn record_suggestion(&mut self, value: S) -> Result<()> {
        let last = self.entries.last_mut().ok_or_else(|| {
            Error::unexpected("cannot record a suggestion on an empty history")
                .with_operation("history::record_suggestion")
        })?;
        if last.suggested_next.is_some() {
            return Err(Error::unexpected("latest entry already has a suggestion")
                .with_operation("history::record_suggestion"));
        }
        last.suggested_next = Some(value);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[HistoryEntry<S>] {
        &self.entries
    }

    pub fn last(&self) -> Option<&HistoryEntry<S>> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HistoryEntry<S>> {
        self.entries.iter()
    }
}

impl<S: Suggestion> History<S> {
    /// Render oldest first, one line per run
    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return "No previous runs yet.".to_string();
        }

        self.entries
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let line = format!(
                    "Run {}: prompt=\"{}\", temperature={}, score={}",
                    i + 1,
                    preview(&h.instruction, INSTRUCTION_PREVIEW_CHARS),
                    h.settings_used.temperature,
                    h.score
                );
                match &h.suggested_next {
                    Some(next) => format!("{} (suggested next {}: {})", line, S::LABEL, next.render()),
                    None => line,
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Truncate to `max` characters, marking the cut with `...`
pub fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configurator::Temperature;

    const SETTINGS: Settings = Settings::new(0.7, 1024, 30_000);

    #[test]
    fn test_append_keeps_round_order() {
        let mut history: History<Temperature> = History::new();
        assert_eq!(history.append(HistoryEntry::new("first", SETTINGS, 4.0)), 0);
        assert_eq!(history.append(HistoryEntry::new("second", SETTINGS, 6.0)), 1);

        let instructions: Vec<_> = history.iter().map(|e| e.instruction.as_str()).collect();
        assert_eq!(instructions, ["first", "second"]);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_record_suggestion_targets_latest_only() {
        let mut history = History::new();
        history.append(HistoryEntry::new("first", SETTINGS, 4.0));
        history.record_suggestion(Temperature(0.5)).unwrap();
        history.append(HistoryEntry::new("second", SETTINGS.with_temperature(0.5), 6.0));
        history.record_suggestion(Temperature(0.4)).unwrap();

        assert_eq!(history.entries()[0].suggested_next, Some(Temperature(0.5)));
        assert_eq!(history.entries()[1].suggested_next, Some(Temperature(0.4)));
    }

    #[test]
    fn test_record_suggestion_rejects_double_write_and_empty() {
        let mut history: History<Temperature> = History::new();
        assert!(history.record_suggestion(Temperature(0.5)).is_err());

        history.append(HistoryEntry::new("only", SETTINGS, 4.0));
        history.record_suggestion(Temperature(0.5)).unwrap();
        assert!(history.record_suggestion(Temperature(0.9)).is_err());
        assert_eq!(history.last().unwrap().suggested_next, Some(Temperature(0.5)));
    }

    #[test]
    fn test_clear() {
        let mut history: History<Temperature> = History::new();
        history.append(HistoryEntry::new("only", SETTINGS, 4.0));
        history.clear();
        assert!(history.is_empty());
    }

    #[test]
    fn test_render() {
        let mut history = History::new();
        assert_eq!(history.render(), "No previous runs yet.");

        history.append(HistoryEntry::new("Tell me a joke", SETTINGS, 4.0));
        history.record_suggestion(Temperature(0.5)).unwrap();
        history.append(HistoryEntry::new("x".repeat(130), SETTINGS.with_temperature(0.5), 6.0));

        let rendered = history.render();
        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(
            lines[0],
            "Run 1: prompt=\"Tell me a joke\", temperature=0.7, score=4 (suggested next temperature: 0.5)"
        );
        assert_eq!(
            lines[1],
            format!("Run 2: prompt=\"{}...\", temperature=0.5, score=6", "x".repeat(120))
        );
    }

    #[test]
    fn test_preview_is_char_safe() {
        assert_eq!(preview("héllo", 2), "hé...");
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("exact", 5), "exact");
    }
}
