use crate::lock::{read_or_recover, write_or_recover};
use std::sync::RwLock;

/// Append-only record of interactive commands. Indices never move once assigned;
/// `clear` starts the index space over at zero.
#[derive(Debug, Default)]
pub struct CommandHistory {
    entries: RwLock<Vec<String>>,
}

impl CommandHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `text` and return its index.
    pub fn push(&self, text: impl Into<String>) -> usize {
        let mut entries = write_or_recover(&self.entries, "history push");
        entries.push(text.into());
        entries.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<String> {
        read_or_recover(&self.entries, "history get")
            .get(index)
            .cloned()
    }

    pub fn entries(&self) -> Vec<String> {
        read_or_recover(&self.entries, "history entries").clone()
    }

    pub fn len(&self) -> usize {
        read_or_recover(&self.entries, "history len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        write_or_recover(&self.entries, "history clear").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_stable_and_monotonic() {
        let history = CommandHistory::new();
        assert_eq!(history.push("a"), 0);
        assert_eq!(history.push("b"), 1);
        assert_eq!(history.get(0).as_deref(), Some("a"));
        assert_eq!(history.entries(), vec!["a", "b"]);
    }

    #[test]
    fn clear_restarts_at_zero() {
        let history = CommandHistory::new();
        history.push("a");
        history.push("b");
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.push("c"), 0);
        assert_eq!(history.get(1), None);
    }
}
