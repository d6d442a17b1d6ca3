//! Command history and word completion for line editors.

use embsh_types::error::{Result, ShellError};

use crate::registry::CommandRegistry;

/// Maximum number of history entries to retain.
const MAX_HISTORY: usize = 100;

/// In-memory history of submitted lines, oldest first.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<String>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a submitted line.
    ///
    /// Blank lines and immediate repeats are not recorded.
    pub fn push(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        if self.entries.last().is_none_or(|last| last != line) {
            self.entries.push(line.to_string());
            if self.entries.len() > MAX_HISTORY {
                self.entries.remove(0);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    /// Expand `!!` (previous line) and `!n` (1-based entry).
    ///
    /// Any other input is returned unchanged.
    pub fn expand(&self, input: &str) -> Result<String> {
        if input == "!!" {
            return self
                .entries
                .last()
                .cloned()
                .ok_or_else(|| ShellError::Command("!!: no previous command".to_string()));
        }
        if let Some(n_str) = input.strip_prefix('!')
            && let Ok(n) = n_str.parse::<usize>()
        {
            if n == 0 || n > self.entries.len() {
                return Err(ShellError::Command(format!("!{n}: event not found")));
            }
            return Ok(self.entries[n - 1].clone());
        }
        Ok(input.to_string())
    }
}

/// Completes a word against a fixed, case-insensitive vocabulary.
#[derive(Debug, Clone, Default)]
pub struct WordCompleter {
    words: Vec<String>,
}

impl WordCompleter {
    pub fn new(words: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    /// Vocabulary made of every command name in `registry`.
    pub fn from_registry(registry: &CommandRegistry) -> Self {
        Self::new(registry.commands().into_iter().map(|(name, _)| name))
    }

    /// Words starting with `prefix`, ignoring ASCII case, in vocabulary order.
    pub fn complete(&self, prefix: &str) -> Vec<&str> {
        let lower = prefix.to_ascii_lowercase();
        self.words
            .iter()
            .filter(|w| w.to_ascii_lowercase().starts_with(&lower))
            .map(String::as_str)
            .collect()
    }

    /// Longest extension of `prefix` shared by every candidate.
    ///
    /// Returns `None` when nothing matches.
    pub fn extend(&self, prefix: &str) -> Option<String> {
        let candidates = self.complete(prefix);
        let (first, rest) = candidates.split_first()?;
        let mut len = first.len();
        for other in rest {
            len = first
                .bytes()
                .zip(other.bytes())
                .take(len)
                .take_while(|(a, b)| a.eq_ignore_ascii_case(b))
                .count();
        }
        while !first.is_char_boundary(len) {
            len -= 1;
        }
        Some(first[..len].to_string())
    }
}
