//! Per-group antilink flag and the link heuristic.

use regex::Regex;
use std::collections::HashSet;
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

/// http(s) URLs, `www.` tokens, and bare `label.tld` tokens.
///
/// Loose: it also flags `example.com` in prose too.
static LINK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://\S+|\bwww\.\S+|\b[a-z0-9-]+\.[a-z]{2,}\b")
        .expect("link pattern is valid")
});

/// Whether `text` contains something that looks like a link.
pub fn contains_link(text: &str) -> bool {
    LINK_PATTERN.is_match(text)
}

/// Groups with antilink turned on.
#[derive(Debug, Default)]
pub struct AntilinkRegistry {
    groups: Mutex<HashSet<String>>,
}

impl AntilinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn groups(&self) -> MutexGuard<'_, HashSet<String>> {
        self.groups.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Turn antilink on. Returns `false` if it already was.
    pub fn enable(&self, group_id: &str) -> bool {
        self.groups().insert(group_id.to_string())
    }

    /// Turn antilink off. Returns `false` if it already was.
    pub fn disable(&self, group_id: &str) -> bool {
        self.groups().remove(group_id)
    }

    pub fn is_enabled(&self, group_id: &str) -> bool {
        self.groups().contains(group_id)
    }
}
