//! Hash write-back into the host's history.

use tracing::trace;

/// The host's location hash and history stack.
pub trait HashHistory {
    /// Add a history entry. Hosts fire a hash-change event for this.
    fn push(&mut self, hash: &str);

    /// Overwrite the current entry without firing a hash-change event.
    fn replace(&mut self, hash: &str);

    /// The current hash, with leading `#`, or empty.
    fn current(&self) -> String;
}

/// History stack kept in memory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryHistory {
    entries: Vec<String>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a hash already present, as on a page load.
    pub fn with_hash(hash: &str) -> Self {
        Self {
            entries: vec![hash.to_string()],
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

impl HashHistory for InMemoryHistory {
    fn push(&mut self, hash: &str) {
        self.entries.push(hash.to_string());
    }

    fn replace(&mut self, hash: &str) {
        match self.entries.last_mut() {
            Some(last) => *last = hash.to_string(),
            None => self.entries.push(hash.to_string()),
        }
    }

    fn current(&self) -> String {
        self.entries.last().cloned().unwrap_or_default()
    }
}

/// Writes hashes and recognizes the hash-change events our own pushes cause.
#[derive(Debug)]
pub struct HashSync<H> {
    history: H,
    /// Programmatic pushes whose hash-change event has not been seen yet.
    self_triggered: u32,
}

impl<H: HashHistory> HashSync<H> {
    pub fn new(history: H) -> Self {
        Self {
            history,
            self_triggered: 0,
        }
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut H {
        &mut self.history
    }

    pub fn current(&self) -> String {
        self.history.current()
    }

    pub fn pending_self_events(&self) -> u32 {
        self.self_triggered
    }

    /// Write a hash. User-initiated changes push an entry, the rest replace.
    /// Returns false when the hash is already current.
    pub fn write(&mut self, hash: &str, user_initiated: bool) -> bool {
        if self.history.current() == hash {
            return false;
        }
        if user_initiated {
            self.self_triggered += 1;
            self.history.push(hash);
        } else {
            self.history.replace(hash);
        }
        trace!("Hash written ({}): {}", if user_initiated { "push" } else { "replace" }, hash);
        true
    }

    /// Account for an observed hash-change event. Returns true if the event
    /// was caused by our own push and should be ignored.
    pub fn observe_hash_change(&mut self) -> bool {
        if self.self_triggered > 0 {
            self.self_triggered -= 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_replace() {
        let mut sync = HashSync::new(InMemoryHistory::new());
        assert!(sync.write("#nb=a", true));
        assert!(sync.write("#nb=a&sec=s", false));
        assert_eq!(sync.history().entries(), ["#nb=a&sec=s"]);
        assert!(sync.write("#nb=b", true));
        assert_eq!(sync.history().entries().len(), 2);
    }

    #[test]
    fn test_unchanged_hash_is_not_written() {
        let mut sync = HashSync::new(InMemoryHistory::with_hash("#nb=a"));
        assert!(!sync.write("#nb=a", true));
        assert_eq!(sync.pending_self_events(), 0);
    }

    #[test]
    fn test_self_triggered_events_are_counted() {
        let mut sync = HashSync::new(InMemoryHistory::new());
        sync.write("#nb=a", true);
        sync.write("#nb=b", true);
        sync.write("#nb=c", false);
        assert_eq!(sync.pending_self_events(), 2);

        assert!(sync.observe_hash_change());
        assert!(sync.observe_hash_change());
        // The next one came from outside
        assert!(!sync.observe_hash_change());
    }
}
