//! Debounced commit of the search term.
//!
//! Raw keystrokes land in a staging value; the committed term only
//! changes after [`SEARCH_DEBOUNCE`] of silence, so rapid typing
//! coalesces into a single filter pass. Every keystroke cancels and
//! reschedules the pending commit. The clock is passed in explicitly,
//! which keeps the behaviour deterministic under test.

use tokio::time::{Duration, Instant};

/// Quiet period before a staged term is committed.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone)]
pub struct SearchDebouncer {
    staged: String,
    committed: String,
    deadline: Option<Instant>,
}

impl SearchDebouncer {
    pub fn new() -> Self {
        Self {
            staged: String::new(),
            committed: String::new(),
            deadline: None,
        }
    }

    /// Raw input as typed so far.
    pub fn staged(&self) -> &str {
        &self.staged
    }

    /// Term the filter engine should currently use.
    pub fn committed(&self) -> &str {
        &self.committed
    }

    /// Whether a commit is scheduled but not yet due.
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Record a keystroke, superseding any pending commit.
    pub fn set(&mut self, text: impl Into<String>, now: Instant) {
        self.staged = text.into();
        self.deadline = Some(now + SEARCH_DEBOUNCE);
    }

    /// Commit the staged term if its quiet period has elapsed. Returns
    /// the newly committed term, or `None` when nothing changed.
    pub fn poll(&mut self, now: Instant) -> Option<&str> {
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }
        self.deadline = None;
        if self.staged == self.committed {
            return None;
        }
        self.committed = self.staged.clone();
        Some(&self.committed)
    }

    /// Commit immediately (e.g. on Enter), bypassing the timer.
    pub fn flush(&mut self) -> bool {
        self.deadline = None;
        if self.staged == self.committed {
            return false;
        }
        self.committed = self.staged.clone();
        true
    }

    /// Clear the staged and committed terms and any pending commit.
    pub fn reset(&mut self) {
        self.staged.clear();
        self.committed.clear();
        self.deadline = None;
    }
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(base: Instant, offset: u64) -> Instant {
        base + Duration::from_millis(offset)
    }

    #[test]
    fn rapid_keystrokes_commit_once_with_the_final_value() {
        let base = Instant::now();
        let mut debouncer = SearchDebouncer::new();

        debouncer.set("스", ms(base, 0));
        debouncer.set("스플", ms(base, 50));
        debouncer.set("스플렌", ms(base, 100));
        debouncer.set("스플렌더", ms(base, 150));

        // Quiet period measured from the last keystroke.
        assert_eq!(debouncer.poll(ms(base, 300)), None);
        assert_eq!(debouncer.poll(ms(base, 449)), None);
        assert_eq!(debouncer.poll(ms(base, 450)), Some("스플렌더"));
        // Committed exactly once; later polls are no-ops.
        assert_eq!(debouncer.poll(ms(base, 500)), None);
        assert_eq!(debouncer.committed(), "스플렌더");
    }

    #[test]
    fn new_keystroke_cancels_the_pending_commit() {
        let base = Instant::now();
        let mut debouncer = SearchDebouncer::new();

        debouncer.set("아줄", ms(base, 0));
        debouncer.set("아그리콜라", ms(base, 299));
        assert_eq!(debouncer.poll(ms(base, 300)), None);
        assert_eq!(debouncer.poll(ms(base, 599)), Some("아그리콜라"));
    }

    #[test]
    fn unchanged_term_does_not_recommit() {
        let base = Instant::now();
        let mut debouncer = SearchDebouncer::new();

        debouncer.set("아줄", ms(base, 0));
        assert_eq!(debouncer.poll(ms(base, 300)), Some("아줄"));
        debouncer.set("아줄", ms(base, 400));
        assert_eq!(debouncer.poll(ms(base, 700)), None);
    }

    #[test]
    fn flush_commits_immediately() {
        let base = Instant::now();
        let mut debouncer = SearchDebouncer::new();

        debouncer.set("아줄", ms(base, 0));
        assert!(debouncer.flush());
        assert_eq!(debouncer.committed(), "아줄");
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn reset_clears_staged_committed_and_pending() {
        let base = Instant::now();
        let mut debouncer = SearchDebouncer::new();

        debouncer.set("아줄", ms(base, 0));
        debouncer.flush();
        debouncer.set("아그리콜라", ms(base, 100));
        debouncer.reset();

        assert_eq!(debouncer.staged(), "");
        assert_eq!(debouncer.committed(), "");
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.poll(ms(base, 1000)), None);
    }
}
