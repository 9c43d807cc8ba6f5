//! Content budgeting for text handed to size-limited consumers.
//!
//! Blocks are capped individually first so one long page cannot starve the
//! rest, then whole blocks are dropped from the tail until the combined
//! size fits. The first block is never dropped; if it alone is over budget
//! it is truncated instead.

/// Suffix marking text that was cut short.
pub const TRUNCATION_MARK: &str = "...";

/// Character count (not bytes).
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Smallest cap that still leaves one character of text before the mark.
pub const MIN_TRUNCATED_CHARS: usize = TRUNCATION_MARK.len() + 1;

/// Truncate to at most `max_chars` characters, ending with
/// [`TRUNCATION_MARK`] when anything was removed. Caps below
/// [`MIN_TRUNCATED_CHARS`] are raised to it, so cut text is always marked
/// and never empty.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let max_chars = max_chars.max(MIN_TRUNCATED_CHARS);
    if char_len(text) <= max_chars {
        return text.to_string();
    }
    let mark_len = char_len(TRUNCATION_MARK);
    let mut out: String = text.chars().take(max_chars - mark_len).collect();
    out.push_str(TRUNCATION_MARK);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentBudget {
    pub per_block_chars: usize,
    pub total_chars: usize,
}

/// Result of fitting blocks into a budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Budgeted {
    /// Surviving blocks, in input order.
    pub kept: Vec<String>,
    /// How many blocks were dropped from the tail.
    pub dropped: usize,
}

impl ContentBudget {
    pub fn new(per_block_chars: usize, total_chars: usize) -> Self {
        Self {
            per_block_chars,
            total_chars,
        }
    }

    pub fn cap(&self, text: &str) -> String {
        truncate_chars(text, self.per_block_chars)
    }

    pub fn fit<S: AsRef<str>>(&self, blocks: &[S]) -> Budgeted {
        let mut kept: Vec<String> = blocks.iter().map(|b| self.cap(b.as_ref())).collect();
        let original = kept.len();
        let mut total: usize = kept.iter().map(|b| char_len(b)).sum();

        while total > self.total_chars && kept.len() > 1 {
            if let Some(last) = kept.pop() {
                total -= char_len(&last);
            }
        }

        if total > self.total_chars {
            if let Some(first) = kept.first_mut() {
                *first = truncate_chars(first, self.total_chars);
            }
        }

        Budgeted {
            dropped: original - kept.len(),
            kept,
        }
    }
}
