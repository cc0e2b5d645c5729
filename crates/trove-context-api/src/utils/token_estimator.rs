//! Word-based token estimation for the grounding prompt budget

/// Tokens added per rendered block for numbering and separators
const BLOCK_OVERHEAD: f64 = 5.0;

/// ~1.3 tokens per whitespace-separated word of archive text
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }

    let words = text.split_whitespace().count();
    ((words as f64 * 1.3) + BLOCK_OVERHEAD).ceil() as usize
}

/// Running token count for a prompt under construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    limit: usize,
    used: usize,
}

impl TokenBudget {
    pub fn new(limit: usize) -> Self {
        Self { limit, used: 0 }
    }

    /// Account for `text` if it fits; a block that does not fit spends nothing.
    pub fn try_spend(&mut self, text: &str) -> bool {
        let cost = estimate_tokens(text);
        match self.used.checked_add(cost) {
            Some(total) if total <= self.limit => {
                self.used = total;
                true
            }
            _ => false,
        }
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.used)
    }
}
