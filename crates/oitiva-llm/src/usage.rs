//! Token usage accounting

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

/// Tokens consumed by one or more calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
    pub cache_read: u64,
    pub cache_creation: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input + self.output + self.cache_read + self.cache_creation
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.input += rhs.input;
        self.output += rhs.output;
        self.cache_read += rhs.cache_read;
        self.cache_creation += rhs.cache_creation;
    }
}

impl std::fmt::Display for TokenUsage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} in / {} out / {} cache read / {} cache write",
            self.input, self.output, self.cache_read, self.cache_creation
        )
    }
}

/// Receives the usage delta of every successful gateway call.
///
/// The gateway only ever adds; resetting is the owner's business.
pub trait UsageSink {
    fn record(&mut self, usage: TokenUsage);
}

impl UsageSink for TokenUsage {
    fn record(&mut self, usage: TokenUsage) {
        *self += usage;
    }
}

/// Discards usage
impl UsageSink for () {
    fn record(&mut self, _usage: TokenUsage) {}
}
