//! Moderation verdict type shared by all pipeline layers.

/// Severity assigned to deny-list matches.
pub const SEVERITY_KEYWORD: u8 = 1;

/// Generic severity for LLM-judge flags and provider content-filter
/// rejections, where no per-category score exists.
pub const SEVERITY_GENERIC: u8 = 2;

/// Outcome of a moderation layer (or of the whole pipeline).
#[derive(Debug, Clone)]
pub struct Verdict {
    /// Whether the text was flagged.
    pub flagged: bool,
    /// Severity of the flag; 0 when not flagged.
    pub severity: u8,
    /// Human-readable reason, or a sentinel such as "disabled".
    pub reason: String,
}

impl Verdict {
    /// A passing verdict with the given reason.
    pub fn clean(reason: impl Into<String>) -> Self {
        Self {
            flagged: false,
            severity: 0,
            reason: reason.into(),
        }
    }

    /// A flagged verdict.
    pub fn flagged(severity: u8, reason: impl Into<String>) -> Self {
        Self {
            flagged: true,
            severity,
            reason: reason.into(),
        }
    }
}
