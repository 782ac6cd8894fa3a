//! Content moderation pipeline for Civic Knit.
//!
//! Inbound chat text goes through three layers, cheapest first:
//!
//! 1. [`keyword`] - static deny-list scan, pure and synchronous
//! 2. [`SafetyClassifier`] - external content-safety API, fail-open
//! 3. [`LlmJudge`] - SAFE/UNSAFE second opinion from the chat model, fail-open
//!
//! [`ModerationPipeline::check`] runs them in order and short-circuits on the
//! first flag, so obviously-bad input never pays for an API call. None of the
//! layers ever returns an error to the caller: missing configuration or a
//! provider hiccup degrades to a not-flagged [`Verdict`] rather than blocking
//! traffic.

pub mod keyword;

mod judge;
mod pipeline;
mod safety;
mod verdict;

pub use judge::LlmJudge;
pub use pipeline::ModerationPipeline;
pub use safety::{SafetyClassifier, SafetyConfig};
pub use verdict::{Verdict, SEVERITY_GENERIC, SEVERITY_KEYWORD};
