//! AI layer: narrative compliance insights from an external text-generation service.
//!
//! The insight step is best-effort. [`InsightRequestor::request`] never fails;
//! it degrades to [`INSIGHT_UNAVAILABLE`].

mod insight;
pub use insight::{
    build_user_prompt, GenerateRequest, GenerateResponse, InsightError, InsightRequestor,
    InsightSummary, TextGenerator, INSIGHT_UNAVAILABLE, SYSTEM_PROMPT,
};

#[cfg(feature = "http")]
mod claude;
#[cfg(feature = "http")]
pub use claude::ClaudeClient;
