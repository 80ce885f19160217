//! Insight requests: prompt construction and a bounded, non-fatal LLM call.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quorum_core::AnalyzerConfig;
use thiserror::Error;
use tracing::{info, warn};

/// Narrative stored when the text-generation service cannot answer.
pub const INSIGHT_UNAVAILABLE: &str = "insight unavailable";

#[derive(Debug, Error)]
pub enum InsightError {
    #[error("text generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("text generation returned no text")]
    Empty,

    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("{0}")]
    Other(String),
}

/// A single prompt for the text-generation service.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub system_prompt: Option<String>,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateResponse {
    pub text: String,
    pub tokens_used: u32,
}

/// External text-completion service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, InsightError>;
}

/// Structured facts handed to the generator. Numbers only, no raw evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct InsightSummary {
    pub meeting_id: String,
    pub meeting_title: String,
    pub process_type: String,
    pub formal_step_count: usize,
    pub completed_count: usize,
    pub skipped_count: usize,
    pub skipped_steps: Vec<String>,
    pub added_practices: Vec<String>,
    pub variance_days: i64,
}

pub const SYSTEM_PROMPT: &str = "\
You are an analyst reviewing whether a fishery management council meeting \
followed its documented procedures.

Given a structured compliance summary, write two or three plain sentences that \
explain how the meeting departed from the formal process and whether the \
departure looks like routine practice or a genuine gap. Do not restate every \
number. Do not use lists or markdown.";

pub fn build_user_prompt(summary: &InsightSummary) -> String {
    let skipped = if summary.skipped_steps.is_empty() {
        "none".to_string()
    } else {
        summary.skipped_steps.join("; ")
    };
    let added = if summary.added_practices.is_empty() {
        "none".to_string()
    } else {
        summary.added_practices.join("; ")
    };

    format!(
        "Meeting: {title} ({id})\n\
         Process type: {process_type}\n\
         Formal steps: {formal}\n\
         Completed steps: {completed}\n\
         Skipped required steps: {skipped_count} ({skipped})\n\
         Informal practices observed: {added}\n\
         Timeline variance: {variance:+} days",
        title = summary.meeting_title,
        id = summary.meeting_id,
        process_type = summary.process_type,
        formal = summary.formal_step_count,
        completed = summary.completed_count,
        skipped_count = summary.skipped_count,
        variance = summary.variance_days,
    )
}

/// Requests insights with a hard timeout and a placeholder on failure.
pub struct InsightRequestor {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
    max_tokens: u32,
}

impl InsightRequestor {
    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration, max_tokens: u32) -> Self {
        Self {
            generator,
            timeout,
            max_tokens,
        }
    }

    pub fn from_config(generator: Arc<dyn TextGenerator>, config: &AnalyzerConfig) -> Self {
        Self::new(generator, config.insight_timeout(), config.insight_max_tokens)
    }

    /// Ask for an insight, surfacing any failure.
    pub async fn try_request(&self, summary: &InsightSummary) -> Result<String, InsightError> {
        let request = GenerateRequest {
            system_prompt: Some(SYSTEM_PROMPT.to_string()),
            user_prompt: build_user_prompt(summary),
            max_tokens: self.max_tokens,
            temperature: 0.0,
        };

        let response = tokio::time::timeout(self.timeout, self.generator.generate(&request))
            .await
            .map_err(|_| InsightError::Timeout(self.timeout))??;

        let text = response.text.trim();
        if text.is_empty() {
            return Err(InsightError::Empty);
        }
        info!(
            meeting_id = %summary.meeting_id,
            tokens = response.tokens_used,
            "insight generated"
        );
        Ok(text.to_string())
    }

    /// Ask for an insight; any failure yields [`INSIGHT_UNAVAILABLE`].
    pub async fn request(&self, summary: &InsightSummary) -> String {
        match self.try_request(summary).await {
            Ok(text) => text,
            Err(e) => {
                warn!(meeting_id = %summary.meeting_id, error = %e, "insight unavailable");
                INSIGHT_UNAVAILABLE.to_string()
            }
        }
    }
}
