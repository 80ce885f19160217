//! Evidence aggregation: everything text-bearing about one meeting, in one blob.
//!
//! The corpus is built from the meeting title and type label, each document's
//! type label, title and URL, and (when an extractor is available) each
//! document's body text. Extraction failure never fails aggregation; the
//! document simply contributes its labels only.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{Document, Meeting};

/// Boxed error for collaborator traits whose transport is not known here.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result of asking the PDF/text extraction service for a document body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractedText {
    pub text: String,
    pub success: bool,
}

impl ExtractedText {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: true,
        }
    }

    pub fn failed() -> Self {
        Self::default()
    }
}

/// Turns a document URL into plain text.
///
/// Implementations report transport problems as `success = false` rather
/// than an error.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> ExtractedText;
}

/// Lists the documents attached to a meeting.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn documents(&self, meeting_id: &str) -> Result<Vec<Document>, BoxError>;
}

/// Normalised evidence for one meeting.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EvidenceCorpus {
    /// Lowercased, whitespace-collapsed text.
    pub text: String,
    pub has_agenda: bool,
    pub has_briefing_book: bool,
    pub has_final_report: bool,
    pub document_count: usize,
    /// Documents whose body text was successfully extracted.
    pub extracted_count: usize,
}

impl EvidenceCorpus {
    /// Case-insensitive substring test against the corpus.
    pub fn contains(&self, phrase: &str) -> bool {
        let needle = normalize(phrase);
        !needle.is_empty() && self.text.contains(&needle)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Lowercase and collapse whitespace runs to single spaces.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a URL into words so file names like `C2_SSC_report.pdf` read as
/// "c2 ssc report pdf".
fn url_words(url: &str) -> String {
    url.chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect()
}

fn label_mentions(label: &str, words: &[&str]) -> bool {
    let label = label.to_lowercase();
    words.iter().any(|w| label.contains(w))
}

/// Collect the evidence corpus for `meeting`.
pub async fn collect_evidence(
    meeting: &Meeting,
    extractor: Option<&dyn TextExtractor>,
) -> EvidenceCorpus {
    let mut parts: Vec<String> = vec![meeting.title.clone(), meeting.type_label.clone()];
    let mut corpus = EvidenceCorpus {
        document_count: meeting.documents.len(),
        ..Default::default()
    };

    for doc in &meeting.documents {
        corpus.has_agenda |= label_mentions(&doc.type_label, &["agenda"]);
        corpus.has_briefing_book |= label_mentions(&doc.type_label, &["briefing", "book"]);
        corpus.has_final_report |=
            label_mentions(&doc.type_label, &["report", "minutes", "summary"]);

        parts.push(doc.type_label.clone());
        if let Some(title) = &doc.title {
            parts.push(title.clone());
        }
        parts.push(doc.url.clone());
        parts.push(url_words(&doc.url));

        let Some(extractor) = extractor else {
            continue;
        };
        let extracted = extractor.extract(&doc.url).await;
        if extracted.success && !extracted.text.trim().is_empty() {
            debug!(url = %doc.url, chars = extracted.text.len(), "document text extracted");
            corpus.extracted_count += 1;
            parts.push(extracted.text);
        } else {
            warn!(
                meeting_id = %meeting.id,
                url = %doc.url,
                "text extraction failed, using document labels only"
            );
        }
    }

    corpus.text = normalize(&parts.join(" "));
    corpus
}
