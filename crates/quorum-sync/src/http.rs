//! HTTP client for the document store and extraction endpoints.

use std::time::Duration;

use async_trait::async_trait;
use quorum_core::evidence::BoxError;
use quorum_core::{Document, DocumentSource, ExtractedText, Meeting, TextExtractor};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Upper bound on any single request to the document service.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Client for the meeting document service.
///
/// The same base URL serves meeting descriptors, document listings and
/// text extraction.
pub struct DocumentClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct ExtractRequest<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    text: String,
    #[serde(default)]
    success: bool,
}

impl From<ExtractResponse> for ExtractedText {
    fn from(resp: ExtractResponse) -> Self {
        // A successful call with nothing in it is no evidence either.
        if resp.success && !resp.text.trim().is_empty() {
            ExtractedText::ok(resp.text)
        } else {
            ExtractedText::failed()
        }
    }
}

impl DocumentClient {
    /// Create a new client for the given base URL.
    ///
    /// `base_url` should be like `http://localhost:4000` (no trailing slash).
    pub fn new(base_url: String) -> Result<Self, SyncError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Like [`new`](Self::new) with an explicit per-request timeout.
    pub fn with_timeout(base_url: String, timeout: Duration) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, SyncError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    /// Fetch a meeting descriptor, including whatever documents the store
    /// already lists for it.
    pub async fn meeting(&self, meeting_id: &str) -> Result<Meeting, SyncError> {
        let url = format!("{}/api/meetings/{}", self.base_url, meeting_id);
        info!(url = %url, "fetching meeting");
        let resp = Self::check(self.client.get(&url).send().await?).await?;
        Ok(resp.json().await?)
    }

    /// List the documents attached to a meeting.
    pub async fn list_documents(&self, meeting_id: &str) -> Result<Vec<Document>, SyncError> {
        let url = format!("{}/api/meetings/{}/documents", self.base_url, meeting_id);
        info!(url = %url, "listing meeting documents");
        let resp = Self::check(self.client.get(&url).send().await?).await?;
        let documents: Vec<Document> = resp.json().await?;
        info!(meeting_id, count = documents.len(), "listed documents");
        Ok(documents)
    }

    /// Ask the extraction service for a document's body text.
    pub async fn extract_text(&self, document_url: &str) -> Result<ExtractedText, SyncError> {
        let url = format!("{}/api/extract", self.base_url);
        debug!(document = document_url, "requesting text extraction");
        let resp = self
            .client
            .post(&url)
            .json(&ExtractRequest { url: document_url })
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        let parsed: ExtractResponse = resp.json().await?;
        Ok(parsed.into())
    }
}

#[async_trait]
impl DocumentSource for DocumentClient {
    async fn documents(&self, meeting_id: &str) -> Result<Vec<Document>, BoxError> {
        Ok(self.list_documents(meeting_id).await?)
    }
}

#[async_trait]
impl TextExtractor for DocumentClient {
    async fn extract(&self, url: &str) -> ExtractedText {
        match self.extract_text(url).await {
            Ok(text) => text,
            Err(e) => {
                warn!(document = url, error = %e, "extraction request failed");
                ExtractedText::failed()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_list_json() {
        let json = r#"[
            {
                "type_label": "Agenda",
                "url": "https://example.org/meetings/june/agenda.pdf",
                "upload_date": "2024-05-20T09:00:00Z"
            },
            {
                "type_label": "Briefing Book",
                "url": "https://example.org/meetings/june/C2_SSC_report.pdf",
                "title": "C2 SSC Report",
                "upload_date": null
            }
        ]"#;
        let parsed: Vec<Document> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(parsed[0].upload_date.is_some());
        assert!(parsed[0].title.is_none());
        assert_eq!(parsed[1].title.as_deref(), Some("C2 SSC Report"));
        assert!(parsed[1].upload_date.is_none());
    }

    #[test]
    fn meeting_json_without_documents() {
        let json = r#"{
            "id": "mtg-2024-06",
            "title": "June 2024 Council Meeting",
            "type_label": "Council",
            "start": "2024-06-03T08:00:00Z",
            "end": "2024-06-28T17:00:00Z"
        }"#;
        let parsed: Meeting = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.id, "mtg-2024-06");
        assert!(parsed.documents.is_empty());
    }

    #[test]
    fn extract_response_success() {
        let parsed: ExtractResponse =
            serde_json::from_str(r#"{"text": "The SSC recommends...", "success": true}"#).unwrap();
        let text: ExtractedText = parsed.into();
        assert!(text.success);
        assert_eq!(text.text, "The SSC recommends...");
    }

    #[test]
    fn extract_response_failure_or_blank() {
        let failed: ExtractResponse =
            serde_json::from_str(r#"{"text": "partial", "success": false}"#).unwrap();
        assert_eq!(ExtractedText::from(failed), ExtractedText::failed());

        let blank: ExtractResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(!ExtractedText::from(blank).success);
    }

    #[test]
    fn document_client_trims_trailing_slash() {
        let client = DocumentClient::new("http://localhost:4000/".into()).unwrap();
        assert_eq!(client.base_url, "http://localhost:4000");
    }

    #[tokio::test]
    async fn unreachable_service_degrades_extraction() {
        // Port 9 (discard) on localhost is not expected to serve HTTP.
        let client = DocumentClient::new("http://127.0.0.1:9".into()).unwrap();
        let text = client.extract("https://example.org/a.pdf").await;
        assert!(!text.success);
        assert!(client.list_documents("m1").await.is_err());
    }

    #[tokio::test]
    async fn stalled_service_times_out() {
        // Accepts connections and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client =
            DocumentClient::with_timeout(format!("http://{addr}"), Duration::from_millis(200))
                .unwrap();
        let outcome = tokio::time::timeout(Duration::from_secs(5), async {
            let text = client.extract("https://example.org/a.pdf").await;
            let listing = client.list_documents("m1").await;
            (text, listing)
        })
        .await
        .expect("client should give up before the outer deadline");

        assert_eq!(outcome.0, ExtractedText::failed());
        assert!(matches!(outcome.1, Err(SyncError::Http(e)) if e.is_timeout()));
    }
}
