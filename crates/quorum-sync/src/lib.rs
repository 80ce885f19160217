//! Collaborator transport: the document store and the PDF/text extractor,
//! both reached over HTTP.

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{DocumentClient, SyncError};
