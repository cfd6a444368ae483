//! Collaborator contracts for the search API.
//!
//! The core only talks to the network through these traits. [`ApiClient`]
//! implements them over HTTP, [`DevBackend`] over an in-memory corpus, and
//! [`mock::MockTransport`] for tests.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::TransportError;
use crate::types::{SearchResult, VideoDetails};

mod dev_backend;
mod dto;
mod http;
pub mod mock;

pub use dev_backend::DevBackend;
pub use http::ApiClient;

pub type Result<T> = std::result::Result<T, TransportError>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptSearchRequest {
    pub query: String,
    pub limit: u32,
    pub min_confidence: f32,
    pub page: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoSearchRequest {
    pub query: String,
    pub limit: u32,
    pub page: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptSearchResponse {
    pub results: Vec<SearchResult>,
    /// `None` when the server did not report a total.
    pub total: Option<u64>,
    pub processing_time_seconds: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoSearchResponse {
    pub results: Vec<SearchResult>,
    pub total: Option<u64>,
}

/// One transcript utterance as delivered by the API, defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    pub time_offset: String,
    pub text: String,
}

#[async_trait]
pub trait SearchTransport: Send + Sync {
    async fn search_scripts(&self, request: &ScriptSearchRequest) -> Result<ScriptSearchResponse>;

    async fn search_videos(&self, request: &VideoSearchRequest) -> Result<VideoSearchResponse>;
}

#[async_trait]
pub trait BookmarkTransport: Send + Sync {
    /// Flips the server-side bookmark of a video.
    async fn toggle_bookmark(&self, item_id: &str) -> Result<()>;
}

/// Everything the video page loads about one video.
#[async_trait]
pub trait VideoTransport: Send + Sync {
    async fn get_video(&self, video_id: &str) -> Result<VideoDetails>;

    /// Transcript of a video in utterance order.
    async fn get_transcripts(&self, video_id: &str) -> Result<Vec<TranscriptLine>>;

    /// Up to `limit` videos to suggest next, as video-mode results.
    async fn get_related(&self, video_id: &str, limit: u32) -> Result<Vec<SearchResult>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Verify traits are object-safe (can be used as trait objects)
    fn _assert_search_object_safe(_: &dyn SearchTransport) {}
    fn _assert_bookmark_object_safe(_: &dyn BookmarkTransport) {}
    fn _assert_video_object_safe(_: &dyn VideoTransport) {}

    #[test]
    fn script_request_serializes_wire_field_names() {
        let request = ScriptSearchRequest {
            query: "hello".to_string(),
            limit: 10,
            min_confidence: 0.5,
            page: 1,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"query": "hello", "limit": 10, "min_confidence": 0.5, "page": 1})
        );
    }
}
