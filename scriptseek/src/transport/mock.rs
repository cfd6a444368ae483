//! Scriptable in-process transport for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{
    BookmarkTransport, Result, ScriptSearchRequest, ScriptSearchResponse, SearchTransport,
    TranscriptLine, VideoTransport, VideoSearchRequest, VideoSearchResponse,
};
use crate::error::TransportError;
use crate::types::{ResultDetail, ScriptMatch, SearchResult, VideoDetails, VideoMeta};

/// A script-mode hit whose context is `matched` padded on both sides.
pub fn script_hit(id: &str, timestamp: &str, matched: &str) -> SearchResult {
    SearchResult {
        id: id.to_string(),
        title: format!("Video {id}"),
        thumbnail_url: format!("https://img.test/{id}.jpg"),
        upload_date: "2024-01-01".to_string(),
        bookmarked: false,
        detail: ResultDetail::Script(ScriptMatch::new(
            timestamp,
            matched,
            format!("... {matched} ..."),
        )),
    }
}

pub fn video_hit(id: &str) -> SearchResult {
    SearchResult {
        id: id.to_string(),
        title: format!("Video {id}"),
        thumbnail_url: format!("https://img.test/{id}.jpg"),
        upload_date: "2024-01-01".to_string(),
        bookmarked: false,
        detail: ResultDetail::Video(VideoMeta {
            channel: "Test Channel".to_string(),
            view_count: 100,
            duration: "04:20".to_string(),
        }),
    }
}

/// Details of a video as the fixtures above describe it.
pub fn video_details(id: &str, bookmarked: bool) -> VideoDetails {
    VideoDetails {
        id: id.to_string(),
        title: format!("Video {id}"),
        description: format!("About video {id}"),
        channel: "Test Channel".to_string(),
        view_count: 100,
        duration: "04:20".to_string(),
        upload_date: "2024-01-01".to_string(),
        thumbnail_url: format!("https://img.test/{id}.jpg"),
        video_url: format!("https://media.test/{id}.mp4"),
        bookmarked,
    }
}

/// Test double for every transport trait.
///
/// Responses are scripted per query text; unknown queries get an empty page.
/// Clones share state, so a test can keep one handle for assertions while the
/// code under test owns another.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

#[derive(Debug, Default)]
struct MockState {
    script_results: HashMap<String, Scripted>,
    video_results: HashMap<String, Scripted>,
    delays: HashMap<String, Duration>,
    search_failures: HashMap<String, TransportError>,
    bookmark_failure: Option<TransportError>,
    transcripts: HashMap<String, Vec<TranscriptLine>>,
    transcript_failure: Option<TransportError>,
    details: HashMap<String, VideoDetails>,
    related: HashMap<String, Vec<SearchResult>>,
    related_failure: Option<TransportError>,
    script_calls: Vec<ScriptSearchRequest>,
    video_calls: Vec<VideoSearchRequest>,
    bookmark_calls: Vec<String>,
    transcript_calls: Vec<String>,
    detail_calls: Vec<String>,
    related_calls: Vec<(String, u32)>,
}

#[derive(Debug, Clone)]
struct Scripted {
    results: Vec<SearchResult>,
    total: Option<u64>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script_results(
        self,
        query: &str,
        results: Vec<SearchResult>,
        total: Option<u64>,
    ) -> Self {
        self.state()
            .script_results
            .insert(query.to_string(), Scripted { results, total });
        self
    }

    pub fn with_video_results(
        self,
        query: &str,
        results: Vec<SearchResult>,
        total: Option<u64>,
    ) -> Self {
        self.state()
            .video_results
            .insert(query.to_string(), Scripted { results, total });
        self
    }

    /// Searches for `query` (either mode) answer only after `delay`.
    pub fn with_delay(self, query: &str, delay: Duration) -> Self {
        self.state().delays.insert(query.to_string(), delay);
        self
    }

    /// Searches for `query` (either mode) fail with `error`.
    pub fn failing_search(self, query: &str, error: TransportError) -> Self {
        self.state()
            .search_failures
            .insert(query.to_string(), error);
        self
    }

    pub fn failing_bookmarks(self, error: TransportError) -> Self {
        self.state().bookmark_failure = Some(error);
        self
    }

    pub fn with_transcript(self, video_id: &str, lines: Vec<TranscriptLine>) -> Self {
        self.state()
            .transcripts
            .insert(video_id.to_string(), lines);
        self
    }

    pub fn failing_transcripts(self, error: TransportError) -> Self {
        self.state().transcript_failure = Some(error);
        self
    }

    /// Details served for `video_id`; other ids answer 404.
    pub fn with_video(self, details: VideoDetails) -> Self {
        self.state()
            .details
            .insert(details.id.clone(), details);
        self
    }

    pub fn with_related(self, video_id: &str, results: Vec<SearchResult>) -> Self {
        self.state()
            .related
            .insert(video_id.to_string(), results);
        self
    }

    pub fn failing_related(self, error: TransportError) -> Self {
        self.state().related_failure = Some(error);
        self
    }

    /// Makes subsequent bookmark calls succeed again.
    pub fn restore_bookmarks(&self) {
        self.state().bookmark_failure = None;
    }

    pub fn script_calls(&self) -> Vec<ScriptSearchRequest> {
        self.state().script_calls.clone()
    }

    pub fn video_calls(&self) -> Vec<VideoSearchRequest> {
        self.state().video_calls.clone()
    }

    pub fn bookmark_calls(&self) -> Vec<String> {
        self.state().bookmark_calls.clone()
    }

    pub fn transcript_calls(&self) -> Vec<String> {
        self.state().transcript_calls.clone()
    }

    pub fn detail_calls(&self) -> Vec<String> {
        self.state().detail_calls.clone()
    }

    pub fn related_calls(&self) -> Vec<(String, u32)> {
        self.state().related_calls.clone()
    }

    /// Number of search calls across both modes.
    pub fn search_call_count(&self) -> usize {
        let state = self.state();
        state.script_calls.len() + state.video_calls.len()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock transport lock poisoned")
    }

    async fn pause_for(&self, query: &str) {
        let delay = self.state().delays.get(query).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl SearchTransport for MockTransport {
    async fn search_scripts(&self, request: &ScriptSearchRequest) -> Result<ScriptSearchResponse> {
        self.state().script_calls.push(request.clone());
        self.pause_for(&request.query).await;

        let state = self.state();
        if let Some(error) = state.search_failures.get(&request.query) {
            return Err(error.clone());
        }
        let scripted = state.script_results.get(&request.query).cloned();
        Ok(match scripted {
            Some(Scripted { results, total }) => ScriptSearchResponse {
                results,
                total,
                processing_time_seconds: 0.001,
            },
            None => ScriptSearchResponse {
                results: Vec::new(),
                total: Some(0),
                processing_time_seconds: 0.001,
            },
        })
    }

    async fn search_videos(&self, request: &VideoSearchRequest) -> Result<VideoSearchResponse> {
        self.state().video_calls.push(request.clone());
        self.pause_for(&request.query).await;

        let state = self.state();
        if let Some(error) = state.search_failures.get(&request.query) {
            return Err(error.clone());
        }
        let scripted = state.video_results.get(&request.query).cloned();
        Ok(match scripted {
            Some(Scripted { results, total }) => VideoSearchResponse { results, total },
            None => VideoSearchResponse {
                results: Vec::new(),
                total: Some(0),
            },
        })
    }
}

#[async_trait]
impl BookmarkTransport for MockTransport {
    async fn toggle_bookmark(&self, item_id: &str) -> Result<()> {
        let mut state = self.state();
        state.bookmark_calls.push(item_id.to_string());
        match &state.bookmark_failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VideoTransport for MockTransport {
    async fn get_video(&self, video_id: &str) -> Result<VideoDetails> {
        let mut state = self.state();
        state.detail_calls.push(video_id.to_string());
        state
            .details
            .get(video_id)
            .cloned()
            .ok_or_else(|| TransportError::Status {
                status: 404,
                detail: Some("Video not found".to_string()),
            })
    }

    async fn get_transcripts(&self, video_id: &str) -> Result<Vec<TranscriptLine>> {
        let mut state = self.state();
        state.transcript_calls.push(video_id.to_string());
        if let Some(error) = &state.transcript_failure {
            return Err(error.clone());
        }
        Ok(state.transcripts.get(video_id).cloned().unwrap_or_default())
    }

    async fn get_related(&self, video_id: &str, limit: u32) -> Result<Vec<SearchResult>> {
        let mut state = self.state();
        state.related_calls.push((video_id.to_string(), limit));
        if let Some(error) = &state.related_failure {
            return Err(error.clone());
        }
        let mut related = state.related.get(video_id).cloned().unwrap_or_default();
        related.truncate(limit as usize);
        Ok(related)
    }
}
