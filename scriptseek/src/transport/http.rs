use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use time::macros::format_description;
use time::OffsetDateTime;

use super::dto::{
    ErrorBody, ScriptHitDto, SearchEnvelope, TranscriptLineDto, VideoDetailDto, VideoHitDto,
};
use super::{
    BookmarkTransport, Result, ScriptSearchRequest, ScriptSearchResponse, SearchTransport,
    TranscriptLine, VideoTransport, VideoSearchRequest, VideoSearchResponse,
};
use crate::error::TransportError;
use crate::session::SessionContext;
use crate::types::{SearchResult, VideoDetails};

/// HTTP client for the search API. Sends the session's bearer token with
/// every request when one is present.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    session: Arc<SessionContext>,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Arc<SessionContext>) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .with_context(|| format!("Invalid API URL: {}", base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("API URL cannot be used as a base: {}", base_url);
        }

        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url,
            session,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends percent-encoded `segments` to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::network(format!("invalid API URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder, call_name: &str) -> Result<Response> {
        let request = match self.session.token() {
            Some(token) if !token.is_empty() => request.bearer_auth(token),
            _ => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::network(format!("failed to call {call_name}: {e}")))?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(TransportError::Unauthorized);
        }
        if !status.is_success() {
            let detail = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(ErrorBody::message);
            return Err(TransportError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        call_name: &str,
    ) -> Result<T> {
        let response = self.send(request, call_name).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| TransportError::Decode(format!("{call_name}: {e}")))
    }
}

#[async_trait]
impl SearchTransport for ApiClient {
    #[tracing::instrument(skip(self), fields(query = %request.query, page = request.page))]
    async fn search_scripts(&self, request: &ScriptSearchRequest) -> Result<ScriptSearchResponse> {
        let url = self.endpoint(&["api", "v1", "search", "transcripts"])?;
        let envelope: SearchEnvelope<ScriptHitDto> = self
            .get_json(
                self.client.post(url).json(request),
                "POST /api/v1/search/transcripts",
            )
            .await?;

        let today = today();
        Ok(ScriptSearchResponse {
            results: envelope
                .results
                .into_iter()
                .map(|hit| hit.into_result(&request.query, &today))
                .collect(),
            total: envelope.total,
            processing_time_seconds: envelope.processing_time.unwrap_or(0.0),
        })
    }

    #[tracing::instrument(skip(self), fields(query = %request.query, page = request.page))]
    async fn search_videos(&self, request: &VideoSearchRequest) -> Result<VideoSearchResponse> {
        let url = self.endpoint(&["api", "v1", "videos", "search"])?;
        let limit = request.limit.to_string();
        let page = request.page.to_string();
        let envelope: SearchEnvelope<VideoHitDto> = self
            .get_json(
                self.client.get(url).query(&[
                    ("q", request.query.as_str()),
                    ("limit", limit.as_str()),
                    ("page", page.as_str()),
                ]),
                "GET /api/v1/videos/search",
            )
            .await?;

        let today = today();
        Ok(VideoSearchResponse {
            results: envelope
                .results
                .into_iter()
                .map(|hit| hit.into_result(&today))
                .collect(),
            total: envelope.total,
        })
    }
}

#[async_trait]
impl BookmarkTransport for ApiClient {
    #[tracing::instrument(skip(self))]
    async fn toggle_bookmark(&self, item_id: &str) -> Result<()> {
        let url = self.endpoint(&["api", "v1", "videos", item_id, "bookmark"])?;
        self.send(self.client.post(url), "POST /api/v1/videos/{id}/bookmark")
            .await?;
        Ok(())
    }
}

#[async_trait]
impl VideoTransport for ApiClient {
    #[tracing::instrument(skip(self))]
    async fn get_video(&self, video_id: &str) -> Result<VideoDetails> {
        let url = self.endpoint(&["api", "v1", "videos", video_id])?;
        let dto: VideoDetailDto = self
            .get_json(self.client.get(url), "GET /api/v1/videos/{id}")
            .await?;
        Ok(dto.into_details(&today()))
    }

    #[tracing::instrument(skip(self))]
    async fn get_transcripts(&self, video_id: &str) -> Result<Vec<TranscriptLine>> {
        let url = self.endpoint(&["api", "v1", "videos", video_id, "transcripts"])?;
        let lines: Vec<TranscriptLineDto> = self
            .get_json(
                self.client.get(url),
                "GET /api/v1/videos/{id}/transcripts",
            )
            .await?;
        Ok(lines.into_iter().map(TranscriptLine::from).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn get_related(&self, video_id: &str, limit: u32) -> Result<Vec<SearchResult>> {
        let url = self.endpoint(&["api", "v1", "videos", video_id, "related"])?;
        let hits: Vec<VideoHitDto> = self
            .get_json(
                self.client.get(url).query(&[("limit", limit)]),
                "GET /api/v1/videos/{id}/related",
            )
            .await?;
        let today = today();
        Ok(hits.into_iter().map(|hit| hit.into_result(&today)).collect())
    }
}

/// Today's date as `YYYY-MM-DD`, standing in for missing upload dates.
fn today() -> String {
    let format = format_description!("[year]-[month]-[day]");
    OffsetDateTime::now_utc()
        .date()
        .format(&format)
        .unwrap_or_default()
}
