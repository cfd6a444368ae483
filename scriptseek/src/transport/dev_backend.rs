use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use time::macros::format_description;
use time::{Duration, OffsetDateTime};

use super::{
    BookmarkTransport, Result, ScriptSearchRequest, ScriptSearchResponse, SearchTransport,
    TranscriptLine, VideoTransport, VideoSearchRequest, VideoSearchResponse,
};
use crate::error::TransportError;
use crate::types::{ResultDetail, ScriptMatch, SearchResult, VideoDetails, VideoMeta};

/// In-memory corpus served through the transport traits, for running the
/// CLI without an API server.
#[derive(Debug, Clone)]
pub struct DevBackend {
    videos: Arc<Vec<DevVideo>>,
    bookmarks: Arc<Mutex<HashSet<String>>>,
}

#[derive(Debug, Clone)]
struct DevVideo {
    id: String,
    title: String,
    channel: String,
    views: u64,
    duration: String,
    upload_date: String,
    lines: Vec<(String, String)>,
}

impl DevBackend {
    pub fn new() -> Self {
        Self {
            videos: Arc::new(seed_dev_corpus()),
            bookmarks: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    fn is_bookmarked(&self, video_id: &str) -> bool {
        self.bookmarks
            .lock()
            .expect("dev store lock poisoned")
            .contains(video_id)
    }

    fn find(&self, video_id: &str) -> Result<&DevVideo> {
        self.videos
            .iter()
            .find(|video| video.id == video_id)
            .ok_or_else(|| TransportError::Status {
                status: 404,
                detail: Some("Video not found".to_string()),
            })
    }

    fn video_result(&self, video: &DevVideo) -> SearchResult {
        self.result_for(
            video,
            ResultDetail::Video(VideoMeta {
                channel: video.channel.clone(),
                view_count: video.views,
                duration: video.duration.clone(),
            }),
        )
    }

    fn result_for(&self, video: &DevVideo, detail: ResultDetail) -> SearchResult {
        SearchResult {
            id: video.id.clone(),
            title: video.title.clone(),
            thumbnail_url: format!("https://img.dev.local/{}.jpg", video.id),
            upload_date: video.upload_date.clone(),
            bookmarked: self.is_bookmarked(&video.id),
            detail,
        }
    }
}

impl Default for DevBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchTransport for DevBackend {
    async fn search_scripts(&self, request: &ScriptSearchRequest) -> Result<ScriptSearchResponse> {
        let needle = request.query.to_lowercase();
        let needle = needle.as_str();
        let hits: Vec<SearchResult> = self
            .videos
            .iter()
            .flat_map(|video| {
                video.lines.iter().filter_map(move |(offset, text)| {
                    let start = text.to_lowercase().find(needle)?;
                    // Lowercasing may shift byte offsets for non-ASCII text.
                    let matched = text.get(start..start + needle.len())?;
                    Some((video, offset, text, matched))
                })
            })
            .map(|(video, offset, text, matched)| {
                self.result_for(
                    video,
                    ResultDetail::Script(ScriptMatch::new(offset.as_str(), matched, text.as_str())),
                )
            })
            .collect();

        let total = hits.len() as u64;
        Ok(ScriptSearchResponse {
            results: paginate(hits, request.limit, request.page),
            total: Some(total),
            processing_time_seconds: 0.0,
        })
    }

    async fn search_videos(&self, request: &VideoSearchRequest) -> Result<VideoSearchResponse> {
        let needle = request.query.to_lowercase();
        let hits: Vec<SearchResult> = self
            .videos
            .iter()
            .filter(|video| {
                video.title.to_lowercase().contains(&needle)
                    || video.channel.to_lowercase().contains(&needle)
            })
            .map(|video| self.video_result(video))
            .collect();

        let total = hits.len() as u64;
        Ok(VideoSearchResponse {
            results: paginate(hits, request.limit, request.page),
            total: Some(total),
        })
    }
}

#[async_trait]
impl BookmarkTransport for DevBackend {
    async fn toggle_bookmark(&self, item_id: &str) -> Result<()> {
        self.find(item_id)?;
        let mut bookmarks = self.bookmarks.lock().expect("dev store lock poisoned");
        if !bookmarks.remove(item_id) {
            bookmarks.insert(item_id.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl VideoTransport for DevBackend {
    async fn get_video(&self, video_id: &str) -> Result<VideoDetails> {
        let video = self.find(video_id)?;
        Ok(VideoDetails {
            id: video.id.clone(),
            title: video.title.clone(),
            description: format!("{}, from the {} channel.", video.title, video.channel),
            channel: video.channel.clone(),
            view_count: video.views,
            duration: video.duration.clone(),
            upload_date: video.upload_date.clone(),
            thumbnail_url: format!("https://img.dev.local/{}.jpg", video.id),
            video_url: format!("https://media.dev.local/{}.mp4", video.id),
            bookmarked: self.is_bookmarked(&video.id),
        })
    }

    async fn get_transcripts(&self, video_id: &str) -> Result<Vec<TranscriptLine>> {
        let video = self.find(video_id)?;
        Ok(video
            .lines
            .iter()
            .map(|(offset, text)| TranscriptLine {
                time_offset: offset.clone(),
                text: text.clone(),
            })
            .collect())
    }

    /// Same channel first, then the rest of the corpus in seed order.
    async fn get_related(&self, video_id: &str, limit: u32) -> Result<Vec<SearchResult>> {
        let current = self.find(video_id)?;
        let others = self.videos.iter().filter(|video| video.id != current.id);
        let (same_channel, rest): (Vec<_>, Vec<_>) =
            others.partition(|video| video.channel == current.channel);
        Ok(same_channel
            .into_iter()
            .chain(rest)
            .take(limit as usize)
            .map(|video| self.video_result(video))
            .collect())
    }
}

fn paginate(hits: Vec<SearchResult>, limit: u32, page: u32) -> Vec<SearchResult> {
    let limit = limit.max(1) as usize;
    let skip = (page.max(1) as usize - 1) * limit;
    hits.into_iter().skip(skip).take(limit).collect()
}

fn seed_dev_corpus() -> Vec<DevVideo> {
    let format = format_description!("[year]-[month]-[day]");
    let today = OffsetDateTime::now_utc().date();

    let video = |idx: u32,
                 days_ago: i64,
                 title: &str,
                 channel: &str,
                 views: u64,
                 duration: &str,
                 lines: &[(&str, &str)]| DevVideo {
        id: format!("dev-video-{}", idx),
        title: title.to_string(),
        channel: channel.to_string(),
        views,
        duration: duration.to_string(),
        upload_date: (today - Duration::days(days_ago))
            .format(&format)
            .unwrap_or_default(),
        lines: lines
            .iter()
            .map(|(offset, text)| (offset.to_string(), text.to_string()))
            .collect(),
    };

    let mut corpus = vec![
        video(
            1,
            3,
            "Getting started with Rust",
            "Systems Weekly",
            12_400,
            "12:31",
            &[
                ("00:00", "Hello and welcome to the channel"),
                ("00:42", "Today we install the Rust toolchain"),
                ("01:29", "Cargo is the package manager"),
                ("01:30", "Hello world is the first program we write"),
                ("03:10", "Ownership is what makes Rust different"),
            ],
        ),
        video(
            2,
            10,
            "Async runtimes explained",
            "Systems Weekly",
            8_210,
            "24:05",
            &[
                ("00:00", "Hello everyone"),
                ("02:15", "A future does nothing until it is polled"),
                ("05:40", "The executor drives tasks to completion"),
            ],
        ),
        video(
            3,
            30,
            "Cooking pasta at home",
            "Kitchen Notes",
            102_000,
            "08:12",
            &[
                ("00:05", "Salt the water generously"),
                ("01:00", "Hello to everyone cooking along"),
            ],
        ),
    ];

    // Enough greetings to span several result pages.
    for idx in 4..=15u32 {
        let offset = format!("00:{:02}", idx);
        let text = format!("Hello from episode {}", idx);
        corpus.push(video(
            idx,
            i64::from(idx) * 7,
            &format!("Daily log episode {}", idx),
            "Daily Log",
            u64::from(idx) * 100,
            "05:00",
            &[(offset.as_str(), text.as_str())],
        ));
    }

    corpus
}
