use serde::Deserialize;

use crate::playback::format_offset;
use crate::types::{ResultDetail, ScriptMatch, SearchResult, VideoDetails, VideoMeta};

const PLACEHOLDER_THUMBNAIL: &str = "https://via.placeholder.com/320x180";
const UNKNOWN_CHANNEL: &str = "Unknown";
const NO_DESCRIPTION: &str = "No description";
const ZERO_OFFSET: &str = "00:00";

#[derive(Deserialize)]
pub struct SearchEnvelope<T> {
    pub results: Vec<T>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub processing_time: Option<f64>,
}

#[derive(Deserialize)]
pub struct ScriptHitDto {
    pub video_id: String,
    #[serde(default)]
    pub video_title: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub upload_date: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub matched_text: Option<String>,
    #[serde(default)]
    pub is_bookmarked: Option<bool>,
}

impl ScriptHitDto {
    /// `query` stands in for a missing matched text; `today` for a missing date.
    pub fn into_result(self, query: &str, today: &str) -> SearchResult {
        let matched = non_empty(self.matched_text).unwrap_or_else(|| query.to_string());
        SearchResult {
            id: self.video_id,
            title: self.video_title.unwrap_or_default(),
            thumbnail_url: non_empty(self.thumbnail_url)
                .unwrap_or_else(|| PLACEHOLDER_THUMBNAIL.to_string()),
            upload_date: non_empty(self.upload_date).unwrap_or_else(|| today.to_string()),
            bookmarked: self.is_bookmarked.unwrap_or(false),
            detail: ResultDetail::Script(ScriptMatch::new(
                non_empty(self.timestamp).unwrap_or_else(|| ZERO_OFFSET.to_string()),
                matched,
                self.context.unwrap_or_default(),
            )),
        }
    }
}

#[derive(Deserialize)]
pub struct VideoHitDto {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub views: Option<u64>,
    #[serde(default)]
    pub upload_date: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub is_bookmarked: Option<bool>,
}

impl VideoHitDto {
    pub fn into_result(self, today: &str) -> SearchResult {
        SearchResult {
            id: self.id,
            title: self.title.unwrap_or_default(),
            thumbnail_url: non_empty(self.thumbnail_url)
                .unwrap_or_else(|| PLACEHOLDER_THUMBNAIL.to_string()),
            upload_date: non_empty(self.upload_date).unwrap_or_else(|| today.to_string()),
            bookmarked: self.is_bookmarked.unwrap_or(false),
            detail: ResultDetail::Video(VideoMeta {
                channel: non_empty(self.channel).unwrap_or_else(|| UNKNOWN_CHANNEL.to_string()),
                view_count: self.views.unwrap_or(0),
                duration: non_empty(self.duration).unwrap_or_else(|| ZERO_OFFSET.to_string()),
            }),
        }
    }
}

#[derive(Deserialize)]
pub struct VideoDetailDto {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub views: Option<u64>,
    #[serde(default)]
    pub upload_date: Option<String>,
    /// Either a display string or a number of seconds.
    #[serde(default)]
    pub duration: Option<serde_json::Value>,
    #[serde(default)]
    pub is_bookmarked: Option<bool>,
}

impl VideoDetailDto {
    pub fn into_details(self, today: &str) -> VideoDetails {
        VideoDetails {
            id: self.id,
            title: self.title.unwrap_or_default(),
            description: non_empty(self.description)
                .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            channel: non_empty(self.channel).unwrap_or_else(|| UNKNOWN_CHANNEL.to_string()),
            view_count: self.views.unwrap_or(0),
            duration: duration_text(self.duration),
            upload_date: non_empty(self.upload_date).unwrap_or_else(|| today.to_string()),
            thumbnail_url: non_empty(self.thumbnail_url)
                .unwrap_or_else(|| PLACEHOLDER_THUMBNAIL.to_string()),
            video_url: self.video_url.unwrap_or_default(),
            bookmarked: self.is_bookmarked.unwrap_or(false),
        }
    }
}

fn duration_text(duration: Option<serde_json::Value>) -> String {
    match duration {
        Some(serde_json::Value::String(text)) if !text.trim().is_empty() => text,
        Some(serde_json::Value::Number(seconds)) => seconds
            .as_f64()
            .filter(|s| s.is_finite() && *s >= 0.0 && *s <= f64::from(u32::MAX))
            .map(|s| format_offset(s.round() as u32))
            .unwrap_or_else(|| ZERO_OFFSET.to_string()),
        _ => ZERO_OFFSET.to_string(),
    }
}

#[derive(Deserialize)]
pub struct TranscriptLineDto {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl From<TranscriptLineDto> for super::TranscriptLine {
    fn from(dto: TranscriptLineDto) -> Self {
        Self {
            time_offset: non_empty(dto.timestamp).unwrap_or_else(|| ZERO_OFFSET.to_string()),
            text: dto.text.unwrap_or_default(),
        }
    }
}

/// Error body of the API: `{"detail": ...}`, where detail may be a string or
/// a structured validation report.
#[derive(Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn message(self) -> Option<String> {
        match self.detail? {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TranscriptLine;

    #[test]
    fn script_hit_defaults_follow_the_client_contract() {
        let dto: ScriptHitDto = serde_json::from_value(serde_json::json!({
            "video_id": "v1",
            "video_title": "Intro",
        }))
        .unwrap();

        let hit = dto.into_result("hello", "2024-06-01");
        assert_eq!(hit.thumbnail_url, PLACEHOLDER_THUMBNAIL);
        assert_eq!(hit.upload_date, "2024-06-01");
        let m = hit.script_match().unwrap();
        assert_eq!(m.timestamp, "00:00");
        assert_eq!(m.matched_text(), "hello");
        assert_eq!(m.context_text(), "hello");
    }

    #[test]
    fn script_hit_keeps_server_values() {
        let dto: ScriptHitDto = serde_json::from_value(serde_json::json!({
            "video_id": "v1",
            "video_title": "Intro",
            "thumbnail_url": "https://cdn/x.jpg",
            "upload_date": "2023-02-03",
            "timestamp": "01:30",
            "context": "well hello there",
            "matched_text": "hello",
            "is_bookmarked": true,
        }))
        .unwrap();

        let hit = dto.into_result("ignored", "2024-06-01");
        assert!(hit.bookmarked);
        assert_eq!(hit.script_match().unwrap().highlight(), ("well ", "hello", " there"));
    }

    #[test]
    fn video_hit_defaults() {
        let dto: VideoHitDto = serde_json::from_value(serde_json::json!({"id": "v9"})).unwrap();
        let hit = dto.into_result("2024-06-01");
        match hit.detail {
            ResultDetail::Video(meta) => {
                assert_eq!(meta.channel, "Unknown");
                assert_eq!(meta.view_count, 0);
                assert_eq!(meta.duration, "00:00");
            }
            ResultDetail::Script(_) => panic!("expected a video hit"),
        }
    }

    #[test]
    fn video_detail_defaults_and_numeric_duration() {
        let dto: VideoDetailDto = serde_json::from_value(serde_json::json!({
            "id": "v1",
            "title": "Intro",
            "duration": 754.4,
            "is_bookmarked": true,
        }))
        .unwrap();

        let details = dto.into_details("2024-06-01");
        assert_eq!(details.description, "No description");
        assert_eq!(details.channel, "Unknown");
        assert_eq!(details.duration, "12:34");
        assert_eq!(details.upload_date, "2024-06-01");
        assert!(details.bookmarked);

        let dto: VideoDetailDto =
            serde_json::from_value(serde_json::json!({"id": "v2", "duration": "1:02:03"}))
                .unwrap();
        let details = dto.into_details("2024-06-01");
        assert_eq!(details.duration, "1:02:03");
        assert!(!details.bookmarked);
    }

    #[test]
    fn transcript_line_defaults_missing_offset() {
        let dto: TranscriptLineDto =
            serde_json::from_value(serde_json::json!({"text": "hi"})).unwrap();
        assert_eq!(
            TranscriptLine::from(dto),
            TranscriptLine {
                time_offset: "00:00".to_string(),
                text: "hi".to_string()
            }
        );
    }

    #[test]
    fn error_body_accepts_structured_detail() {
        let body: ErrorBody =
            serde_json::from_value(serde_json::json!({"detail": "Not found"})).unwrap();
        assert_eq!(body.message().as_deref(), Some("Not found"));

        let body: ErrorBody =
            serde_json::from_value(serde_json::json!({"detail": [{"loc": ["q"]}]})).unwrap();
        assert!(body.message().unwrap().contains("loc"));
    }
}
