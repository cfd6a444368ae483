//! Core types shared by the search and playback state machines.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Fixed number of results per page.
pub const PAGE_SIZE: u32 = 10;

/// Number of related videos shown beside a video.
pub const RELATED_LIMIT: u32 = 5;

/// Confidence floor sent with script searches unless configured otherwise.
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;

/// Which index a query runs against.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Transcribed speech, returns time-located matches.
    #[default]
    Script,
    /// Video metadata, returns whole videos.
    Video,
}

impl SearchMode {
    pub fn other(self) -> Self {
        match self {
            SearchMode::Script => SearchMode::Video,
            SearchMode::Video => SearchMode::Script,
        }
    }
}

/// The `{text, mode, page}` triple. Single source of truth for the search view;
/// the URL is only a serialization of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QueryState {
    pub text: String,
    pub mode: SearchMode,
    page: u32,
}

impl QueryState {
    pub fn new(text: impl Into<String>, mode: SearchMode) -> Self {
        Self {
            text: text.into(),
            mode,
            page: 1,
        }
    }

    /// Same query on another page. Page 0 is clamped to 1.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    /// True when there is nothing to search for.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl Default for QueryState {
    fn default() -> Self {
        Self::new("", SearchMode::default())
    }
}

/// Match details for a script-mode hit.
///
/// `matched_text` is always a literal substring of `context_text`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptMatch {
    pub timestamp: String,
    matched_text: String,
    context_text: String,
}

impl ScriptMatch {
    /// Builds a match, repairing inputs that break the substring invariant:
    /// an empty context takes the matched text, an unrelated context keeps
    /// its text and drops the highlight.
    pub fn new(
        timestamp: impl Into<String>,
        matched_text: impl Into<String>,
        context_text: impl Into<String>,
    ) -> Self {
        let mut matched_text = matched_text.into();
        let mut context_text = context_text.into();
        if context_text.is_empty() {
            context_text = matched_text.clone();
        } else if !context_text.contains(&matched_text) {
            matched_text.clear();
        }
        Self {
            timestamp: timestamp.into(),
            matched_text,
            context_text,
        }
    }

    pub fn matched_text(&self) -> &str {
        &self.matched_text
    }

    pub fn context_text(&self) -> &str {
        &self.context_text
    }

    /// Context split around the first occurrence of the match:
    /// `(before, matched, after)`.
    pub fn highlight(&self) -> (&str, &str, &str) {
        match self.context_text.find(&self.matched_text) {
            Some(start) => {
                let end = start + self.matched_text.len();
                (
                    &self.context_text[..start],
                    &self.context_text[start..end],
                    &self.context_text[end..],
                )
            }
            None => (self.context_text.as_str(), "", ""),
        }
    }
}

/// Metadata for a video-mode hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoMeta {
    pub channel: String,
    pub view_count: u64,
    pub duration: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResultDetail {
    Script(ScriptMatch),
    Video(VideoMeta),
}

/// One row of a result page. Only `bookmarked` is ever mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub thumbnail_url: String,
    pub upload_date: String,
    pub bookmarked: bool,
    pub detail: ResultDetail,
}

impl SearchResult {
    pub fn mode(&self) -> SearchMode {
        match self.detail {
            ResultDetail::Script(_) => SearchMode::Script,
            ResultDetail::Video(_) => SearchMode::Video,
        }
    }

    pub fn script_match(&self) -> Option<&ScriptMatch> {
        match &self.detail {
            ResultDetail::Script(m) => Some(m),
            ResultDetail::Video(_) => None,
        }
    }

    /// Deep link into the video page, at the matched timestamp for script hits.
    pub fn watch_path(&self) -> String {
        match &self.detail {
            ResultDetail::Script(m) => format!("/video/{}?t={}", self.id, m.timestamp),
            ResultDetail::Video(_) => format!("/video/{}", self.id),
        }
    }
}

/// Everything the video page shows about the video itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetails {
    pub id: String,
    pub title: String,
    pub description: String,
    pub channel: String,
    pub view_count: u64,
    pub duration: String,
    pub upload_date: String,
    pub thumbnail_url: String,
    pub video_url: String,
    pub bookmarked: bool,
}

/// A fetched page of results, valid only for the `query` it was fetched with.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPage {
    pub items: Vec<SearchResult>,
    pub total_count: u64,
    pub query: QueryState,
}

impl ResultPage {
    pub fn empty(query: QueryState) -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
            query,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One transcript utterance on the video page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptMarker {
    pub id: String,
    /// `mm:ss`, compared verbatim against the `t` URL parameter.
    pub time_offset: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn search_mode_round_trips_through_url_form() {
        assert_eq!(SearchMode::Script.to_string(), "script");
        assert_eq!(SearchMode::Video.to_string(), "video");
        assert_eq!(SearchMode::from_str("VIDEO").unwrap(), SearchMode::Video);
        assert!(SearchMode::from_str("audio").is_err());
    }

    #[test]
    fn query_page_never_drops_below_one() {
        let query = QueryState::new("hello", SearchMode::Script).with_page(0);
        assert_eq!(query.page(), 1);
        assert!(QueryState::new("  \t", SearchMode::Video).is_blank());
    }

    #[test]
    fn script_match_highlight_splits_context() {
        let m = ScriptMatch::new("01:30", "brown fox", "the quick brown fox jumps");
        assert_eq!(m.highlight(), ("the quick ", "brown fox", " jumps"));
    }

    #[test]
    fn script_match_repairs_broken_substring_invariant() {
        let m = ScriptMatch::new("00:01", "hello", "");
        assert_eq!(m.context_text(), "hello");
        assert_eq!(m.highlight(), ("", "hello", ""));

        let m = ScriptMatch::new("00:01", "hello", "goodbye world");
        assert_eq!(m.matched_text(), "");
        assert!(m.context_text().contains(m.matched_text()));
    }

    #[test]
    fn watch_path_carries_timestamp_for_script_hits() {
        let hit = SearchResult {
            id: "v1".to_string(),
            title: "Title".to_string(),
            thumbnail_url: String::new(),
            upload_date: "2024-01-01".to_string(),
            bookmarked: false,
            detail: ResultDetail::Script(ScriptMatch::new("02:15", "a", "a b")),
        };
        assert_eq!(hit.watch_path(), "/video/v1?t=02:15");
        assert_eq!(hit.mode(), SearchMode::Script);
    }
}
