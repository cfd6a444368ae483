use crate::bookmark::{BookmarkTarget, BookmarkToggler, FlagSlot, UndoToken};
use crate::context::AppContext;
use crate::error::{Error, Result, TransportError};
use crate::playback::{markers_from_lines, PlaybackResolver};
use crate::transport::TranscriptLine;
use crate::types::{SearchResult, TranscriptMarker, VideoDetails, RELATED_LIMIT};

use super::LOGIN_PATH;

const VIDEO_PATH_PREFIX: &str = "/video/";

pub enum DetailsState {
    Loading,
    Ready(VideoDetails),
    Failed(Error),
}

pub enum TranscriptState {
    Loading,
    Ready(PlaybackResolver),
    Failed(Error),
}

/// Bookmark flag of the video on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
struct VideoFlag {
    video_id: String,
    bookmarked: bool,
}

impl BookmarkTarget for VideoFlag {
    fn find_flags(&self, item_id: &str) -> Vec<(FlagSlot, bool)> {
        if item_id == self.video_id {
            vec![(FlagSlot::Video(self.video_id.clone()), self.bookmarked)]
        } else {
            Vec::new()
        }
    }

    fn write_flag(&mut self, item_id: &str, slot: &FlagSlot, value: bool) -> bool {
        match slot {
            FlagSlot::Video(id) if id == item_id && *id == self.video_id => {
                self.bookmarked = value;
                true
            }
            _ => false,
        }
    }
}

/// The video view: details, transcript markers, the `t` deep link, related
/// videos and the video's own bookmark flag.
pub struct VideoPage {
    ctx: AppContext,
    flag: VideoFlag,
    toggler: BookmarkToggler,
    /// Optimistic toggles still waiting for the server.
    toggles_in_flight: usize,
    details: DetailsState,
    transcript: TranscriptState,
    related: Vec<SearchResult>,
}

impl VideoPage {
    /// A page waiting for its data. `bookmarked` is shown until the video
    /// details report the server's flag.
    pub fn new(ctx: AppContext, video_id: impl Into<String>, bookmarked: bool) -> Self {
        let toggler = BookmarkToggler::new(ctx.auth.clone(), ctx.bookmarks.clone());
        Self {
            ctx,
            flag: VideoFlag {
                video_id: video_id.into(),
                bookmarked,
            },
            toggler,
            toggles_in_flight: 0,
            details: DetailsState::Loading,
            transcript: TranscriptState::Loading,
            related: Vec::new(),
        }
    }

    /// Builds the page and loads details, transcript and related videos once.
    pub async fn mount(ctx: AppContext, video_id: impl Into<String>, bookmarked: bool) -> Self {
        let mut page = Self::new(ctx, video_id, bookmarked);
        let videos = page.ctx.videos.clone();
        let id = page.flag.video_id.as_str();
        let (details, lines, related) = tokio::join!(
            videos.get_video(id),
            videos.get_transcripts(id),
            videos.get_related(id, RELATED_LIMIT),
        );
        page.apply_details(details);
        page.apply_transcripts(lines);
        page.apply_related(related);
        page
    }

    /// Loads only the video details.
    pub async fn load_details(&mut self) {
        let outcome = self.ctx.videos.get_video(&self.flag.video_id).await;
        self.apply_details(outcome);
    }

    /// Video id addressed by a `/video/{id}` location.
    pub fn video_id_from_path(path: &str) -> Option<&str> {
        let id = path.strip_prefix(VIDEO_PATH_PREFIX)?;
        let id = id.split(['?', '#']).next().unwrap_or(id);
        (!id.is_empty() && !id.contains('/')).then_some(id)
    }

    pub fn video_id(&self) -> &str {
        &self.flag.video_id
    }

    pub fn bookmarked(&self) -> bool {
        self.flag.bookmarked
    }

    pub fn details(&self) -> &DetailsState {
        &self.details
    }

    pub fn transcript(&self) -> &TranscriptState {
        &self.transcript
    }

    pub fn related(&self) -> &[SearchResult] {
        &self.related
    }

    /// Seeds the bookmark flag from the server unless a toggle is pending,
    /// whose optimistic value is newer.
    pub fn apply_details(&mut self, outcome: std::result::Result<VideoDetails, TransportError>) {
        self.details = match outcome {
            Ok(details) => {
                if self.toggles_in_flight == 0 {
                    self.flag.bookmarked = details.bookmarked;
                }
                DetailsState::Ready(details)
            }
            Err(e) => {
                tracing::warn!(
                    video_id = %self.flag.video_id,
                    error = %e,
                    "video details fetch failed"
                );
                DetailsState::Failed(Error::TransportFailure(e))
            }
        };
    }

    /// Related videos are optional; a failure leaves the list empty.
    pub fn apply_related(
        &mut self,
        outcome: std::result::Result<Vec<SearchResult>, TransportError>,
    ) {
        match outcome {
            Ok(related) => self.related = related,
            Err(e) => {
                tracing::warn!(
                    video_id = %self.flag.video_id,
                    error = %e,
                    "related videos fetch failed"
                );
                self.related.clear();
            }
        }
    }

    pub fn apply_transcripts(
        &mut self,
        outcome: std::result::Result<Vec<TranscriptLine>, TransportError>,
    ) {
        self.transcript = match outcome {
            Ok(lines) => {
                let markers = markers_from_lines(lines);
                tracing::debug!(
                    video_id = %self.flag.video_id,
                    markers = markers.len(),
                    "transcript loaded"
                );
                TranscriptState::Ready(PlaybackResolver::new(markers, self.ctx.router.clone()))
            }
            Err(e) => {
                tracing::warn!(
                    video_id = %self.flag.video_id,
                    error = %e,
                    "transcript fetch failed"
                );
                TranscriptState::Failed(Error::TransportFailure(e))
            }
        };
    }

    pub fn markers(&self) -> &[TranscriptMarker] {
        match &self.transcript {
            TranscriptState::Ready(resolver) => resolver.markers(),
            _ => &[],
        }
    }

    pub fn highlighted(&self) -> Option<&TranscriptMarker> {
        match &self.transcript {
            TranscriptState::Ready(resolver) => resolver.highlighted(),
            _ => None,
        }
    }

    pub fn seek_seconds(&self) -> Option<u32> {
        match &self.transcript {
            TranscriptState::Ready(resolver) => resolver.seek_seconds(),
            _ => None,
        }
    }

    /// The details failure, else the transcript failure.
    pub fn error(&self) -> Option<&Error> {
        match (&self.details, &self.transcript) {
            (DetailsState::Failed(e), _) | (_, TranscriptState::Failed(e)) => Some(e),
            _ => None,
        }
    }

    /// Marker click. Ignored until the transcript is loaded.
    pub fn select_marker(&mut self, marker_id: &str) -> bool {
        match &mut self.transcript {
            TranscriptState::Ready(resolver) => resolver.select_marker(marker_id),
            _ => false,
        }
    }

    /// External change of the address. Re-resolves `t` without refetching.
    pub fn on_location_changed(&mut self) -> bool {
        match &mut self.transcript {
            TranscriptState::Ready(resolver) => resolver.sync_from_location(),
            _ => false,
        }
    }

    pub fn begin_bookmark(&mut self) -> Result<UndoToken> {
        let video_id = self.flag.video_id.clone();
        let begun = self.toggler.begin(&mut self.flag, &video_id);
        match &begun {
            Ok(_) => self.toggles_in_flight += 1,
            Err(Error::AuthRequired) => self.ctx.router.push(LOGIN_PATH),
            Err(_) => {}
        }
        begun
    }

    pub fn finish_bookmark(
        &mut self,
        token: UndoToken,
        outcome: std::result::Result<(), TransportError>,
    ) -> Result<bool> {
        self.toggles_in_flight = self.toggles_in_flight.saturating_sub(1);
        self.toggler.finish(&mut self.flag, token, outcome)
    }

    pub async fn toggle_bookmark(&mut self) -> Result<bool> {
        let token = self.begin_bookmark()?;
        let outcome = self
            .ctx
            .bookmarks
            .toggle_bookmark(&self.flag.video_id)
            .await;
        self.finish_bookmark(token, outcome)
    }
}
