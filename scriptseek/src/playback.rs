//! Deep-link resolution between the `t` URL parameter and transcript markers.

use std::sync::Arc;

use crate::router::{NavigateOptions, Router};
use crate::transport::TranscriptLine;
use crate::types::TranscriptMarker;

pub const PARAM_TIME: &str = "t";

/// Id of the marker whose offset equals `requested` exactly, if any.
pub fn resolve<'a>(requested: &str, markers: &'a [TranscriptMarker]) -> Option<&'a str> {
    markers
        .iter()
        .find(|marker| marker.time_offset == requested)
        .map(|marker| marker.id.as_str())
}

/// Builds markers in transcript order, with ids `m0`, `m1`, ...
pub fn markers_from_lines(lines: Vec<TranscriptLine>) -> Vec<TranscriptMarker> {
    lines
        .into_iter()
        .enumerate()
        .map(|(index, line)| TranscriptMarker {
            id: format!("m{index}"),
            time_offset: line.time_offset,
            text: line.text,
        })
        .collect()
}

/// Seconds in an `mm:ss` or `h:mm:ss` offset.
pub fn offset_seconds(offset: &str) -> Option<u32> {
    let parts = offset
        .split(':')
        .map(|part| part.trim().parse::<u32>().ok())
        .collect::<Option<Vec<_>>>()?;
    match parts.as_slice() {
        [m, s] if *s < 60 => m.checked_mul(60)?.checked_add(*s),
        [h, m, s] if *m < 60 && *s < 60 => h.checked_mul(3600)?.checked_add(m * 60 + s),
        _ => None,
    }
}

/// `mm:ss`, or `h:mm:ss` from one hour on.
pub fn format_offset(seconds: u32) -> String {
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackLink {
    /// Raw `t` parameter; `None` when absent.
    pub requested_time_offset: Option<String>,
    pub highlighted_marker_id: Option<String>,
}

impl PlaybackLink {
    fn resolved(requested: Option<String>, markers: &[TranscriptMarker]) -> Self {
        let highlighted_marker_id = requested
            .as_deref()
            .and_then(|t| resolve(t, markers))
            .map(str::to_string);
        Self {
            requested_time_offset: requested,
            highlighted_marker_id,
        }
    }
}

/// Keeps the highlighted marker and the `t` parameter in step.
pub struct PlaybackResolver {
    markers: Vec<TranscriptMarker>,
    router: Arc<dyn Router>,
    link: PlaybackLink,
}

impl PlaybackResolver {
    /// Resolves the current `t` parameter against `markers`.
    pub fn new(markers: Vec<TranscriptMarker>, router: Arc<dyn Router>) -> Self {
        let link = PlaybackLink::resolved(router.get_param(PARAM_TIME), &markers);
        Self {
            markers,
            router,
            link,
        }
    }

    pub fn markers(&self) -> &[TranscriptMarker] {
        &self.markers
    }

    pub fn link(&self) -> &PlaybackLink {
        &self.link
    }

    pub fn highlighted(&self) -> Option<&TranscriptMarker> {
        let id = self.link.highlighted_marker_id.as_deref()?;
        self.markers.iter().find(|marker| marker.id == id)
    }

    /// Where the player should seek to, if `t` parses.
    pub fn seek_seconds(&self) -> Option<u32> {
        offset_seconds(self.link.requested_time_offset.as_deref()?)
    }

    /// Highlights `marker_id` and rewrites `t` in place, without adding a
    /// history entry. Unknown ids are ignored and return false.
    pub fn select_marker(&mut self, marker_id: &str) -> bool {
        let Some(marker) = self.markers.iter().find(|marker| marker.id == marker_id) else {
            tracing::debug!(marker_id, "ignoring unknown marker");
            return false;
        };

        self.router
            .set_param(PARAM_TIME, &marker.time_offset, NavigateOptions::REPLACE);
        self.link = PlaybackLink {
            requested_time_offset: Some(marker.time_offset.clone()),
            highlighted_marker_id: Some(marker.id.clone()),
        };
        true
    }

    /// Re-resolves after an external change of `t`. Returns whether the link
    /// changed. Never refetches markers.
    pub fn sync_from_location(&mut self) -> bool {
        let requested = self.router.get_param(PARAM_TIME);
        if requested == self.link.requested_time_offset {
            return false;
        }
        self.link = PlaybackLink::resolved(requested, &self.markers);
        true
    }
}
