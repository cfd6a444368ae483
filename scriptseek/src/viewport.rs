use std::sync::atomic::{AtomicUsize, Ordering};

/// Scroll side effect of a page change.
pub trait Viewport: Send + Sync {
    fn scroll_to_top(&self);
}

/// Viewport that only counts scrolls. Used by the CLI and by tests.
#[derive(Debug, Default)]
pub struct RecordingViewport {
    scrolls: AtomicUsize,
}

impl RecordingViewport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scroll_count(&self) -> usize {
        self.scrolls.load(Ordering::SeqCst)
    }
}

impl Viewport for RecordingViewport {
    fn scroll_to_top(&self) {
        self.scrolls.fetch_add(1, Ordering::SeqCst);
        tracing::trace!("scrolled to top");
    }
}
