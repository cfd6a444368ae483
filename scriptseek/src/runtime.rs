//! Action queue carrying network completions back to the page that asked.
//!
//! Transport calls run on tokio tasks. Each task posts one [`Action`] when it
//! finishes; the owning loop drains the channel and hands every action to
//! [`run_action`], so state transitions happen one at a time in arrival order.
//! Completions for the search page still reach it while a video is open on
//! top of it.

use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::bookmark::UndoToken;
use crate::error::{Result, TransportError};
use crate::orchestrator::{fetch, Applied, SearchTicket};
use crate::pages::{SearchPage, VideoPage};
use crate::router::{LocationChanged, Router};
use crate::transport::{BookmarkTransport, SearchTransport, TranscriptLine, VideoTransport};
use crate::types::{ResultPage, SearchResult, VideoDetails, RELATED_LIMIT};

#[derive(Debug)]
pub enum Action {
    SearchFinished {
        ticket: SearchTicket,
        outcome: std::result::Result<ResultPage, TransportError>,
    },
    BookmarkFinished {
        token: UndoToken,
        outcome: std::result::Result<(), TransportError>,
    },
    DetailsLoaded {
        video_id: String,
        outcome: std::result::Result<VideoDetails, TransportError>,
    },
    TranscriptLoaded {
        video_id: String,
        outcome: std::result::Result<Vec<TranscriptLine>, TransportError>,
    },
    RelatedLoaded {
        video_id: String,
        outcome: std::result::Result<Vec<SearchResult>, TransportError>,
    },
    LocationChanged(LocationChanged),
}

pub type ActionTx = UnboundedSender<Action>;
pub type ActionRx = UnboundedReceiver<Action>;

pub fn channel() -> (ActionTx, ActionRx) {
    mpsc::unbounded_channel()
}

/// A mounted page.
pub enum View {
    Search(SearchPage),
    Video(VideoPage),
}

/// The page on screen, plus the search page kept alive under an open video.
pub struct Screen {
    pub view: View,
    pub stashed_search: Option<SearchPage>,
}

impl Screen {
    pub fn new(view: View) -> Self {
        Self {
            view,
            stashed_search: None,
        }
    }

    /// Puts `page` on screen. A search page it covers is stashed; covering a
    /// video drops it.
    pub fn open_video(&mut self, page: VideoPage) {
        if let View::Search(search) = std::mem::replace(&mut self.view, View::Video(page)) {
            self.stashed_search = Some(search);
        }
    }

    /// The search page, on screen or stashed.
    pub fn search_page(&mut self) -> Option<&mut SearchPage> {
        match &mut self.view {
            View::Search(page) => Some(page),
            View::Video(_) => self.stashed_search.as_mut(),
        }
    }

    pub fn shows_search(&self) -> bool {
        matches!(self.view, View::Search(_))
    }
}

/// What applying an action changed.
#[derive(Debug, PartialEq)]
pub enum Update {
    Search(Applied),
    /// Another search was issued in response.
    SearchIssued,
    Bookmark(Result<bool>),
    Details,
    Transcript,
    Related,
    /// The `t` deep link was re-resolved.
    Playback,
    /// A page that is not on screen changed.
    Offscreen,
    /// No page cared.
    Ignored,
}

pub fn spawn_search(
    transport: Arc<dyn SearchTransport>,
    ticket: SearchTicket,
    tx: &ActionTx,
) -> JoinHandle<()> {
    let tx = tx.clone();
    tokio::spawn(async move {
        let outcome = fetch(transport.as_ref(), &ticket).await;
        let _ = tx.send(Action::SearchFinished { ticket, outcome });
    })
}

pub fn spawn_bookmark(
    transport: Arc<dyn BookmarkTransport>,
    token: UndoToken,
    tx: &ActionTx,
) -> JoinHandle<()> {
    let tx = tx.clone();
    tokio::spawn(async move {
        let outcome = transport.toggle_bookmark(token.item_id()).await;
        let _ = tx.send(Action::BookmarkFinished { token, outcome });
    })
}

/// Loads details, transcript and related videos on separate tasks; each
/// posts its own action.
pub fn spawn_video_loads(transport: Arc<dyn VideoTransport>, video_id: String, tx: &ActionTx) {
    {
        let (transport, video_id, tx) = (transport.clone(), video_id.clone(), tx.clone());
        tokio::spawn(async move {
            let outcome = transport.get_video(&video_id).await;
            let _ = tx.send(Action::DetailsLoaded { video_id, outcome });
        });
    }
    {
        let (transport, video_id, tx) = (transport.clone(), video_id.clone(), tx.clone());
        tokio::spawn(async move {
            let outcome = transport.get_transcripts(&video_id).await;
            let _ = tx.send(Action::TranscriptLoaded { video_id, outcome });
        });
    }
    let tx = tx.clone();
    tokio::spawn(async move {
        let outcome = transport.get_related(&video_id, RELATED_LIMIT).await;
        let _ = tx.send(Action::RelatedLoaded { video_id, outcome });
    });
}

/// Forwards external address changes from `router` into the queue until
/// either side closes.
pub fn forward_location_changes(router: &dyn Router, tx: &ActionTx) -> JoinHandle<()> {
    let mut changes = router.subscribe();
    let tx = tx.clone();
    tokio::spawn(async move {
        while let Some(change) = changes.recv().await {
            if tx.send(Action::LocationChanged(change)).is_err() {
                break;
            }
        }
    })
}

/// Spawns the fetch for `ticket`, if any.
pub fn dispatch_search(page: &SearchPage, ticket: Option<SearchTicket>, tx: &ActionTx) -> bool {
    match ticket {
        Some(ticket) => {
            spawn_search(page.context().search.clone(), ticket, tx);
            true
        }
        None => false,
    }
}

pub fn run_action(action: Action, screen: &mut Screen, tx: &ActionTx) -> Update {
    let on_screen = screen.shows_search();
    match action {
        Action::SearchFinished { ticket, outcome } => match screen.search_page() {
            Some(page) => {
                let applied = page.apply_search(ticket, outcome);
                if on_screen {
                    Update::Search(applied)
                } else {
                    Update::Offscreen
                }
            }
            None => ignored(Action::SearchFinished { ticket, outcome }),
        },
        Action::BookmarkFinished { token, outcome } if token.flips_video_page() => {
            match &mut screen.view {
                View::Video(page) => Update::Bookmark(page.finish_bookmark(token, outcome)),
                View::Search(_) => ignored(Action::BookmarkFinished { token, outcome }),
            }
        }
        Action::BookmarkFinished { token, outcome } => match screen.search_page() {
            Some(page) => Update::Bookmark(page.finish_bookmark(token, outcome)),
            None => ignored(Action::BookmarkFinished { token, outcome }),
        },
        Action::DetailsLoaded { video_id, outcome } => match &mut screen.view {
            View::Video(page) if page.video_id() == video_id => {
                page.apply_details(outcome);
                Update::Details
            }
            _ => ignored(Action::DetailsLoaded { video_id, outcome }),
        },
        Action::TranscriptLoaded { video_id, outcome } => match &mut screen.view {
            View::Video(page) if page.video_id() == video_id => {
                page.apply_transcripts(outcome);
                Update::Transcript
            }
            _ => ignored(Action::TranscriptLoaded { video_id, outcome }),
        },
        Action::RelatedLoaded { video_id, outcome } => match &mut screen.view {
            View::Video(page) if page.video_id() == video_id => {
                page.apply_related(outcome);
                Update::Related
            }
            _ => ignored(Action::RelatedLoaded { video_id, outcome }),
        },
        Action::LocationChanged(change) => match &mut screen.view {
            View::Search(page) => {
                let ticket = page.on_location_changed();
                if dispatch_search(page, ticket, tx) {
                    Update::SearchIssued
                } else {
                    Update::Ignored
                }
            }
            View::Video(page) => {
                if page.on_location_changed() {
                    Update::Playback
                } else {
                    tracing::trace!(location = %change.location, "location change without effect");
                    Update::Ignored
                }
            }
        },
    }
}

fn ignored(action: Action) -> Update {
    tracing::debug!(?action, "action for a page no longer mounted");
    Update::Ignored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AppContext;
    use crate::router::MemoryRouter;
    use crate::session::SessionContext;
    use crate::transport::mock::{script_hit, video_details, MockTransport};
    use crate::viewport::RecordingViewport;
    use std::time::Duration;

    fn context(location: &str, transport: &MockTransport) -> (Arc<MemoryRouter>, AppContext) {
        let router = Arc::new(MemoryRouter::new(location).unwrap());
        let ctx = AppContext::with_backend(
            transport.clone(),
            Arc::new(SessionContext::with_token("token")),
            router.clone(),
            Arc::new(RecordingViewport::new()),
        );
        (router, ctx)
    }

    fn search_screen(location: &str, transport: &MockTransport) -> (Arc<MemoryRouter>, Screen) {
        let (router, ctx) = context(location, transport);
        (router, Screen::new(View::Search(SearchPage::new(ctx))))
    }

    fn search_page(screen: &mut Screen) -> &mut SearchPage {
        screen.search_page().expect("a search page")
    }

    async fn race(slow: &str, fast: &str) -> String {
        let transport = MockTransport::new()
            .with_script_results(slow, vec![script_hit("slow", "00:01", slow)], Some(1))
            .with_script_results(fast, vec![script_hit("fast", "00:02", fast)], Some(1))
            .with_delay(slow, Duration::from_millis(80));
        let (_, mut screen) = search_screen("/search", &transport);
        let (tx, mut rx) = channel();

        let page = search_page(&mut screen);
        let first = if slow == "a" { slow } else { fast };
        let second = if slow == "a" { fast } else { slow };
        let ticket = page.submit_query(first);
        dispatch_search(page, ticket, &tx);
        let ticket = page.submit_query(second);
        dispatch_search(page, ticket, &tx);

        for _ in 0..2 {
            let action = rx.recv().await.unwrap();
            run_action(action, &mut screen, &tx);
        }
        search_page(&mut screen)
            .view()
            .results
            .unwrap()
            .query
            .text
            .clone()
    }

    #[tokio::test]
    async fn later_search_wins_when_it_answers_first() {
        assert_eq!(race("a", "b").await, "b");
    }

    #[tokio::test]
    async fn later_search_wins_when_it_answers_last() {
        assert_eq!(race("b", "a").await, "b");
    }

    #[tokio::test]
    async fn bookmark_completion_is_applied_through_the_queue() {
        let transport = MockTransport::new()
            .with_script_results("hello", vec![script_hit("v1", "00:01", "hello")], Some(1))
            .failing_bookmarks(TransportError::network("reset"));
        let (_, mut screen) = search_screen("/search?q=hello", &transport);
        let (tx, mut rx) = channel();

        let page = search_page(&mut screen);
        let ticket = page.mount();
        page.run(ticket).await;
        let token = page.begin_bookmark("v1").unwrap();
        assert!(page.view().results.unwrap().items[0].bookmarked);
        spawn_bookmark(page.context().bookmarks.clone(), token, &tx);

        let action = rx.recv().await.unwrap();
        let update = run_action(action, &mut screen, &tx);

        assert!(matches!(update, Update::Bookmark(Err(_))));
        assert!(!search_page(&mut screen).view().results.unwrap().items[0].bookmarked);
    }

    #[tokio::test]
    async fn failed_result_bookmark_rolls_back_under_an_open_video() {
        let transport = MockTransport::new()
            .with_script_results("hello", vec![script_hit("v1", "00:01", "hello")], Some(1))
            .with_video(video_details("v1", false))
            .failing_bookmarks(TransportError::network("reset"));
        let (_, mut screen) = search_screen("/search?q=hello", &transport);
        let (tx, mut rx) = channel();

        let page = search_page(&mut screen);
        let ticket = page.mount();
        page.run(ticket).await;
        let token = page.begin_bookmark("v1").unwrap();
        let ctx = page.context().clone();
        spawn_bookmark(ctx.bookmarks.clone(), token, &tx);
        screen.open_video(VideoPage::new(ctx, "v1", true));

        let action = rx.recv().await.unwrap();
        let update = run_action(action, &mut screen, &tx);

        assert!(matches!(update, Update::Bookmark(Err(_))));
        let View::Video(video) = &screen.view else {
            panic!("expected the video page");
        };
        assert!(video.bookmarked(), "video flag untouched");
        let stashed = screen.stashed_search.as_ref().unwrap();
        assert!(!stashed.view().results.unwrap().items[0].bookmarked);
    }

    #[tokio::test]
    async fn search_finishing_under_an_open_video_is_shown_on_return() {
        let transport = MockTransport::new()
            .with_script_results("hello", vec![script_hit("h1", "00:01", "hello")], Some(1))
            .with_script_results("world", vec![script_hit("w1", "00:02", "world")], Some(1))
            .with_delay("world", Duration::from_millis(30));
        let (_, mut screen) = search_screen("/search?q=hello", &transport);
        let (tx, mut rx) = channel();

        let page = search_page(&mut screen);
        let ticket = page.mount();
        page.run(ticket).await;
        let ticket = page.submit_query("world");
        dispatch_search(page, ticket, &tx);
        let ctx = page.context().clone();
        screen.open_video(VideoPage::new(ctx, "h1", false));

        let action = rx.recv().await.unwrap();
        assert_eq!(run_action(action, &mut screen, &tx), Update::Offscreen);

        let stashed = screen.stashed_search.as_ref().unwrap();
        assert_eq!(*stashed.view().status, crate::orchestrator::SearchStatus::Success);
        assert_eq!(stashed.view().results.unwrap().query.text, "world");
    }

    #[tokio::test]
    async fn back_navigation_reaches_the_page_through_the_queue() {
        let transport = MockTransport::new()
            .with_script_results("a", vec![script_hit("a1", "00:01", "a")], Some(1))
            .with_script_results("b", vec![script_hit("b1", "00:01", "b")], Some(1));
        let (router, mut screen) = search_screen("/search?q=a", &transport);
        let (tx, mut rx) = channel();
        forward_location_changes(router.as_ref(), &tx);

        let page = search_page(&mut screen);
        let ticket = page.mount();
        page.run(ticket).await;
        let ticket = page.submit_query("b");
        page.run(ticket).await;

        router.back();
        let action = rx.recv().await.unwrap();
        assert_eq!(run_action(action, &mut screen, &tx), Update::SearchIssued);

        let action = rx.recv().await.unwrap();
        assert_eq!(
            run_action(action, &mut screen, &tx),
            Update::Search(Applied::Displayed)
        );
        assert_eq!(
            search_page(&mut screen).view().results.unwrap().query.text,
            "a"
        );
    }

    #[tokio::test]
    async fn video_loads_arrive_through_the_queue() {
        let transport = MockTransport::new()
            .with_video(video_details("v1", true))
            .with_transcript(
                "v1",
                vec![TranscriptLine {
                    time_offset: "00:00".to_string(),
                    text: "hi".to_string(),
                }],
            );
        let (_, ctx) = context("/video/v1?t=00:00", &transport);
        let mut screen = Screen::new(View::Video(VideoPage::new(ctx.clone(), "v1", false)));
        let (tx, mut rx) = channel();

        spawn_video_loads(ctx.videos.clone(), "v1".to_string(), &tx);
        for _ in 0..3 {
            let action = rx.recv().await.unwrap();
            assert_ne!(run_action(action, &mut screen, &tx), Update::Ignored);
        }

        let View::Video(page) = &screen.view else {
            panic!("expected the video page");
        };
        assert!(page.bookmarked());
        assert_eq!(page.highlighted().unwrap().id, "m0");
    }

    #[tokio::test]
    async fn transcript_for_another_video_is_ignored() {
        let transport = MockTransport::new();
        let (_, ctx) = context("/video/v2", &transport);
        let mut screen = Screen::new(View::Video(VideoPage::new(ctx, "v2", false)));
        let (tx, _rx) = channel();

        let update = run_action(
            Action::TranscriptLoaded {
                video_id: "v1".to_string(),
                outcome: Ok(Vec::new()),
            },
            &mut screen,
            &tx,
        );
        assert_eq!(update, Update::Ignored);
    }
}
