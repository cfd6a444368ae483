use anyhow::Result;
use scriptseek::orchestrator::{Applied, SearchTicket};
use scriptseek::pages::{SearchPage, VideoPage, LOGIN_PATH};
use scriptseek::router::{MemoryRouter, Router};
use scriptseek::runtime::{
    channel, dispatch_search, forward_location_changes, run_action, spawn_bookmark,
    spawn_video_loads, ActionTx, Screen, Update, View,
};
use scriptseek::{AppContext, Error, SearchMode, SearchResult};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::render;

const HELP: &str = "\
commands:
  search <words>     search (alias: s)
  mode script|video  switch tab
  page <n>, next, prev
  open <n>           open the n-th result, or the n-th related video
  mark <id|n>        jump to a transcript marker
  bm [n]             toggle bookmark of the n-th result, or of the open video
  back, forward      history navigation
  go <location>      open a link, e.g. /video/abc?t=01:30
  dismiss            clear the error
  show, help, quit";

struct Shell {
    ctx: AppContext,
    router: Arc<MemoryRouter>,
    screen: Screen,
    tx: ActionTx,
}

pub async fn run(ctx: AppContext, router: Arc<MemoryRouter>) -> Result<()> {
    let (tx, mut rx) = channel();
    forward_location_changes(router.as_ref(), &tx);

    let mut shell = Shell::new(ctx, router, tx);
    println!("{HELP}");
    shell.mount();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt();
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !shell.handle_line(line.trim()) {
                    break;
                }
            }
            Some(action) = rx.recv() => {
                let update = run_action(action, &mut shell.screen, &shell.tx);
                shell.after_update(update);
            }
        }
    }

    Ok(())
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

impl Shell {
    fn new(ctx: AppContext, router: Arc<MemoryRouter>, tx: ActionTx) -> Self {
        Self {
            screen: Screen::new(View::Search(SearchPage::new(ctx.clone()))),
            ctx,
            router,
            tx,
        }
    }

    /// First render for whatever the address says.
    fn mount(&mut self) {
        if VideoPage::video_id_from_path(&self.router.path()).is_some() {
            self.mount_for_location();
        } else {
            self.with_search(SearchPage::mount);
        }
    }

    /// Returns false when the user asked to quit.
    fn handle_line(&mut self, line: &str) -> bool {
        let (command, rest) = line
            .split_once(char::is_whitespace)
            .map(|(c, r)| (c, r.trim()))
            .unwrap_or((line, ""));

        match command {
            "" => {}
            "q" | "quit" | "exit" => return false,
            "help" | "?" => println!("{HELP}"),
            "show" | "ls" => self.render(),
            "s" | "search" => self.with_search(|page| page.submit_query(rest)),
            "mode" | "tab" => match rest.parse::<SearchMode>() {
                Ok(mode) => self.with_search(|page| page.set_mode(mode)),
                Err(_) => println!("unknown mode `{rest}`, expected script or video"),
            },
            "page" | "p" => match rest.parse::<u32>() {
                Ok(n) => self.change_page(n),
                Err(_) => println!("expected a page number"),
            },
            "next" | "n" => self.step_page(1),
            "prev" => self.step_page(-1),
            "open" | "o" => self.open_result(rest),
            "mark" | "m" => self.select_marker(rest),
            "bm" | "bookmark" => self.bookmark(rest),
            "back" | "b" => {
                if self.router.back() {
                    self.mount_for_location();
                }
            }
            "forward" | "f" => {
                if self.router.forward() {
                    self.mount_for_location();
                }
            }
            "go" => match self.router.open(rest) {
                Ok(()) => self.mount_for_location(),
                Err(e) => println!("invalid location: {e}"),
            },
            "dismiss" | "d" => {
                if let View::Search(page) = &mut self.screen.view {
                    page.dismiss_error();
                }
                self.render();
            }
            other => println!("unknown command `{other}`, type `help`"),
        }
        true
    }

    fn with_search(&mut self, handler: impl FnOnce(&mut SearchPage) -> Option<SearchTicket>) {
        let View::Search(page) = &mut self.screen.view else {
            println!("go `back` to the results first");
            return;
        };
        let ticket = handler(page);
        dispatch_search(page, ticket, &self.tx);
        self.render();
    }

    fn change_page(&mut self, n: u32) {
        let View::Search(page) = &mut self.screen.view else {
            println!("go `back` to the results first");
            return;
        };
        let ticket = page.change_page(n);
        if ticket.is_none() {
            if page.query().page() != n {
                println!("page {n} is out of range");
            }
            return;
        }
        dispatch_search(page, ticket, &self.tx);
        self.render();
    }

    fn step_page(&mut self, delta: i64) {
        let View::Search(page) = &self.screen.view else {
            println!("go `back` to the results first");
            return;
        };
        let target = i64::from(page.query().page()) + delta;
        match u32::try_from(target) {
            Ok(n) if n >= 1 => self.change_page(n),
            _ => println!("already on the first page"),
        }
    }

    fn open_result(&mut self, rest: &str) {
        let item = match &self.screen.view {
            View::Search(page) => nth_result(page, rest),
            View::Video(page) => nth_item(page.related(), rest),
        };
        let Some(item) = item else {
            println!("no result `{rest}` on this page");
            return;
        };
        let (id, path, bookmarked) = (item.id.clone(), item.watch_path(), item.bookmarked);

        self.router.push(&path);
        self.show_video(id, bookmarked);
    }

    fn select_marker(&mut self, rest: &str) {
        let View::Video(page) = &mut self.screen.view else {
            println!("open a video first");
            return;
        };
        let marker_id = if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
            format!("m{rest}")
        } else {
            rest.to_string()
        };
        if page.select_marker(&marker_id) {
            self.render();
        } else {
            println!("no marker `{rest}`");
        }
    }

    fn bookmark(&mut self, rest: &str) {
        let begun = match &mut self.screen.view {
            View::Search(page) => {
                let Some(id) = nth_result(page, rest).map(|item| item.id.clone()) else {
                    println!("no result `{rest}` on this page");
                    return;
                };
                page.begin_bookmark(&id)
            }
            View::Video(page) => page.begin_bookmark(),
        };

        match begun {
            Ok(token) => {
                spawn_bookmark(self.ctx.bookmarks.clone(), token, &self.tx);
                self.render();
            }
            Err(Error::AuthRequired) => {
                println!("{}", Error::AuthRequired);
                println!("Set SCRIPTSEEK_TOKEN or write a token to the session file.");
                // The page redirected to the login view; come back from it.
                if self.router.path() == LOGIN_PATH {
                    self.router.back();
                }
            }
            Err(e) => println!("! {e}"),
        }
    }

    /// Swaps the mounted page when the address now points at another view.
    fn mount_for_location(&mut self) {
        let path = self.router.path();
        match (VideoPage::video_id_from_path(&path), &self.screen.view) {
            (Some(id), View::Video(page)) if page.video_id() == id => self.render(),
            (Some(id), View::Search(page)) => {
                let bookmarked = page
                    .view()
                    .results
                    .and_then(|results| results.items.iter().find(|item| item.id == id))
                    .is_some_and(|item| item.bookmarked);
                self.show_video(id.to_string(), bookmarked);
            }
            (Some(id), View::Video(_)) => self.show_video(id.to_string(), false),
            (None, View::Search(_)) => self.with_search(SearchPage::on_location_changed),
            (None, View::Video(_)) => {
                let ticket;
                let page = match self.screen.stashed_search.take() {
                    Some(mut page) => {
                        ticket = page.on_location_changed();
                        page
                    }
                    None => {
                        let mut page = SearchPage::new(self.ctx.clone());
                        ticket = page.mount();
                        page
                    }
                };
                dispatch_search(&page, ticket, &self.tx);
                self.screen.view = View::Search(page);
                self.render();
            }
        }
    }

    fn show_video(&mut self, video_id: String, bookmarked: bool) {
        let page = VideoPage::new(self.ctx.clone(), video_id.clone(), bookmarked);
        spawn_video_loads(self.ctx.videos.clone(), video_id, &self.tx);
        self.screen.open_video(page);
        self.render();
    }

    fn after_update(&mut self, update: Update) {
        match update {
            Update::Search(Applied::Discarded) | Update::Offscreen | Update::Ignored => {}
            Update::Bookmark(Ok(true)) => println!("bookmarked"),
            Update::Bookmark(Ok(false)) => println!("bookmark removed"),
            Update::Bookmark(Err(e)) => println!("! bookmark reverted: {e}"),
            Update::Search(_)
            | Update::SearchIssued
            | Update::Details
            | Update::Transcript
            | Update::Related
            | Update::Playback => self.render(),
        }
    }

    fn render(&self) {
        match &self.screen.view {
            View::Search(page) => render::search_page(page),
            View::Video(page) => render::video_page(page),
        }
    }
}

/// The 1-based `n`-th item of the displayed page.
fn nth_result<'a>(page: &'a SearchPage, n: &str) -> Option<&'a SearchResult> {
    nth_item(&page.view().results?.items, n)
}

fn nth_item<'a>(items: &'a [SearchResult], n: &str) -> Option<&'a SearchResult> {
    let index = n.parse::<usize>().ok()?.checked_sub(1)?;
    items.get(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptseek::orchestrator::SearchStatus;
    use scriptseek::runtime::ActionRx;
    use scriptseek::session::SessionContext;
    use scriptseek::transport::mock::{script_hit, video_details, MockTransport};
    use scriptseek::transport::DevBackend;
    use scriptseek::viewport::RecordingViewport;
    use scriptseek::TransportError;
    use std::time::Duration;

    fn shell_with<B>(location: &str, backend: B) -> (Shell, ActionRx)
    where
        B: scriptseek::transport::SearchTransport
            + scriptseek::transport::BookmarkTransport
            + scriptseek::transport::VideoTransport
            + 'static,
    {
        let router = Arc::new(MemoryRouter::new(location).unwrap());
        let ctx = AppContext::with_backend(
            backend,
            Arc::new(SessionContext::with_token("dev")),
            router.clone(),
            Arc::new(RecordingViewport::new()),
        );
        let (tx, rx) = channel();
        (Shell::new(ctx, router, tx), rx)
    }

    fn dev_shell(location: &str) -> (Shell, ActionRx) {
        shell_with(location, DevBackend::new())
    }

    async fn drain(shell: &mut Shell, rx: &mut ActionRx, count: usize) {
        for _ in 0..count {
            let action = rx.recv().await.unwrap();
            let update = run_action(action, &mut shell.screen, &shell.tx);
            shell.after_update(update);
        }
    }

    fn search_page(shell: &Shell) -> &SearchPage {
        match &shell.screen.view {
            View::Search(page) => page,
            View::Video(_) => panic!("expected the search page"),
        }
    }

    fn video_page(shell: &Shell) -> &VideoPage {
        match &shell.screen.view {
            View::Video(page) => page,
            View::Search(_) => panic!("expected the video page"),
        }
    }

    #[tokio::test]
    async fn opening_a_result_and_going_back_keeps_the_results() {
        let (mut shell, mut rx) = dev_shell("/search?q=cargo");
        shell.mount();
        drain(&mut shell, &mut rx, 1).await;

        assert!(shell.handle_line("open 1"));
        assert_eq!(shell.router.path(), "/video/dev-video-1");
        drain(&mut shell, &mut rx, 3).await;
        let video = video_page(&shell);
        assert_eq!(video.highlighted().unwrap().time_offset, "01:29");
        assert!(!video.related().is_empty());

        assert!(shell.handle_line("back"));
        assert_eq!(search_page(&shell).view().results.unwrap().query.text, "cargo");
    }

    #[tokio::test]
    async fn failed_bookmark_started_on_results_rolls_back_after_opening_a_video() {
        let transport = MockTransport::new()
            .with_script_results("hello", vec![script_hit("v1", "00:01", "hello")], Some(1))
            .with_video(video_details("v1", false))
            .failing_bookmarks(TransportError::network("reset"));
        let (mut shell, mut rx) = shell_with("/search?q=hello", transport);
        shell.mount();
        drain(&mut shell, &mut rx, 1).await;

        assert!(shell.handle_line("bm 1"));
        assert!(shell.handle_line("open 1"));
        drain(&mut shell, &mut rx, 4).await;

        assert!(shell.handle_line("back"));
        assert!(!search_page(&shell).view().results.unwrap().items[0].bookmarked);
    }

    #[tokio::test]
    async fn search_answered_while_a_video_is_open_is_shown_after_back() {
        let transport = MockTransport::new()
            .with_script_results("hello", vec![script_hit("h1", "00:01", "hello")], Some(1))
            .with_script_results("world", vec![script_hit("w1", "00:02", "world")], Some(1))
            .with_video(video_details("h1", false))
            .with_delay("world", Duration::from_millis(30));
        let (mut shell, mut rx) = shell_with("/search?q=hello", transport);
        shell.mount();
        drain(&mut shell, &mut rx, 1).await;

        assert!(shell.handle_line("search world"));
        assert!(shell.handle_line("open 1"));
        drain(&mut shell, &mut rx, 4).await;

        assert!(shell.handle_line("back"));
        let view = search_page(&shell).view();
        assert_eq!(*view.status, SearchStatus::Success);
        assert_eq!(view.results.unwrap().query.text, "world");
    }

    #[test]
    fn nth_result_is_one_based() {
        let (shell, _rx) = dev_shell("/search");
        let page = search_page(&shell);
        assert!(nth_result(page, "0").is_none());
        assert!(nth_result(page, "1").is_none());
    }

    #[test]
    fn quit_ends_the_session() {
        let (mut shell, _rx) = dev_shell("/search");
        assert!(!shell.handle_line("quit"));
        assert!(shell.handle_line("help"));
    }
}
