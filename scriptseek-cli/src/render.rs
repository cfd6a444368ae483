use scriptseek::orchestrator::SearchStatus;
use scriptseek::pages::{DetailsState, SearchPage, TranscriptState, VideoPage};
use scriptseek::playback::format_offset;
use scriptseek::viewport::Viewport;
use scriptseek::{ResultDetail, SearchResult};
use std::io::Write;

/// Page changes start from a cleared screen.
pub struct TerminalViewport;

impl Viewport for TerminalViewport {
    fn scroll_to_top(&self) {
        print!("\x1b[2J\x1b[H");
        let _ = std::io::stdout().flush();
    }
}

pub fn search_page(page: &SearchPage) {
    let query = page.query();
    let view = page.view();

    if let Some(error) = view.error {
        println!("! {error} (type `dismiss` to clear)");
    }
    if *view.status == SearchStatus::Searching {
        println!("Searching {} for \"{}\"...", query.mode, query.text);
    }

    let Some(results) = view.results else {
        if query.is_blank() {
            println!("Type `search <words>` to start.");
        }
        return;
    };

    if results.query != *query {
        println!(
            "(showing {} results for \"{}\", page {})",
            results.query.mode,
            results.query.text,
            results.query.page()
        );
    }
    println!(
        "{} {} results for \"{}\"",
        results.total_count, results.query.mode, results.query.text
    );
    for (index, item) in results.items.iter().enumerate() {
        println!("{:>3}. {}", index + 1, result_line(item));
    }

    if let Some(pagination) = page.pagination().filter(|p| p.shows_controls()) {
        println!("page {} of {}", query.page(), pagination.page_count());
    }
}

pub fn result_line(item: &SearchResult) -> String {
    let star = if item.bookmarked { "*" } else { " " };
    match &item.detail {
        ResultDetail::Script(m) => {
            let (before, matched, after) = m.highlight();
            format!(
                "{star} [{}] {} ({}): {before}[{matched}]{after}",
                m.timestamp, item.title, item.id
            )
        }
        ResultDetail::Video(meta) => format!(
            "{star} {} ({}) by {}, {} views, {}, uploaded {}",
            item.title, item.id, meta.channel, meta.view_count, meta.duration, item.upload_date
        ),
    }
}

pub fn video_page(page: &VideoPage) {
    let star = if page.bookmarked() { " *" } else { "" };
    match page.details() {
        DetailsState::Loading => println!("Video {}{star}", page.video_id()),
        DetailsState::Failed(error) => println!("Video {}{star}\n! {error}", page.video_id()),
        DetailsState::Ready(details) => {
            println!("{}{star}", details.title);
            println!(
                "{} | {} views | {} | uploaded {}",
                details.channel, details.view_count, details.duration, details.upload_date
            );
            println!("{}", details.description);
        }
    }

    match page.transcript() {
        TranscriptState::Loading => println!("Loading transcript..."),
        TranscriptState::Failed(error) => println!("! {error}"),
        TranscriptState::Ready(_) => {
            let highlighted = page.highlighted().map(|marker| marker.id.as_str());
            for marker in page.markers() {
                let cursor = if Some(marker.id.as_str()) == highlighted {
                    ">"
                } else {
                    " "
                };
                println!(
                    "{cursor} {:>4} {} {}",
                    marker.id, marker.time_offset, marker.text
                );
            }
            if let Some(seconds) = page.seek_seconds() {
                println!("playing from {}", format_offset(seconds));
            }
        }
    }

    if !page.related().is_empty() {
        println!("related:");
        for (index, item) in page.related().iter().enumerate() {
            println!("{:>3}. {}", index + 1, result_line(item));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptseek::transport::mock::{script_hit, video_hit};

    #[test]
    fn script_line_brackets_the_match() {
        let mut hit = script_hit("v1", "01:30", "hello");
        hit.bookmarked = true;
        assert_eq!(
            result_line(&hit),
            "* [01:30] Video v1 (v1): ... [hello] ..."
        );
    }

    #[test]
    fn video_line_lists_metadata() {
        let line = result_line(&video_hit("v2"));
        assert!(line.contains("by Test Channel"));
        assert!(line.contains("100 views"));
    }
}
