use clap::{Parser, Subcommand};
use scriptseek::SearchMode;

#[derive(Debug, Parser)]
#[command(name = "scriptseek")]
#[command(about = "Search video transcripts and metadata from the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one search against the API server and print the page
    Search {
        query: String,
        /// Search spoken text (script) or video metadata (video)
        #[arg(long, short, default_value_t = SearchMode::Script)]
        mode: SearchMode,
        #[arg(long, short, default_value_t = 1)]
        page: u32,
    },
    /// Print a video's transcript, highlighting the marker at --at
    Video {
        id: String,
        /// Timestamp to deep-link to, e.g. 01:30
        #[arg(long)]
        at: Option<String>,
    },
    /// Toggle the bookmark of a video
    Bookmark { id: String },
    /// Interactive session against the API server
    Shell {
        /// Initial query
        #[arg(long, short)]
        query: Option<String>,
        #[arg(long, short, default_value_t = SearchMode::Script)]
        mode: SearchMode,
    },
    /// Interactive session against local in-memory data
    Dev,
    /// Remove the local session
    Logout,
    /// Print config path and create default file if missing
    ConfigPath,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_defaults_to_script_mode_page_one() {
        let cli = Cli::try_parse_from(["scriptseek", "search", "hello world"]).unwrap();
        match cli.command {
            Commands::Search { query, mode, page } => {
                assert_eq!(query, "hello world");
                assert_eq!(mode, SearchMode::Script);
                assert_eq!(page, 1);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn mode_parses_case_insensitively() {
        let cli =
            Cli::try_parse_from(["scriptseek", "search", "rust", "--mode", "Video", "-p", "2"])
                .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Search {
                mode: SearchMode::Video,
                page: 2,
                ..
            }
        ));
        assert!(Cli::try_parse_from(["scriptseek", "search", "rust", "--mode", "audio"]).is_err());
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
