//! Search-and-navigation core for a video transcript search client.
//!
//! The crate keeps the query, the result pages, bookmark flags and the
//! playback deep link consistent while the user types, pages, switches tabs
//! and navigates history. Network, address bar, session and scrolling are
//! reached through the collaborator traits in [`transport`], [`router`],
//! [`session`] and [`viewport`].

pub mod bookmark;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod pages;
pub mod playback;
pub mod query;
pub mod router;
pub mod runtime;
pub mod session;
pub mod transport;
pub mod types;
pub mod viewport;

pub use config::ScriptseekConfig;
pub use context::AppContext;
pub use error::{Error, Result, TransportError};
pub use types::{
    QueryState, ResultDetail, ResultPage, ScriptMatch, SearchMode, SearchResult,
    TranscriptMarker, VideoDetails, VideoMeta, PAGE_SIZE, RELATED_LIMIT,
};
