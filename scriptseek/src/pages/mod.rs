//! Page controllers composing the core state machines with their
//! collaborators.

mod search;
mod video;

pub use search::SearchPage;
pub use video::{DetailsState, TranscriptState, VideoPage};

pub const LOGIN_PATH: &str = "/login";
