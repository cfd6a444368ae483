//! Optimistic bookmark toggling with rollback.
//!
//! A toggle is two-phase: [`apply_optimistic`] flips the local flag and hands
//! back an [`UndoToken`]; once the server answers, the token is either
//! [confirmed](UndoToken::confirm) or [rolled back](UndoToken::rollback).
//! Rapid double toggles are not coalesced: each one flips the flag and
//! issues its own remote call.

use std::sync::Arc;

use crate::error::{Error, Result, TransportError};
use crate::session::AuthOracle;
use crate::transport::BookmarkTransport;
use crate::types::QueryState;

/// Where a bookmark flag lives, precise enough to detect that the state it
/// pointed at has since been replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagSlot {
    /// An item on the cached page fetched for this exact query.
    ResultPage(QueryState),
    /// The bookmark flag of the video page for this video id.
    Video(String),
}

/// State holding bookmark flags that the toggler may flip.
pub trait BookmarkTarget {
    /// Every slot currently holding `item_id`, with its flag.
    fn find_flags(&self, item_id: &str) -> Vec<(FlagSlot, bool)>;

    /// Writes the flag if `slot` still refers to live state.
    fn write_flag(&mut self, item_id: &str, slot: &FlagSlot, value: bool) -> bool;
}

/// Proof of an optimistic flip, carrying the pre-toggle values.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "an optimistic toggle must be confirmed or rolled back"]
pub struct UndoToken {
    item_id: String,
    value: bool,
    previous: Vec<(FlagSlot, bool)>,
}

impl UndoToken {
    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    /// True when the flip was made on a video page's own flag rather than on
    /// cached result lists.
    pub fn flips_video_page(&self) -> bool {
        self.previous
            .iter()
            .any(|(slot, _)| matches!(slot, FlagSlot::Video(_)))
    }

    /// The flag value applied optimistically.
    pub fn value(&self) -> bool {
        self.value
    }

    /// The server accepted the toggle. Returns the flag value now shown.
    pub fn confirm(self) -> bool {
        tracing::debug!(item_id = %self.item_id, bookmarked = self.value, "bookmark confirmed");
        self.value
    }

    /// Restores every flag this token flipped to its pre-toggle value.
    /// Slots whose page has been replaced since are left alone. Returns the
    /// number of slots restored.
    pub fn rollback<T: BookmarkTarget + ?Sized>(self, target: &mut T) -> usize {
        let restored = self
            .previous
            .iter()
            .filter(|(slot, previous)| target.write_flag(&self.item_id, slot, *previous))
            .count();
        tracing::warn!(item_id = %self.item_id, restored, "bookmark rolled back");
        restored
    }
}

/// Flips the flag of `item_id` everywhere `target` holds it.
///
/// The new value is the negation of the first slot's current value, so every
/// copy of the item ends up agreeing. Returns `None` if nothing holds the item.
pub fn apply_optimistic<T: BookmarkTarget + ?Sized>(
    target: &mut T,
    item_id: &str,
) -> Option<UndoToken> {
    let previous = target.find_flags(item_id);
    let value = !previous.first()?.1;
    for (slot, _) in &previous {
        target.write_flag(item_id, slot, value);
    }
    tracing::debug!(item_id, bookmarked = value, "bookmark applied optimistically");
    Some(UndoToken {
        item_id: item_id.to_string(),
        value,
        previous,
    })
}

/// Gatekeeper for bookmark toggles: checks the session, applies the flip and
/// talks to the bookmark transport.
#[derive(Clone)]
pub struct BookmarkToggler {
    auth: Arc<dyn AuthOracle>,
    transport: Arc<dyn BookmarkTransport>,
}

impl BookmarkToggler {
    pub fn new(auth: Arc<dyn AuthOracle>, transport: Arc<dyn BookmarkTransport>) -> Self {
        Self { auth, transport }
    }

    pub fn transport(&self) -> Arc<dyn BookmarkTransport> {
        self.transport.clone()
    }

    /// First phase. Fails with [`Error::AuthRequired`] before touching any
    /// state when there is no session.
    pub fn begin<T: BookmarkTarget + ?Sized>(
        &self,
        target: &mut T,
        item_id: &str,
    ) -> Result<UndoToken> {
        if !self.auth.is_authenticated() {
            return Err(Error::AuthRequired);
        }
        apply_optimistic(target, item_id).ok_or_else(|| Error::UnknownItem(item_id.to_string()))
    }

    /// Second phase. Confirms on success; on failure rolls back and reports
    /// the transport error.
    pub fn finish<T: BookmarkTarget + ?Sized>(
        &self,
        target: &mut T,
        token: UndoToken,
        outcome: std::result::Result<(), TransportError>,
    ) -> Result<bool> {
        match outcome {
            Ok(()) => Ok(token.confirm()),
            Err(e) => {
                tracing::warn!(item_id = %token.item_id(), error = %e, "bookmark toggle failed");
                token.rollback(target);
                Err(Error::TransportFailure(e))
            }
        }
    }

    /// Both phases back to back. Returns the flag value now shown.
    pub async fn toggle<T: BookmarkTarget + ?Sized>(
        &self,
        target: &mut T,
        item_id: &str,
    ) -> Result<bool> {
        let token = self.begin(target, item_id)?;
        let outcome = self.transport.toggle_bookmark(item_id).await;
        self.finish(target, token, outcome)
    }
}
