use std::sync::Arc;

use crate::config::ScriptseekConfig;
use crate::router::Router;
use crate::session::{AuthOracle, SessionContext};
use crate::transport::{ApiClient, BookmarkTransport, SearchTransport, VideoTransport};
use crate::types::DEFAULT_MIN_CONFIDENCE;
use crate::viewport::Viewport;

/// Collaborators shared by the page controllers.
#[derive(Clone)]
pub struct AppContext {
    pub search: Arc<dyn SearchTransport>,
    pub bookmarks: Arc<dyn BookmarkTransport>,
    pub videos: Arc<dyn VideoTransport>,
    pub auth: Arc<dyn AuthOracle>,
    pub router: Arc<dyn Router>,
    pub viewport: Arc<dyn Viewport>,
    pub min_confidence: f32,
}

impl AppContext {
    /// Context backed by the HTTP API described by `config`.
    pub fn http(
        config: &ScriptseekConfig,
        session: Arc<SessionContext>,
        router: Arc<dyn Router>,
        viewport: Arc<dyn Viewport>,
    ) -> anyhow::Result<Self> {
        let client = Arc::new(ApiClient::new(&config.api_url, session.clone())?);
        Ok(Self {
            search: client.clone(),
            bookmarks: client.clone(),
            videos: client,
            auth: session,
            router,
            viewport,
            min_confidence: config.min_confidence,
        })
    }

    /// Context where one backend serves every transport role.
    pub fn with_backend<B>(
        backend: B,
        auth: Arc<dyn AuthOracle>,
        router: Arc<dyn Router>,
        viewport: Arc<dyn Viewport>,
    ) -> Self
    where
        B: SearchTransport + BookmarkTransport + VideoTransport + 'static,
    {
        let backend = Arc::new(backend);
        Self {
            search: backend.clone(),
            bookmarks: backend.clone(),
            videos: backend,
            auth,
            router,
            viewport,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }

    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }
}
