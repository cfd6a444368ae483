mod cli;
mod render;
mod shell;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use scriptseek::pages::{SearchPage, VideoPage};
use scriptseek::router::{MemoryRouter, NavigateOptions, Router};
use scriptseek::session::{SessionContext, SessionStore};
use scriptseek::transport::DevBackend;
use scriptseek::{AppContext, Error, ScriptseekConfig, SearchMode};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const TOKEN_ENV: &str = "SCRIPTSEEK_TOKEN";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Search { query, mode, page } => {
            let router = search_router(&query, mode, Some(page))?;
            let ctx = http_context(router)?;
            let mut search = SearchPage::new(ctx);
            let ticket = search.mount();
            search.run(ticket).await;

            if let Some(error) = search.view().error {
                anyhow::bail!("{error}");
            }
            render::search_page(&search);
        }
        Commands::Video { id, at } => {
            let router = Arc::new(MemoryRouter::new(&format!("/video/{id}"))?);
            if let Some(at) = at {
                router.set_param("t", &at, NavigateOptions::REPLACE);
            }
            let ctx = http_context(router)?;
            let page = VideoPage::mount(ctx, id, false).await;
            if let Some(error) = page.error() {
                anyhow::bail!("{error}");
            }
            render::video_page(&page);
        }
        Commands::Bookmark { id } => {
            let router = Arc::new(MemoryRouter::new(&format!("/video/{id}"))?);
            let ctx = http_context(router)?;
            let mut page = VideoPage::new(ctx, id.clone(), false);
            page.load_details().await;
            if let Some(error) = page.error() {
                anyhow::bail!("{error}");
            }
            match page.toggle_bookmark().await {
                Ok(true) => println!("Bookmarked {id}."),
                Ok(false) => println!("Removed bookmark from {id}."),
                Err(Error::AuthRequired) => anyhow::bail!(
                    "Not signed in. Set {TOKEN_ENV} or write a token to the session file."
                ),
                Err(e) => return Err(e).context("Failed to toggle bookmark"),
            }
        }
        Commands::Shell { query, mode } => {
            let router = search_router(query.as_deref().unwrap_or_default(), mode, None)?;
            let ctx = http_context(router.clone())?;
            shell::run(ctx, router).await?;
        }
        Commands::Dev => {
            let config = ScriptseekConfig::load()?;
            let router = search_router("", SearchMode::default(), None)?;
            let ctx = AppContext::with_backend(
                DevBackend::new(),
                Arc::new(SessionContext::with_token("dev")),
                router.clone(),
                Arc::new(render::TerminalViewport),
            )
            .with_min_confidence(config.min_confidence);
            shell::run(ctx, router).await?;
        }
        Commands::Logout => {
            let store = SessionStore::default_location()?;
            SessionContext::load(store)?.logout()?;
            println!("Logged out. Session cleared.");
        }
        Commands::ConfigPath => {
            let path = ScriptseekConfig::ensure_default_file()?;
            println!("{}", path.display());
        }
    }

    Ok(())
}

/// A `/search` address carrying the given query.
fn search_router(query: &str, mode: SearchMode, page: Option<u32>) -> Result<Arc<MemoryRouter>> {
    let router = Arc::new(MemoryRouter::new("/search")?);
    if !query.is_empty() {
        let mode = mode.to_string();
        let page = page.unwrap_or(1).to_string();
        router.set_params(
            &[("q", query), ("type", mode.as_str()), ("page", page.as_str())],
            NavigateOptions::REPLACE,
        );
    }
    Ok(router)
}

fn load_session() -> Result<SessionContext> {
    if let Ok(token) = std::env::var(TOKEN_ENV) {
        if !token.trim().is_empty() {
            return Ok(SessionContext::with_token(token.trim()));
        }
    }
    SessionContext::load(SessionStore::default_location()?).context("Failed to load session")
}

fn http_context(router: Arc<MemoryRouter>) -> Result<AppContext> {
    let config = ScriptseekConfig::load()?;
    tracing::debug!(api_url = %config.api_url, "using API server");
    let session = Arc::new(load_session()?);
    AppContext::http(&config, session, router, Arc::new(render::TerminalViewport))
}
