//! Address-bar collaborator.
//!
//! The core never touches a URL directly: it reads and writes query
//! parameters through [`Router`] and listens for external address changes
//! (back, forward, a pasted link) through [`Router::subscribe`].

use std::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use url::Url;

const ORIGIN: &str = "http://localhost";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigateOptions {
    /// Overwrite the current history entry instead of pushing a new one.
    pub replace_history: bool,
}

impl NavigateOptions {
    pub const PUSH: Self = Self {
        replace_history: false,
    };
    pub const REPLACE: Self = Self {
        replace_history: true,
    };
}

/// Emitted when the address changes from outside the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationChanged {
    pub location: String,
}

pub trait Router: Send + Sync {
    /// Current path plus query string, e.g. `/search?q=hello`.
    fn location(&self) -> String;

    fn get_param(&self, name: &str) -> Option<String>;

    fn set_param(&self, name: &str, value: &str, opts: NavigateOptions);

    /// Navigate to another view. Not reported to subscribers.
    fn push(&self, path: &str);

    /// Receives a notification for every external address change.
    fn subscribe(&self) -> UnboundedReceiver<LocationChanged>;

    /// Writes several params as one navigation: the first write honours
    /// `opts`, the rest replace the entry it produced.
    fn set_params(&self, params: &[(&str, &str)], opts: NavigateOptions) {
        for (i, (name, value)) in params.iter().enumerate() {
            let opts = if i == 0 { opts } else { NavigateOptions::REPLACE };
            self.set_param(name, value, opts);
        }
    }
}

#[derive(Debug)]
struct History {
    entries: Vec<Url>,
    index: usize,
}

impl History {
    fn current(&self) -> &Url {
        &self.entries[self.index]
    }

    fn push(&mut self, url: Url) {
        self.entries.truncate(self.index + 1);
        self.entries.push(url);
        self.index = self.entries.len() - 1;
    }

    fn replace(&mut self, url: Url) {
        self.entries[self.index] = url;
    }
}

/// In-memory router with a browser-like history stack.
///
/// Used by the CLI shell and by tests in place of a real address bar.
#[derive(Debug)]
pub struct MemoryRouter {
    history: Mutex<History>,
    listeners: Mutex<Vec<UnboundedSender<LocationChanged>>>,
}

impl MemoryRouter {
    pub fn new(initial: &str) -> Result<Self, url::ParseError> {
        let url = resolve(initial)?;
        Ok(Self {
            history: Mutex::new(History {
                entries: vec![url],
                index: 0,
            }),
            listeners: Mutex::new(Vec::new()),
        })
    }

    /// External navigation, as if the user pasted a link.
    pub fn open(&self, location: &str) -> Result<(), url::ParseError> {
        let url = resolve(location)?;
        self.history.lock().expect("router lock poisoned").push(url);
        self.notify();
        Ok(())
    }

    /// Browser back button. Returns false at the start of history.
    pub fn back(&self) -> bool {
        {
            let mut history = self.history.lock().expect("router lock poisoned");
            if history.index == 0 {
                return false;
            }
            history.index -= 1;
        }
        self.notify();
        true
    }

    /// Browser forward button. Returns false at the end of history.
    pub fn forward(&self) -> bool {
        {
            let mut history = self.history.lock().expect("router lock poisoned");
            if history.index + 1 >= history.entries.len() {
                return false;
            }
            history.index += 1;
        }
        self.notify();
        true
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().expect("router lock poisoned").entries.len()
    }

    pub fn path(&self) -> String {
        self.history
            .lock()
            .expect("router lock poisoned")
            .current()
            .path()
            .to_string()
    }

    fn notify(&self) {
        let event = LocationChanged {
            location: self.location(),
        };
        self.listeners
            .lock()
            .expect("router listeners lock poisoned")
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl Router for MemoryRouter {
    fn location(&self) -> String {
        let history = self.history.lock().expect("router lock poisoned");
        let url = history.current();
        match url.query() {
            Some(query) if !query.is_empty() => format!("{}?{}", url.path(), query),
            _ => url.path().to_string(),
        }
    }

    fn get_param(&self, name: &str) -> Option<String> {
        self.history
            .lock()
            .expect("router lock poisoned")
            .current()
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    fn set_param(&self, name: &str, value: &str, opts: NavigateOptions) {
        let mut history = self.history.lock().expect("router lock poisoned");
        let mut url = history.current().clone();

        let mut pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != name)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        pairs.push((name.to_string(), value.to_string()));
        url.query_pairs_mut().clear().extend_pairs(pairs);

        if opts.replace_history {
            history.replace(url);
        } else {
            history.push(url);
        }
    }

    fn push(&self, path: &str) {
        match resolve(path) {
            Ok(url) => self.history.lock().expect("router lock poisoned").push(url),
            Err(e) => tracing::warn!(path, error = %e, "ignoring navigation to invalid path"),
        }
    }

    fn subscribe(&self) -> UnboundedReceiver<LocationChanged> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners
            .lock()
            .expect("router listeners lock poisoned")
            .push(tx);
        rx
    }
}

fn resolve(location: &str) -> Result<Url, url::ParseError> {
    Url::parse(ORIGIN)?.join(location)
}
