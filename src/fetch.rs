//! Loading template bodies referenced by `src`

use std::collections::HashMap;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from fetching a template body
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("request failed: {0}")]
    Http(String),

    #[error("no template source registered for {src}")]
    NotFound { src: String },
}

/// Resolves a `src` value to markup
pub trait Fetcher {
    fn fetch(&self, src: &str) -> Result<String, FetchError>;
}

/// Reads files, relative to an optional base directory
#[derive(Debug, Default, Clone)]
pub struct FsFetcher {
    base_path: Option<PathBuf>,
}

impl FsFetcher {
    pub fn with_base_path(base_path: PathBuf) -> Self {
        Self {
            base_path: Some(base_path),
        }
    }

    pub fn base_path(&self) -> Option<&PathBuf> {
        self.base_path.as_ref()
    }

    pub fn resolve_path(&self, relative: &str) -> PathBuf {
        match &self.base_path {
            Some(base) => base.join(relative),
            None => PathBuf::from(relative),
        }
    }
}

impl Fetcher for FsFetcher {
    fn fetch(&self, src: &str) -> Result<String, FetchError> {
        let path = self.resolve_path(src);
        tracing::debug!(path = %path.display(), "reading template source");
        std::fs::read_to_string(&path).map_err(|source| FetchError::Io { path, source })
    }
}

/// Fixed set of sources, for tests and embedding
#[derive(Debug, Default, Clone)]
pub struct MemoryFetcher {
    sources: HashMap<String, String>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, src: impl Into<String>, markup: impl Into<String>) -> Self {
        self.insert(src, markup);
        self
    }

    pub fn insert(&mut self, src: impl Into<String>, markup: impl Into<String>) {
        self.sources.insert(src.into(), markup.into());
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch(&self, src: &str) -> Result<String, FetchError> {
        self.sources
            .get(src)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                src: src.to_string(),
            })
    }
}

/// Fetches `http://` and `https://` sources, everything else from disk
#[cfg(feature = "http")]
pub struct HttpFetcher {
    agent: ureq::Agent,
    files: FsFetcher,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    pub fn new(timeout: std::time::Duration, files: FsFetcher) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self { agent, files }
    }
}

#[cfg(feature = "http")]
impl Fetcher for HttpFetcher {
    fn fetch(&self, src: &str) -> Result<String, FetchError> {
        if !(src.starts_with("http://") || src.starts_with("https://")) {
            return self.files.fetch(src);
        }
        tracing::debug!(url = %src, "fetching template source");
        let response = self
            .agent
            .get(src)
            .call()
            .map_err(|e| FetchError::Http(e.to_string()))?;
        response
            .into_body()
            .read_to_string()
            .map_err(|e| FetchError::Http(e.to_string()))
    }
}
