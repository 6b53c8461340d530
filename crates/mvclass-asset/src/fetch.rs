/*!
Make sure an artifact is available on local disk before it is loaded.
*/

use anyhow::{Context, Result};
use mvclass_core::Error;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Where an artifact lives, and where to get it from if it isn't there.
#[derive(Debug, Clone)]
pub struct ArtifactSource {
    pub path: PathBuf,
    pub url: Option<String>,

    /// Total number of download attempts, including the first one.
    pub max_attempts: u32,

    /// Attempt `n` waits `n * backoff` before retrying.
    pub backoff: Duration,
}

impl ArtifactSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            url: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }

    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Return the local path of the artifact, downloading it first when
    /// it is missing and a URL is configured.
    ///
    /// # Errors
    ///
    /// [`Error::ModelUnavailable`] when the file is missing and can't be
    /// downloaded.
    pub fn ensure_local(&self) -> Result<PathBuf, Error> {
        if self.path.exists() {
            log::debug!("using local artifact {:?}", self.path);
            return Ok(self.path.clone());
        }

        let url = self.url.as_deref().ok_or_else(|| {
            Error::ModelUnavailable(format!(
                "{:?} does not exist and no download URL is configured",
                self.path
            ))
        })?;

        let attempts = self.max_attempts.max(1);
        let mut last_error = None;
        for attempt in 1..=attempts {
            log::info!(
                "fetching artifact from {} into {:?} (attempt {}/{})",
                url,
                self.path,
                attempt,
                attempts
            );

            match download(url, &self.path) {
                Ok(bytes) => {
                    log::info!("fetched {} bytes into {:?}", bytes, self.path);
                    return Ok(self.path.clone());
                }
                Err(e) => {
                    log::warn!("fetching {} failed: {:#}", url, e);
                    last_error = Some(e);
                    if attempt < attempts {
                        std::thread::sleep(self.backoff * attempt);
                    }
                }
            }
        }

        Err(Error::ModelUnavailable(format!(
            "failed fetching {} after {} attempts: {:#}",
            url,
            attempts,
            last_error.unwrap_or_else(|| anyhow::anyhow!("no attempts made"))
        )))
    }
}

fn download(url: &str, path: &Path) -> Result<u64> {
    let client = reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()?;

    let mut response = client.get(url).send()?.error_for_status()?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).with_context(|| format!("creating {:?}", dir))?;

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    let bytes = response.copy_to(&mut file)?;
    file.persist(path)
        .with_context(|| format!("persisting artifact to {:?}", path))?;

    Ok(bytes)
}
