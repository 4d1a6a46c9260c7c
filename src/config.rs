//! Runtime configuration: where the backend is, where tokens are kept, and
//! which timezone decides the current month.

use std::{path::PathBuf, sync::Arc, time::Duration};

use directories::BaseDirs;
use url::Url;

use crate::{
    Error,
    api_client::ApiClient,
    timezone::get_local_offset,
    token_store::{FileTokenStore, MemoryTokenStore, TokenStore},
};

/// The backend address used when none is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/";

/// How long to wait for a response before giving up.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The settings the client runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// The base URL of the backend.
    pub api_url: Url,
    /// The file tokens are persisted to. `None` keeps them in memory only.
    pub token_path: Option<PathBuf>,
    /// The canonical timezone name, e.g. "Asia/Manila".
    pub timezone: String,
    /// How long to wait for each response.
    pub request_timeout: Duration,
}

impl Config {
    /// Create a config, checking that the URL and timezone are usable.
    ///
    /// # Errors
    ///
    /// - [Error::InvalidUrl] if `api_url` does not parse or is not HTTP(S),
    /// - [Error::InvalidTimezone] if `timezone` is not a canonical timezone name.
    pub fn new(
        api_url: &str,
        token_path: Option<PathBuf>,
        timezone: &str,
        request_timeout: Duration,
    ) -> Result<Self, Error> {
        let api_url = Url::parse(api_url).map_err(|_| Error::InvalidUrl(api_url.to_owned()))?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl(api_url.to_string()));
        }

        if get_local_offset(timezone).is_none() {
            return Err(Error::InvalidTimezone(timezone.to_owned()));
        }

        Ok(Self {
            api_url,
            token_path,
            timezone: timezone.to_owned(),
            request_timeout,
        })
    }

    /// Build the token store the config asks for.
    pub fn token_store(&self) -> Arc<dyn TokenStore> {
        match &self.token_path {
            Some(path) => Arc::new(FileTokenStore::new(path.clone())),
            None => {
                tracing::warn!(
                    "no token file available, the session will not outlive this process"
                );
                Arc::new(MemoryTokenStore::new())
            }
        }
    }

    /// Build an API client with a fresh token store.
    ///
    /// # Errors
    ///
    /// See [ApiClient::new].
    pub fn api_client(&self) -> Result<ApiClient, Error> {
        ApiClient::new(self.api_url.clone(), self.token_store(), self.request_timeout)
    }
}

/// `<config dir>/tally/tokens.json`, or `None` if the platform has no home
/// directory.
pub fn default_token_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.config_dir().join("tally").join("tokens.json"))
}
