#![allow(missing_docs)]

pub(crate) mod backend;

use std::{sync::Arc, time::Duration};

use crate::{api_client::ApiClient, token_store::{MemoryTokenStore, TokenStore}};

pub(crate) use backend::{MockBackend, VALID_PASSWORD};

/// A client for `backend` holding a freshly issued token pair in memory.
pub(crate) fn logged_in_client(backend: &MockBackend) -> ApiClient {
    let tokens = Arc::new(MemoryTokenStore::new());
    tokens.set_pair(&backend.state.issue_tokens());

    ApiClient::new(backend.base_url.clone(), tokens, Duration::from_secs(5))
        .expect("could not create API client")
}
