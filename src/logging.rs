//! Logging setup and helpers for logging requests and responses.

use std::{fs::OpenOptions, path::Path, sync::Arc};

use serde_json::Value;
use tracing_subscriber::{EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::Error;

/// Bodies longer than this many bytes are truncated in `debug` level logs.
///
/// The full body is logged at the `trace` level.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// The JSON fields whose values never appear in logs.
const SECRET_FIELDS: [&str; 4] = ["password", "password_confirmation", "access", "refresh"];

const REDACTED: &str = "********";

/// Install the global tracing subscriber.
///
/// Logs go to stderr so they never mix with command output. The level comes
/// from `RUST_LOG` when set, otherwise `tally=info`, or `tally=debug` when
/// `verbose` is set. When `log_file` is given, everything at `debug` and
/// above is also appended to that file.
///
/// # Errors
///
/// Returns [Error::Io] if the log file cannot be opened.
pub fn setup_logging(verbose: bool, log_file: Option<&Path>) -> Result<(), Error> {
    let default_directive = if verbose { "tally=debug" } else { "tally=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let stderr_log = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(env_filter);

    let file_log = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .with_filter(filter::LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_log)
        .with(file_log)
        .init();

    Ok(())
}

/// Replace the values of secret fields in a JSON body, at any depth.
pub fn redact_secrets(body: &Value) -> Value {
    match body {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    let value = if SECRET_FIELDS.contains(&key.as_str()) {
                        Value::String(REDACTED.to_owned())
                    } else {
                        redact_secrets(value)
                    };
                    (key.clone(), value)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_secrets).collect()),
        other => other.clone(),
    }
}

/// Redact secrets from a response body that may or may not be JSON.
pub(crate) fn redact_text(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(json) => redact_secrets(&json).to_string(),
        Err(_) => body.to_owned(),
    }
}

pub(crate) fn log_request(method: &reqwest::Method, url: &url::Url, body: Option<&Value>) {
    let body_text = body
        .map(|body| redact_secrets(body).to_string())
        .unwrap_or_default();
    log_body(&format!("Sending {method} {url}"), &body_text);
}

pub(crate) fn log_response(status: reqwest::StatusCode, url: &url::Url, body: &str) {
    log_body(&format!("Received {status} from {url}"), &redact_text(body));
}

fn log_body(summary: &str, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        let cut = floor_char_boundary(body, LOG_BODY_LENGTH_LIMIT);
        tracing::debug!("{summary}\nbody: {}...", &body[..cut]);
        tracing::trace!("Full body: {body}");
    } else {
        tracing::debug!("{summary}\nbody: {body}");
    }
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    (0..=index.min(text.len()))
        .rev()
        .find(|&i| text.is_char_boundary(i))
        .unwrap_or(0)
}
