//! The backend endpoint paths.
//!
//! Paths are relative to the configured API base URL, so they carry no
//! leading slash. For endpoints that take an ID, e.g. 'transactions/{id}/',
//! use [format_endpoint].

/// Exchange an email and password for a token pair and the user profile.
pub const LOG_IN: &str = "auth/login";
/// Create a new account.
pub const REGISTER: &str = "auth/register";
/// Invalidate a refresh token.
pub const LOG_OUT: &str = "auth/logout";
/// Exchange a refresh token for a new access token.
pub const REFRESH: &str = "auth/refresh";
/// The profile of the user that owns the access token.
pub const CURRENT_USER: &str = "auth/user";

/// List the user's transactions, optionally filtered by query parameters.
pub const TRANSACTIONS: &str = "transactions/";
/// A single transaction.
pub const TRANSACTION: &str = "transactions/{transaction_id}/";
/// Create a transaction.
pub const NEW_TRANSACTION: &str = "transactions/new/";
/// Replace the fields of a transaction.
pub const UPDATE_TRANSACTION: &str = "transactions/update/{transaction_id}/";
/// Delete a transaction.
pub const DELETE_TRANSACTION: &str = "transactions/delete/{transaction_id}/";

/// The budget for the current month, or the month given in the query.
pub const BUDGET: &str = "transactions/budgets/";
/// Create the budget for a month, or update it if it already exists.
pub const NEW_BUDGET: &str = "transactions/budgets/new/";

/// Replace the first `{...}` parameter in `endpoint_path` with `id`.
///
/// If `endpoint_path` has no parameter it is returned unchanged.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let end = endpoint_path[start..]
        .find('}')
        .map(|offset| start + offset + 1)
        .unwrap_or(endpoint_path.len());

    format!("{}{id}{}", &endpoint_path[..start], &endpoint_path[end..])
}
