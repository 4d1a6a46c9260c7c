//! Tally is a client for tracking personal income, expenses and a monthly
//! budget against the Tally REST backend.
//!
//! This library provides:
//! - an API client that attaches the stored access token to each request and
//!   silently refreshes it once when it has expired,
//! - a session controller for logging in and out and registering,
//! - the transaction and budget services,
//! - the aggregations behind the dashboard, and CSV export.

#![warn(missing_docs)]

mod api_client;
mod auth;
mod budget;
mod config;
mod csv;
mod dashboard;
mod endpoints;
mod error;
mod format;
mod logging;
mod month;
mod timezone;
mod token_store;
mod transaction;
mod user;

#[cfg(test)]
mod test_utils;

pub use api_client::{ApiClient, ApiRequest, RefreshedTokens};
pub use auth::{
    AuthState, Credentials, LoginResponse, MIN_PASSWORD_LENGTH, RegistrationForm, Session,
    SessionController,
};
pub use budget::{MonthlyBudget, get_budget, set_budget};
pub use config::{Config, DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT, default_token_path};
pub use crate::csv::{export_filename, write_transactions_csv};
pub use dashboard::{
    BudgetStatus, MonthlySummary, Totals, available_months, category_breakdown, remaining_budget,
    summarize, totals, validate_new_budget,
};
pub use error::{Error, ValidationError};
pub use format::{CURRENCY_SYMBOL, format_currency};
pub use logging::{LOG_BODY_LENGTH_LIMIT, redact_secrets, setup_logging};
pub use month::YearMonth;
pub use timezone::{DEFAULT_TIMEZONE, current_month, today};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenKind, TokenPair, TokenStore};
pub use transaction::{
    ALL, CATEGORIES, DEFAULT_CATEGORY, DeleteReport, INCOME_CATEGORY, NewTransaction, Transaction,
    TransactionFilter, TransactionId, TransactionType, create_transaction, delete_transaction,
    delete_transactions, get_transaction, get_transactions, update_transaction,
};
pub use user::{User, UserID};
