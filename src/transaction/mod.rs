//! Transactions: the expenses and incomes the dashboard is built from.
//!
//! This module contains:
//! - The `Transaction` model and `NewTransaction` for creating and editing one
//! - `TransactionFilter` for narrowing a listing by type, category and month
//! - The backend calls for listing, creating, updating and deleting transactions

mod api;
mod core;
mod query;

pub use api::{
    DeleteReport, create_transaction, delete_transaction, delete_transactions, get_transaction,
    get_transactions, update_transaction,
};
pub use core::{
    CATEGORIES, DEFAULT_CATEGORY, INCOME_CATEGORY, NewTransaction, Transaction, TransactionId,
    TransactionType,
};
pub use query::{ALL, TransactionFilter};

pub(crate) use core::{amount_format, date_format};
