//! Export transactions as CSV.

use std::io::Write;

use serde::Serialize;

use crate::{Error, month::YearMonth, transaction::Transaction, transaction::date_format};

/// The name of the file an export is saved as.
///
/// The name encodes the month filter, e.g. `transactions-2025-05.csv`, or
/// `transactions-all.csv` when no month is selected.
pub fn export_filename(month: Option<YearMonth>) -> String {
    match month {
        Some(month) => format!("transactions-{month}.csv"),
        None => "transactions-all.csv".to_owned(),
    }
}

#[derive(Serialize)]
struct ExportRow<'a> {
    #[serde(rename = "Date", with = "date_format")]
    date: time::Date,
    #[serde(rename = "Subject")]
    subject: &'a str,
    #[serde(rename = "Category")]
    category: &'a str,
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "Amount")]
    amount: f64,
    #[serde(rename = "Notes")]
    notes: &'a str,
}

impl<'a> From<&'a Transaction> for ExportRow<'a> {
    fn from(transaction: &'a Transaction) -> Self {
        Self {
            date: transaction.date,
            subject: &transaction.subject,
            category: &transaction.category,
            kind: transaction.kind.to_string(),
            amount: transaction.amount,
            notes: transaction.notes.as_deref().unwrap_or_default(),
        }
    }
}

/// Writes `transactions` to `writer` as CSV with a header row.
///
/// Columns are `Date, Subject, Category, Type, Amount, Notes`, with dates
/// as `YYYY-MM-DD`.
///
/// # Errors
///
/// Returns [Error::Csv] if a row could not be written, or [Error::Io] if
/// flushing `writer` failed.
pub fn write_transactions_csv<W: Write>(
    transactions: &[Transaction],
    writer: W,
) -> Result<(), Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    if transactions.is_empty() {
        csv_writer.write_record(["Date", "Subject", "Category", "Type", "Amount", "Notes"])?;
    }

    for transaction in transactions {
        csv_writer.serialize(ExportRow::from(transaction))?;
    }

    csv_writer.flush()?;
    tracing::debug!("wrote {} transactions as CSV", transactions.len());

    Ok(())
}
