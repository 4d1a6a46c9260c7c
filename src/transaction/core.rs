//! Defines the transaction models and how they map to the backend's JSON.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::Date;

use crate::ValidationError;

/// The backend's ID for a transaction.
pub type TransactionId = i64;

/// The categories the backend knows about.
pub const CATEGORIES: [&str; 5] = ["Food", "Transportation", "Entertainment", "Utilities", "Other"];

/// The category a new expense starts with.
pub const DEFAULT_CATEGORY: &str = "Food";

/// The category every income is filed under.
pub const INCOME_CATEGORY: &str = "Other";

/// Whether money came in or went out.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionType {
    /// Money earned.
    Income,
    /// Money spent.
    Expense,
    /// A type this client does not know. Ignored by the aggregations.
    Other(String),
}

impl From<String> for TransactionType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Income" => TransactionType::Income,
            "Expense" => TransactionType::Expense,
            _ => TransactionType::Other(value),
        }
    }
}

impl From<TransactionType> for String {
    fn from(value: TransactionType) -> Self {
        value.to_string()
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Income => f.write_str("Income"),
            TransactionType::Expense => f.write_str("Expense"),
            TransactionType::Other(name) => f.write_str(name),
        }
    }
}

/// Parses user input, which must be one of the two known types in any case.
impl FromStr for TransactionType {
    type Err = ValidationError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            _ => Err(ValidationError::InvalidTransactionType(text.to_owned())),
        }
    }
}

/// An expense or income as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// A short description of what the transaction was for.
    pub subject: String,
    /// When the transaction happened.
    #[serde(with = "date_format")]
    pub date: Date,
    /// How much money moved. Always a magnitude, see [Transaction::kind].
    #[serde(with = "amount_format")]
    pub amount: f64,
    /// The spending category, e.g. "Food".
    pub category: String,
    /// Whether the amount was earned or spent.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// The fields sent to the backend to create or replace a transaction.
///
/// Use [NewTransaction::build] to start one with the defaults of the new
/// transaction form: an expense in the "Food" category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTransaction {
    /// Whether the amount was earned or spent.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// The spending category.
    pub category: String,
    /// A short description.
    pub subject: String,
    /// How much money moved.
    #[serde(with = "amount_format")]
    pub amount: f64,
    /// When the transaction happened.
    #[serde(with = "date_format")]
    pub date: Date,
    /// Free-form notes, sent as an empty string when there are none.
    pub notes: String,
}

impl NewTransaction {
    /// Start a new expense.
    pub fn build(subject: &str, amount: f64, date: Date) -> Self {
        Self {
            kind: TransactionType::Expense,
            category: DEFAULT_CATEGORY.to_owned(),
            subject: subject.to_owned(),
            amount,
            date,
            notes: String::new(),
        }
    }

    /// Set the type. Incomes are always filed under [INCOME_CATEGORY].
    pub fn kind(mut self, kind: TransactionType) -> Self {
        if kind == TransactionType::Income {
            self.category = INCOME_CATEGORY.to_owned();
        }
        self.kind = kind;
        self
    }

    /// Set the category. Ignored for incomes, so set the type first.
    pub fn category(mut self, category: &str) -> Self {
        if self.kind != TransactionType::Income {
            self.category = category.to_owned();
        }
        self
    }

    /// Set the notes.
    pub fn notes(mut self, notes: &str) -> Self {
        self.notes = notes.to_owned();
        self
    }

    /// Check the fields before anything is sent.
    ///
    /// # Errors
    ///
    /// - [ValidationError::InvalidAmount] if the amount is negative or not a number,
    /// - [ValidationError::EmptyField] if the subject or category is blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(ValidationError::InvalidAmount(self.amount));
        }

        if self.subject.trim().is_empty() {
            return Err(ValidationError::EmptyField("subject"));
        }

        if self.category.trim().is_empty() {
            return Err(ValidationError::EmptyField("category"));
        }

        Ok(())
    }
}

impl From<&Transaction> for NewTransaction {
    fn from(transaction: &Transaction) -> Self {
        Self {
            kind: transaction.kind.clone(),
            category: transaction.category.clone(),
            subject: transaction.subject.clone(),
            amount: transaction.amount,
            date: transaction.date,
            notes: transaction.notes.clone().unwrap_or_default(),
        }
    }
}

pub(crate) mod date_format {
    //! Dates go out as `YYYY-MM-DD`. Coming in, a full ISO-8601 date-time is
    //! also accepted and cut down to its date.
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

    pub(crate) const DATE_FORMAT: &[BorrowedFormatItem] =
        format_description!("[year]-[month]-[day]");

    /// Parse the date at the start of `text`.
    pub(crate) fn parse(text: &str) -> Result<Date, time::error::Parse> {
        let date_part = text.trim().get(..10).unwrap_or(text);
        Date::parse(date_part, DATE_FORMAT)
    }

    pub fn serialize<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = date
            .format(DATE_FORMAT)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        parse(&text).map_err(|error| {
            serde::de::Error::custom(format!("invalid date \"{text}\": {error}"))
        })
    }
}

pub(crate) mod amount_format {
    //! Amounts may arrive as JSON numbers or as decimal strings such as
    //! `"100.00"`. Anything that is not a finite number is rejected instead of
    //! being read as zero.
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAmount {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S>(amount: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(*amount)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let amount = match RawAmount::deserialize(deserializer)
            .map_err(|_| serde::de::Error::custom("amount must be a number or a numeric string"))?
        {
            RawAmount::Number(number) => number,
            RawAmount::Text(text) => text.trim().parse::<f64>().map_err(|_| {
                serde::de::Error::custom(format!("amount \"{text}\" is not a number"))
            })?,
        };

        if amount.is_finite() {
            Ok(amount)
        } else {
            Err(serde::de::Error::custom(format!(
                "amount {amount} is not a finite number"
            )))
        }
    }
}
