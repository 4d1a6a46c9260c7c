//! Filters for listing transactions.

use crate::{ValidationError, api_client::ApiRequest, month::YearMonth};

use super::core::{Transaction, TransactionType};

/// The value filter inputs use to mean "no filter".
pub const ALL: &str = "All";

/// Narrow a transaction listing by type, category and month.
///
/// Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    /// Only transactions of this type.
    pub kind: Option<TransactionType>,
    /// Only transactions in this category.
    pub category: Option<String>,
    /// Only transactions dated in this month.
    pub month: Option<YearMonth>,
}

impl TransactionFilter {
    /// Build a filter from raw user input, where [ALL] or an empty string
    /// means no filter for that field.
    ///
    /// # Errors
    ///
    /// Returns a [ValidationError] if the type or month is not recognised.
    pub fn parse(
        kind: Option<&str>,
        category: Option<&str>,
        month: Option<&str>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            kind: selected(kind)
                .map(str::parse::<TransactionType>)
                .transpose()?,
            category: selected(category).map(str::to_owned),
            month: selected(month)
                .map(str::parse::<YearMonth>)
                .transpose()?,
        })
    }

    /// Whether `transaction` passes the filter.
    pub fn matches(&self, transaction: &Transaction) -> bool {
        self.kind.as_ref().is_none_or(|kind| &transaction.kind == kind)
            && self
                .category
                .as_deref()
                .is_none_or(|category| transaction.category == category)
            && self.month.is_none_or(|month| month.contains(transaction.date))
    }

    /// Add the filter's query parameters to `request`.
    pub(crate) fn apply(&self, mut request: ApiRequest) -> ApiRequest {
        if let Some(kind) = &self.kind {
            request = request.query("type", kind.to_string());
        }
        if let Some(category) = &self.category {
            request = request.query("category", category.as_str());
        }
        if let Some(month) = self.month {
            request = request.query("month", month.to_string());
        }
        request
    }
}

fn selected(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case(ALL))
}
