//! Transaction aggregation for the dashboard figures.
//!
//! Provides functions to total transactions by type, group expenses by
//! category, compare spending against a budget, and list the months that
//! have transactions.

use std::collections::BTreeSet;

use crate::{
    Error, ValidationError,
    month::YearMonth,
    transaction::{Transaction, TransactionType},
};

/// Total income and expense of a set of transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    /// The sum of all income amounts.
    pub income: f64,
    /// The sum of all expense amounts.
    pub expense: f64,
}

impl Totals {
    /// Income minus expense.
    pub fn balance(&self) -> f64 {
        self.income - self.expense
    }
}

/// Where spending stands relative to the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetStatus {
    /// Some of the budget is left.
    Under,
    /// Exactly all of the budget was spent.
    At,
    /// More than the budget was spent.
    Over,
}

impl BudgetStatus {
    /// Classify the output of [remaining_budget].
    pub fn from_remaining(remaining: f64) -> Self {
        if remaining > 0.0 {
            BudgetStatus::Under
        } else if remaining < 0.0 {
            BudgetStatus::Over
        } else {
            BudgetStatus::At
        }
    }

    /// A short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            BudgetStatus::Under => "under budget",
            BudgetStatus::At => "at budget",
            BudgetStatus::Over => "over budget",
        }
    }
}

/// Sums transaction amounts by type.
///
/// Transactions of types other than income and expense are ignored.
///
/// # Errors
/// Returns [Error::InvalidAmount] if any counted amount is negative or not a
/// finite number.
pub fn totals(transactions: &[Transaction]) -> Result<Totals, Error> {
    let mut totals = Totals::default();

    for transaction in transactions {
        match transaction.kind {
            TransactionType::Income => totals.income += checked_amount(transaction)?,
            TransactionType::Expense => totals.expense += checked_amount(transaction)?,
            TransactionType::Other(_) => {}
        }
    }

    Ok(totals)
}

/// Groups expenses by category and sums them.
///
/// # Returns
/// Vector of (category, total) pairs with categories in the order they first
/// appear in `transactions`.
///
/// # Errors
/// Returns [Error::InvalidAmount] if any expense amount is negative or not a
/// finite number.
pub fn category_breakdown(transactions: &[Transaction]) -> Result<Vec<(String, f64)>, Error> {
    let mut breakdown: Vec<(String, f64)> = Vec::new();

    for transaction in transactions
        .iter()
        .filter(|transaction| transaction.kind == TransactionType::Expense)
    {
        let amount = checked_amount(transaction)?;

        match breakdown
            .iter_mut()
            .find(|(category, _)| *category == transaction.category)
        {
            Some((_, total)) => *total += amount,
            None => breakdown.push((transaction.category.clone(), amount)),
        }
    }

    Ok(breakdown)
}

/// How much of `budget` is left after `total_expense`. Negative when over
/// budget.
pub fn remaining_budget(budget: f64, total_expense: f64) -> f64 {
    budget - total_expense
}

/// Check a budget amount before it is sent to the backend.
///
/// # Errors
/// - [ValidationError::InvalidAmount] if `amount` is negative or not a number,
/// - [ValidationError::ExceedsBalance] if `amount` is more than `remaining_balance`.
pub fn validate_new_budget(amount: f64, remaining_balance: f64) -> Result<(), ValidationError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(ValidationError::InvalidAmount(amount));
    }

    if amount > remaining_balance {
        return Err(ValidationError::ExceedsBalance {
            amount,
            remaining_balance,
        });
    }

    Ok(())
}

/// Extracts the distinct months of `transactions`, newest first.
pub fn available_months(transactions: &[Transaction]) -> Vec<YearMonth> {
    let months: BTreeSet<YearMonth> = transactions
        .iter()
        .map(|transaction| YearMonth::from_date(transaction.date))
        .collect();

    months.into_iter().rev().collect()
}

fn checked_amount(transaction: &Transaction) -> Result<f64, Error> {
    let amount = transaction.amount;

    if amount.is_finite() && amount >= 0.0 {
        Ok(amount)
    } else {
        tracing::error!(
            "transaction {} has an invalid amount: {amount}",
            transaction.id
        );
        Err(Error::InvalidAmount(amount))
    }
}
