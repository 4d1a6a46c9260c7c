//! The figures shown on the dashboard for one month.

use std::fmt::{Display, Write};

use crate::{
    Error,
    format::format_currency,
    month::YearMonth,
    transaction::Transaction,
};

use super::aggregation::{BudgetStatus, Totals, category_breakdown, remaining_budget, totals};

/// A month's totals, spending by category and standing against the budget.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySummary {
    /// The month summarized.
    pub month: YearMonth,
    /// Income and expense in the month.
    pub totals: Totals,
    /// Expense per category, in first-seen order.
    pub breakdown: Vec<(String, f64)>,
    /// The budget for the month, if one is set.
    pub budget: Option<f64>,
}

impl MonthlySummary {
    /// The budget left after the month's expenses.
    pub fn remaining(&self) -> Option<f64> {
        self.budget
            .map(|budget| remaining_budget(budget, self.totals.expense))
    }

    /// Whether the month is under, at, or over budget.
    pub fn status(&self) -> Option<BudgetStatus> {
        self.remaining().map(BudgetStatus::from_remaining)
    }
}

/// Summarize the transactions in `transactions` that fall in `month`.
///
/// Transactions from other months are skipped, so the full listing can be
/// passed in.
///
/// # Errors
/// Returns [Error::InvalidAmount] if a transaction in the month has a
/// negative or non-finite amount.
pub fn summarize(
    transactions: &[Transaction],
    month: YearMonth,
    budget: Option<f64>,
) -> Result<MonthlySummary, Error> {
    let in_month: Vec<Transaction> = transactions
        .iter()
        .filter(|transaction| month.contains(transaction.date))
        .cloned()
        .collect();

    Ok(MonthlySummary {
        month,
        totals: totals(&in_month)?,
        breakdown: category_breakdown(&in_month)?,
        budget,
    })
}

impl Display for MonthlySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut text = String::new();

        writeln!(text, "{}", self.month.long_name())?;
        writeln!(text, "  Income:   {}", format_currency(self.totals.income))?;
        writeln!(text, "  Expenses: {}", format_currency(self.totals.expense))?;
        writeln!(text, "  Balance:  {}", format_currency(self.totals.balance()))?;

        match (self.budget, self.remaining(), self.status()) {
            (Some(budget), Some(remaining), Some(status)) => {
                writeln!(text, "  Budget:   {}", format_currency(budget))?;
                writeln!(
                    text,
                    "  Left:     {} ({})",
                    format_currency(remaining),
                    status.label()
                )?;
            }
            _ => writeln!(text, "  Budget:   not set")?,
        }

        if !self.breakdown.is_empty() {
            writeln!(text)?;
            writeln!(text, "Expenses by category")?;
            for (category, amount) in &self.breakdown {
                writeln!(text, "  {category:<15} {}", format_currency(*amount))?;
            }
        }

        f.write_str(text.trim_end())
    }
}
