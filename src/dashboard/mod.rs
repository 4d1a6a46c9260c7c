//! Dashboard module
//!
//! Derives the dashboard figures from a list of transactions: totals,
//! spending by category, and the standing against the monthly budget.

mod aggregation;
mod summary;

pub use aggregation::{
    BudgetStatus, Totals, available_months, category_breakdown, remaining_budget, totals,
    validate_new_budget,
};
pub use summary::{MonthlySummary, summarize};
