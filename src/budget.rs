//! Monthly budgets: one spending ceiling per user per month.

use serde::{Deserialize, Serialize};

use crate::{
    Error,
    api_client::{ApiClient, ApiRequest},
    dashboard::validate_new_budget,
    endpoints,
    month::YearMonth,
    transaction::amount_format,
};

/// A user's spending ceiling for a month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBudget {
    /// The most the user wants to spend in the month.
    #[serde(with = "amount_format")]
    pub amount: f64,
    /// The month the budget applies to.
    #[serde(with = "first_day_format")]
    pub month: YearMonth,
}

/// Get the budget for `month`, or for the backend's current month if `month`
/// is `None`.
///
/// Returns `Ok(None)` if no budget has been set for the month.
///
/// # Errors
///
/// Returns any error of [ApiClient::send] other than a 404.
pub async fn get_budget(
    month: Option<YearMonth>,
    client: &ApiClient,
) -> Result<Option<MonthlyBudget>, Error> {
    let mut request = ApiRequest::get(endpoints::BUDGET);
    if let Some(month) = month {
        request = request.query("month", month.to_string());
    }

    match client.send_json::<Option<MonthlyBudget>>(request).await {
        Ok(budget) => Ok(budget),
        Err(Error::Server { status: 404, .. }) => Ok(None),
        Err(error) => Err(error),
    }
}

/// Set the budget for `month`, replacing any budget already set for it.
///
/// `remaining_balance` is the user's income minus expenses, which the budget
/// may not exceed.
///
/// # Errors
///
/// Returns [Error::Validation] without sending anything if the amount is
/// negative or exceeds `remaining_balance`, otherwise any error of
/// [ApiClient::send].
pub async fn set_budget(
    amount: f64,
    month: YearMonth,
    remaining_balance: f64,
    client: &ApiClient,
) -> Result<MonthlyBudget, Error> {
    validate_new_budget(amount, remaining_balance)?;

    let budget = MonthlyBudget { amount, month };
    let request = ApiRequest::post(endpoints::NEW_BUDGET).json(&budget)?;
    let saved = client.send_json(request).await?;
    tracing::info!("set the budget for {month} to {amount}");

    Ok(saved)
}

mod first_day_format {
    //! Months go out as `YYYY-MM-01` and come in as `YYYY-MM` or `YYYY-MM-DD`.
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::month::YearMonth;

    pub fn serialize<S>(month: &YearMonth, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&month.to_first_day_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<YearMonth, D::Error>
    where
        D: Deserializer<'de>,
    {
        YearMonth::deserialize(deserializer)
    }
}
