//! Backend calls for reading and changing transactions.

use crate::{
    Error,
    api_client::{ApiClient, ApiRequest},
    endpoints::{self, format_endpoint},
};

use super::{
    core::{NewTransaction, Transaction, TransactionId},
    query::TransactionFilter,
};

/// Get the user's transactions that pass `filter`.
///
/// The filter is sent to the backend and applied again to the response, so
/// the result honours it even if the backend ignores a parameter.
///
/// # Errors
///
/// Returns any error of [ApiClient::send], or [Error::InvalidResponse] if a
/// transaction does not decode, e.g. because its amount is not a number.
pub async fn get_transactions(
    filter: &TransactionFilter,
    client: &ApiClient,
) -> Result<Vec<Transaction>, Error> {
    let request = filter.apply(ApiRequest::get(endpoints::TRANSACTIONS));
    let mut transactions: Vec<Transaction> = client.send_json(request).await?;
    transactions.retain(|transaction| filter.matches(transaction));

    Ok(transactions)
}

/// Get a single transaction.
///
/// # Errors
///
/// Returns [Error::Server] with status 404 if there is no such transaction,
/// or any other error of [ApiClient::send].
pub async fn get_transaction(id: TransactionId, client: &ApiClient) -> Result<Transaction, Error> {
    client
        .send_json(ApiRequest::get(format_endpoint(endpoints::TRANSACTION, id)))
        .await
}

/// Create a transaction and return it as stored by the backend.
///
/// # Errors
///
/// Returns [Error::Validation] without sending anything if `new` is invalid,
/// otherwise any error of [ApiClient::send].
pub async fn create_transaction(
    new: &NewTransaction,
    client: &ApiClient,
) -> Result<Transaction, Error> {
    new.validate()?;

    let request = ApiRequest::post(endpoints::NEW_TRANSACTION).json(new)?;
    let transaction: Transaction = client.send_json(request).await?;
    tracing::info!("created transaction {}", transaction.id);

    Ok(transaction)
}

/// Replace all fields of the transaction `id`.
///
/// # Errors
///
/// Returns [Error::Validation] without sending anything if `update` is
/// invalid, otherwise any error of [ApiClient::send].
pub async fn update_transaction(
    id: TransactionId,
    update: &NewTransaction,
    client: &ApiClient,
) -> Result<Transaction, Error> {
    update.validate()?;

    let request =
        ApiRequest::put(format_endpoint(endpoints::UPDATE_TRANSACTION, id)).json(update)?;
    let transaction = client.send_json(request).await?;
    tracing::info!("updated transaction {id}");

    Ok(transaction)
}

/// Delete the transaction `id`.
///
/// # Errors
///
/// Returns any error of [ApiClient::send].
pub async fn delete_transaction(id: TransactionId, client: &ApiClient) -> Result<(), Error> {
    client
        .send(ApiRequest::delete(format_endpoint(
            endpoints::DELETE_TRANSACTION,
            id,
        )))
        .await?;
    tracing::info!("deleted transaction {id}");

    Ok(())
}

/// The outcome of deleting several transactions.
#[derive(Debug, Default, PartialEq)]
pub struct DeleteReport {
    /// The transactions that were deleted.
    pub deleted: Vec<TransactionId>,
    /// The transactions that could not be deleted and why.
    pub failed: Vec<(TransactionId, Error)>,
}

impl DeleteReport {
    /// Whether every transaction was deleted.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Delete each transaction in `ids`, one after another.
///
/// A failure does not stop the remaining deletions.
pub async fn delete_transactions(ids: &[TransactionId], client: &ApiClient) -> DeleteReport {
    let mut report = DeleteReport::default();

    for &id in ids {
        match delete_transaction(id, client).await {
            Ok(()) => report.deleted.push(id),
            Err(error) => {
                tracing::error!("failed to delete transaction {id}: {error}");
                report.failed.push((id, error));
            }
        }
    }

    report
}
