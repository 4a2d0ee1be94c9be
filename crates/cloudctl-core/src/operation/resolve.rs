//! Decoding the resource produced by a completed operation

use serde::de::DeserializeOwned;

use super::{Clock, Operation, OperationHandle, OperationStatus, Poller, StatusFetcher};
use crate::error::{CoreError, Result};

/// Decode the payload of a succeeded operation into `T`.
///
/// A failed record yields [`CoreError::OperationFailed`], an unfinished one
/// [`CoreError::NotTerminal`], and a payload that does not match `T`
/// [`CoreError::Decode`].
pub fn resolve<T: DeserializeOwned>(operation: &Operation) -> Result<T> {
    match operation.status() {
        OperationStatus::Succeeded(payload) => {
            serde_json::from_value(payload.clone()).map_err(|source| CoreError::Decode {
                operation_id: operation.operation_id.clone(),
                source,
            })
        }
        OperationStatus::Failed(cause) => Err(CoreError::OperationFailed {
            operation_id: operation.operation_id.clone(),
            cause,
        }),
        OperationStatus::Pending => Err(CoreError::NotTerminal {
            operation_id: operation.operation_id.clone(),
        }),
    }
}

/// Await an operation and decode the resource it produced
pub async fn await_and_resolve<T, F, C>(
    poller: &Poller<C>,
    handle: &OperationHandle,
    fetcher: &F,
) -> Result<T>
where
    T: DeserializeOwned,
    F: StatusFetcher + ?Sized,
    C: Clock,
{
    let operation = poller.await_operation(handle, fetcher).await?;
    resolve(&operation)
}
