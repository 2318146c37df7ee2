use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::{CommitReceipt, RecordKey, Snapshot, StoreClient, StoreError, Write};

/// What a transaction wants to commit, plus the value handed back on success.
#[derive(Debug, Clone, PartialEq)]
pub struct TxPlan<T> {
    pub value: T,
    pub writes: Vec<Write>,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransactionError<E> {
    /// The decide step refused to commit.
    #[error("{0}")]
    Aborted(E),
    #[error("Transaction gave up after {attempts} conflicting attempts")]
    Conflict { attempts: u32 },
    #[error("Store failure: {0}")]
    Store(StoreError),
}

impl StoreClient {
    /// Runs an optimistic read-decide-commit transaction.
    ///
    /// Each attempt reads `keys` as one snapshot, calls `decide` on it, and
    /// commits the returned writes guarded by the versions it read. When
    /// another writer touched any of those records in between, the attempt is
    /// discarded and retried against a fresh snapshot, up to `max_attempts`
    /// times. `decide` may run several times and must not have side effects.
    ///
    /// # Errors
    /// - [`TransactionError::Aborted`] when `decide` rejects the snapshot
    /// - [`TransactionError::Conflict`] when every attempt hit a conflict
    /// - [`TransactionError::Store`] for any other store failure
    ///
    /// No write is applied in any error case.
    #[instrument(skip(self, decide), fields(keys = keys.len()))]
    pub async fn run_transaction<T, E, F>(
        &self,
        keys: Vec<RecordKey>,
        max_attempts: u32,
        mut decide: F,
    ) -> Result<(T, CommitReceipt), TransactionError<E>>
    where
        F: FnMut(&Snapshot) -> Result<TxPlan<T>, E>,
    {
        let attempts = max_attempts.max(1);
        for attempt in 1..=attempts {
            let snapshot = self
                .read_snapshot(keys.clone())
                .await
                .map_err(TransactionError::Store)?;
            let plan = decide(&snapshot).map_err(TransactionError::Aborted)?;

            match self.commit(snapshot.read_versions(), plan.writes).await {
                Ok(receipt) => {
                    debug!(attempt, "Transaction committed");
                    return Ok((plan.value, receipt));
                }
                Err(StoreError::Conflict(key)) => {
                    debug!(attempt, key = %key, "Write conflict, retrying");
                }
                Err(e) => return Err(TransactionError::Store(e)),
            }
        }

        warn!(attempts, "Transaction abandoned after repeated conflicts");
        Err(TransactionError::Conflict { attempts })
    }
}
