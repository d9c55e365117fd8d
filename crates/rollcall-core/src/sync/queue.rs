//! Durable FIFO of mutations waiting for connectivity.

use chrono::Utc;

use crate::models::{NewPendingOperation, PendingOperation};
use crate::services::LocalStore;
use crate::{Error, Result};

/// Applies one queued operation against the remote sheet.
#[allow(async_fn_in_trait)]
pub trait OperationProcessor {
    async fn process(&mut self, operation: &PendingOperation) -> Result<()>;
}

/// Result of one pass over the queue
#[derive(Debug)]
pub struct QueueRun {
    /// Operations confirmed and removed during this pass
    pub applied: usize,
    /// Retryable failure that ended the pass early, if any
    pub interrupted_by: Option<Error>,
}

/// Sole owner of enumeration and deletion of pending operations.
#[derive(Clone)]
pub struct OfflineQueue {
    store: LocalStore,
}

impl OfflineQueue {
    pub const fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Append an operation, stamping it with the current time when it carries
    /// no creation time. Returns the assigned id.
    pub async fn add_to_queue(&self, operation: NewPendingOperation) -> Result<i64> {
        let created_at = operation
            .created_at
            .unwrap_or_else(|| Utc::now().timestamp_millis());
        let id = self
            .store
            .insert_pending_operation(&operation, created_at)
            .await?;
        tracing::warn!(
            "Queued {} for participant {} as operation {}",
            operation.kind,
            operation.payload.participant_id,
            id
        );
        Ok(id)
    }

    /// Pending operations in creation order.
    pub async fn queued_operations(&self) -> Result<Vec<PendingOperation>> {
        self.store.list_pending_operations().await
    }

    pub async fn len(&self) -> Result<u64> {
        self.store.count_pending_operations().await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Drop an operation that can never apply. Returns whether it existed.
    pub async fn discard(&self, id: i64) -> Result<bool> {
        let removed = self.store.delete_pending_operation(id).await?;
        if removed {
            tracing::info!("Discarded queued operation {}", id);
        }
        Ok(removed)
    }

    /// Replay queued operations oldest first.
    ///
    /// Each confirmed operation is deleted before the next one runs. A
    /// retryable failure ends the pass and leaves that operation and every
    /// later one queued. Any other failure is returned and the queue is left
    /// as it stands.
    pub async fn process_queue<P: OperationProcessor>(&self, processor: &mut P) -> Result<QueueRun> {
        let queued = self.queued_operations().await?;
        let mut applied = 0;

        for operation in &queued {
            match processor.process(operation).await {
                Ok(()) => {
                    self.store.delete_pending_operation(operation.id).await?;
                    applied += 1;
                    tracing::info!(
                        "Replayed {} for participant {} (operation {})",
                        operation.kind,
                        operation.payload.participant_id,
                        operation.id
                    );
                }
                Err(error) if error.is_retryable() => {
                    tracing::warn!(
                        "Queue replay paused at operation {}: {}",
                        operation.id,
                        error
                    );
                    return Ok(QueueRun {
                        applied,
                        interrupted_by: Some(error),
                    });
                }
                Err(error) => return Err(error),
            }
        }

        Ok(QueueRun {
            applied,
            interrupted_by: None,
        })
    }
}
