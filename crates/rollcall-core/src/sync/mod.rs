//! Offline delivery: the retry executor and the durable mutation queue.

mod queue;
mod retry;

pub use queue::{OfflineQueue, OperationProcessor, QueueRun};
pub use retry::{retry_with_backoff, retry_with_backoff_when, RetryPolicy};
