use thiserror::Error;

use super::RecordKey;

/// Errors reported by the document store.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),
    #[error("Order not found: {0}")]
    OrderNotFound(String),
    #[error("Only {remaining} left of {product_id}")]
    InsufficientStock { product_id: String, remaining: u32 },
    /// A record read by a transaction changed before the transaction committed.
    #[error("Write conflict on {0}")]
    Conflict(RecordKey),
    #[error("Store communication error: {0}")]
    ActorCommunicationError(String),
}
