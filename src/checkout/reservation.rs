//! Atomic check-and-decrement of inventory at order placement.

use tracing::{info, instrument, warn};

use crate::domain::Order;
use crate::store::{StoreClient, StoreError, Write};

use super::{CheckoutError, OrderDraft};

/// Places `draft` as a new order, taking its quantities out of stock.
///
/// One store commit carries a stock reservation per product and the new
/// order. The store checks each reservation against the stock it holds at
/// that moment, so concurrent checkouts never overwrite each other and never
/// need a retry. Pre-order and unlimited products are never decremented.
///
/// # Errors
/// - [`CheckoutError::OutOfStock`] naming the product and what is left
/// - [`CheckoutError::ProductNotFound`] if a product was deleted meanwhile
/// - [`CheckoutError::TransactionFailed`] when the store cannot be reached
///
/// In every error case neither stock nor orders are changed.
#[instrument(skip(store, draft), fields(lines = draft.lines.len(), total = %draft.quote.total))]
pub async fn place_order(store: &StoreClient, draft: &OrderDraft) -> Result<Order, CheckoutError> {
    let mut writes: Vec<Write> = draft
        .demand()
        .into_iter()
        .map(|(product_id, quantity)| Write::ReserveStock { product_id, quantity })
        .collect();
    writes.push(Write::CreateOrder(draft.to_order_create()));

    match store.commit(Vec::new(), writes).await {
        Ok(receipt) => {
            let order = receipt
                .created_orders
                .into_iter()
                .next()
                .ok_or_else(|| CheckoutError::TransactionFailed("order was not recorded".to_string()))?;
            info!(order_id = %order.id, "Order placed");
            Ok(order)
        }
        Err(StoreError::InsufficientStock { product_id, remaining }) => {
            let product = draft
                .lines
                .iter()
                .find(|line| line.product_id == product_id)
                .map(|line| line.name.clone())
                .unwrap_or_else(|| product_id.clone());
            info!(product_id = %product_id, remaining, "Stock ran out before commit");
            Err(CheckoutError::OutOfStock {
                product_id,
                product,
                remaining,
            })
        }
        Err(StoreError::ProductNotFound(product_id)) => Err(CheckoutError::ProductNotFound(product_id)),
        Err(e) => {
            warn!(error = %e, "Reservation commit failed");
            Err(CheckoutError::TransactionFailed(e.to_string()))
        }
    }
}
