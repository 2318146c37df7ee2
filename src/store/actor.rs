use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::domain::{Order, Product, ProductCreate, ProductUpdate, Stock};

use super::{
    CommitReceipt, RecordKey, ServiceResponse, Snapshot, StoreClient, StoreError, StoreRequest, Versioned,
    Write,
};

/// Owns the product and order collections. Requests are served one at a
/// time, so a snapshot read or a commit never interleaves with another write.
pub struct StoreActor {
    receiver: mpsc::Receiver<StoreRequest>,
    products: HashMap<String, Versioned<Product>>,
    orders: HashMap<String, Versioned<Order>>,
    next_product_id: u64,
    next_order_id: u64,
}

impl StoreActor {
    pub fn new(buffer_size: usize) -> (Self, StoreClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            products: HashMap::new(),
            orders: HashMap::new(),
            next_product_id: 1,
            next_order_id: 1,
        };
        (actor, StoreClient::new(sender))
    }

    #[instrument(name = "store_actor", skip(self))]
    pub async fn run(mut self) {
        info!("StoreActor starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StoreRequest::GetProduct { id, respond_to } => {
                    let product = self.products.get(&id).map(|v| v.record.clone());
                    let _ = respond_to.send(Ok(product));
                }
                StoreRequest::ListProducts { respond_to } => {
                    let mut products: Vec<Product> =
                        self.products.values().map(|v| v.record.clone()).collect();
                    products.sort_by(|a, b| id_order(&a.id, &b.id));
                    let _ = respond_to.send(Ok(products));
                }
                StoreRequest::CreateProduct { params, respond_to } => {
                    self.handle_create_product(params, respond_to);
                }
                StoreRequest::UpdateProduct { id, update, respond_to } => {
                    self.handle_update_product(id, update, respond_to);
                }
                StoreRequest::DeleteProduct { id, respond_to } => {
                    self.handle_delete_product(id, respond_to);
                }
                StoreRequest::GetOrder { id, respond_to } => {
                    let order = self.orders.get(&id).map(|v| v.record.clone());
                    let _ = respond_to.send(Ok(order));
                }
                StoreRequest::ListOrders { respond_to } => {
                    let mut orders: Vec<Order> = self.orders.values().map(|v| v.record.clone()).collect();
                    orders.sort_by(|a, b| a.placed_at.cmp(&b.placed_at).then_with(|| id_order(&a.id, &b.id)));
                    let _ = respond_to.send(Ok(orders));
                }
                StoreRequest::ReadSnapshot { keys, respond_to } => {
                    let _ = respond_to.send(Ok(self.snapshot(keys)));
                }
                StoreRequest::Commit { reads, writes, respond_to } => {
                    let _ = respond_to.send(self.handle_commit(reads, writes));
                }
                StoreRequest::Shutdown => {
                    info!("StoreActor shutting down");
                    break;
                }
            }
        }
        info!("StoreActor stopped");
    }

    #[instrument(fields(product_name = %params.name), skip(self, params, respond_to))]
    fn handle_create_product(&mut self, params: ProductCreate, respond_to: ServiceResponse<String, StoreError>) {
        let id = format!("product_{}", self.next_product_id);
        self.next_product_id += 1;
        self.products.insert(
            id.clone(),
            Versioned {
                version: 1,
                record: params.into_product(id.clone()),
            },
        );
        info!(product_id = %id, "Product created");
        let _ = respond_to.send(Ok(id));
    }

    /// Unconditional write: last writer wins, but the version bump still
    /// forces in-flight transactions that read this product to retry.
    #[instrument(fields(product_id = %id), skip(self, update, respond_to))]
    fn handle_update_product(
        &mut self,
        id: String,
        update: ProductUpdate,
        respond_to: ServiceResponse<Product, StoreError>,
    ) {
        let result = match self.products.get_mut(&id) {
            Some(entry) => {
                update.apply(&mut entry.record);
                entry.version += 1;
                info!(version = entry.version, "Product updated");
                Ok(entry.record.clone())
            }
            None => {
                warn!("Product not found");
                Err(StoreError::ProductNotFound(id))
            }
        };
        let _ = respond_to.send(result);
    }

    #[instrument(fields(product_id = %id), skip(self, respond_to))]
    fn handle_delete_product(&mut self, id: String, respond_to: ServiceResponse<(), StoreError>) {
        let result = match self.products.remove(&id) {
            Some(_) => {
                info!("Product deleted");
                Ok(())
            }
            None => Err(StoreError::ProductNotFound(id)),
        };
        let _ = respond_to.send(result);
    }

    fn version_of(&self, key: &RecordKey) -> u64 {
        match key {
            RecordKey::Product(id) => self.products.get(id).map_or(0, |v| v.version),
            RecordKey::Order(id) => self.orders.get(id).map_or(0, |v| v.version),
        }
    }

    fn snapshot(&self, keys: Vec<RecordKey>) -> Snapshot {
        let mut snapshot = Snapshot::default();
        for key in keys {
            match &key {
                RecordKey::Product(id) => {
                    if let Some(entry) = self.products.get(id) {
                        snapshot.products.insert(id.clone(), entry.clone());
                    }
                }
                RecordKey::Order(id) => {
                    if let Some(entry) = self.orders.get(id) {
                        snapshot.orders.insert(id.clone(), entry.clone());
                    }
                }
            }
            let version = self.version_of(&key);
            snapshot.versions.insert(key, version);
        }
        snapshot
    }

    /// Applies `writes` only if every record in `reads` is still at the
    /// version the transaction saw and every stock reservation fits the
    /// current stock. Nothing is applied on any failure.
    #[instrument(fields(reads = reads.len(), writes = writes.len()), skip(self, reads, writes))]
    fn handle_commit(
        &mut self,
        reads: Vec<(RecordKey, u64)>,
        writes: Vec<Write>,
    ) -> Result<CommitReceipt, StoreError> {
        for (key, seen) in &reads {
            let current = self.version_of(key);
            if current != *seen {
                debug!(key = %key, seen, current, "Stale read");
                return Err(StoreError::Conflict(key.clone()));
            }
        }

        let taken = self.plan_reservations(&writes)?;
        for write in &writes {
            if let Write::SetOrderStatus { order_id, .. } = write {
                if !self.orders.contains_key(order_id) {
                    return Err(StoreError::OrderNotFound(order_id.clone()));
                }
            }
        }

        let placed_at = Utc::now();
        let mut receipt = CommitReceipt::default();
        for write in writes {
            match write {
                Write::ReserveStock { product_id, quantity } => {
                    if !taken.contains_key(&product_id) {
                        continue;
                    }
                    if let Some(entry) = self.products.get_mut(&product_id) {
                        if let Stock::Tracked(count) = entry.record.stock {
                            entry.record.stock = Stock::Tracked(count.saturating_sub(quantity));
                            entry.version += 1;
                        }
                    }
                }
                Write::RestockProduct { product_id, quantity } => match self.products.get_mut(&product_id) {
                    Some(entry) if entry.record.tracks_stock() => {
                        let count = entry.record.stock.tracked().unwrap_or_default();
                        entry.record.stock = Stock::Tracked(count.saturating_add(quantity));
                        entry.version += 1;
                    }
                    _ => {
                        warn!(product_id = %product_id, quantity, "Restock skipped");
                        receipt.skipped_restocks.push(product_id);
                    }
                },
                Write::SetOrderStatus { order_id, status } => {
                    if let Some(entry) = self.orders.get_mut(&order_id) {
                        entry.record.status = status;
                        entry.version += 1;
                    }
                }
                Write::CreateOrder(mut params) => {
                    for line in &mut params.lines {
                        line.reserved = taken.contains_key(&line.product_id);
                    }
                    let id = format!("order_{}", self.next_order_id);
                    self.next_order_id += 1;
                    let order = params.into_order(id.clone(), placed_at);
                    self.orders.insert(
                        id,
                        Versioned {
                            version: 1,
                            record: order.clone(),
                        },
                    );
                    receipt.created_orders.push(order);
                }
            }
        }

        debug!(created = receipt.created_orders.len(), reserved = taken.len(), "Commit applied");
        Ok(receipt)
    }

    /// Totals the stock each `ReserveStock` write takes, checked against the
    /// stock held now. Products that do not reserve stock are left out.
    fn plan_reservations(&self, writes: &[Write]) -> Result<HashMap<String, u32>, StoreError> {
        let mut taken: HashMap<String, u32> = HashMap::new();
        for write in writes {
            let Write::ReserveStock { product_id, quantity } = write else {
                continue;
            };
            let product = &self
                .products
                .get(product_id)
                .ok_or_else(|| StoreError::ProductNotFound(product_id.clone()))?
                .record;
            let Some(count) = product.stock.tracked().filter(|_| product.reserves_stock()) else {
                continue;
            };
            let already = taken.entry(product_id.clone()).or_insert(0);
            let remaining = count.saturating_sub(*already);
            if remaining < *quantity {
                debug!(product_id = %product_id, remaining, wanted = quantity, "Insufficient stock");
                return Err(StoreError::InsufficientStock {
                    product_id: product_id.clone(),
                    remaining,
                });
            }
            *already += quantity;
        }
        Ok(taken)
    }
}

/// Orders `prefix_N` ids numerically.
fn id_order(a: &str, b: &str) -> std::cmp::Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Availability, CustomerDetails, OrderCreate, OrderLine, OrderStatus, PaymentDetails, PaymentMethod,
    };
    use rust_decimal::Decimal;

    fn start() -> StoreClient {
        let (actor, client) = StoreActor::new(10);
        tokio::spawn(actor.run());
        client
    }

    fn order_params() -> OrderCreate {
        OrderCreate {
            lines: Vec::new(),
            subtotal: Decimal::ZERO,
            delivery_fee: Decimal::from(150),
            total: Decimal::from(150),
            paid: Decimal::from(150),
            due: Decimal::ZERO,
            customer: CustomerDetails {
                name: "Karim".to_string(),
                phone: "01700000000".to_string(),
                address: "Sylhet".to_string(),
            },
            payment: PaymentDetails {
                method: PaymentMethod::CashOnDelivery,
                account_number: None,
                transaction_id: None,
            },
        }
    }

    #[tokio::test]
    async fn test_commit_applies_writes_atomically() {
        let store = start();
        let id = store
            .create_product(Product::new("", "Kurti", 500, 3).into())
            .await
            .unwrap();

        let snapshot = store.read_snapshot(vec![RecordKey::Product(id.clone())]).await.unwrap();
        assert_eq!(snapshot.product(&id).map(|p| p.stock), Some(Stock::Tracked(3)));

        let receipt = store
            .commit(
                snapshot.read_versions(),
                vec![
                    Write::ReserveStock { product_id: id.clone(), quantity: 2 },
                    Write::CreateOrder(order_params()),
                ],
            )
            .await
            .unwrap();

        assert_eq!(receipt.created_orders.len(), 1);
        assert_eq!(receipt.created_orders[0].status, OrderStatus::Pending);
        let product = store.get_product(id).await.unwrap().unwrap();
        assert_eq!(product.stock, Stock::Tracked(1));
    }

    #[tokio::test]
    async fn test_stale_read_is_rejected_without_changes() {
        let store = start();
        let id = store
            .create_product(Product::new("", "Kurti", 500, 3).into())
            .await
            .unwrap();

        let snapshot = store.read_snapshot(vec![RecordKey::Product(id.clone())]).await.unwrap();

        // An admin edit lands between the read and the commit.
        store
            .update_product(id.clone(), ProductUpdate { discount: Some(Decimal::from(20)), ..Default::default() })
            .await
            .unwrap();

        let result = store
            .commit(
                snapshot.read_versions(),
                vec![
                    Write::ReserveStock { product_id: id.clone(), quantity: 1 },
                    Write::CreateOrder(order_params()),
                ],
            )
            .await;

        assert_eq!(result, Err(StoreError::Conflict(RecordKey::Product(id.clone()))));
        let product = store.get_product(id).await.unwrap().unwrap();
        assert_eq!(product.stock, Stock::Tracked(3));
        assert!(store.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_write_target_rejects_whole_commit() {
        let store = start();
        let result = store
            .commit(
                Vec::new(),
                vec![
                    Write::CreateOrder(order_params()),
                    Write::ReserveStock { product_id: "product_404".to_string(), quantity: 1 },
                ],
            )
            .await;

        assert_eq!(result, Err(StoreError::ProductNotFound("product_404".to_string())));
        assert!(store.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reservation_checks_current_stock() {
        let store = start();
        let id = store
            .create_product(Product::new("", "Kurti", 500, 3).into())
            .await
            .unwrap();

        // Two writes on the same product count together.
        let result = store
            .commit(
                Vec::new(),
                vec![
                    Write::ReserveStock { product_id: id.clone(), quantity: 2 },
                    Write::ReserveStock { product_id: id.clone(), quantity: 2 },
                    Write::CreateOrder(order_params()),
                ],
            )
            .await;
        assert_eq!(
            result,
            Err(StoreError::InsufficientStock { product_id: id.clone(), remaining: 1 })
        );
        assert_eq!(store.get_product(id.clone()).await.unwrap().unwrap().stock, Stock::Tracked(3));
        assert!(store.list_orders().await.unwrap().is_empty());

        // An unconditional admin edit between reads does not matter: the
        // reservation sees whatever stock is held when it commits.
        store
            .update_product(id.clone(), ProductUpdate { stock: Some(Stock::Tracked(10)), ..Default::default() })
            .await
            .unwrap();
        store
            .commit(Vec::new(), vec![Write::ReserveStock { product_id: id.clone(), quantity: 4 }])
            .await
            .unwrap();
        assert_eq!(store.get_product(id).await.unwrap().unwrap().stock, Stock::Tracked(6));
    }

    #[tokio::test]
    async fn test_created_lines_flag_reserved_products() {
        let store = start();
        let ready = store
            .create_product(Product::new("", "Kurti", 500, 3).into())
            .await
            .unwrap();
        let mut shawl = Product::new("", "Shawl", 1800, 0);
        shawl.availability = Availability::PreOrder;
        let pre_order = store.create_product(shawl.into()).await.unwrap();

        let line = |product_id: &str| OrderLine {
            product_id: product_id.to_string(),
            name: product_id.to_string(),
            color: None,
            unit_price: Decimal::from(500),
            quantity: 1,
            pre_order: false,
            reserved: false,
        };
        let mut params = order_params();
        params.lines = vec![line(&ready), line(&pre_order)];

        let receipt = store
            .commit(
                Vec::new(),
                vec![
                    Write::ReserveStock { product_id: ready.clone(), quantity: 1 },
                    Write::ReserveStock { product_id: pre_order.clone(), quantity: 1 },
                    Write::CreateOrder(params),
                ],
            )
            .await
            .unwrap();

        let flags: Vec<bool> = receipt.created_orders[0].lines.iter().map(|l| l.reserved).collect();
        assert_eq!(flags, vec![true, false]);
        assert_eq!(store.get_product(pre_order).await.unwrap().unwrap().stock, Stock::Tracked(0));
    }

    #[tokio::test]
    async fn test_restock_skips_untracked_and_missing_products() {
        let store = start();
        let tracked = store
            .create_product(Product::new("", "Kurti", 500, 1).into())
            .await
            .unwrap();
        let mut scarf = Product::new("", "Scarf", 300, 0);
        scarf.stock = Stock::Unlimited;
        let unlimited = store.create_product(scarf.into()).await.unwrap();

        let receipt = store
            .commit(
                Vec::new(),
                vec![
                    Write::RestockProduct { product_id: tracked.clone(), quantity: 2 },
                    Write::RestockProduct { product_id: unlimited.clone(), quantity: 2 },
                    Write::RestockProduct { product_id: "product_404".to_string(), quantity: 2 },
                ],
            )
            .await
            .unwrap();

        assert_eq!(receipt.skipped_restocks, vec![unlimited, "product_404".to_string()]);
        assert_eq!(store.get_product(tracked).await.unwrap().unwrap().stock, Stock::Tracked(3));
    }

    #[tokio::test]
    async fn test_deleted_product_reads_as_absent() {
        let store = start();
        let id = store
            .create_product(Product::new("", "Kurti", 500, 3).into())
            .await
            .unwrap();
        store.delete_product(id.clone()).await.unwrap();

        let snapshot = store.read_snapshot(vec![RecordKey::Product(id.clone())]).await.unwrap();
        assert!(snapshot.product(&id).is_none());
        assert_eq!(snapshot.read_versions(), vec![(RecordKey::Product(id.clone()), 0)]);
        assert_eq!(store.delete_product(id.clone()).await, Err(StoreError::ProductNotFound(id)));
    }

    #[tokio::test]
    async fn test_list_products_in_creation_order() {
        let store = start();
        for n in 0..11 {
            store
                .create_product(Product::new("", format!("Item {n}"), 100, 1).into())
                .await
                .unwrap();
        }
        let products = store.list_products().await.unwrap();
        assert_eq!(products.first().map(|p| p.id.as_str()), Some("product_1"));
        assert_eq!(products.last().map(|p| p.id.as_str()), Some("product_11"));
    }
}
