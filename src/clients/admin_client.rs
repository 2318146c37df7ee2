use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::checkout::ValidationError;
use crate::domain::{Availability, Order, OrderStatus, Price, Product, ProductCreate, ProductUpdate, Stock};
use crate::store::{RecordKey, Snapshot, StoreClient, StoreError, TransactionError, TxPlan, Write};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AdminError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Product not found: {0}")]
    ProductNotFound(String),
    #[error("Order not found: {0}")]
    OrderNotFound(String),
    #[error("Cannot move an order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("Store operation failed: {0}")]
    TransactionFailed(String),
}

impl From<StoreError> for AdminError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ProductNotFound(id) => AdminError::ProductNotFound(id),
            StoreError::OrderNotFound(id) => AdminError::OrderNotFound(id),
            e @ (StoreError::Conflict(_)
            | StoreError::InsufficientStock { .. }
            | StoreError::ActorCommunicationError(_)) => {
                AdminError::TransactionFailed(e.to_string())
            }
        }
    }
}

/// Product fields as typed into the admin console.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductForm {
    pub name: String,
    pub color: String,
    pub category: String,
    /// A number, or `TBA` while the price is not announced.
    pub price: String,
    /// Blank means no discount.
    pub discount: String,
    /// A count, or `unlimited` / `-1` for untracked stock.
    pub stock: String,
    pub availability: String,
    pub images: Vec<String>,
    pub description: String,
}

impl TryFrom<ProductForm> for ProductCreate {
    type Error = ValidationError;

    fn try_from(form: ProductForm) -> Result<Self, Self::Error> {
        let name = form.name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingField("product name"));
        }

        let price = match form.price.trim() {
            "" => return Err(ValidationError::MissingField("price")),
            text if text.eq_ignore_ascii_case(Price::UNANNOUNCED_MARKER) => Price::Unannounced,
            text => Price::Known(non_negative("price", text)?),
        };

        let discount = match form.discount.trim() {
            "" => Decimal::ZERO,
            text => non_negative("discount", text)?,
        };

        let stock = match form.stock.trim() {
            "" => return Err(ValidationError::MissingField("stock")),
            text if text.eq_ignore_ascii_case("unlimited") => Stock::Unlimited,
            text => {
                let raw: i64 = text.parse().map_err(|_| invalid("stock", text))?;
                Stock::try_from(raw).map_err(|_| invalid("stock", text))?
            }
        };

        let availability = match form.availability.trim() {
            "" => Availability::Ready,
            text => Availability::parse(text).ok_or_else(|| ValidationError::UnknownAvailability(text.to_string()))?,
        };

        let color = form.color.trim();
        Ok(ProductCreate {
            name: name.to_string(),
            color: (!color.is_empty()).then(|| color.to_string()),
            category: form.category.trim().to_string(),
            price,
            discount,
            stock,
            availability,
            images: form.images.into_iter().filter(|url| !url.trim().is_empty()).collect(),
            description: form.description,
        })
    }
}

/// Checks the fields an admin edit sets, with the same rules as the create
/// form.
fn validate_update(update: &ProductUpdate) -> Result<(), ValidationError> {
    if matches!(&update.name, Some(name) if name.trim().is_empty()) {
        return Err(ValidationError::MissingField("product name"));
    }
    if let Some(Price::Known(amount)) = update.price {
        ensure_non_negative("price", amount)?;
    }
    if let Some(discount) = update.discount {
        ensure_non_negative("discount", discount)?;
    }
    Ok(())
}

fn non_negative(field: &'static str, text: &str) -> Result<Decimal, ValidationError> {
    match text.parse::<Decimal>() {
        Ok(value) if value >= Decimal::ZERO => Ok(value),
        _ => Err(invalid(field, text)),
    }
}

fn ensure_non_negative(field: &'static str, value: Decimal) -> Result<(), ValidationError> {
    if value < Decimal::ZERO {
        return Err(invalid(field, &value.to_string()));
    }
    Ok(())
}

fn invalid(field: &'static str, text: &str) -> ValidationError {
    ValidationError::InvalidNumber {
        field,
        value: text.to_string(),
    }
}

/// Catalog management and order handling for the admin console.
#[derive(Clone)]
pub struct AdminClient {
    store: StoreClient,
    max_attempts: u32,
}

impl AdminClient {
    pub fn new(store: StoreClient, max_attempts: u32) -> Self {
        Self { store, max_attempts }
    }

    #[instrument(skip(self, form), fields(name = %form.name))]
    pub async fn create_product(&self, form: ProductForm) -> Result<String, AdminError> {
        let params = ProductCreate::try_from(form)?;
        let id = self.store.create_product(params).await?;
        info!(product_id = %id, "Product added to catalog");
        Ok(id)
    }

    /// Overwrites the given fields without checking what is currently stored.
    /// Checkouts committing afterwards reserve against the new stock.
    ///
    /// # Errors
    /// [`AdminError::Validation`] for a blank name or a negative amount;
    /// nothing is written then.
    #[instrument(skip(self))]
    pub async fn update_product(&self, id: String, update: ProductUpdate) -> Result<Product, AdminError> {
        validate_update(&update)?;
        let product = self.store.update_product(id, update).await?;
        info!(product_id = %product.id, stock = ?product.stock, "Product updated");
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: String) -> Result<(), AdminError> {
        Ok(self.store.delete_product(id).await?)
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, AdminError> {
        Ok(self.store.list_products().await?)
    }

    pub async fn list_orders(&self) -> Result<Vec<Order>, AdminError> {
        Ok(self.store.list_orders().await?)
    }

    pub async fn get_order(&self, id: String) -> Result<Option<Order>, AdminError> {
        Ok(self.store.get_order(id).await?)
    }

    /// Moves an order along its lifecycle.
    ///
    /// Re-applying the current status changes nothing. Cancelling puts the
    /// stock taken at checkout back on the shelf in the same commit as the
    /// status change; lines whose product has since been deleted or made
    /// untracked are skipped.
    ///
    /// # Errors
    /// - [`AdminError::OrderNotFound`] for an unknown order
    /// - [`AdminError::InvalidTransition`] for a move the lifecycle forbids
    /// - [`AdminError::TransactionFailed`] on persistent conflicts
    #[instrument(skip(self))]
    pub async fn set_order_status(&self, order_id: String, status: OrderStatus) -> Result<Order, AdminError> {
        let keys = vec![RecordKey::Order(order_id.clone())];
        let result = self
            .store
            .run_transaction(keys, self.max_attempts, |snapshot| transition(snapshot, &order_id, status))
            .await;

        match result {
            Ok((change, receipt)) => {
                let restored: u32 = change
                    .returned
                    .iter()
                    .filter(|(product_id, _)| !receipt.skipped_restocks.contains(product_id))
                    .map(|(_, quantity)| quantity)
                    .sum();
                if restored > 0 {
                    info!(restored, "Stock restored for cancelled order");
                }
                info!(status = %change.order.status, "Order status updated");
                Ok(change.order)
            }
            Err(TransactionError::Aborted(e)) => {
                warn!(error = %e, "Status change refused");
                Err(e)
            }
            Err(e) => Err(AdminError::TransactionFailed(e.to_string())),
        }
    }
}

struct StatusChange {
    order: Order,
    /// Quantity per product handed back to stock.
    returned: Vec<(String, u32)>,
}

fn transition(snapshot: &Snapshot, order_id: &str, next: OrderStatus) -> Result<TxPlan<StatusChange>, AdminError> {
    let current = snapshot
        .order(order_id)
        .ok_or_else(|| AdminError::OrderNotFound(order_id.to_string()))?;

    let mut order = current.clone();
    if current.status == next {
        return Ok(TxPlan {
            value: StatusChange {
                order,
                returned: Vec::new(),
            },
            writes: Vec::new(),
        });
    }
    if !current.status.can_transition_to(next) {
        return Err(AdminError::InvalidTransition {
            from: current.status,
            to: next,
        });
    }

    let mut returned: Vec<(String, u32)> = Vec::new();
    if next == OrderStatus::Cancelled {
        for line in current.lines.iter().filter(|line| line.reserved) {
            match returned.iter_mut().find(|(id, _)| *id == line.product_id) {
                Some((_, quantity)) => *quantity += line.quantity,
                None => returned.push((line.product_id.clone(), line.quantity)),
            }
        }
    }

    let mut writes = vec![Write::SetOrderStatus {
        order_id: order_id.to_string(),
        status: next,
    }];
    writes.extend(returned.iter().map(|(product_id, quantity)| Write::RestockProduct {
        product_id: product_id.clone(),
        quantity: *quantity,
    }));

    order.status = next;
    Ok(TxPlan {
        value: StatusChange { order, returned },
        writes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreActor;
    use rstest::rstest;

    fn form() -> ProductForm {
        ProductForm {
            name: "Jamdani Saree".to_string(),
            color: "Red".to_string(),
            category: "Saree".to_string(),
            price: "2500".to_string(),
            discount: "".to_string(),
            stock: "8".to_string(),
            availability: "Ready".to_string(),
            images: vec!["https://img.example/1.jpg".to_string(), " ".to_string()],
            description: "Handwoven".to_string(),
        }
    }

    #[test]
    fn test_form_defaults() {
        let params = ProductCreate::try_from(form()).unwrap();
        assert_eq!(params.price, Price::Known(Decimal::from(2500)));
        assert_eq!(params.discount, Decimal::ZERO);
        assert_eq!(params.stock, Stock::Tracked(8));
        assert_eq!(params.color.as_deref(), Some("Red"));
        assert_eq!(params.images.len(), 1);
    }

    #[rstest]
    #[case("TBA", "-1", "Pre Order", Price::Unannounced, Stock::Unlimited, Availability::PreOrder)]
    #[case("tba", "unlimited", "upcoming", Price::Unannounced, Stock::Unlimited, Availability::Upcoming)]
    #[case("99.5", "0", "", Price::Known(Decimal::new(995, 1)), Stock::Tracked(0), Availability::Ready)]
    fn test_form_sentinels(
        #[case] price: &str,
        #[case] stock: &str,
        #[case] availability: &str,
        #[case] want_price: Price,
        #[case] want_stock: Stock,
        #[case] want_availability: Availability,
    ) {
        let submitted = ProductForm {
            price: price.to_string(),
            stock: stock.to_string(),
            availability: availability.to_string(),
            ..form()
        };
        let params = ProductCreate::try_from(submitted).unwrap();
        assert_eq!(params.price, want_price);
        assert_eq!(params.stock, want_stock);
        assert_eq!(params.availability, want_availability);
    }

    #[rstest]
    #[case(ProductForm { name: " ".to_string(), ..form() }, ValidationError::MissingField("product name"))]
    #[case(ProductForm { price: "cheap".to_string(), ..form() }, invalid("price", "cheap"))]
    #[case(ProductForm { price: "-5".to_string(), ..form() }, invalid("price", "-5"))]
    #[case(ProductForm { price: "NaN".to_string(), ..form() }, invalid("price", "NaN"))]
    #[case(ProductForm { price: "inf".to_string(), ..form() }, invalid("price", "inf"))]
    #[case(ProductForm { discount: "abc".to_string(), ..form() }, invalid("discount", "abc"))]
    #[case(ProductForm { discount: "-0.5".to_string(), ..form() }, invalid("discount", "-0.5"))]
    #[case(ProductForm { stock: "-3".to_string(), ..form() }, invalid("stock", "-3"))]
    #[case(ProductForm { stock: "".to_string(), ..form() }, ValidationError::MissingField("stock"))]
    #[case(ProductForm { availability: "soon".to_string(), ..form() }, ValidationError::UnknownAvailability("soon".to_string()))]
    fn test_form_rejections(#[case] submitted: ProductForm, #[case] expected: ValidationError) {
        assert_eq!(ProductCreate::try_from(submitted), Err(expected));
    }

    #[tokio::test]
    async fn test_update_product_rejects_invalid_edits() {
        let (actor, store) = StoreActor::new(8);
        tokio::spawn(actor.run());
        let admin = AdminClient::new(store.clone(), 3);
        let id = admin.create_product(form()).await.unwrap();

        let rejected = [
            (
                ProductUpdate { discount: Some(Decimal::new(-1, 0)), ..Default::default() },
                invalid("discount", "-1"),
            ),
            (
                ProductUpdate { price: Some(Price::Known(Decimal::new(-250, 2))), ..Default::default() },
                invalid("price", "-2.50"),
            ),
            (
                ProductUpdate { name: Some("  ".to_string()), ..Default::default() },
                ValidationError::MissingField("product name"),
            ),
        ];
        for (update, expected) in rejected {
            assert_eq!(
                admin.update_product(id.clone(), update).await,
                Err(AdminError::Validation(expected))
            );
        }
        let stored = store.get_product(id.clone()).await.unwrap().unwrap();
        assert_eq!(stored.discount, Decimal::ZERO);
        assert_eq!(stored.price, Price::Known(Decimal::from(2500)));

        let updated = admin
            .update_product(
                id.clone(),
                ProductUpdate {
                    price: Some(Price::Unannounced),
                    discount: Some(Decimal::new(1999, 2)),
                    stock: Some(Stock::Tracked(2)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price, Price::Unannounced);
        assert_eq!(updated.discount, Decimal::new(1999, 2));
        assert_eq!(updated.stock, Stock::Tracked(2));

        assert_eq!(
            admin.update_product("product_404".to_string(), ProductUpdate::default()).await,
            Err(AdminError::ProductNotFound("product_404".to_string()))
        );
    }

    #[test]
    fn test_store_errors_map_to_admin_errors() {
        assert_eq!(
            AdminError::from(StoreError::OrderNotFound("order_4".to_string())),
            AdminError::OrderNotFound("order_4".to_string())
        );
        assert!(matches!(
            AdminError::from(StoreError::ActorCommunicationError("Actor closed".to_string())),
            AdminError::TransactionFailed(_)
        ));
    }
}
