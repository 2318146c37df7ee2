use tracing::{info, instrument, warn};

use crate::checkout::{self, CheckoutError, CheckoutForm, LineRequest, OrderContext, ValidationError};
use crate::config::PricingConfig;
use crate::domain::{Order, PaymentMethod, Product};
use crate::pricing::{self, Quote};
use crate::store::StoreClient;

use super::CartClient;

/// Submission boundary of the checkout page.
///
/// Both checkout paths hold the context's submit permit for their whole
/// duration, so a second click on the same page is refused instead of
/// placing a duplicate order.
#[derive(Clone)]
pub struct CheckoutClient {
    store: StoreClient,
    carts: CartClient,
    pricing: PricingConfig,
}

impl CheckoutClient {
    pub fn new(store: StoreClient, carts: CartClient, pricing: PricingConfig) -> Self {
        Self { store, carts, pricing }
    }

    /// Figures shown on the "buy now" page before the form is submitted.
    /// `Ok(None)` means no payment method has been picked yet.
    #[instrument(skip(self))]
    pub async fn quote_single(
        &self,
        product_id: &str,
        quantity: u32,
        address: &str,
        method: Option<PaymentMethod>,
    ) -> Result<Option<Quote>, CheckoutError> {
        let products = self.load_products(&[product_id.to_string()]).await?;
        let requests: Vec<LineRequest<'_>> = products
            .iter()
            .map(|product| LineRequest { product, quantity })
            .collect();
        self.quote_requests(&requests, address, method)
    }

    /// Figures shown on the cart checkout page for the cart in `ctx`.
    #[instrument(skip(self, ctx), fields(lines = ctx.cart.lines().len()))]
    pub async fn quote_cart(
        &self,
        ctx: &OrderContext,
        address: &str,
        method: Option<PaymentMethod>,
    ) -> Result<Option<Quote>, CheckoutError> {
        let products = self.load_cart_products(ctx).await?;
        let requests = cart_requests(ctx, &products);
        self.quote_requests(&requests, address, method)
    }

    /// Buys one product directly. The cart is left untouched.
    #[instrument(skip(self, ctx, form), fields(identity = ?ctx.identity))]
    pub async fn checkout_single(
        &self,
        ctx: &OrderContext,
        product_id: &str,
        quantity: u32,
        form: &CheckoutForm,
    ) -> Result<Order, CheckoutError> {
        let _permit = ctx.guard().try_begin().ok_or(CheckoutError::SubmissionInProgress)?;

        let result = self.submit_single(product_id, quantity, form).await;

        log_outcome(&result);
        result
    }

    /// Buys everything in the context's cart, then takes the ordered lines
    /// out of the stored cart. Lines added elsewhere in the meantime stay.
    #[instrument(skip(self, ctx, form), fields(identity = ?ctx.identity, lines = ctx.cart.lines().len()))]
    pub async fn checkout_cart(&self, ctx: &OrderContext, form: &CheckoutForm) -> Result<Order, CheckoutError> {
        let _permit = ctx.guard().try_begin().ok_or(CheckoutError::SubmissionInProgress)?;

        let result = self.submit_cart(ctx, form).await;

        log_outcome(&result);
        if result.is_ok() {
            // The order stands even if the cart cannot be updated.
            if let Err(e) = self.carts.remove_ordered(&ctx.identity, &ctx.cart).await {
                warn!(error = %e, "Order placed but ordered lines could not be removed from the cart");
            }
        }
        result
    }

    async fn submit_single(&self, product_id: &str, quantity: u32, form: &CheckoutForm) -> Result<Order, CheckoutError> {
        checkout::validate_form(form)?;
        let products = self.load_products(&[product_id.to_string()]).await?;
        let requests: Vec<LineRequest<'_>> = products
            .iter()
            .map(|product| LineRequest { product, quantity })
            .collect();
        let draft = checkout::assemble(&requests, form, &self.pricing)?;
        checkout::place_order(&self.store, &draft).await
    }

    async fn submit_cart(&self, ctx: &OrderContext, form: &CheckoutForm) -> Result<Order, CheckoutError> {
        checkout::validate_form(form)?;
        let products = self.load_cart_products(ctx).await?;
        let requests = cart_requests(ctx, &products);
        let draft = checkout::assemble(&requests, form, &self.pricing)?;
        checkout::place_order(&self.store, &draft).await
    }

    fn quote_requests(
        &self,
        requests: &[LineRequest<'_>],
        address: &str,
        method: Option<PaymentMethod>,
    ) -> Result<Option<Quote>, CheckoutError> {
        let lines = checkout::price_lines(requests)?;
        let pre_order = lines.iter().any(|line| line.pre_order);
        let fee = pricing::delivery_fee(address, &self.pricing);
        Ok(pricing::quote(pricing::subtotal(&lines), fee, pre_order, method, &self.pricing))
    }

    async fn load_cart_products(&self, ctx: &OrderContext) -> Result<Vec<Product>, CheckoutError> {
        if ctx.cart.is_empty() {
            return Err(ValidationError::EmptyCart.into());
        }
        let ids: Vec<String> = ctx.cart.lines().iter().map(|line| line.product_id.clone()).collect();
        self.load_products(&ids).await
    }

    /// Current catalog entries for `ids`, in the same order.
    async fn load_products(&self, ids: &[String]) -> Result<Vec<Product>, CheckoutError> {
        let mut products = Vec::with_capacity(ids.len());
        for id in ids {
            let product = self
                .store
                .get_product(id.clone())
                .await
                .map_err(|e| CheckoutError::TransactionFailed(e.to_string()))?
                .ok_or_else(|| CheckoutError::ProductNotFound(id.clone()))?;
            products.push(product);
        }
        Ok(products)
    }
}

fn cart_requests<'a>(ctx: &OrderContext, products: &'a [Product]) -> Vec<LineRequest<'a>> {
    ctx.cart
        .lines()
        .iter()
        .zip(products)
        .map(|(line, product)| LineRequest {
            product,
            quantity: line.quantity,
        })
        .collect()
}

fn log_outcome(result: &Result<Order, CheckoutError>) {
    match result {
        Ok(order) => info!(order_id = %order.id, total = %order.total, "Checkout complete"),
        Err(e @ CheckoutError::Validation(_)) => warn!(error = %e, "Checkout rejected"),
        Err(e) => warn!(error = %e, "Checkout failed"),
    }
}
