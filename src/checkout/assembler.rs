//! Turns a checkout form plus the products being bought into a priced,
//! validated [`OrderDraft`]. Nothing here touches the store.

use crate::config::PricingConfig;
use crate::domain::{
    Availability, CustomerDetails, OrderCreate, OrderLine, PaymentDetails, PaymentMethod, Product, Stock,
};
use crate::pricing::{self, Quote};

use super::ValidationError;

/// Raw checkout form fields as submitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckoutForm {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub payment_method: String,
    pub account_number: String,
    pub transaction_id: String,
}

/// One product and the quantity asked for.
#[derive(Debug, Clone, Copy)]
pub struct LineRequest<'a> {
    pub product: &'a Product,
    pub quantity: u32,
}

/// A validated order, ready for the stock reservation transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub lines: Vec<OrderLine>,
    pub quote: Quote,
    pub customer: CustomerDetails,
    pub payment: PaymentDetails,
}

impl OrderDraft {
    pub fn is_pre_order(&self) -> bool {
        self.lines.iter().any(|line| line.pre_order)
    }

    /// Requested quantity per product, in first-seen order.
    pub fn demand(&self) -> Vec<(String, u32)> {
        let mut demand: Vec<(String, u32)> = Vec::new();
        for line in &self.lines {
            match demand.iter_mut().find(|(id, _)| *id == line.product_id) {
                Some((_, quantity)) => *quantity += line.quantity,
                None => demand.push((line.product_id.clone(), line.quantity)),
            }
        }
        demand
    }

    /// Builds the record to persist. The store flags reserved lines when it
    /// commits.
    pub fn to_order_create(&self) -> OrderCreate {
        OrderCreate {
            lines: self.lines.clone(),
            subtotal: self.quote.subtotal,
            delivery_fee: self.quote.delivery_fee,
            total: self.quote.total,
            paid: self.quote.paid,
            due: self.quote.due,
            customer: self.customer.clone(),
            payment: self.payment.clone(),
        }
    }
}

/// Snapshots the requested products into priced order lines.
///
/// # Errors
/// Rejects an empty request, a zero quantity, a product without a price or
/// not yet orderable, and a quantity above tracked stock on a non-pre-order
/// product.
pub fn price_lines(requests: &[LineRequest<'_>]) -> Result<Vec<OrderLine>, ValidationError> {
    if requests.is_empty() {
        return Err(ValidationError::EmptyCart);
    }

    requests
        .iter()
        .map(|request| {
            let product = request.product;
            if request.quantity == 0 {
                return Err(ValidationError::InvalidQuantity {
                    product: product.name.clone(),
                });
            }
            if product.availability == Availability::Upcoming {
                return Err(ValidationError::NotYetAvailable(product.name.clone()));
            }
            let unit_price = product
                .unit_price()
                .ok_or_else(|| ValidationError::PriceUnannounced(product.name.clone()))?;
            if let (Stock::Tracked(available), false) = (product.stock, product.is_pre_order()) {
                if request.quantity > available {
                    return Err(ValidationError::ExceedsStock {
                        product: product.name.clone(),
                        requested: request.quantity,
                        available,
                    });
                }
            }

            Ok(OrderLine {
                product_id: product.id.clone(),
                name: product.name.clone(),
                color: product.color.clone(),
                unit_price,
                quantity: request.quantity,
                pre_order: product.is_pre_order(),
                reserved: false,
            })
        })
        .collect()
}

/// Checks the customer and payment fields of the form.
///
/// # Errors
/// Returns the first missing or malformed field.
pub fn validate_form(form: &CheckoutForm) -> Result<(CustomerDetails, PaymentDetails), ValidationError> {
    let customer = CustomerDetails {
        name: required(&form.name, "name")?,
        phone: required(&form.phone, "phone number")?,
        address: required(&form.address, "address")?,
    };

    let method_text = required(&form.payment_method, "payment method")?;
    let method = PaymentMethod::parse(&method_text)
        .ok_or_else(|| ValidationError::UnknownPaymentMethod(method_text.clone()))?;
    let transaction_id = optional(&form.transaction_id);
    if method.settles_immediately() && transaction_id.is_none() {
        return Err(ValidationError::MissingTransactionId);
    }
    let payment = PaymentDetails {
        method,
        account_number: optional(&form.account_number),
        transaction_id,
    };
    Ok((customer, payment))
}

/// Validates the form and the requested lines and prices the order.
///
/// # Errors
/// Returns the first [`ValidationError`] found; form fields are checked
/// before the lines.
pub fn assemble(
    requests: &[LineRequest<'_>],
    form: &CheckoutForm,
    config: &PricingConfig,
) -> Result<OrderDraft, ValidationError> {
    let (customer, payment) = validate_form(form)?;

    let lines = price_lines(requests)?;
    let pre_order = lines.iter().any(|line| line.pre_order);
    let fee = pricing::delivery_fee(&customer.address, config);
    let quote = pricing::quote(pricing::subtotal(&lines), fee, pre_order, Some(payment.method), config)
        .ok_or(ValidationError::MissingField("payment method"))?;

    Ok(OrderDraft {
        lines,
        quote,
        customer,
        payment,
    })
}

fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    optional(value).ok_or(ValidationError::MissingField(field))
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
