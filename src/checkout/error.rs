use thiserror::Error;

/// Problems with the submitted checkout form or cart, found before anything
/// is sent to the store. The messages are shown to the customer as-is.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("Please enter your {0}")]
    MissingField(&'static str),
    #[error("Unknown payment method: {0}")]
    UnknownPaymentMethod(String),
    #[error("Transaction ID is required for Bkash payments")]
    MissingTransactionId,
    #[error("Your cart is empty")]
    EmptyCart,
    #[error("Quantity for {product} must be at least 1")]
    InvalidQuantity { product: String },
    #[error("Only {available} of {product} left in stock, {requested} requested")]
    ExceedsStock {
        product: String,
        requested: u32,
        available: u32,
    },
    #[error("{0} does not have a price yet")]
    PriceUnannounced(String),
    #[error("{0} is not available to order yet")]
    NotYetAvailable(String),
    #[error("Invalid {field}: {value}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("Unknown availability: {0}")]
    UnknownAvailability(String),
}

/// Outcome of a failed checkout submission.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CheckoutError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Stock ran out between loading the page and placing the order.
    #[error("{product} is out of stock, only {remaining} left")]
    OutOfStock {
        product_id: String,
        product: String,
        remaining: u32,
    },
    #[error("Product not found: {0}")]
    ProductNotFound(String),
    #[error("Could not place the order: {0}")]
    TransactionFailed(String),
    #[error("An order is already being submitted")]
    SubmissionInProgress,
}
