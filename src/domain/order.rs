use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two accepted payment methods. Bkash settles the amount due now by
/// mobile transfer; cash on delivery defers the goods amount to the courier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Bkash,
    #[serde(rename = "Cash on Delivery")]
    CashOnDelivery,
}

impl PaymentMethod {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "bkash" => Some(PaymentMethod::Bkash),
            "cash on delivery" | "cod" => Some(PaymentMethod::CashOnDelivery),
            _ => None,
        }
    }

    /// Whether the customer pays everything due up front.
    pub fn settles_immediately(&self) -> bool {
        matches!(self, PaymentMethod::Bkash)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Bkash => write!(f, "Bkash"),
            PaymentMethod::CashOnDelivery => write!(f, "Cash on Delivery"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Processing,
    Dispatched,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Forward-only lifecycle. Cancellation is allowed from any state that is
    /// not terminal; re-applying the current status is handled by the caller.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (Pending, Processing) | (Processing, Dispatched) | (Dispatched, Delivered) => true,
            (current, Cancelled) => !current.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Dispatched => "Dispatched",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        };
        f.write_str(label)
    }
}

/// Snapshot of a product at order time. Never recomputed from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub pre_order: bool,
    /// Set when placing the order took this line's quantity out of stock.
    #[serde(default)]
    pub reserved: bool,
}

impl OrderLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

/// A placed order. Only `status` changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub placed_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
    pub paid: Decimal,
    pub due: Decimal,
    pub customer: CustomerDetails,
    pub payment: PaymentDetails,
    pub status: OrderStatus,
}

impl Order {
    pub fn is_pre_order(&self) -> bool {
        self.lines.iter().any(|line| line.pre_order)
    }
}

/// Payload for creating a new order. The store assigns the id and the
/// placement timestamp on commit.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderCreate {
    pub lines: Vec<OrderLine>,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
    pub paid: Decimal,
    pub due: Decimal,
    pub customer: CustomerDetails,
    pub payment: PaymentDetails,
}

impl OrderCreate {
    pub fn into_order(self, id: String, placed_at: DateTime<Utc>) -> Order {
        Order {
            id,
            placed_at,
            lines: self.lines,
            subtotal: self.subtotal,
            delivery_fee: self.delivery_fee,
            total: self.total,
            paid: self.paid,
            due: self.due,
            customer: self.customer,
            payment: self.payment,
            status: OrderStatus::Pending,
        }
    }
}
