use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Price of a catalog item.
///
/// Products can be listed before their price is announced, so the catalog
/// stores either a known amount or the `"TBA"` marker. Known amounts are
/// never negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPrice", into = "RawPrice")]
pub enum Price {
    Known(Decimal),
    Unannounced,
}

impl Price {
    pub const UNANNOUNCED_MARKER: &'static str = "TBA";

    pub fn amount(&self) -> Option<Decimal> {
        match self {
            Price::Known(amount) => Some(*amount),
            Price::Unannounced => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawPrice {
    Amount(Decimal),
    Text(String),
}

impl TryFrom<RawPrice> for Price {
    type Error = String;

    fn try_from(raw: RawPrice) -> Result<Self, Self::Error> {
        let amount = match raw {
            RawPrice::Amount(amount) => amount,
            RawPrice::Text(text) if text.trim().eq_ignore_ascii_case(Price::UNANNOUNCED_MARKER) => {
                return Ok(Price::Unannounced);
            }
            RawPrice::Text(text) => text
                .trim()
                .parse::<Decimal>()
                .map_err(|_| format!("invalid price: {text}"))?,
        };
        if amount.is_sign_negative() {
            return Err(format!("negative price: {amount}"));
        }
        Ok(Price::Known(amount))
    }
}

impl From<Price> for RawPrice {
    fn from(price: Price) -> Self {
        match price {
            Price::Known(amount) => RawPrice::Amount(amount),
            Price::Unannounced => RawPrice::Text(Price::UNANNOUNCED_MARKER.to_string()),
        }
    }
}

/// Inventory level of a product. `Unlimited` products are not tracked and
/// are never decremented by checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Stock {
    Tracked(u32),
    Unlimited,
}

impl Stock {
    /// Stored value standing for untracked inventory.
    pub const UNLIMITED_SENTINEL: i64 = -1;

    pub fn is_tracked(&self) -> bool {
        matches!(self, Stock::Tracked(_))
    }

    pub fn tracked(&self) -> Option<u32> {
        match self {
            Stock::Tracked(count) => Some(*count),
            Stock::Unlimited => None,
        }
    }
}

impl TryFrom<i64> for Stock {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value == Self::UNLIMITED_SENTINEL {
            return Ok(Stock::Unlimited);
        }
        u32::try_from(value)
            .map(Stock::Tracked)
            .map_err(|_| format!("invalid stock value: {value}"))
    }
}

impl From<Stock> for i64 {
    fn from(stock: Stock) -> Self {
        match stock {
            Stock::Tracked(count) => i64::from(count),
            Stock::Unlimited => Stock::UNLIMITED_SENTINEL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    Ready,
    #[serde(rename = "Pre Order")]
    PreOrder,
    Upcoming,
}

impl Availability {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "ready" => Some(Availability::Ready),
            "pre order" | "pre-order" | "preorder" => Some(Availability::PreOrder),
            "upcoming" => Some(Availability::Upcoming),
            _ => None,
        }
    }
}

/// Represents a product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub category: String,
    pub price: Price,
    #[serde(default)]
    pub discount: Decimal,
    pub stock: Stock,
    pub availability: Availability,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl Product {
    /// Creates a ready-to-ship product with tracked stock and no discount.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        price: impl Into<Decimal>,
        stock: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: None,
            category: String::new(),
            price: Price::Known(price.into()),
            discount: Decimal::ZERO,
            stock: Stock::Tracked(stock),
            availability: Availability::Ready,
            images: Vec::new(),
            description: String::new(),
        }
    }

    /// Price after discount, when the price is known.
    pub fn unit_price(&self) -> Option<Decimal> {
        self.price.amount().map(|price| price - self.discount)
    }

    pub fn tracks_stock(&self) -> bool {
        self.stock.is_tracked()
    }

    pub fn is_pre_order(&self) -> bool {
        self.availability == Availability::PreOrder
    }

    /// Whether checkout has to hold back this product's stock.
    pub fn reserves_stock(&self) -> bool {
        self.tracks_stock() && !self.is_pre_order()
    }
}

/// Payload for creating a new product.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductCreate {
    pub name: String,
    pub color: Option<String>,
    pub category: String,
    pub price: Price,
    pub discount: Decimal,
    pub stock: Stock,
    pub availability: Availability,
    pub images: Vec<String>,
    pub description: String,
}

impl ProductCreate {
    pub fn into_product(self, id: String) -> Product {
        Product {
            id,
            name: self.name,
            color: self.color,
            category: self.category,
            price: self.price,
            discount: self.discount,
            stock: self.stock,
            availability: self.availability,
            images: self.images,
            description: self.description,
        }
    }
}

impl From<Product> for ProductCreate {
    fn from(product: Product) -> Self {
        Self {
            name: product.name,
            color: product.color,
            category: product.category,
            price: product.price,
            discount: product.discount,
            stock: product.stock,
            availability: product.availability,
            images: product.images,
            description: product.description,
        }
    }
}

/// Unconditional admin edit. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<Price>,
    pub discount: Option<Decimal>,
    pub stock: Option<Stock>,
    pub availability: Option<Availability>,
    pub images: Option<Vec<String>>,
    pub description: Option<String>,
}

impl ProductUpdate {
    pub fn apply(self, product: &mut Product) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(discount) = self.discount {
            product.discount = discount;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(availability) = self.availability {
            product.availability = availability;
        }
        if let Some(images) = self.images {
            product.images = images;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
    }
}
