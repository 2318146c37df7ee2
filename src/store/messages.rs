use std::collections::HashMap;
use std::fmt;
use tokio::sync::oneshot;

use crate::domain::{Order, OrderCreate, OrderStatus, Product, ProductCreate, ProductUpdate};

use super::StoreError;

pub type ServiceResult<T, E> = std::result::Result<T, E>;
pub type ServiceResponse<T, E> = oneshot::Sender<ServiceResult<T, E>>;

/// Identifies one document across both collections.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    Product(String),
    Order(String),
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Product(id) => write!(f, "products/{id}"),
            RecordKey::Order(id) => write!(f, "orders/{id}"),
        }
    }
}

/// A stored record with its write counter. Absent records count as version 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub version: u64,
    pub record: T,
}

/// Records read at one instant, together with the versions observed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub(crate) products: HashMap<String, Versioned<Product>>,
    pub(crate) orders: HashMap<String, Versioned<Order>>,
    pub(crate) versions: HashMap<RecordKey, u64>,
}

impl Snapshot {
    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.get(id).map(|v| &v.record)
    }

    pub fn order(&self, id: &str) -> Option<&Order> {
        self.orders.get(id).map(|v| &v.record)
    }

    /// The read set to validate at commit time.
    pub fn read_versions(&self) -> Vec<(RecordKey, u64)> {
        self.versions.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }
}

/// A change applied at commit time.
///
/// Stock writes are evaluated against the stock held when the commit runs,
/// not against a snapshot, so they need no read set.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Takes `quantity` out of a tracked, ready product. Fails the whole
    /// commit when less is left. Untracked and pre-order products are untouched.
    ReserveStock { product_id: String, quantity: u32 },
    /// Puts `quantity` back. Missing and untracked products are skipped.
    RestockProduct { product_id: String, quantity: u32 },
    /// Inserts an order. Lines whose product had stock taken by this commit
    /// are flagged `reserved`.
    CreateOrder(OrderCreate),
    SetOrderStatus { order_id: String, status: OrderStatus },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitReceipt {
    pub created_orders: Vec<Order>,
    /// Products named by a restock that no longer track stock.
    pub skipped_restocks: Vec<String>,
}

#[derive(Debug)]
pub enum StoreRequest {
    GetProduct {
        id: String,
        respond_to: ServiceResponse<Option<Product>, StoreError>,
    },
    ListProducts {
        respond_to: ServiceResponse<Vec<Product>, StoreError>,
    },
    CreateProduct {
        params: ProductCreate,
        respond_to: ServiceResponse<String, StoreError>,
    },
    UpdateProduct {
        id: String,
        update: ProductUpdate,
        respond_to: ServiceResponse<Product, StoreError>,
    },
    DeleteProduct {
        id: String,
        respond_to: ServiceResponse<(), StoreError>,
    },
    GetOrder {
        id: String,
        respond_to: ServiceResponse<Option<Order>, StoreError>,
    },
    ListOrders {
        respond_to: ServiceResponse<Vec<Order>, StoreError>,
    },
    ReadSnapshot {
        keys: Vec<RecordKey>,
        respond_to: ServiceResponse<Snapshot, StoreError>,
    },
    Commit {
        reads: Vec<(RecordKey, u64)>,
        writes: Vec<Write>,
        respond_to: ServiceResponse<CommitReceipt, StoreError>,
    },
    Shutdown,
}
