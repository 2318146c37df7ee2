use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument};

use crate::domain::{Order, Product, ProductCreate, ProductUpdate};

use super::{CommitReceipt, RecordKey, Snapshot, StoreError, StoreRequest, Write};

/// Generate client methods with oneshot channel boilerplate and automatic tracing.
macro_rules! client_method {
    ($client:ty => fn $method:ident($($param:ident: $param_type:ty),*) -> $return_type:ty as $request:ident::$variant:ident, Error = $error_type:ty) => {
        impl $client {
            #[instrument(skip(self))]
            pub async fn $method(&self, $($param: $param_type),*) -> Result<$return_type, $error_type> {
                debug!("Sending request");
                let (respond_to, response) = oneshot::channel();
                self.sender.send($request::$variant {
                    $($param,)*
                    respond_to,
                }).await.map_err(|_| <$error_type>::ActorCommunicationError("Actor closed".to_string()))?;

                response.await.map_err(|_| <$error_type>::ActorCommunicationError("Actor dropped".to_string()))?
            }
        }
    };
}

/// Handle to the [`StoreActor`](super::StoreActor).
#[derive(Clone)]
pub struct StoreClient {
    sender: mpsc::Sender<StoreRequest>,
}

impl StoreClient {
    pub fn new(sender: mpsc::Sender<StoreRequest>) -> Self {
        Self { sender }
    }

    pub async fn shutdown(&self) -> Result<(), StoreError> {
        self.sender
            .send(StoreRequest::Shutdown)
            .await
            .map_err(|_| StoreError::ActorCommunicationError("Actor closed".to_string()))
    }
}

client_method!(StoreClient => fn get_product(id: String) -> Option<Product> as StoreRequest::GetProduct, Error = StoreError);
client_method!(StoreClient => fn list_products() -> Vec<Product> as StoreRequest::ListProducts, Error = StoreError);
client_method!(StoreClient => fn create_product(params: ProductCreate) -> String as StoreRequest::CreateProduct, Error = StoreError);
client_method!(StoreClient => fn update_product(id: String, update: ProductUpdate) -> Product as StoreRequest::UpdateProduct, Error = StoreError);
client_method!(StoreClient => fn delete_product(id: String) -> () as StoreRequest::DeleteProduct, Error = StoreError);
client_method!(StoreClient => fn get_order(id: String) -> Option<Order> as StoreRequest::GetOrder, Error = StoreError);
client_method!(StoreClient => fn list_orders() -> Vec<Order> as StoreRequest::ListOrders, Error = StoreError);
client_method!(StoreClient => fn read_snapshot(keys: Vec<RecordKey>) -> Snapshot as StoreRequest::ReadSnapshot, Error = StoreError);
client_method!(StoreClient => fn commit(reads: Vec<(RecordKey, u64)>, writes: Vec<Write>) -> CommitReceipt as StoreRequest::Commit, Error = StoreError);
