use tracing::{debug, instrument};

use crate::actor_framework::ResourceClient;
use crate::domain::{Cart, CartLine, UserCreate, UserProfile, UserUpdate};
use crate::user_actor::{UserAction, UserError};

/// Client for the user profile actor.
#[derive(Clone)]
pub struct UserClient {
    inner: ResourceClient<UserProfile>,
}

impl_basic_client!(UserClient, UserProfile, UserError, user);

impl UserClient {
    #[instrument(skip(self))]
    pub async fn create_user(&self, params: UserCreate) -> Result<String, UserError> {
        debug!("Sending request");
        self.inner.create(params).await.map_err(UserError::from)
    }

    #[instrument(skip(self))]
    pub async fn update_user(&self, id: String, update: UserUpdate) -> Result<UserProfile, UserError> {
        debug!("Sending request");
        self.inner.update(id, update).await.map_err(UserError::from)
    }

    #[instrument(skip(self))]
    pub async fn add_to_cart(&self, user_id: String, line: CartLine) -> Result<Cart, UserError> {
        self.cart_action(user_id, UserAction::AddToCart(line)).await
    }

    #[instrument(skip(self))]
    pub async fn set_cart_quantity(&self, user_id: String, product_id: String, quantity: u32) -> Result<Cart, UserError> {
        self.cart_action(user_id, UserAction::SetQuantity { product_id, quantity }).await
    }

    #[instrument(skip(self))]
    pub async fn remove_from_cart(&self, user_id: String, product_id: String) -> Result<Cart, UserError> {
        self.cart_action(user_id, UserAction::RemoveFromCart(product_id)).await
    }

    #[instrument(skip(self, cart))]
    pub async fn merge_cart(&self, user_id: String, cart: Cart) -> Result<Cart, UserError> {
        self.cart_action(user_id, UserAction::MergeCart(cart)).await
    }

    #[instrument(skip(self, ordered))]
    pub async fn remove_ordered(&self, user_id: String, ordered: Cart) -> Result<Cart, UserError> {
        self.cart_action(user_id, UserAction::RemoveOrdered(ordered)).await
    }

    #[instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: String) -> Result<Cart, UserError> {
        self.cart_action(user_id, UserAction::ClearCart).await
    }

    pub async fn shutdown(&self) -> Result<(), UserError> {
        self.inner.shutdown().await.map_err(UserError::from)
    }

    async fn cart_action(&self, user_id: String, action: UserAction) -> Result<Cart, UserError> {
        debug!("Sending request");
        self.inner.perform_action(user_id, action).await.map_err(UserError::from)
    }
}
