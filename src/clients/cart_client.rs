use thiserror::Error;
use tracing::{info, instrument};

use crate::checkout::OrderContext;
use crate::domain::{Cart, CartError, CartLine, Identity, Product};
use crate::local_cart::{LocalCartStore, LocalStoreError};
use crate::user_actor::UserError;

use super::UserClient;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CartServiceError {
    #[error(transparent)]
    Cart(#[from] CartError),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Local(#[from] LocalStoreError),
}

/// Routes cart operations to wherever the cart lives: the profile of a
/// signed-in user, or the device-local store for an anonymous visitor.
/// A cart is never kept in both places.
#[derive(Clone)]
pub struct CartClient {
    users: UserClient,
    local: LocalCartStore,
}

impl CartClient {
    pub fn new(users: UserClient, local: LocalCartStore) -> Self {
        Self { users, local }
    }

    #[instrument(skip(self))]
    pub async fn cart_for(&self, identity: &Identity) -> Result<Cart, CartServiceError> {
        match identity {
            Identity::Anonymous => Ok(self.local.load().await?),
            Identity::SignedIn(user_id) => {
                let profile = self
                    .users
                    .get_user(user_id.clone())
                    .await?
                    .ok_or_else(|| UserError::NotFound(user_id.clone()))?;
                Ok(profile.cart)
            }
        }
    }

    /// Loads the current cart into a fresh [`OrderContext`] for a checkout page.
    pub async fn context_for(&self, identity: Identity) -> Result<OrderContext, CartServiceError> {
        let cart = self.cart_for(&identity).await?;
        Ok(OrderContext::new(identity, cart))
    }

    /// Adds `quantity` of `product`, capturing its name and color on the line.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_to_cart(
        &self,
        identity: &Identity,
        product: &Product,
        quantity: u32,
    ) -> Result<Cart, CartServiceError> {
        let line = CartLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            color: product.color.clone(),
            quantity,
        };
        match identity {
            Identity::Anonymous => {
                self.local
                    .modify(|cart| cart.add(line).map_err(CartServiceError::from))
                    .await
            }
            Identity::SignedIn(user_id) => Ok(self.users.add_to_cart(user_id.clone(), line).await?),
        }
    }

    #[instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        identity: &Identity,
        product_id: &str,
        quantity: u32,
    ) -> Result<Cart, CartServiceError> {
        match identity {
            Identity::Anonymous => {
                self.local
                    .modify(|cart| cart.set_quantity(product_id, quantity).map_err(CartServiceError::from))
                    .await
            }
            Identity::SignedIn(user_id) => Ok(self
                .users
                .set_cart_quantity(user_id.clone(), product_id.to_string(), quantity)
                .await?),
        }
    }

    #[instrument(skip(self))]
    pub async fn remove_from_cart(&self, identity: &Identity, product_id: &str) -> Result<Cart, CartServiceError> {
        match identity {
            Identity::Anonymous => {
                self.local
                    .modify(|cart| cart.remove(product_id).map(|_| ()).map_err(CartServiceError::from))
                    .await
            }
            Identity::SignedIn(user_id) => Ok(self
                .users
                .remove_from_cart(user_id.clone(), product_id.to_string())
                .await?),
        }
    }

    #[instrument(skip(self))]
    pub async fn clear_cart(&self, identity: &Identity) -> Result<(), CartServiceError> {
        match identity {
            Identity::Anonymous => self.local.clear().await?,
            Identity::SignedIn(user_id) => {
                self.users.clear_cart(user_id.clone()).await?;
            }
        }
        Ok(())
    }

    /// Takes the lines of a placed order out of the stored cart, leaving
    /// anything added after `ordered` was loaded.
    #[instrument(skip(self, ordered), fields(lines = ordered.lines().len()))]
    pub async fn remove_ordered(&self, identity: &Identity, ordered: &Cart) -> Result<Cart, CartServiceError> {
        match identity {
            Identity::Anonymous => {
                self.local
                    .modify(|cart| {
                        cart.remove_ordered(ordered);
                        Ok::<_, CartServiceError>(())
                    })
                    .await
            }
            Identity::SignedIn(user_id) => Ok(self.users.remove_ordered(user_id.clone(), ordered.clone()).await?),
        }
    }

    /// Moves the anonymous cart onto the user's profile after sign-in.
    #[instrument(skip(self))]
    pub async fn merge_local_into_user(&self, user_id: &str) -> Result<Cart, CartServiceError> {
        let local = self.local.load().await?;
        if local.is_empty() {
            return self.cart_for(&Identity::SignedIn(user_id.to_string())).await;
        }

        let lines = local.lines().len();
        let merged = self.users.merge_cart(user_id.to_string(), local).await?;
        self.local.clear().await?;
        info!(lines, "Local cart merged into profile");
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor_framework::ResourceActor;
    use crate::domain::{UserCreate, UserProfile};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    async fn cart_client(dir: &tempfile::TempDir) -> (CartClient, String) {
        let counter = Arc::new(AtomicU64::new(1));
        let (actor, inner) = ResourceActor::<UserProfile>::new(16, move || {
            format!("user_{}", counter.fetch_add(1, Ordering::SeqCst))
        });
        tokio::spawn(actor.run());
        let users = UserClient::new(inner);
        let user_id = users
            .create_user(UserCreate {
                name: "Nusrat".to_string(),
                email: "nusrat@example.com".to_string(),
            })
            .await
            .unwrap();
        let local = LocalCartStore::new(dir.path().join("cart.json"));
        (CartClient::new(users, local), user_id)
    }

    fn kurti() -> Product {
        let mut product = Product::new("product_1", "Kurti", 650, 10);
        product.color = Some("Maroon".to_string());
        product
    }

    #[tokio::test]
    async fn test_anonymous_and_signed_in_carts_are_separate() {
        let dir = tempfile::tempdir().unwrap();
        let (carts, user_id) = cart_client(&dir).await;
        let user = Identity::SignedIn(user_id);

        carts.add_to_cart(&Identity::Anonymous, &kurti(), 2).await.unwrap();
        let signed_in = carts.add_to_cart(&user, &kurti(), 1).await.unwrap();

        assert_eq!(signed_in.total_quantity(), 1);
        assert_eq!(carts.cart_for(&Identity::Anonymous).await.unwrap().total_quantity(), 2);
        let line = &signed_in.lines()[0];
        assert_eq!(line.name, "Kurti");
        assert_eq!(line.color.as_deref(), Some("Maroon"));
    }

    #[tokio::test]
    async fn test_cart_edits_for_both_identities() {
        let dir = tempfile::tempdir().unwrap();
        let (carts, user_id) = cart_client(&dir).await;

        for identity in [Identity::Anonymous, Identity::SignedIn(user_id)] {
            carts.add_to_cart(&identity, &kurti(), 1).await.unwrap();
            let cart = carts.set_quantity(&identity, "product_1", 4).await.unwrap();
            assert_eq!(cart.total_quantity(), 4);

            let err = carts.set_quantity(&identity, "product_1", 0).await.unwrap_err();
            assert!(matches!(
                err,
                CartServiceError::Cart(CartError::InvalidQuantity(0)) | CartServiceError::User(UserError::ValidationError(_))
            ));

            let cart = carts.remove_from_cart(&identity, "product_1").await.unwrap();
            assert!(cart.is_empty());
        }
    }

    #[tokio::test]
    async fn test_merge_moves_local_lines_to_profile() {
        let dir = tempfile::tempdir().unwrap();
        let (carts, user_id) = cart_client(&dir).await;
        let user = Identity::SignedIn(user_id.clone());

        carts.add_to_cart(&Identity::Anonymous, &kurti(), 2).await.unwrap();
        carts.add_to_cart(&user, &kurti(), 1).await.unwrap();

        let merged = carts.merge_local_into_user(&user_id).await.unwrap();
        assert_eq!(merged.total_quantity(), 3);
        assert_eq!(merged.lines().len(), 1);
        assert!(carts.cart_for(&Identity::Anonymous).await.unwrap().is_empty());

        let again = carts.merge_local_into_user(&user_id).await.unwrap();
        assert_eq!(again.total_quantity(), 3);
    }

    #[tokio::test]
    async fn test_remove_ordered_and_clear_for_both_identities() {
        let dir = tempfile::tempdir().unwrap();
        let (carts, user_id) = cart_client(&dir).await;
        let saree = Product::new("product_2", "Saree", 2500, 3);

        for identity in [Identity::Anonymous, Identity::SignedIn(user_id)] {
            carts.add_to_cart(&identity, &kurti(), 2).await.unwrap();
            let ordered = carts.cart_for(&identity).await.unwrap();
            carts.add_to_cart(&identity, &saree, 1).await.unwrap();

            let left = carts.remove_ordered(&identity, &ordered).await.unwrap();
            assert_eq!(left.lines().len(), 1);
            assert_eq!(left.line("product_2").map(|l| l.quantity), Some(1));

            carts.clear_cart(&identity).await.unwrap();
            assert!(carts.cart_for(&identity).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_unknown_user_cart_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (carts, _) = cart_client(&dir).await;

        let err = carts.cart_for(&Identity::SignedIn("user_99".to_string())).await.unwrap_err();
        assert_eq!(err, CartServiceError::User(UserError::NotFound("user_99".to_string())));
    }
}
