use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::actor_framework::ResourceActor;
use crate::clients::{AdminClient, CartClient, CheckoutClient, UserClient};
use crate::config::AppConfig;
use crate::domain::UserProfile;
use crate::local_cart::LocalCartStore;
use crate::store::{StoreActor, StoreClient};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SystemError {
    #[error("Failed to stop actor: {0}")]
    Shutdown(String),
    #[error("Actor task failed: {0}")]
    TaskFailed(String),
}

/// Starts the store and user actors and wires the clients on top of them.
pub struct StorefrontSystem {
    pub store: StoreClient,
    pub users: UserClient,
    pub carts: CartClient,
    pub checkout: CheckoutClient,
    pub admin: AdminClient,
    handles: Vec<JoinHandle<()>>,
}

impl StorefrontSystem {
    pub fn new(config: AppConfig) -> Self {
        let buffer = config.store.channel_buffer;

        let (store_actor, store) = StoreActor::new(buffer);
        let store_handle = tokio::spawn(store_actor.run());

        let user_id_counter = Arc::new(AtomicU64::new(1));
        let next_user_id = move || format!("user_{}", user_id_counter.fetch_add(1, Ordering::SeqCst));
        let (user_actor, user_resource_client) = ResourceActor::<UserProfile>::new(buffer, next_user_id);
        let users = UserClient::new(user_resource_client);
        let user_handle = tokio::spawn(user_actor.run());

        let local = LocalCartStore::new(config.local_cart_path);
        let carts = CartClient::new(users.clone(), local);
        let checkout = CheckoutClient::new(store.clone(), carts.clone(), config.pricing);
        let admin = AdminClient::new(store.clone(), config.store.max_attempts);

        info!(buffer, max_attempts = config.store.max_attempts, "Storefront system started");
        Self {
            store,
            users,
            carts,
            checkout,
            admin,
            handles: vec![store_handle, user_handle],
        }
    }

    /// Stops both actors and waits for their tasks to finish.
    pub async fn shutdown(self) -> Result<(), SystemError> {
        info!("Shutting down storefront system");
        self.store
            .shutdown()
            .await
            .map_err(|e| SystemError::Shutdown(e.to_string()))?;
        self.users
            .shutdown()
            .await
            .map_err(|e| SystemError::Shutdown(e.to_string()))?;

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Actor task failed");
                return Err(SystemError::TaskFailed(e.to_string()));
            }
        }

        info!("Storefront system shutdown complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserCreate;

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            local_cart_path: dir.path().join("cart.json"),
            ..AppConfig::default()
        };
        let system = StorefrontSystem::new(config);

        let user_id = system
            .users
            .create_user(UserCreate {
                name: "Farhan".to_string(),
                email: "farhan@example.com".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(user_id, "user_1");
        assert!(system.admin.list_products().await.unwrap().is_empty());

        let store = system.store.clone();
        system.shutdown().await.unwrap();
        assert!(store.list_products().await.is_err());
    }
}
