//! Cart storage for visitors who are not signed in.
//!
//! The cart is kept as a JSON document in a file on the device so it
//! survives restarts. Access goes through a mutex so concurrent
//! read-modify-write cycles from the same process cannot lose updates.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::domain::Cart;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LocalStoreError {
    #[error("Local cart I/O error: {0}")]
    Io(String),
    #[error("Local cart is corrupt: {0}")]
    Corrupt(String),
}

#[derive(Debug, Clone)]
pub struct LocalCartStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl LocalCartStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Reads the stored cart. A missing file is an empty cart.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<Cart, LocalStoreError> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    #[instrument(skip(self, cart), fields(path = %self.path.display(), lines = cart.lines().len()))]
    pub async fn save(&self, cart: &Cart) -> Result<(), LocalStoreError> {
        let _guard = self.lock.lock().await;
        self.write(cart).await
    }

    /// Applies `change` to the stored cart and writes it back. Nothing is
    /// written when `change` fails.
    pub async fn modify<F, E>(&self, change: F) -> Result<Cart, E>
    where
        F: FnOnce(&mut Cart) -> Result<(), E>,
        E: From<LocalStoreError>,
    {
        let _guard = self.lock.lock().await;
        let mut cart = self.read().await?;
        change(&mut cart)?;
        self.write(&cart).await?;
        Ok(cart)
    }

    /// Removes the stored cart, e.g. once an order has been placed.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn clear(&self) -> Result<(), LocalStoreError> {
        let _guard = self.lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LocalStoreError::Io(e.to_string())),
        }
    }

    async fn read(&self) -> Result<Cart, LocalStoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| LocalStoreError::Corrupt(e.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Cart::new()),
            Err(e) => Err(LocalStoreError::Io(e.to_string())),
        }
    }

    async fn write(&self, cart: &Cart) -> Result<(), LocalStoreError> {
        let bytes = serde_json::to_vec_pretty(cart).map_err(|e| LocalStoreError::Corrupt(e.to_string()))?;
        // Write-then-rename so a crash never leaves half a cart behind.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| LocalStoreError::Io(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| LocalStoreError::Io(e.to_string()))?;
        debug!("Local cart written");
        Ok(())
    }
}
