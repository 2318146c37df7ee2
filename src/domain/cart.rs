use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CartError {
    #[error("Quantity must be at least 1, got {0}")]
    InvalidQuantity(u32),
    #[error("Product is not in the cart: {0}")]
    NotInCart(String),
}

/// One product in a shopping cart. Name and color are captured when the
/// product is added so the cart renders without a catalog lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub quantity: u32,
}

impl CartLine {
    pub fn new(product_id: impl Into<String>, name: impl Into<String>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            color: None,
            quantity,
        }
    }
}

/// Mutable precursor of an order. Holds at most one line per product and
/// every line has a quantity of at least 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    #[serde(default)]
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    pub fn line(&self, product_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id == product_id)
    }

    /// Adds a line, merging into an existing line for the same product.
    pub fn add(&mut self, line: CartLine) -> Result<(), CartError> {
        if line.quantity == 0 {
            return Err(CartError::InvalidQuantity(line.quantity));
        }
        match self.lines.iter_mut().find(|l| l.product_id == line.product_id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => self.lines.push(line),
        }
        Ok(())
    }

    pub fn set_quantity(&mut self, product_id: &str, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity(quantity));
        }
        let line = self
            .lines
            .iter_mut()
            .find(|line| line.product_id == product_id)
            .ok_or_else(|| CartError::NotInCart(product_id.to_string()))?;
        line.quantity = quantity;
        Ok(())
    }

    pub fn remove(&mut self, product_id: &str) -> Result<CartLine, CartError> {
        let index = self
            .lines
            .iter()
            .position(|line| line.product_id == product_id)
            .ok_or_else(|| CartError::NotInCart(product_id.to_string()))?;
        Ok(self.lines.remove(index))
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Takes the quantities in `ordered` back out of this cart. Lines drop
    /// out when nothing is left; lines added since `ordered` was read stay.
    pub fn remove_ordered(&mut self, ordered: &Cart) {
        for taken in &ordered.lines {
            if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == taken.product_id) {
                line.quantity = line.quantity.saturating_sub(taken.quantity);
            }
        }
        self.lines.retain(|line| line.quantity > 0);
    }

    /// Adds every line of `other` into this cart.
    pub fn merge(&mut self, other: Cart) -> Result<(), CartError> {
        for line in other.lines {
            self.add(line)?;
        }
        Ok(())
    }
}
