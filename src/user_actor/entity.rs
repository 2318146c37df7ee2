use crate::actor_framework::{Entity, FrameworkError};
use crate::domain::{Cart, UserCreate, UserProfile, UserUpdate};

use super::actions::UserAction;

impl Entity for UserProfile {
    type Id = String;
    type CreateParams = UserCreate;
    type Update = UserUpdate;
    type Action = UserAction;
    type ActionResult = Cart;

    /// Creates a profile with an empty cart.
    ///
    /// # Errors
    /// Rejects a blank name or an email without an `@`.
    fn from_create_params(id: String, params: UserCreate) -> Result<Self, FrameworkError> {
        let name = params.name.trim();
        if name.is_empty() {
            return Err(FrameworkError::Rejected("name is required".to_string()));
        }
        if !params.email.contains('@') {
            return Err(FrameworkError::Rejected(format!("invalid email: {}", params.email)));
        }
        Ok(Self {
            id,
            name: name.to_string(),
            email: params.email.trim().to_string(),
            cart: Cart::new(),
        })
    }

    fn on_update(&mut self, update: UserUpdate) -> Result<(), FrameworkError> {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(email) = update.email {
            self.email = email;
        }
        Ok(())
    }

    fn handle_action(&mut self, action: UserAction) -> Result<Cart, FrameworkError> {
        let result = match action {
            UserAction::AddToCart(line) => self.cart.add(line),
            UserAction::SetQuantity { product_id, quantity } => {
                self.cart.set_quantity(&product_id, quantity)
            }
            UserAction::RemoveFromCart(product_id) => self.cart.remove(&product_id).map(|_| ()),
            UserAction::MergeCart(other) => self.cart.merge(other),
            UserAction::RemoveOrdered(ordered) => {
                self.cart.remove_ordered(&ordered);
                Ok(())
            }
            UserAction::ClearCart => {
                self.cart.clear();
                Ok(())
            }
        };
        result.map_err(|e| FrameworkError::Rejected(e.to_string()))?;
        Ok(self.cart.clone())
    }
}
