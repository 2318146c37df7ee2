use crate::domain::{Cart, CartLine};

/// Cart operations on a signed-in user's profile. Every action answers with
/// the cart as it is after the change.
#[derive(Debug, Clone)]
pub enum UserAction {
    /// Adds a line, merging with an existing line for the same product.
    AddToCart(CartLine),
    SetQuantity { product_id: String, quantity: u32 },
    RemoveFromCart(String),
    /// Adds every line of a cart brought over from the device.
    MergeCart(Cart),
    /// Takes the lines of a placed order back out of the cart.
    RemoveOrdered(Cart),
    ClearCart,
}
