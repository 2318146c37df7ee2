//! Typed handles the storefront pages talk to.

#[macro_use]
mod macros;

pub mod admin_client;
pub mod cart_client;
pub mod checkout_client;
pub mod user_client;

pub use admin_client::*;
pub use cart_client::*;
pub use checkout_client::*;
pub use user_client::*;
