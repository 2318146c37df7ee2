//! User profiles and the signed-in cart stored on them.

mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use error::*;
