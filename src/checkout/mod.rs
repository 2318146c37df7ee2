//! Checkout core: validating and pricing an order, then reserving stock and
//! recording the order in one atomic step.

pub mod assembler;
pub mod context;
pub mod error;
pub mod reservation;

pub use assembler::*;
pub use context::*;
pub use error::*;
pub use reservation::*;
