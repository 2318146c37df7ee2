//! In-process document store holding the product and order collections.
//!
//! Records carry a version that is bumped on every write. Transactions read a
//! consistent [`Snapshot`], decide on a set of [`Write`]s, and commit them only
//! if none of the records they read changed in the meantime (see
//! [`StoreClient::run_transaction`]).

pub mod actor;
pub mod client;
pub mod error;
pub mod messages;
pub mod transaction;

pub use actor::*;
pub use client::*;
pub use error::*;
pub use messages::*;
pub use transaction::*;
