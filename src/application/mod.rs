// Application layer - use cases and orchestration.
// The service owns one user's ledger, applies commands to it and then
// persists the whole document through a DocumentStore.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
