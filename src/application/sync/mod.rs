//! View synchronization: a tag-invalidated query cache in front of the
//! ledger store, plus the per-control mutation lifecycle.

mod cache;
mod controller;
mod mutation;
mod query;

pub use cache::*;
pub use controller::*;
pub use mutation::*;
pub use query::*;
