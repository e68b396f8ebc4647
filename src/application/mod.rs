// Application layer - everything between user input and the ledger store:
// input validation, the store contract and view synchronization.

pub mod error;
pub mod store;
pub mod sync;
pub mod validation;

pub use error::*;
pub use store::*;
pub use sync::*;
pub use validation::*;
