mod account;
mod ledger;
mod money;
mod stats;
mod style;
mod transaction;

pub use account::*;
pub use ledger::*;
pub use money::*;
pub use stats::*;
pub use style::*;
pub use transaction::*;
