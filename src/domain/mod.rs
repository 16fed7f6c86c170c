mod breakdown;
mod calendar;
mod ledger;
mod money;
mod savings;
mod transaction;

pub use breakdown::*;
pub use calendar::*;
pub use ledger::*;
pub use money::*;
pub use savings::*;
pub use transaction::*;
