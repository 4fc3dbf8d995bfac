mod category;
mod ledger;
mod money;
mod transaction;
mod transfer;
mod wallet;

pub use category::*;
pub use ledger::*;
pub use money::*;
pub use transaction::*;
pub use transfer::*;
pub use wallet::*;
