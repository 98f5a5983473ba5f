pub mod ledger;
pub mod payable;
pub mod penalty;
pub mod ports;
