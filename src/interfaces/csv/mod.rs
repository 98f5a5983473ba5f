pub mod ledger_reader;
pub mod rule_reader;
pub mod view_writer;
