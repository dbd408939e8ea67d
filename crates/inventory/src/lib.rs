//! Inventory ledger module.
//!
//! A product's stock lives in three places: the origin warehouse, in transit
//! ("midway") and the domestic hub. This crate holds the counters and the
//! arithmetic for moving goods between them, implemented purely as
//! deterministic domain logic (no IO, no storage).

pub mod ledger;

pub use ledger::{Inventory, StockDelta, StockLocation};
