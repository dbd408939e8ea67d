//! Products domain module.
//!
//! Product master data is maintained elsewhere; this crate models the part the
//! fulfilment workflows depend on: a product exists and owns exactly one
//! inventory ledger record, which it only changes through `AdjustInventory`.

pub mod product;

pub use product::{
    AdjustInventory, InventoryAdjusted, Product, ProductCommand, ProductEvent, ProductRegistered,
    RegisterProduct,
};
