//! Purchasing domain module (Purchase Orders).
//!
//! This crate contains the purchase-order lifecycle from request to
//! warehousing, implemented purely as deterministic domain logic (no IO, no
//! storage). Stock effects are reported through `GoodsWarehoused` events and
//! applied to the ledger by the caller.

pub mod order;

pub use order::{
    AssignBuyer, AssignWarehouseKeeper, BuyerAssigned, CreatePurchaseOrder,
    ForceFinishWarehousing, GoodsWarehoused, PurchaseInfo, PurchaseInfoRejected,
    PurchaseInfoUploaded, PurchaseOrder, PurchaseOrderAction, PurchaseOrderCommand,
    PurchaseOrderCreated, PurchaseOrderEvent, PurchaseOrderStatus, PutIntoWarehouse,
    RejectPurchaseInfo, UploadPurchaseInfo, WarehouseKeeperAssigned, WarehousingForceFinished,
    TRANSITIONS,
};
