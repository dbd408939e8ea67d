//! Sale Orders domain module.
//!
//! This crate contains business rules for customer sale orders, from payment
//! to (possibly partial) delivery out of the domestic hub, implemented purely
//! as deterministic domain logic (no IO, no HTTP, no storage).

pub mod order;

pub use order::{
    AddItem, CreateSaleOrder, DeliverItem, DeliverSaleOrder, DetailsUpdated, ItemAdded,
    ItemDelivered, ItemDispatch, ItemRemoved, ItemUpdated, NewSaleItem, PaymentRecorded,
    RecordPayment, RemoveItem, SaleOrder, SaleOrderAction, SaleOrderCommand, SaleOrderCreated,
    SaleOrderDelivered, SaleOrderEvent, SaleOrderItem, SaleOrderStatus, Shipment,
    UpdateDetails, UpdateItem, TRANSITIONS,
};
