//! Shipping domain module (cross-border express orders).
//!
//! An express order carries goods from the origin warehouse to the domestic
//! hub. The aggregate decides shipment and receipt; the stock moves implied by
//! its events are applied to the ledger by the caller.

pub mod order;

pub use order::{
    CreateExpressOrder, DeliverExpressOrder, ExpressOrder, ExpressOrderAction,
    ExpressOrderCommand, ExpressOrderCreated, ExpressOrderDelivered, ExpressOrderEvent,
    ExpressOrderItem, ExpressOrderReceived, ExpressOrderStatus, NewExpressItem, ReceiveExpressOrder,
    ReceivedQuantity, TRANSITIONS,
};
