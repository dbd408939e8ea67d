//! `globalsourcing-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the error model, the aggregate decide/apply contract, status
//! transition tables and pagination types shared by every workflow crate.

pub mod aggregate;
pub mod error;
pub mod event;
pub mod id;
pub mod page;
pub mod transition;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use event::Event;
pub use id::{
    ExpressOrderId, ExpressOrderItemId, ProductId, PurchaseOrderId, SaleOrderId, SaleOrderItemId,
    UserId,
};
pub use page::{Page, PageRequest};
pub use transition::TransitionTable;
