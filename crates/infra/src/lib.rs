//! Infrastructure layer: persistence gateway, lookups, workflow services.
//!
//! Domain crates decide; this crate loads their state, runs their commands,
//! turns the resulting events into inventory ledger adjustments and commits
//! every touched record in one atomic unit of work.

pub mod clock;
pub mod config;
pub mod error;
pub mod finance;
pub mod ledger;
pub mod lookup;
pub mod store;
pub mod workflows;

#[cfg(test)]
mod integration_tests;

pub use clock::{Clock, SteppingClock, SystemClock};
pub use config::WorkflowConfig;
pub use error::{WorkflowError, WorkflowResult};
pub use finance::{BuyerTotal, FinanceReport, FinanceService, SalespersonTotal};
pub use ledger::StagedLedger;
pub use lookup::Lookup;
pub use store::{
    FulfillmentStore, InMemoryFulfillmentStore, Record, RecordKey, StoreError, UnitOfWork, Write,
};
pub use workflows::{
    ExpressItemRequest, ExpressOrderService, ProductService, PurchaseOrderService,
    SaleItemRequest, SaleOrderService,
};
