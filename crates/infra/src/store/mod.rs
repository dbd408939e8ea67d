//! Persistence gateway boundary.
//!
//! Workflows never write a record directly: they hand the gateway a
//! `UnitOfWork` listing every record they touched together with the version
//! they read, and the gateway commits all of it or none of it.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryFulfillmentStore;
pub use r#trait::{Filter, FulfillmentStore, Record, RecordKey, StoreError, UnitOfWork, Write};
