use std::sync::Arc;

use thiserror::Error;

use globalsourcing_auth::User;
use globalsourcing_core::{
    AggregateRoot, ExpectedVersion, ExpressOrderId, Page, PageRequest, ProductId,
    PurchaseOrderId, SaleOrderId, SaleOrderItemId, UserId,
};
use globalsourcing_products::Product;
use globalsourcing_purchasing::PurchaseOrder;
use globalsourcing_sales::SaleOrder;
use globalsourcing_shipping::ExpressOrder;

/// A versioned record the gateway can write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Product(Product),
    PurchaseOrder(PurchaseOrder),
    ExpressOrder(ExpressOrder),
    SaleOrder(SaleOrder),
}

impl Record {
    pub fn key(&self) -> RecordKey {
        match self {
            Record::Product(p) => RecordKey::Product(p.id_typed()),
            Record::PurchaseOrder(o) => RecordKey::PurchaseOrder(o.id_typed()),
            Record::ExpressOrder(o) => RecordKey::ExpressOrder(o.id_typed()),
            Record::SaleOrder(o) => RecordKey::SaleOrder(o.id_typed()),
        }
    }

    pub fn version(&self) -> u64 {
        match self {
            Record::Product(p) => p.version(),
            Record::PurchaseOrder(o) => o.version(),
            Record::ExpressOrder(o) => o.version(),
            Record::SaleOrder(o) => o.version(),
        }
    }
}

/// Identity of a stored record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKey {
    Product(ProductId),
    PurchaseOrder(PurchaseOrderId),
    ExpressOrder(ExpressOrderId),
    SaleOrder(SaleOrderId),
}

impl core::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RecordKey::Product(id) => write!(f, "product {id}"),
            RecordKey::PurchaseOrder(id) => write!(f, "purchase order {id}"),
            RecordKey::ExpressOrder(id) => write!(f, "express order {id}"),
            RecordKey::SaleOrder(id) => write!(f, "sale order {id}"),
        }
    }
}

/// One write of a unit of work, guarded by the version the caller observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    Upsert {
        record: Record,
        expected: ExpectedVersion,
    },
    Delete {
        key: RecordKey,
        expected: ExpectedVersion,
    },
}

impl Write {
    pub fn key(&self) -> RecordKey {
        match self {
            Write::Upsert { record, .. } => record.key(),
            Write::Delete { key, .. } => *key,
        }
    }

    pub fn expected(&self) -> ExpectedVersion {
        match self {
            Write::Upsert { expected, .. } | Write::Delete { expected, .. } => *expected,
        }
    }
}

/// Every record one workflow operation writes.
///
/// Committed all-or-nothing: if any write's expected version does not match
/// the stored version, nothing is written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitOfWork {
    writes: Vec<Write>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, record: Record, expected: ExpectedVersion) -> &mut Self {
        self.writes.push(Write::Upsert { record, expected });
        self
    }

    pub fn delete(&mut self, key: RecordKey, expected: ExpectedVersion) -> &mut Self {
        self.writes.push(Write::Delete { key, expected });
        self
    }

    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<Write> {
        self.writes
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Persistence gateway operation error.
///
/// These are **infrastructure errors** (storage, concurrency) as opposed to
/// domain errors (validation, invariants).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A record moved underneath the caller; nothing was written.
    #[error("optimistic concurrency check failed: {0}")]
    Conflict(String),

    /// The unit of work itself is malformed (duplicate keys, version going backwards).
    #[error("invalid write: {0}")]
    InvalidWrite(String),

    /// The backend cannot serve the request (e.g. poisoned lock).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Predicate used by the paged queries.
pub type Filter<'a, T> = &'a dyn Fn(&T) -> bool;

/// Durable home of products, orders and users.
///
/// ## Semantics
///
/// - Loads return the latest committed snapshot, or `None` when absent.
/// - `commit` checks every write's `ExpectedVersion` against the stored
///   version (0 = absent) and then applies all writes, or none.
/// - Paged queries filter with the given predicate and order by
///   `updated_at` descending, ties broken by id descending.
/// - `next_id` hands out positive ids from one sequence shared by every
///   entity and item kind.
pub trait FulfillmentStore: Send + Sync {
    fn next_id(&self) -> Result<u64, StoreError>;

    fn user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    fn purchase_order(&self, id: PurchaseOrderId) -> Result<Option<PurchaseOrder>, StoreError>;

    fn express_order(&self, id: ExpressOrderId) -> Result<Option<ExpressOrder>, StoreError>;

    fn sale_order(&self, id: SaleOrderId) -> Result<Option<SaleOrder>, StoreError>;

    /// The sale order owning `item_id`.
    fn sale_order_for_item(&self, item_id: SaleOrderItemId)
    -> Result<Option<SaleOrder>, StoreError>;

    fn commit(&self, unit: UnitOfWork) -> Result<(), StoreError>;

    fn page_purchase_orders(
        &self,
        filter: Filter<'_, PurchaseOrder>,
        request: PageRequest,
    ) -> Result<Page<PurchaseOrder>, StoreError>;

    fn page_express_orders(
        &self,
        filter: Filter<'_, ExpressOrder>,
        request: PageRequest,
    ) -> Result<Page<ExpressOrder>, StoreError>;

    fn page_sale_orders(
        &self,
        filter: Filter<'_, SaleOrder>,
        request: PageRequest,
    ) -> Result<Page<SaleOrder>, StoreError>;
}

impl<S> FulfillmentStore for Arc<S>
where
    S: FulfillmentStore + ?Sized,
{
    fn next_id(&self) -> Result<u64, StoreError> {
        (**self).next_id()
    }

    fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        (**self).user(id)
    }

    fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        (**self).product(id)
    }

    fn purchase_order(&self, id: PurchaseOrderId) -> Result<Option<PurchaseOrder>, StoreError> {
        (**self).purchase_order(id)
    }

    fn express_order(&self, id: ExpressOrderId) -> Result<Option<ExpressOrder>, StoreError> {
        (**self).express_order(id)
    }

    fn sale_order(&self, id: SaleOrderId) -> Result<Option<SaleOrder>, StoreError> {
        (**self).sale_order(id)
    }

    fn sale_order_for_item(
        &self,
        item_id: SaleOrderItemId,
    ) -> Result<Option<SaleOrder>, StoreError> {
        (**self).sale_order_for_item(item_id)
    }

    fn commit(&self, unit: UnitOfWork) -> Result<(), StoreError> {
        (**self).commit(unit)
    }

    fn page_purchase_orders(
        &self,
        filter: Filter<'_, PurchaseOrder>,
        request: PageRequest,
    ) -> Result<Page<PurchaseOrder>, StoreError> {
        (**self).page_purchase_orders(filter, request)
    }

    fn page_express_orders(
        &self,
        filter: Filter<'_, ExpressOrder>,
        request: PageRequest,
    ) -> Result<Page<ExpressOrder>, StoreError> {
        (**self).page_express_orders(filter, request)
    }

    fn page_sale_orders(
        &self,
        filter: Filter<'_, SaleOrder>,
        request: PageRequest,
    ) -> Result<Page<SaleOrder>, StoreError> {
        (**self).page_sale_orders(filter, request)
    }
}
