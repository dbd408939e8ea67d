//! Per-operation staging of inventory adjustments.
//!
//! A workflow that moves goods may touch the same product several times (two
//! express items for one product, say). The staged ledger loads each product
//! once, applies every adjustment to that in-memory copy in order and only at
//! the end hands the changed products to the unit of work, each guarded by
//! the version it was loaded at. A failing adjustment leaves the staged copy
//! untouched and, since nothing has been committed yet, aborts the whole
//! operation with no stock moved.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use chrono::{DateTime, Utc};
use tracing::debug;

use globalsourcing_core::{Aggregate, AggregateRoot, ExpectedVersion, ProductId};
use globalsourcing_inventory::{Inventory, StockDelta};
use globalsourcing_products::{AdjustInventory, Product, ProductCommand};

use crate::error::WorkflowResult;
use crate::lookup::Lookup;
use crate::store::{FulfillmentStore, Record, UnitOfWork};

#[derive(Debug)]
struct StagedProduct {
    product: Product,
    base_version: u64,
}

pub struct StagedLedger<'a, S: ?Sized> {
    store: &'a S,
    staged: BTreeMap<ProductId, StagedProduct>,
}

impl<'a, S> StagedLedger<'a, S>
where
    S: FulfillmentStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            staged: BTreeMap::new(),
        }
    }

    fn staged(&mut self, product_id: ProductId) -> WorkflowResult<&mut StagedProduct> {
        match self.staged.entry(product_id) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let product = Lookup::new(self.store).product(product_id)?;
                let base_version = product.version();
                Ok(entry.insert(StagedProduct {
                    product,
                    base_version,
                }))
            }
        }
    }

    /// Apply `delta` on top of whatever was already staged for the product.
    ///
    /// Fails with `InsufficientStock` when any counter would go negative; the
    /// staged balance is then left as it was.
    pub fn adjust(
        &mut self,
        product_id: ProductId,
        delta: StockDelta,
        occurred_at: DateTime<Utc>,
    ) -> WorkflowResult<Inventory> {
        let entry = self.staged(product_id)?;
        entry
            .product
            .execute(&ProductCommand::AdjustInventory(AdjustInventory {
                product_id,
                delta,
                occurred_at,
            }))?;

        debug!(
            product_id = %product_id,
            warehouse = delta.warehouse,
            midway = delta.midway,
            hub = delta.hub,
            "staged inventory adjustment"
        );
        Ok(*entry.product.inventory())
    }

    /// Current balance including everything staged so far.
    pub fn inventory(&mut self, product_id: ProductId) -> WorkflowResult<Inventory> {
        Ok(*self.staged(product_id)?.product.inventory())
    }

    /// Number of products whose balance changed.
    pub fn changed(&self) -> usize {
        self.staged
            .values()
            .filter(|s| s.product.version() != s.base_version)
            .count()
    }

    /// Add every changed product to `unit`, each expecting its loaded version.
    pub fn stage_into(self, unit: &mut UnitOfWork) {
        for staged in self.staged.into_values() {
            if staged.product.version() == staged.base_version {
                continue;
            }
            unit.upsert(
                Record::Product(staged.product),
                ExpectedVersion::Exact(staged.base_version),
            );
        }
    }
}
