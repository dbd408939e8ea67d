use tracing::{info, instrument};

use globalsourcing_core::{Aggregate, ExpectedVersion, ProductId};
use globalsourcing_inventory::Inventory;
use globalsourcing_products::{Product, ProductCommand, RegisterProduct};

use crate::clock::Clock;
use crate::config::WorkflowConfig;
use crate::error::WorkflowResult;
use crate::lookup::Lookup;
use crate::store::{FulfillmentStore, Record, UnitOfWork};

use super::commit_with_retry;

/// Product master data. Stock only changes through the other workflows.
#[derive(Debug)]
pub struct ProductService<S, C> {
    store: S,
    clock: C,
    config: WorkflowConfig,
}

impl<S, C> ProductService<S, C> {
    pub fn new(store: S, clock: C, config: WorkflowConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }
}

impl<S, C> ProductService<S, C>
where
    S: FulfillmentStore,
    C: Clock,
{
    #[instrument(skip(self), err)]
    pub fn register(
        &self,
        name: &str,
        barcode: &str,
        price: u64,
        opening_stock: Inventory,
    ) -> WorkflowResult<Product> {
        let product_id = ProductId::new(self.store.next_id()?);
        let product = commit_with_retry(&self.store, &self.config, "product.register", || {
            let mut product = Product::empty(product_id);
            product.execute(&ProductCommand::RegisterProduct(RegisterProduct {
                product_id,
                name: name.to_string(),
                barcode: barcode.to_string(),
                price,
                opening_stock,
                occurred_at: self.clock.now(),
            }))?;

            let mut unit = UnitOfWork::new();
            unit.upsert(Record::Product(product.clone()), ExpectedVersion::Exact(0));
            Ok((unit, product))
        })?;

        info!(product_id = %product_id, "product registered");
        Ok(product)
    }

    pub fn get(&self, product_id: ProductId) -> WorkflowResult<Product> {
        Lookup::new(&self.store).product(product_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::error::WorkflowError;
    use crate::store::InMemoryFulfillmentStore;
    use globalsourcing_core::DomainError;

    fn service() -> ProductService<InMemoryFulfillmentStore, SystemClock> {
        ProductService::new(
            InMemoryFulfillmentStore::new(),
            SystemClock,
            WorkflowConfig::default(),
        )
    }

    #[test]
    fn registered_product_can_be_read_back() {
        let service = service();
        let product = service
            .register("Tea set", "6920000000011", 4_500, Inventory::new(2, 0, 1).unwrap())
            .unwrap();

        let loaded = service.get(product.id_typed()).unwrap();
        assert_eq!(loaded.name(), "Tea set");
        assert_eq!(loaded.inventory().warehouse(), 2);
        assert_eq!(loaded.inventory().hub(), 1);
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = service()
            .register("  ", "", 0, Inventory::empty())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Domain(DomainError::Validation(_))));
    }
}
