use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use globalsourcing_auth::User;
use globalsourcing_core::{
    AggregateRoot, ExpectedVersion, ExpressOrderId, Page, PageRequest, ProductId,
    PurchaseOrderId, SaleOrderId, SaleOrderItemId, UserId,
};
use globalsourcing_products::Product;
use globalsourcing_purchasing::PurchaseOrder;
use globalsourcing_sales::SaleOrder;
use globalsourcing_shipping::ExpressOrder;

use super::r#trait::{Filter, FulfillmentStore, Record, RecordKey, StoreError, UnitOfWork, Write};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    products: HashMap<ProductId, Product>,
    purchase_orders: HashMap<PurchaseOrderId, PurchaseOrder>,
    express_orders: HashMap<ExpressOrderId, ExpressOrder>,
    sale_orders: HashMap<SaleOrderId, SaleOrder>,
    /// Owning order of every stored sale-order item.
    sale_items: HashMap<SaleOrderItemId, SaleOrderId>,
}

impl Tables {
    fn stored_version(&self, key: RecordKey) -> u64 {
        match key {
            RecordKey::Product(id) => self.products.get(&id).map(|r| r.version()),
            RecordKey::PurchaseOrder(id) => self.purchase_orders.get(&id).map(|r| r.version()),
            RecordKey::ExpressOrder(id) => self.express_orders.get(&id).map(|r| r.version()),
            RecordKey::SaleOrder(id) => self.sale_orders.get(&id).map(|r| r.version()),
        }
        .unwrap_or(0)
    }

    fn unindex_sale_order(&mut self, id: SaleOrderId) {
        if let Some(previous) = self.sale_orders.get(&id) {
            for item in previous.items() {
                self.sale_items.remove(&item.id);
            }
        }
    }

    fn upsert(&mut self, record: Record) {
        match record {
            Record::Product(p) => {
                self.products.insert(p.id_typed(), p);
            }
            Record::PurchaseOrder(o) => {
                self.purchase_orders.insert(o.id_typed(), o);
            }
            Record::ExpressOrder(o) => {
                self.express_orders.insert(o.id_typed(), o);
            }
            Record::SaleOrder(o) => {
                let id = o.id_typed();
                self.unindex_sale_order(id);
                for item in o.items() {
                    self.sale_items.insert(item.id, id);
                }
                self.sale_orders.insert(id, o);
            }
        }
    }

    fn delete(&mut self, key: RecordKey) {
        match key {
            RecordKey::Product(id) => {
                self.products.remove(&id);
            }
            RecordKey::PurchaseOrder(id) => {
                self.purchase_orders.remove(&id);
            }
            RecordKey::ExpressOrder(id) => {
                self.express_orders.remove(&id);
            }
            RecordKey::SaleOrder(id) => {
                self.unindex_sale_order(id);
                self.sale_orders.remove(&id);
            }
        }
    }
}

/// In-memory persistence gateway.
///
/// Every table sits behind one `RwLock`, so a commit validates and applies its
/// whole unit of work under a single write guard. Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryFulfillmentStore {
    sequence: AtomicU64,
    tables: RwLock<Tables>,
}

impl InMemoryFulfillmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user. Users are master data and have no workflow of their own.
    pub fn insert_user(&self, user: User) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.users.insert(user.id, user);
        Ok(())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn validate(tables: &Tables, writes: &[Write]) -> Result<(), StoreError> {
        let mut seen = HashSet::with_capacity(writes.len());
        for write in writes {
            let key = write.key();
            if !seen.insert(key) {
                return Err(StoreError::InvalidWrite(format!(
                    "{key} appears more than once in one unit of work"
                )));
            }

            let current = tables.stored_version(key);
            let expected = write.expected();
            if !expected.matches(current) {
                return Err(StoreError::Conflict(format!(
                    "{key}: expected {expected:?}, found {current}"
                )));
            }

            if let (Write::Upsert { record, .. }, ExpectedVersion::Exact(base)) = (write, expected)
            {
                if record.version() <= base {
                    return Err(StoreError::InvalidWrite(format!(
                        "{key}: version {} does not advance past {base}",
                        record.version()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Most recently updated first, ties by id descending.
fn page_sorted<T, K>(
    rows: impl Iterator<Item = T>,
    filter: Filter<'_, T>,
    request: PageRequest,
    sort_key: impl Fn(&T) -> (Option<DateTime<Utc>>, K),
) -> Page<T>
where
    K: Ord,
{
    let mut matching: Vec<T> = rows.filter(|row| filter(row)).collect();
    matching.sort_by(|a, b| sort_key(b).cmp(&sort_key(a)));
    Page::from_ordered(matching, request)
}

impl FulfillmentStore for InMemoryFulfillmentStore {
    fn next_id(&self) -> Result<u64, StoreError> {
        Ok(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    fn purchase_order(&self, id: PurchaseOrderId) -> Result<Option<PurchaseOrder>, StoreError> {
        Ok(self.read()?.purchase_orders.get(&id).cloned())
    }

    fn express_order(&self, id: ExpressOrderId) -> Result<Option<ExpressOrder>, StoreError> {
        Ok(self.read()?.express_orders.get(&id).cloned())
    }

    fn sale_order(&self, id: SaleOrderId) -> Result<Option<SaleOrder>, StoreError> {
        Ok(self.read()?.sale_orders.get(&id).cloned())
    }

    fn sale_order_for_item(
        &self,
        item_id: SaleOrderItemId,
    ) -> Result<Option<SaleOrder>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .sale_items
            .get(&item_id)
            .and_then(|order_id| tables.sale_orders.get(order_id))
            .cloned())
    }

    fn commit(&self, unit: UnitOfWork) -> Result<(), StoreError> {
        if unit.is_empty() {
            return Ok(());
        }

        let mut tables = self.write()?;
        Self::validate(&tables, unit.writes())?;

        for write in unit.into_writes() {
            match write {
                Write::Upsert { record, .. } => tables.upsert(record),
                Write::Delete { key, .. } => tables.delete(key),
            }
        }
        Ok(())
    }

    fn page_purchase_orders(
        &self,
        filter: Filter<'_, PurchaseOrder>,
        request: PageRequest,
    ) -> Result<Page<PurchaseOrder>, StoreError> {
        let tables = self.read()?;
        Ok(page_sorted(
            tables.purchase_orders.values().cloned(),
            filter,
            request,
            |o| (o.updated_at(), o.id_typed()),
        ))
    }

    fn page_express_orders(
        &self,
        filter: Filter<'_, ExpressOrder>,
        request: PageRequest,
    ) -> Result<Page<ExpressOrder>, StoreError> {
        let tables = self.read()?;
        Ok(page_sorted(
            tables.express_orders.values().cloned(),
            filter,
            request,
            |o| (o.updated_at(), o.id_typed()),
        ))
    }

    fn page_sale_orders(
        &self,
        filter: Filter<'_, SaleOrder>,
        request: PageRequest,
    ) -> Result<Page<SaleOrder>, StoreError> {
        let tables = self.read()?;
        Ok(page_sorted(
            tables.sale_orders.values().cloned(),
            filter,
            request,
            |o| (o.updated_at(), o.id_typed()),
        ))
    }
}
