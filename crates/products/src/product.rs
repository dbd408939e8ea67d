use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use globalsourcing_core::{Aggregate, AggregateRoot, DomainError, Event, ProductId};
use globalsourcing_inventory::{Inventory, StockDelta};

/// Aggregate root: Product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    name: String,
    barcode: String,
    /// Reference price in smallest currency unit (e.g., cents).
    price: u64,
    inventory: Inventory,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            name: String::new(),
            barcode: String::new(),
            price: 0,
            inventory: Inventory::empty(),
            created_at: None,
            updated_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn barcode(&self) -> &str {
        &self.barcode
    }

    pub fn price(&self) -> u64 {
        self.price
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterProduct {
    pub product_id: ProductId,
    pub name: String,
    pub barcode: String,
    pub price: u64,
    /// Opening stock, e.g. when migrating an existing catalogue.
    pub opening_stock: Inventory,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AdjustInventory (the ledger's single write path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustInventory {
    pub product_id: ProductId,
    pub delta: StockDelta,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    RegisterProduct(RegisterProduct),
    AdjustInventory(AdjustInventory),
}

/// Event: ProductRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRegistered {
    pub product_id: ProductId,
    pub name: String,
    pub barcode: String,
    pub price: u64,
    pub opening_stock: Inventory,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InventoryAdjusted.
///
/// Carries the resulting balance so the new counters never have to be
/// recomputed from the delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryAdjusted {
    pub product_id: ProductId,
    pub delta: StockDelta,
    pub balance: Inventory,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductRegistered(ProductRegistered),
    InventoryAdjusted(InventoryAdjusted),
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductRegistered(_) => "products.product.registered",
            ProductEvent::InventoryAdjusted(_) => "products.product.inventory_adjusted",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductRegistered(e) => e.occurred_at,
            ProductEvent::InventoryAdjusted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductRegistered(e) => {
                self.id = e.product_id;
                self.name = e.name.clone();
                self.barcode = e.barcode.clone();
                self.price = e.price;
                self.inventory = e.opening_stock;
                self.created_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
                self.created = true;
            }
            ProductEvent::InventoryAdjusted(e) => {
                self.inventory = e.balance;
                self.updated_at = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::RegisterProduct(cmd) => self.handle_register(cmd),
            ProductCommand::AdjustInventory(cmd) => self.handle_adjust(cmd),
        }
    }
}

impl Product {
    fn ensure_product_id(&self, product_id: ProductId) -> Result<(), DomainError> {
        if self.id != product_id {
            return Err(DomainError::validation("product_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("product already exists"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        Ok(vec![ProductEvent::ProductRegistered(ProductRegistered {
            product_id: cmd.product_id,
            name: cmd.name.clone(),
            barcode: cmd.barcode.clone(),
            price: cmd.price,
            opening_stock: cmd.opening_stock,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_adjust(&self, cmd: &AdjustInventory) -> Result<Vec<ProductEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("product {}", cmd.product_id)));
        }
        self.ensure_product_id(cmd.product_id)?;

        if cmd.delta.is_zero() {
            return Ok(vec![]);
        }

        let balance = self.inventory.adjusted(&cmd.delta).map_err(|e| match e {
            DomainError::InsufficientStock(msg) => {
                DomainError::insufficient_stock(format!("product {}: {msg}", self.id))
            }
            other => other,
        })?;

        Ok(vec![ProductEvent::InventoryAdjusted(InventoryAdjusted {
            product_id: cmd.product_id,
            delta: cmd.delta,
            balance,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
    }

    fn registered(stock: Inventory) -> Product {
        let id = ProductId::new(1);
        let mut product = Product::empty(id);
        product
            .execute(&ProductCommand::RegisterProduct(RegisterProduct {
                product_id: id,
                name: "Espresso grinder".to_string(),
                barcode: "4006381333931".to_string(),
                price: 12_900,
                opening_stock: stock,
                occurred_at: test_time(),
            }))
            .unwrap();
        product
    }

    #[test]
    fn register_sets_opening_stock_and_version() {
        let product = registered(Inventory::new(3, 0, 1).unwrap());
        assert_eq!(product.version(), 1);
        assert_eq!(product.inventory().warehouse(), 3);
        assert_eq!(product.inventory().hub(), 1);
        assert_eq!(product.name(), "Espresso grinder");
    }

    #[test]
    fn adjust_applies_delta_and_bumps_version() {
        let mut product = registered(Inventory::new(5, 0, 0).unwrap());
        let events = product
            .execute(&ProductCommand::AdjustInventory(AdjustInventory {
                product_id: product.id_typed(),
                delta: StockDelta::shipped(5),
                occurred_at: test_time(),
            }))
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "products.product.inventory_adjusted");
        assert_eq!(product.inventory().warehouse(), 0);
        assert_eq!(product.inventory().midway(), 5);
        assert_eq!(product.version(), 2);
    }

    #[test]
    fn insufficient_stock_leaves_product_untouched() {
        let mut product = registered(Inventory::new(1, 0, 0).unwrap());
        let before = product.clone();
        let err = product
            .execute(&ProductCommand::AdjustInventory(AdjustInventory {
                product_id: product.id_typed(),
                delta: StockDelta::shipped(2),
                occurred_at: test_time(),
            }))
            .unwrap_err();

        match err {
            DomainError::InsufficientStock(msg) => assert!(msg.starts_with("product 1:")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(product, before);
    }

    #[test]
    fn zero_delta_is_a_no_op() {
        let product = registered(Inventory::empty());
        let events = product
            .handle(&ProductCommand::AdjustInventory(AdjustInventory {
                product_id: product.id_typed(),
                delta: StockDelta::default(),
                occurred_at: test_time(),
            }))
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn adjusting_unknown_product_is_not_found() {
        let product = Product::empty(ProductId::new(9));
        let err = product
            .handle(&ProductCommand::AdjustInventory(AdjustInventory {
                product_id: ProductId::new(9),
                delta: StockDelta::warehoused(1),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }
}
