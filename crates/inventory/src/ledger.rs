use serde::{Deserialize, Serialize};

use globalsourcing_core::{DomainError, DomainResult};

/// Where a unit of stock currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockLocation {
    /// Origin warehouse, before export.
    Warehouse,
    /// In transit between origin and the domestic hub.
    Midway,
    /// Domestic distribution point, available for sale-order delivery.
    Hub,
}

impl StockLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockLocation::Warehouse => "warehouse",
            StockLocation::Midway => "midway",
            StockLocation::Hub => "hub",
        }
    }
}

/// Signed change to all three counters of one product.
///
/// Stock movements between locations are expressed as a single delta so the
/// debit and the credit are applied together or not at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDelta {
    pub warehouse: i64,
    pub midway: i64,
    pub hub: i64,
}

impl StockDelta {
    pub const fn new(warehouse: i64, midway: i64, hub: i64) -> Self {
        Self {
            warehouse,
            midway,
            hub,
        }
    }

    /// Goods put into the origin warehouse by a purchase order.
    pub fn warehoused(quantity: u32) -> Self {
        Self::new(i64::from(quantity), 0, 0)
    }

    /// Goods leaving the warehouse on an express shipment.
    pub fn shipped(quantity: u32) -> Self {
        let q = i64::from(quantity);
        Self::new(-q, q, 0)
    }

    /// Express shipment settled at the hub.
    ///
    /// The whole shipped amount leaves transit; only what actually arrived is
    /// credited to the hub. The difference is shrinkage and is not refunded.
    pub fn received(shipped: u32, received: u32) -> Self {
        Self::new(0, -i64::from(shipped), i64::from(received))
    }

    /// Goods leaving the hub for a sale-order customer.
    pub fn dispatched(quantity: u32) -> Self {
        Self::new(0, 0, -i64::from(quantity))
    }

    pub fn is_zero(&self) -> bool {
        self.warehouse == 0 && self.midway == 0 && self.hub == 0
    }

    /// Net change in units held across all locations (negative = shrinkage).
    pub fn net(&self) -> i64 {
        self.warehouse + self.midway + self.hub
    }
}

impl core::ops::Add for StockDelta {
    type Output = StockDelta;

    fn add(self, rhs: StockDelta) -> StockDelta {
        StockDelta::new(
            self.warehouse + rhs.warehouse,
            self.midway + rhs.midway,
            self.hub + rhs.hub,
        )
    }
}

/// The three stock counters of one product.
///
/// Invariant: every counter is `>= 0`. The only way to change the counters is
/// [`Inventory::adjusted`], which either yields a fully adjusted copy or an
/// error, never a half-applied move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    warehouse: i64,
    midway: i64,
    hub: i64,
}

impl Inventory {
    pub fn new(warehouse: i64, midway: i64, hub: i64) -> DomainResult<Self> {
        Self::default().adjusted(&StockDelta::new(warehouse, midway, hub))
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn warehouse(&self) -> i64 {
        self.warehouse
    }

    pub fn midway(&self) -> i64 {
        self.midway
    }

    pub fn hub(&self) -> i64 {
        self.hub
    }

    pub fn stock(&self, location: StockLocation) -> i64 {
        match location {
            StockLocation::Warehouse => self.warehouse,
            StockLocation::Midway => self.midway,
            StockLocation::Hub => self.hub,
        }
    }

    pub fn total(&self) -> i64 {
        self.warehouse + self.midway + self.hub
    }

    /// Apply all three deltas at once.
    ///
    /// Fails with `InsufficientStock` if any resulting counter would be
    /// negative; `self` is never modified.
    pub fn adjusted(&self, delta: &StockDelta) -> DomainResult<Inventory> {
        let next = Inventory {
            warehouse: checked(self.warehouse, delta.warehouse, StockLocation::Warehouse)?,
            midway: checked(self.midway, delta.midway, StockLocation::Midway)?,
            hub: checked(self.hub, delta.hub, StockLocation::Hub)?,
        };
        Ok(next)
    }
}

fn checked(current: i64, delta: i64, location: StockLocation) -> DomainResult<i64> {
    let next = current.checked_add(delta).ok_or_else(|| {
        DomainError::validation(format!("{} stock overflow", location.as_str()))
    })?;
    if next < 0 {
        return Err(DomainError::insufficient_stock(format!(
            "{} stock is {current}, cannot remove {}",
            location.as_str(),
            -delta
        )));
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn shipping_moves_warehouse_to_midway() {
        let inv = Inventory::new(5, 0, 0).unwrap();
        let next = inv.adjusted(&StockDelta::shipped(5)).unwrap();
        assert_eq!((next.warehouse(), next.midway(), next.hub()), (0, 5, 0));
    }

    #[test]
    fn short_receipt_drops_the_shortfall() {
        let inv = Inventory::new(0, 5, 0).unwrap();
        let next = inv.adjusted(&StockDelta::received(5, 3)).unwrap();
        assert_eq!((next.warehouse(), next.midway(), next.hub()), (0, 0, 3));
        assert_eq!(StockDelta::received(5, 3).net(), -2);
    }

    #[test]
    fn negative_result_is_rejected_without_partial_application() {
        let inv = Inventory::new(2, 7, 1).unwrap();
        // Warehouse would go negative even though midway credit is fine.
        let err = inv.adjusted(&StockDelta::shipped(3)).unwrap_err();
        match err {
            DomainError::InsufficientStock(msg) => assert!(msg.contains("warehouse stock is 2")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!((inv.warehouse(), inv.midway(), inv.hub()), (2, 7, 1));
    }

    #[test]
    fn constructor_refuses_negative_counters() {
        assert!(Inventory::new(0, -1, 0).is_err());
    }

    #[test]
    fn deltas_add_component_wise() {
        let sum = StockDelta::shipped(4) + StockDelta::received(4, 4);
        assert_eq!(sum, StockDelta::new(-4, 0, 4));
        assert!(!sum.is_zero());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: an accepted adjustment never leaves a negative counter, and a
        /// rejected one is exactly the case where some counter would go negative.
        #[test]
        fn counters_never_go_negative(
            start in (0i64..1_000, 0i64..1_000, 0i64..1_000),
            delta in (-1_500i64..1_500, -1_500i64..1_500, -1_500i64..1_500),
        ) {
            let inv = Inventory::new(start.0, start.1, start.2).unwrap();
            let delta = StockDelta::new(delta.0, delta.1, delta.2);
            let would_be_negative = start.0 + delta.warehouse < 0
                || start.1 + delta.midway < 0
                || start.2 + delta.hub < 0;

            match inv.adjusted(&delta) {
                Ok(next) => {
                    prop_assert!(!would_be_negative);
                    prop_assert!(next.warehouse() >= 0 && next.midway() >= 0 && next.hub() >= 0);
                    prop_assert_eq!(next.total(), inv.total() + delta.net());
                }
                Err(DomainError::InsufficientStock(_)) => prop_assert!(would_be_negative),
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }
    }
}
