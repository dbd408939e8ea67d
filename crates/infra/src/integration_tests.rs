//! Integration tests for the full fulfilment pipeline.
//!
//! Tests: PurchaseOrder → warehouse → ExpressOrder → hub → SaleOrder → customer
//!
//! Verifies:
//! - Each workflow moves stock between the right counters, and only there
//! - Failed operations leave orders and inventory untouched
//! - Stale commits are rejected and concurrent writers are serialised
//! - The finance report sees exactly the completed orders

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use proptest::prelude::*;

    use globalsourcing_auth::{Role, User};
    use globalsourcing_core::{
        Aggregate, AggregateRoot, DomainError, ExpectedVersion, ProductId, PurchaseOrderId, UserId,
    };
    use globalsourcing_inventory::{Inventory, StockDelta};
    use globalsourcing_products::{AdjustInventory, ProductCommand};
    use globalsourcing_purchasing::{PurchaseInfo, PurchaseOrderStatus};
    use globalsourcing_sales::SaleOrderStatus;
    use globalsourcing_shipping::{ExpressOrderStatus, ReceivedQuantity};

    use crate::clock::{Clock, SteppingClock};
    use crate::config::WorkflowConfig;
    use crate::error::WorkflowError;
    use crate::finance::FinanceService;
    use crate::store::{FulfillmentStore, InMemoryFulfillmentStore, Record, StoreError, UnitOfWork};
    use crate::workflows::{
        ExpressItemRequest, ExpressOrderService, ProductService, PurchaseOrderService,
        SaleItemRequest, SaleOrderService,
    };

    const BUYER: UserId = UserId::new(10_001);
    const KEEPER: UserId = UserId::new(10_002);
    const TRANSPORTER: UserId = UserId::new(10_003);
    const SALESPERSON: UserId = UserId::new(10_004);

    type Store = Arc<InMemoryFulfillmentStore>;
    type TestClock = Arc<SteppingClock>;

    struct Harness {
        store: Store,
        clock: TestClock,
        products: ProductService<Store, TestClock>,
        purchasing: PurchaseOrderService<Store, TestClock>,
        shipping: ExpressOrderService<Store, TestClock>,
        sales: SaleOrderService<Store, TestClock>,
        finance: FinanceService<Store, TestClock>,
    }

    fn setup_with(config: WorkflowConfig) -> Harness {
        globalsourcing_observability::init_for_tests();

        let store: Store = Arc::new(InMemoryFulfillmentStore::new());
        for user in [
            User::new(BUYER, "Huang Wei", Role::Buyer),
            User::new(KEEPER, "Zhao Min", Role::WarehouseKeeper),
            User::new(TRANSPORTER, "Rui Costa", Role::Transporter),
            User::new(SALESPERSON, "Inês Lopes", Role::Salesperson),
        ] {
            store.insert_user(user).unwrap();
        }
        let clock: TestClock = Arc::new(SteppingClock::new(
            Utc.with_ymd_and_hms(2024, 9, 2, 6, 0, 0).unwrap(),
            Duration::seconds(1),
        ));

        Harness {
            products: ProductService::new(store.clone(), clock.clone(), config.clone()),
            purchasing: PurchaseOrderService::new(store.clone(), clock.clone(), config.clone()),
            shipping: ExpressOrderService::new(store.clone(), clock.clone(), config.clone()),
            sales: SaleOrderService::new(store.clone(), clock.clone(), config),
            finance: FinanceService::new(store.clone(), clock.clone()),
            store,
            clock,
        }
    }

    fn setup() -> Harness {
        setup_with(WorkflowConfig::default())
    }

    impl Harness {
        fn product(&self, stock: Inventory) -> ProductId {
            self.products
                .register("Jade bracelet", "6940000000015", 8_800, stock)
                .unwrap()
                .id_typed()
        }

        fn counters(&self, product_id: ProductId) -> (i64, i64, i64) {
            let product = self.store.product(product_id).unwrap().unwrap();
            let inv = product.inventory();
            (inv.warehouse(), inv.midway(), inv.hub())
        }

        fn confirmed_purchase(&self, product_id: ProductId, quantity: u32) -> PurchaseOrderId {
            let id = self.purchasing.create(product_id, quantity).unwrap().id_typed();
            self.purchasing.assign(id, BUYER, quantity).unwrap();
            self.purchasing
                .upload_purchase_info(
                    id,
                    BUYER,
                    PurchaseInfo {
                        invoice: format!("INV-{id}"),
                        invoice_date: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
                        purchase_price: 500,
                        purchased_quantity: quantity,
                        photo: format!("photos/{id}.jpg"),
                    },
                )
                .unwrap();
            self.purchasing.assign_to_warehouse_keeper(id, KEEPER).unwrap();
            id
        }
    }

    #[test]
    fn goods_flow_from_purchase_to_customer() {
        let h = setup();
        let product = h.product(Inventory::empty());

        // Purchase 10, warehoused in two batches.
        let po = h.confirmed_purchase(product, 10);
        let order = h.purchasing.put_into_warehouse(KEEPER, po, 6).unwrap();
        assert_eq!(order.status(), PurchaseOrderStatus::Confirmed);
        assert_eq!(h.counters(product), (6, 0, 0));
        let order = h.purchasing.put_into_warehouse(KEEPER, po, 4).unwrap();
        assert_eq!(order.status(), PurchaseOrderStatus::Warehoused);
        assert_eq!(h.counters(product), (10, 0, 0));

        // Ship 8 to the hub, 7 arrive.
        let express = h
            .shipping
            .insert(
                vec![ExpressItemRequest {
                    product_id: product,
                    quantity: 8,
                }],
                Some("air freight".into()),
            )
            .unwrap();
        h.shipping
            .deliver(KEEPER, express.id_typed(), "SF Express", "SF100200300")
            .unwrap();
        assert_eq!(h.counters(product), (2, 8, 0));
        let express = h
            .shipping
            .receive(
                TRANSPORTER,
                express.id_typed(),
                vec![ReceivedQuantity {
                    item_id: express.items()[0].id,
                    quantity: 7,
                }],
            )
            .unwrap();
        assert_eq!(express.status(), ExpressOrderStatus::Received);
        assert_eq!(h.counters(product), (2, 0, 7));

        // Sell 5, deliver 2 then 3.
        let sale = h
            .sales
            .insert(
                SALESPERSON,
                "Rua das Flores 20, Porto",
                None,
                vec![SaleItemRequest {
                    product_id: product,
                    sale_price: 12_000,
                    quantity: 5,
                }],
            )
            .unwrap();
        h.sales
            .upload_pay_info(sale.id_typed(), 60_000, Some("mbway-778".into()))
            .unwrap();
        let item_id = sale.items()[0].id;
        h.sales.deliver_item(item_id, 2, "CTT", "RR001").unwrap();
        let item = h.sales.deliver_item(item_id, 3, "CTT", "RR002").unwrap();
        assert_eq!(item.delivered_quantity, 5);
        assert_eq!(h.counters(product), (2, 0, 2));
        assert_eq!(
            h.sales.get(sale.id_typed()).unwrap().status(),
            SaleOrderStatus::Delivered
        );

        let report = h.finance.current_day_summary().unwrap();
        assert_eq!(report.sales_total, 60_000);
        assert_eq!(report.sale_order_count, 1);
        assert_eq!(report.purchases_total, 5_000);
        assert_eq!(report.purchase_order_count, 1);
        assert_eq!(report.by_salesperson[0].salesperson_id, SALESPERSON);
        assert_eq!(report.by_buyer[0].buyer_id, BUYER);
        assert_eq!(report.balance(), 55_000);
    }

    #[test]
    fn finance_window_excludes_incomplete_and_out_of_window_orders() {
        let h = setup();
        let product = h.product(Inventory::new(0, 0, 10).unwrap());

        let open_po = h.confirmed_purchase(product, 4);
        h.purchasing.put_into_warehouse(KEEPER, open_po, 1).unwrap();

        let unpaid = h
            .sales
            .insert(
                SALESPERSON,
                "Largo do Carmo 3",
                None,
                vec![SaleItemRequest {
                    product_id: product,
                    sale_price: 100,
                    quantity: 1,
                }],
            )
            .unwrap();
        assert_eq!(unpaid.status(), SaleOrderStatus::Created);

        let now = h.clock.now();
        let report = h.finance.summarize(now - Duration::days(1), now).unwrap();
        assert_eq!(report.sale_order_count, 0);
        assert_eq!(report.purchase_order_count, 0);

        let report = h
            .finance
            .summarize(now + Duration::days(1), now + Duration::days(2))
            .unwrap();
        assert_eq!(report.sales_total, 0);
    }

    #[test]
    fn express_delivery_shortage_moves_nothing() {
        let h = setup();
        let plenty = h.product(Inventory::new(50, 0, 0).unwrap());
        let scarce = h.product(Inventory::new(2, 0, 0).unwrap());

        let order = h
            .shipping
            .insert(
                vec![
                    ExpressItemRequest {
                        product_id: plenty,
                        quantity: 20,
                    },
                    ExpressItemRequest {
                        product_id: scarce,
                        quantity: 3,
                    },
                ],
                None,
            )
            .unwrap();

        let err = h
            .shipping
            .deliver(KEEPER, order.id_typed(), "EMS", "EE123456789CN")
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Domain(DomainError::InsufficientStock(_))
        ));
        assert_eq!(h.counters(plenty), (50, 0, 0));
        assert_eq!(h.counters(scarce), (2, 0, 0));
    }

    #[test]
    fn stale_commit_is_rejected_without_partial_write() {
        let h = setup();
        let product = h.product(Inventory::new(10, 0, 0).unwrap());
        let other = h.product(Inventory::new(10, 0, 0).unwrap());

        // Two snapshots read before anyone writes.
        let mut stale = h.store.product(product).unwrap().unwrap();
        let mut fresh = h.store.product(other).unwrap().unwrap();
        let stale_version = stale.version();
        let fresh_version = fresh.version();

        // Somebody else moves `product` first.
        let po = h.confirmed_purchase(product, 1);
        h.purchasing.put_into_warehouse(KEEPER, po, 1).unwrap();

        for (p, id) in [(&mut stale, product), (&mut fresh, other)] {
            p.execute(&ProductCommand::AdjustInventory(AdjustInventory {
                product_id: id,
                delta: StockDelta::shipped(5),
                occurred_at: Utc::now(),
            }))
            .unwrap();
        }

        let mut unit = UnitOfWork::new();
        unit.upsert(Record::Product(fresh), ExpectedVersion::Exact(fresh_version))
            .upsert(Record::Product(stale), ExpectedVersion::Exact(stale_version));
        let err = h.store.commit(unit).unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(h.counters(product), (11, 0, 0));
        assert_eq!(h.counters(other), (10, 0, 0));
    }

    #[test]
    fn concurrent_warehousing_of_one_product_is_serialised() {
        let h = setup_with(WorkflowConfig::default().with_commit_attempts(64));
        let product = h.product(Inventory::empty());
        let orders: Vec<_> = (0..8).map(|_| h.confirmed_purchase(product, 5)).collect();

        std::thread::scope(|scope| {
            for order in &orders {
                let purchasing = &h.purchasing;
                scope.spawn(move || {
                    for _ in 0..5 {
                        purchasing.put_into_warehouse(KEEPER, *order, 1).unwrap();
                    }
                });
            }
        });

        assert_eq!(h.counters(product), (40, 0, 0));
        for order in orders {
            let order = h.purchasing.get(order).unwrap();
            assert_eq!(order.status(), PurchaseOrderStatus::Warehoused);
            assert_eq!(order.warehoused_quantity(), 5);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 64, ..ProptestConfig::default() })]

        #[test]
        fn receipt_moves_shipped_out_of_transit_and_received_into_hub(
            lines in prop::collection::vec((1u32..50, 0u32..=100), 1..6),
        ) {
            let h = setup();
            let product_a = h.product(Inventory::new(1_000, 0, 0).unwrap());
            let product_b = h.product(Inventory::new(1_000, 0, 0).unwrap());

            let items: Vec<ExpressItemRequest> = lines
                .iter()
                .enumerate()
                .map(|(i, (quantity, _))| ExpressItemRequest {
                    product_id: if i % 2 == 0 { product_a } else { product_b },
                    quantity: *quantity,
                })
                .collect();
            let order = h.shipping.insert(items, None).unwrap();
            h.shipping.deliver(KEEPER, order.id_typed(), "SF", "SF1").unwrap();
            let before = [h.counters(product_a), h.counters(product_b)];

            // Received share of each line, in percent.
            let received: Vec<ReceivedQuantity> = order
                .items()
                .iter()
                .zip(&lines)
                .map(|(item, (_, percent))| ReceivedQuantity {
                    item_id: item.id,
                    quantity: item.quantity * percent / 100,
                })
                .collect();
            h.shipping.receive(TRANSPORTER, order.id_typed(), received.clone()).unwrap();
            let after = [h.counters(product_a), h.counters(product_b)];

            for (slot, product_id) in [product_a, product_b].into_iter().enumerate() {
                let shipped: i64 = order
                    .items()
                    .iter()
                    .filter(|i| i.product_id == product_id)
                    .map(|i| i64::from(i.quantity))
                    .sum();
                let arrived: i64 = order
                    .items()
                    .iter()
                    .zip(&received)
                    .filter(|(i, _)| i.product_id == product_id)
                    .map(|(_, r)| i64::from(r.quantity))
                    .sum();

                prop_assert_eq!(before[slot].1 - after[slot].1, shipped);
                prop_assert_eq!(after[slot].2 - before[slot].2, arrived);
                prop_assert_eq!(after[slot].0, before[slot].0);
            }
        }

        #[test]
        fn warehouse_stock_tracks_warehoused_quantity(
            purchased in 1u32..40,
            batches in prop::collection::vec(1u32..15, 1..10),
        ) {
            let h = setup();
            let product = h.product(Inventory::empty());
            let po = h.confirmed_purchase(product, purchased);

            for batch in batches {
                let before = h.purchasing.get(po).unwrap();
                match h.purchasing.put_into_warehouse(KEEPER, po, batch) {
                    Ok(order) => {
                        prop_assert!(order.warehoused_quantity() <= purchased);
                        prop_assert_eq!(
                            order.status() == PurchaseOrderStatus::Warehoused,
                            order.warehoused_quantity() == purchased
                        );
                    }
                    Err(WorkflowError::Domain(DomainError::OverPurchase(_))) => {
                        prop_assert!(before.warehoused_quantity() + batch > purchased);
                    }
                    Err(WorkflowError::Domain(DomainError::InvalidState(_))) => {
                        prop_assert_eq!(before.status(), PurchaseOrderStatus::Warehoused);
                    }
                    Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
                }

                let order = h.purchasing.get(po).unwrap();
                prop_assert_eq!(h.counters(product).0, i64::from(order.warehoused_quantity()));
            }
        }
    }
}
