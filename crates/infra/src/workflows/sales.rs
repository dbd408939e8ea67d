use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use globalsourcing_auth::Role;
use globalsourcing_core::{
    Aggregate, AggregateRoot, DomainError, Event, ExpectedVersion, Page, PageRequest, ProductId,
    SaleOrderId, SaleOrderItemId, UserId,
};
use globalsourcing_inventory::StockDelta;
use globalsourcing_sales::{
    AddItem, CreateSaleOrder, DeliverItem, DeliverSaleOrder, NewSaleItem, RecordPayment,
    RemoveItem, SaleOrder, SaleOrderAction, SaleOrderCommand, SaleOrderItem, SaleOrderStatus,
    Shipment, TRANSITIONS, UpdateDetails, UpdateItem,
};

use crate::clock::Clock;
use crate::config::WorkflowConfig;
use crate::error::WorkflowResult;
use crate::ledger::StagedLedger;
use crate::lookup::Lookup;
use crate::store::{FulfillmentStore, Record, RecordKey, UnitOfWork};

use super::commit_with_retry;

/// One line of a sale order as requested by the salesperson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItemRequest {
    pub product_id: ProductId,
    pub sale_price: u64,
    pub quantity: u32,
}

impl SaleItemRequest {
    fn with_id(self, item_id: SaleOrderItemId) -> NewSaleItem {
        NewSaleItem {
            item_id,
            product_id: self.product_id,
            sale_price: self.sale_price,
            quantity: self.quantity,
        }
    }
}

/// Sale-order workflow: payment, then whole or per-item delivery out of the
/// hub.
///
/// The order status is derived from its items and payment (see
/// [`SaleOrder::status`]); delivery is only possible once the order is paid.
#[derive(Debug)]
pub struct SaleOrderService<S, C> {
    store: S,
    clock: C,
    config: WorkflowConfig,
}

impl<S, C> SaleOrderService<S, C> {
    pub fn new(store: S, clock: C, config: WorkflowConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }
}

fn hub_covers(hub: i64, demand: u64) -> bool {
    u64::try_from(hub).is_ok_and(|available| available >= demand)
}

impl<S, C> SaleOrderService<S, C>
where
    S: FulfillmentStore,
    C: Clock,
{
    fn lookup(&self) -> Lookup<'_, S> {
        Lookup::new(&self.store)
    }

    fn shipment(company: &str, tracking_number: &str) -> Shipment {
        Shipment {
            company: company.to_string(),
            tracking_number: tracking_number.to_string(),
        }
    }

    /// Load an order, build a command from it, execute, dispatch whatever
    /// leaves the hub and commit order and products together.
    fn modify(
        &self,
        operation: &'static str,
        load: impl Fn(&Self) -> WorkflowResult<SaleOrder>,
        command: impl Fn(&Self, &SaleOrder) -> WorkflowResult<SaleOrderCommand>,
    ) -> WorkflowResult<SaleOrder> {
        let order = commit_with_retry(&self.store, &self.config, operation, || {
            let mut order = load(self)?;
            let base_version = order.version();
            let cmd = command(self, &order)?;
            let events = order.execute(&cmd)?;

            let mut ledger = StagedLedger::new(&self.store);
            for event in &events {
                for dispatch in event.dispatches() {
                    ledger.adjust(
                        dispatch.product_id,
                        StockDelta::dispatched(dispatch.quantity),
                        event.occurred_at(),
                    )?;
                }
            }

            let mut unit = UnitOfWork::new();
            unit.upsert(
                Record::SaleOrder(order.clone()),
                ExpectedVersion::Exact(base_version),
            );
            ledger.stage_into(&mut unit);
            Ok((unit, order))
        })?;

        info!(
            operation,
            order_id = %order.id_typed(),
            status = ?order.status(),
            "sale order updated"
        );
        Ok(order)
    }

    fn with_status(
        &self,
        order_id: SaleOrderId,
        action: SaleOrderAction,
    ) -> WorkflowResult<SaleOrder> {
        self.lookup()
            .sale_order_with_status(order_id, &TRANSITIONS.sources(action))
    }

    fn ensure_products(&self, product_ids: impl IntoIterator<Item = ProductId>) -> WorkflowResult<()> {
        for product_id in product_ids {
            self.lookup().product(product_id)?;
        }
        Ok(())
    }

    fn deliverable(&self, order: &SaleOrder) -> WorkflowResult<bool> {
        if order.status() != SaleOrderStatus::Paid || order.has_shipments() {
            return Ok(false);
        }
        for (product_id, demand) in order.hub_demand() {
            let product = self.lookup().product(product_id)?;
            if !hub_covers(product.inventory().hub(), demand) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    #[instrument(skip(self), err)]
    pub fn insert(
        &self,
        salesperson_id: UserId,
        address: &str,
        remark: Option<String>,
        items: Vec<SaleItemRequest>,
    ) -> WorkflowResult<SaleOrder> {
        self.lookup()
            .user_with_role(salesperson_id, Role::Salesperson)?;

        let order_id = SaleOrderId::new(self.store.next_id()?);
        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            lines.push(item.with_id(SaleOrderItemId::new(self.store.next_id()?)));
        }

        let order = commit_with_retry(&self.store, &self.config, "sale_order.insert", || {
            self.ensure_products(lines.iter().map(|line| line.product_id))?;

            let mut order = SaleOrder::empty(order_id);
            order.execute(&SaleOrderCommand::Create(CreateSaleOrder {
                order_id,
                salesperson_id,
                address: address.to_string(),
                remark: remark.clone(),
                items: lines.clone(),
                occurred_at: self.clock.now(),
            }))?;

            let mut unit = UnitOfWork::new();
            unit.upsert(Record::SaleOrder(order.clone()), ExpectedVersion::Exact(0));
            Ok((unit, order))
        })?;

        info!(
            order_id = %order_id,
            salesperson_id = %salesperson_id,
            total = order.total_price(),
            "sale order created"
        );
        Ok(order)
    }

    /// Change the delivery address and remark.
    #[instrument(skip(self), err)]
    pub fn update(
        &self,
        order_id: SaleOrderId,
        address: &str,
        remark: Option<String>,
    ) -> WorkflowResult<SaleOrder> {
        self.modify(
            "sale_order.update",
            |service| service.lookup().sale_order_with_status(order_id, &[]),
            |service, _| {
                Ok(SaleOrderCommand::UpdateDetails(UpdateDetails {
                    order_id,
                    address: address.to_string(),
                    remark: remark.clone(),
                    occurred_at: service.clock.now(),
                }))
            },
        )
    }

    /// Record the customer's payment. Paying the full total makes the order
    /// PAID.
    #[instrument(skip(self), err)]
    pub fn upload_pay_info(
        &self,
        order_id: SaleOrderId,
        paid_amount: u64,
        certificate: Option<String>,
    ) -> WorkflowResult<SaleOrder> {
        self.modify(
            "sale_order.upload_pay_info",
            |service| service.with_status(order_id, SaleOrderAction::RecordPayment),
            |service, _| {
                Ok(SaleOrderCommand::RecordPayment(RecordPayment {
                    order_id,
                    paid_amount,
                    certificate: certificate.clone(),
                    occurred_at: service.clock.now(),
                }))
            },
        )
    }

    /// Whether the whole order can go out in one shipment right now: it is
    /// paid, nothing has shipped yet and the hub holds enough of every
    /// product.
    #[instrument(skip(self), err)]
    pub fn is_deliverable(&self, order_id: SaleOrderId) -> WorkflowResult<bool> {
        let order = self.lookup().sale_order_with_status(order_id, &[])?;
        self.deliverable(&order)
    }

    /// Ship every item in full.
    #[instrument(skip(self), err)]
    pub fn deliver(
        &self,
        order_id: SaleOrderId,
        company: &str,
        tracking_number: &str,
    ) -> WorkflowResult<SaleOrder> {
        self.modify(
            "sale_order.deliver",
            |service| service.with_status(order_id, SaleOrderAction::Deliver),
            |service, order| {
                if !service.deliverable(order)? {
                    return Err(DomainError::invalid_state(format!(
                        "sale order {order_id} is not deliverable"
                    ))
                    .into());
                }
                Ok(SaleOrderCommand::Deliver(DeliverSaleOrder {
                    order_id,
                    shipment: Self::shipment(company, tracking_number),
                    occurred_at: service.clock.now(),
                }))
            },
        )
    }

    /// Ship part of one item. Returns the item as updated.
    #[instrument(skip(self), err)]
    pub fn deliver_item(
        &self,
        item_id: SaleOrderItemId,
        quantity: u32,
        company: &str,
        tracking_number: &str,
    ) -> WorkflowResult<SaleOrderItem> {
        let order = self.modify(
            "sale_order.deliver_item",
            |service| service.lookup().sale_order_for_item(item_id),
            |service, order| {
                Ok(SaleOrderCommand::DeliverItem(DeliverItem {
                    order_id: order.id_typed(),
                    item_id,
                    quantity,
                    shipment: Self::shipment(company, tracking_number),
                    occurred_at: service.clock.now(),
                }))
            },
        )?;

        order
            .item(item_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("sale order item {item_id}")).into())
    }

    #[instrument(skip(self), err)]
    pub fn insert_item(
        &self,
        order_id: SaleOrderId,
        item: SaleItemRequest,
    ) -> WorkflowResult<SaleOrder> {
        let line = item.with_id(SaleOrderItemId::new(self.store.next_id()?));
        self.modify(
            "sale_order.insert_item",
            |service| service.with_status(order_id, SaleOrderAction::EditItems),
            |service, _| {
                service.ensure_products([line.product_id])?;
                Ok(SaleOrderCommand::AddItem(AddItem {
                    order_id,
                    item: line.clone(),
                    occurred_at: service.clock.now(),
                }))
            },
        )
    }

    #[instrument(skip(self), err)]
    pub fn update_item(
        &self,
        item_id: SaleOrderItemId,
        item: SaleItemRequest,
    ) -> WorkflowResult<SaleOrder> {
        self.modify(
            "sale_order.update_item",
            |service| service.lookup().sale_order_for_item(item_id),
            |service, order| {
                service.ensure_products([item.product_id])?;
                Ok(SaleOrderCommand::UpdateItem(UpdateItem {
                    order_id: order.id_typed(),
                    item: item.with_id(item_id),
                    occurred_at: service.clock.now(),
                }))
            },
        )
    }

    #[instrument(skip(self), err)]
    pub fn delete_item(&self, item_id: SaleOrderItemId) -> WorkflowResult<SaleOrder> {
        self.modify(
            "sale_order.delete_item",
            |service| service.lookup().sale_order_for_item(item_id),
            |service, order| {
                Ok(SaleOrderCommand::RemoveItem(RemoveItem {
                    order_id: order.id_typed(),
                    item_id,
                    occurred_at: service.clock.now(),
                }))
            },
        )
    }

    /// Remove an order nothing has shipped from. Deleting an absent order
    /// succeeds.
    #[instrument(skip(self), err)]
    pub fn delete(&self, order_id: SaleOrderId) -> WorkflowResult<()> {
        let deleted = commit_with_retry(&self.store, &self.config, "sale_order.delete", || {
            let mut unit = UnitOfWork::new();
            let Some(order) = self.store.sale_order(order_id)? else {
                return Ok((unit, false));
            };
            order.ensure_deletable()?;
            unit.delete(
                RecordKey::SaleOrder(order_id),
                ExpectedVersion::Exact(order.version()),
            );
            Ok((unit, true))
        })?;

        if deleted {
            info!(order_id = %order_id, "sale order deleted");
        }
        Ok(())
    }

    /// Orders matching every given filter, most recently updated first.
    #[instrument(skip(self), err)]
    pub fn find_all(
        &self,
        salesperson_id: Option<UserId>,
        status: Option<SaleOrderStatus>,
        page: PageRequest,
    ) -> WorkflowResult<Page<SaleOrder>> {
        if let Some(id) = salesperson_id {
            self.lookup().user_with_role(id, Role::Salesperson)?;
        }

        let filter = |order: &SaleOrder| {
            salesperson_id.is_none_or(|id| order.salesperson_id() == id)
                && status.is_none_or(|s| order.status() == s)
        };
        Ok(self
            .store
            .page_sale_orders(&filter, self.config.page(page))?)
    }

    /// Case-insensitive substring search over address and remark.
    #[instrument(skip(self), err)]
    pub fn search(&self, keyword: &str, page: PageRequest) -> WorkflowResult<Page<SaleOrder>> {
        let needle = keyword.trim().to_lowercase();
        let filter = |order: &SaleOrder| {
            order.address().to_lowercase().contains(&needle)
                || order
                    .remark()
                    .is_some_and(|remark| remark.to_lowercase().contains(&needle))
        };
        Ok(self
            .store
            .page_sale_orders(&filter, self.config.page(page))?)
    }

    pub fn get(&self, order_id: SaleOrderId) -> WorkflowResult<SaleOrder> {
        self.lookup().sale_order_with_status(order_id, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SteppingClock;
    use crate::error::WorkflowError;
    use crate::store::InMemoryFulfillmentStore;
    use crate::workflows::ProductService;
    use chrono::{Duration, TimeZone, Utc};
    use globalsourcing_auth::User;
    use globalsourcing_inventory::Inventory;
    use std::sync::Arc;

    const SALESPERSON: UserId = UserId::new(700);
    const BUYER: UserId = UserId::new(701);

    struct Fixture {
        store: Arc<InMemoryFulfillmentStore>,
        service: SaleOrderService<Arc<InMemoryFulfillmentStore>, Arc<SteppingClock>>,
        products: ProductService<Arc<InMemoryFulfillmentStore>, Arc<SteppingClock>>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryFulfillmentStore::new());
        store
            .insert_user(User::new(SALESPERSON, "Maria", Role::Salesperson))
            .unwrap();
        store
            .insert_user(User::new(BUYER, "Liu", Role::Buyer))
            .unwrap();
        let clock = Arc::new(SteppingClock::new(
            Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap(),
            Duration::seconds(1),
        ));

        Fixture {
            service: SaleOrderService::new(store.clone(), clock.clone(), WorkflowConfig::default()),
            products: ProductService::new(store.clone(), clock, WorkflowConfig::default()),
            store,
        }
    }

    impl Fixture {
        fn product_with_hub(&self, hub: i64) -> ProductId {
            self.products
                .register("Cast iron teapot", "", 3_000, Inventory::new(0, 0, hub).unwrap())
                .unwrap()
                .id_typed()
        }

        fn hub(&self, product_id: ProductId) -> i64 {
            self.store
                .product(product_id)
                .unwrap()
                .unwrap()
                .inventory()
                .hub()
        }

        fn paid_order(&self, items: Vec<SaleItemRequest>) -> SaleOrder {
            let order = self
                .service
                .insert(SALESPERSON, "12 Harbour Road, Lisbon", None, items)
                .unwrap();
            self.service
                .upload_pay_info(order.id_typed(), order.total_price(), Some("receipt-1".into()))
                .unwrap()
        }
    }

    fn line(product_id: ProductId, quantity: u32) -> SaleItemRequest {
        SaleItemRequest {
            product_id,
            sale_price: 100,
            quantity,
        }
    }

    #[test]
    fn partial_delivery_then_over_delivery() {
        let f = fixture();
        let product = f.product_with_hub(10);
        let order = f.paid_order(vec![line(product, 10)]);
        let item_id = order.items()[0].id;

        let item = f.service.deliver_item(item_id, 4, "CTT", "RR123").unwrap();
        assert_eq!(item.delivered_quantity, 4);
        assert_eq!(item.shipments.len(), 1);
        assert_eq!(f.hub(product), 6);

        let err = f.service.deliver_item(item_id, 7, "CTT", "RR124").unwrap_err();
        assert!(matches!(err, WorkflowError::Domain(DomainError::OverDelivery(_))));
        assert_eq!(f.hub(product), 6);

        f.service.deliver_item(item_id, 6, "CTT", "RR125").unwrap();
        let order = f.service.get(order.id_typed()).unwrap();
        assert_eq!(order.status(), SaleOrderStatus::Delivered);

        let err = f.service.deliver_item(item_id, 1, "CTT", "RR126").unwrap_err();
        assert!(matches!(err, WorkflowError::Domain(DomainError::InvalidState(_))));
    }

    #[test]
    fn item_delivery_needs_hub_stock() {
        let f = fixture();
        let product = f.product_with_hub(2);
        let order = f.paid_order(vec![line(product, 5)]);

        let err = f
            .service
            .deliver_item(order.items()[0].id, 3, "CTT", "RR1")
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Domain(DomainError::InsufficientStock(_))
        ));
        assert_eq!(f.hub(product), 2);
    }

    #[test]
    fn unpaid_orders_cannot_ship() {
        let f = fixture();
        let product = f.product_with_hub(10);
        let order = f
            .service
            .insert(SALESPERSON, "Rua Augusta 5", None, vec![line(product, 1)])
            .unwrap();

        assert!(!f.service.is_deliverable(order.id_typed()).unwrap());
        let err = f.service.deliver(order.id_typed(), "CTT", "RR1").unwrap_err();
        assert!(matches!(err, WorkflowError::Domain(DomainError::InvalidState(_))));
        let err = f
            .service
            .deliver_item(order.items()[0].id, 1, "CTT", "RR1")
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Domain(DomainError::InvalidState(_))));
    }

    #[test]
    fn free_items_cannot_bypass_payment() {
        let f = fixture();
        let product = f.product_with_hub(5);

        let err = f
            .service
            .insert(
                SALESPERSON,
                "Rua Augusta 5",
                None,
                vec![SaleItemRequest {
                    product_id: product,
                    sale_price: 0,
                    quantity: 5,
                }],
            )
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Domain(DomainError::Validation(_))));
        assert!(f.service.find_all(None, None, PageRequest::default()).unwrap().items.is_empty());
        assert_eq!(f.hub(product), 5);
    }

    #[test]
    fn whole_order_delivery_moves_every_item() {
        let f = fixture();
        let teapot = f.product_with_hub(5);
        let cups = f.product_with_hub(12);
        let order = f.paid_order(vec![line(teapot, 2), line(cups, 6), line(teapot, 3)]);

        assert!(f.service.is_deliverable(order.id_typed()).unwrap());
        let order = f.service.deliver(order.id_typed(), "DPD", "DPD42").unwrap();

        assert_eq!(order.status(), SaleOrderStatus::Delivered);
        assert!(order.items().iter().all(|i| i.shipments.len() == 1));
        assert_eq!(f.hub(teapot), 0);
        assert_eq!(f.hub(cups), 6);
    }

    #[test]
    fn cumulative_shortage_makes_order_undeliverable() {
        let f = fixture();
        let teapot = f.product_with_hub(4);
        let order = f.paid_order(vec![line(teapot, 2), line(teapot, 3)]);

        assert!(!f.service.is_deliverable(order.id_typed()).unwrap());
        let err = f.service.deliver(order.id_typed(), "DPD", "DPD1").unwrap_err();
        assert!(matches!(err, WorkflowError::Domain(DomainError::InvalidState(_))));
        assert_eq!(f.hub(teapot), 4);
    }

    #[test]
    fn partially_shipped_order_is_not_deliverable_as_a_whole() {
        let f = fixture();
        let teapot = f.product_with_hub(10);
        let order = f.paid_order(vec![line(teapot, 3)]);
        f.service
            .deliver_item(order.items()[0].id, 1, "CTT", "RR1")
            .unwrap();

        assert!(!f.service.is_deliverable(order.id_typed()).unwrap());
    }

    #[test]
    fn is_deliverable_for_unknown_order_is_not_found() {
        let f = fixture();
        let err = f.service.is_deliverable(SaleOrderId::new(31337)).unwrap_err();
        assert!(matches!(err, WorkflowError::Domain(DomainError::NotFound(_))));
    }

    #[test]
    fn insert_checks_salesperson_and_items() {
        let f = fixture();
        let teapot = f.product_with_hub(1);

        let err = f
            .service
            .insert(BUYER, "Somewhere 1", None, vec![line(teapot, 1)])
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Domain(DomainError::RoleMismatch(_))));

        let err = f
            .service
            .insert(SALESPERSON, "Somewhere 1", None, vec![])
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Domain(DomainError::Validation(_))));

        let err = f
            .service
            .insert(SALESPERSON, "Somewhere 1", None, vec![line(ProductId::new(4040), 1)])
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Domain(DomainError::NotFound(_))));
    }

    #[test]
    fn overpayment_is_rejected() {
        let f = fixture();
        let teapot = f.product_with_hub(1);
        let order = f
            .service
            .insert(SALESPERSON, "Somewhere 1", None, vec![line(teapot, 2)])
            .unwrap();

        let err = f
            .service
            .upload_pay_info(order.id_typed(), 201, None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Domain(DomainError::Validation(_))));

        let partial = f
            .service
            .upload_pay_info(order.id_typed(), 150, None)
            .unwrap();
        assert_eq!(partial.status(), SaleOrderStatus::Created);
    }

    #[test]
    fn item_edits_keep_totals_consistent() {
        let f = fixture();
        let teapot = f.product_with_hub(10);
        let order = f.paid_order(vec![line(teapot, 2), line(teapot, 1)]);
        let first = order.items()[0].id;
        let second = order.items()[1].id;

        // Removing a line would leave the total below what was paid.
        let err = f.service.delete_item(second).unwrap_err();
        assert!(matches!(err, WorkflowError::Domain(DomainError::InvalidState(_))));

        // Adding a line makes the order unpaid again.
        let order = f.service.insert_item(order.id_typed(), line(teapot, 1)).unwrap();
        assert_eq!(order.status(), SaleOrderStatus::Created);
        assert_eq!(order.items().len(), 3);

        let order = f
            .service
            .update_item(first, SaleItemRequest { product_id: teapot, sale_price: 120, quantity: 2 })
            .unwrap();
        assert_eq!(order.total_price(), 440);
    }

    #[test]
    fn shipped_items_and_last_items_cannot_be_removed() {
        let f = fixture();
        let teapot = f.product_with_hub(10);
        let order = f.paid_order(vec![line(teapot, 2)]);
        let only = order.items()[0].id;

        let err = f.service.delete_item(only).unwrap_err();
        assert!(matches!(err, WorkflowError::Domain(DomainError::Validation(_))));

        f.service.deliver_item(only, 1, "CTT", "RR1").unwrap();
        let err = f
            .service
            .update_item(only, line(teapot, 0))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Domain(DomainError::Validation(_))));
    }

    #[test]
    fn delete_refused_once_shipped() {
        let f = fixture();
        let teapot = f.product_with_hub(10);
        let shipped = f.paid_order(vec![line(teapot, 2)]);
        f.service
            .deliver_item(shipped.items()[0].id, 1, "CTT", "RR1")
            .unwrap();
        let err = f.service.delete(shipped.id_typed()).unwrap_err();
        assert!(matches!(err, WorkflowError::Domain(DomainError::InvalidState(_))));

        let fresh = f.paid_order(vec![line(teapot, 1)]);
        f.service.delete(fresh.id_typed()).unwrap();
        assert!(f.store.sale_order(fresh.id_typed()).unwrap().is_none());
    }

    #[test]
    fn update_changes_details_in_any_status() {
        let f = fixture();
        let teapot = f.product_with_hub(1);
        let order = f.paid_order(vec![line(teapot, 1)]);
        f.service.deliver(order.id_typed(), "CTT", "RR1").unwrap();

        let order = f
            .service
            .update(order.id_typed(), "Avenida da Liberdade 1", Some("ring twice".into()))
            .unwrap();
        assert_eq!(order.address(), "Avenida da Liberdade 1");
        assert_eq!(order.remark(), Some("ring twice"));
        assert_eq!(order.status(), SaleOrderStatus::Delivered);
    }

    #[test]
    fn find_all_and_search() {
        let f = fixture();
        let teapot = f.product_with_hub(10);
        let paid = f.paid_order(vec![line(teapot, 1)]);
        let open = f
            .service
            .insert(
                SALESPERSON,
                "Praça do Comércio",
                Some("Leave at Reception".into()),
                vec![line(teapot, 1)],
            )
            .unwrap();

        let page = f
            .service
            .find_all(Some(SALESPERSON), Some(SaleOrderStatus::Paid), PageRequest::default())
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id_typed(), paid.id_typed());

        let all = f.service.find_all(None, None, PageRequest::default()).unwrap();
        let ids: Vec<_> = all.items.iter().map(|o| o.id_typed()).collect();
        assert_eq!(ids, vec![open.id_typed(), paid.id_typed()]);

        let hits = f.service.search("reception", PageRequest::default()).unwrap();
        assert_eq!(hits.total, 1);
        assert_eq!(hits.items[0].id_typed(), open.id_typed());
        let hits = f.service.search("HARBOUR", PageRequest::default()).unwrap();
        assert_eq!(hits.items[0].id_typed(), paid.id_typed());

        let err = f
            .service
            .find_all(Some(BUYER), None, PageRequest::default())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Domain(DomainError::RoleMismatch(_))));
    }
}
