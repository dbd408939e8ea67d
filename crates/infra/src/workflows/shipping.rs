use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use globalsourcing_auth::Role;
use globalsourcing_core::{
    Aggregate, AggregateRoot, ExpectedVersion, ExpressOrderId, ExpressOrderItemId, Page,
    PageRequest, ProductId, UserId,
};
use globalsourcing_inventory::StockDelta;
use globalsourcing_shipping::{
    CreateExpressOrder, DeliverExpressOrder, ExpressOrder, ExpressOrderAction,
    ExpressOrderCommand, ExpressOrderEvent, ExpressOrderStatus, NewExpressItem,
    ReceiveExpressOrder, ReceivedQuantity, TRANSITIONS,
};

use crate::clock::Clock;
use crate::config::WorkflowConfig;
use crate::error::WorkflowResult;
use crate::ledger::StagedLedger;
use crate::lookup::Lookup;
use crate::store::{FulfillmentStore, Record, UnitOfWork};

use super::commit_with_retry;

/// One line of a new express order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Express-shipment workflow: warehouse → in transit → hub.
#[derive(Debug)]
pub struct ExpressOrderService<S, C> {
    store: S,
    clock: C,
    config: WorkflowConfig,
}

impl<S, C> ExpressOrderService<S, C> {
    pub fn new(store: S, clock: C, config: WorkflowConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }
}

impl<S, C> ExpressOrderService<S, C>
where
    S: FulfillmentStore,
    C: Clock,
{
    fn lookup(&self) -> Lookup<'_, S> {
        Lookup::new(&self.store)
    }

    /// Load an order in a status that allows `action`, run `command`, move
    /// the stock its events describe and commit order and products together.
    fn transition(
        &self,
        operation: &'static str,
        order_id: ExpressOrderId,
        action: ExpressOrderAction,
        command: impl Fn(&Self) -> ExpressOrderCommand,
    ) -> WorkflowResult<ExpressOrder> {
        let order = commit_with_retry(&self.store, &self.config, operation, || {
            let mut order = self
                .lookup()
                .express_order_with_status(order_id, &TRANSITIONS.sources(action))?;
            let base_version = order.version();
            let events = order.execute(&command(self))?;

            let mut ledger = StagedLedger::new(&self.store);
            for event in &events {
                match event {
                    ExpressOrderEvent::Delivered(e) => {
                        for item in &e.items {
                            ledger.adjust(
                                item.product_id,
                                StockDelta::shipped(item.quantity),
                                e.occurred_at,
                            )?;
                        }
                    }
                    ExpressOrderEvent::Received(e) => {
                        for item in &e.items {
                            ledger.adjust(
                                item.product_id,
                                StockDelta::received(item.quantity, item.received_quantity),
                                e.occurred_at,
                            )?;
                        }
                    }
                    ExpressOrderEvent::Created(_) => {}
                }
            }

            let mut unit = UnitOfWork::new();
            unit.upsert(
                Record::ExpressOrder(order.clone()),
                ExpectedVersion::Exact(base_version),
            );
            ledger.stage_into(&mut unit);
            Ok((unit, order))
        })?;

        info!(
            operation,
            order_id = %order_id,
            status = ?order.status(),
            "express order updated"
        );
        Ok(order)
    }

    #[instrument(skip(self), err)]
    pub fn insert(
        &self,
        items: Vec<ExpressItemRequest>,
        remark: Option<String>,
    ) -> WorkflowResult<ExpressOrder> {
        let order_id = ExpressOrderId::new(self.store.next_id()?);
        let mut lines = Vec::with_capacity(items.len());
        for item in &items {
            lines.push(NewExpressItem {
                item_id: ExpressOrderItemId::new(self.store.next_id()?),
                product_id: item.product_id,
                quantity: item.quantity,
            });
        }

        let order = commit_with_retry(&self.store, &self.config, "express_order.insert", || {
            for line in &lines {
                self.lookup().product(line.product_id)?;
            }

            let mut order = ExpressOrder::empty(order_id);
            order.execute(&ExpressOrderCommand::Create(CreateExpressOrder {
                order_id,
                items: lines.clone(),
                remark: remark.clone(),
                occurred_at: self.clock.now(),
            }))?;

            let mut unit = UnitOfWork::new();
            unit.upsert(Record::ExpressOrder(order.clone()), ExpectedVersion::Exact(0));
            Ok((unit, order))
        })?;

        info!(order_id = %order_id, items = lines.len(), "express order created");
        Ok(order)
    }

    /// Hand the goods to the carrier: warehouse stock moves to midway for
    /// every item, or for none if any product runs short.
    #[instrument(skip(self), err)]
    pub fn deliver(
        &self,
        deliverer_id: UserId,
        order_id: ExpressOrderId,
        company: &str,
        tracking_number: &str,
    ) -> WorkflowResult<ExpressOrder> {
        self.lookup()
            .user_with_role(deliverer_id, Role::WarehouseKeeper)?;
        self.transition(
            "express_order.deliver",
            order_id,
            ExpressOrderAction::Deliver,
            |service| {
                ExpressOrderCommand::Deliver(DeliverExpressOrder {
                    order_id,
                    deliverer_id,
                    company: company.to_string(),
                    tracking_number: tracking_number.to_string(),
                    occurred_at: service.clock.now(),
                })
            },
        )
    }

    /// Settle the shipment at the hub. Midway stock drops by what was
    /// shipped; the hub gains what actually arrived.
    #[instrument(skip(self), err)]
    pub fn receive(
        &self,
        receiver_id: UserId,
        order_id: ExpressOrderId,
        received: Vec<ReceivedQuantity>,
    ) -> WorkflowResult<ExpressOrder> {
        self.lookup().user_with_role(receiver_id, Role::Transporter)?;
        self.transition(
            "express_order.receive",
            order_id,
            ExpressOrderAction::Receive,
            |service| {
                ExpressOrderCommand::Receive(ReceiveExpressOrder {
                    order_id,
                    receiver_id,
                    received: received.clone(),
                    occurred_at: service.clock.now(),
                })
            },
        )
    }

    #[instrument(skip(self), err)]
    pub fn find_all(
        &self,
        status: Option<ExpressOrderStatus>,
        page: PageRequest,
    ) -> WorkflowResult<Page<ExpressOrder>> {
        let filter = |order: &ExpressOrder| status.is_none_or(|s| order.status() == s);
        Ok(self
            .store
            .page_express_orders(&filter, self.config.page(page))?)
    }

    pub fn get(&self, order_id: ExpressOrderId) -> WorkflowResult<ExpressOrder> {
        self.lookup().express_order_with_status(order_id, &[])
    }
}
