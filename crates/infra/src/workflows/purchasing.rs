use tracing::{info, instrument};

use globalsourcing_auth::Role;
use globalsourcing_core::{
    Aggregate, AggregateRoot, DomainError, ExpectedVersion, Page, PageRequest, ProductId,
    PurchaseOrderId, UserId,
};
use globalsourcing_inventory::StockDelta;
use globalsourcing_purchasing::{
    AssignBuyer, AssignWarehouseKeeper, CreatePurchaseOrder, ForceFinishWarehousing,
    PurchaseInfo, PurchaseOrder, PurchaseOrderAction, PurchaseOrderCommand, PurchaseOrderEvent,
    PurchaseOrderStatus, PutIntoWarehouse, RejectPurchaseInfo, TRANSITIONS, UploadPurchaseInfo,
};

use crate::clock::Clock;
use crate::config::WorkflowConfig;
use crate::error::WorkflowResult;
use crate::ledger::StagedLedger;
use crate::lookup::Lookup;
use crate::store::{FulfillmentStore, Record, RecordKey, UnitOfWork};

use super::commit_with_retry;

/// Purchase-order workflow: request, buy, confirm, warehouse.
///
/// Only warehousing touches inventory (warehouse stock grows by the
/// warehoused quantity); every other step is a status change on the order.
#[derive(Debug)]
pub struct PurchaseOrderService<S, C> {
    store: S,
    clock: C,
    config: WorkflowConfig,
}

impl<S, C> PurchaseOrderService<S, C> {
    pub fn new(store: S, clock: C, config: WorkflowConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }
}

impl<S, C> PurchaseOrderService<S, C>
where
    S: FulfillmentStore,
    C: Clock,
{
    fn lookup(&self) -> Lookup<'_, S> {
        Lookup::new(&self.store)
    }

    /// Load an order in a status that allows `action`, run `command` on it
    /// and commit the result.
    fn transition(
        &self,
        operation: &'static str,
        order_id: PurchaseOrderId,
        action: PurchaseOrderAction,
        command: impl Fn(&Self) -> PurchaseOrderCommand,
    ) -> WorkflowResult<PurchaseOrder> {
        let order = commit_with_retry(&self.store, &self.config, operation, || {
            let mut order = self
                .lookup()
                .purchase_order_with_status(order_id, &TRANSITIONS.sources(action))?;
            let base_version = order.version();
            let events = order.execute(&command(self))?;

            let mut unit = UnitOfWork::new();
            let mut ledger = StagedLedger::new(&self.store);
            for event in &events {
                if let PurchaseOrderEvent::GoodsWarehoused(e) = event {
                    ledger.adjust(e.product_id, StockDelta::warehoused(e.quantity), e.occurred_at)?;
                }
            }
            unit.upsert(
                Record::PurchaseOrder(order.clone()),
                ExpectedVersion::Exact(base_version),
            );
            ledger.stage_into(&mut unit);
            Ok((unit, order))
        })?;

        info!(
            operation,
            order_id = %order_id,
            status = ?order.status(),
            "purchase order updated"
        );
        Ok(order)
    }

    #[instrument(skip(self), err)]
    pub fn create(&self, product_id: ProductId, quantity: u32) -> WorkflowResult<PurchaseOrder> {
        let order_id = PurchaseOrderId::new(self.store.next_id()?);
        let order = commit_with_retry(&self.store, &self.config, "purchase_order.create", || {
            self.lookup().product(product_id)?;

            let mut order = PurchaseOrder::empty(order_id);
            order.execute(&PurchaseOrderCommand::Create(CreatePurchaseOrder {
                order_id,
                product_id,
                quantity,
                occurred_at: self.clock.now(),
            }))?;

            let mut unit = UnitOfWork::new();
            unit.upsert(Record::PurchaseOrder(order.clone()), ExpectedVersion::Exact(0));
            Ok((unit, order))
        })?;

        info!(order_id = %order_id, product_id = %product_id, quantity, "purchase order created");
        Ok(order)
    }

    /// Hand a CREATED order to a buyer, overwriting the requested quantity.
    #[instrument(skip(self), err)]
    pub fn assign(
        &self,
        order_id: PurchaseOrderId,
        buyer_id: UserId,
        quantity: u32,
    ) -> WorkflowResult<PurchaseOrder> {
        self.lookup().user_with_role(buyer_id, Role::Buyer)?;
        self.transition(
            "purchase_order.assign",
            order_id,
            PurchaseOrderAction::Assign,
            |service| {
                PurchaseOrderCommand::AssignBuyer(AssignBuyer {
                    order_id,
                    buyer_id,
                    quantity,
                    occurred_at: service.clock.now(),
                })
            },
        )
    }

    /// Record what the buyer actually bought. Also used to resubmit after a
    /// rejection.
    #[instrument(skip(self), err)]
    pub fn upload_purchase_info(
        &self,
        order_id: PurchaseOrderId,
        buyer_id: UserId,
        info: PurchaseInfo,
    ) -> WorkflowResult<PurchaseOrder> {
        self.transition(
            "purchase_order.upload_purchase_info",
            order_id,
            PurchaseOrderAction::UploadPurchaseInfo,
            |service| {
                PurchaseOrderCommand::UploadPurchaseInfo(UploadPurchaseInfo {
                    order_id,
                    buyer_id,
                    info: info.clone(),
                    occurred_at: service.clock.now(),
                })
            },
        )
    }

    /// Approve the uploaded purchase and name the keeper who will receive it.
    #[instrument(skip(self), err)]
    pub fn assign_to_warehouse_keeper(
        &self,
        order_id: PurchaseOrderId,
        keeper_id: UserId,
    ) -> WorkflowResult<PurchaseOrder> {
        self.lookup()
            .user_with_role(keeper_id, Role::WarehouseKeeper)?;
        self.transition(
            "purchase_order.assign_to_warehouse_keeper",
            order_id,
            PurchaseOrderAction::Confirm,
            |service| {
                PurchaseOrderCommand::AssignWarehouseKeeper(AssignWarehouseKeeper {
                    order_id,
                    keeper_id,
                    occurred_at: service.clock.now(),
                })
            },
        )
    }

    #[instrument(skip(self), err)]
    pub fn reject(&self, order_id: PurchaseOrderId, reason: &str) -> WorkflowResult<PurchaseOrder> {
        self.transition(
            "purchase_order.reject",
            order_id,
            PurchaseOrderAction::Reject,
            |service| {
                PurchaseOrderCommand::Reject(RejectPurchaseInfo {
                    order_id,
                    reason: reason.to_string(),
                    occurred_at: service.clock.now(),
                })
            },
        )
    }

    /// Warehouse part (or the rest) of a confirmed purchase. Warehouse stock
    /// grows by `quantity` in the same commit.
    #[instrument(skip(self), err)]
    pub fn put_into_warehouse(
        &self,
        keeper_id: UserId,
        order_id: PurchaseOrderId,
        quantity: u32,
    ) -> WorkflowResult<PurchaseOrder> {
        self.transition(
            "purchase_order.put_into_warehouse",
            order_id,
            PurchaseOrderAction::Warehouse,
            |service| {
                PurchaseOrderCommand::PutIntoWarehouse(PutIntoWarehouse {
                    order_id,
                    keeper_id,
                    quantity,
                    occurred_at: service.clock.now(),
                })
            },
        )
    }

    /// Close a confirmed order as is. Stock and warehoused quantity stay
    /// untouched.
    #[instrument(skip(self), err)]
    pub fn force_finish_warehousing(
        &self,
        keeper_id: UserId,
        order_id: PurchaseOrderId,
    ) -> WorkflowResult<PurchaseOrder> {
        self.transition(
            "purchase_order.force_finish_warehousing",
            order_id,
            PurchaseOrderAction::ForceFinish,
            |service| {
                PurchaseOrderCommand::ForceFinishWarehousing(ForceFinishWarehousing {
                    order_id,
                    keeper_id,
                    occurred_at: service.clock.now(),
                })
            },
        )
    }

    /// Remove an order that nothing has been bought for yet. Deleting an
    /// absent order succeeds.
    #[instrument(skip(self), err)]
    pub fn delete(&self, order_id: PurchaseOrderId) -> WorkflowResult<()> {
        let deleted = commit_with_retry(&self.store, &self.config, "purchase_order.delete", || {
            let mut unit = UnitOfWork::new();
            let Some(order) = self.store.purchase_order(order_id)? else {
                return Ok((unit, false));
            };
            order.ensure_deletable()?;
            unit.delete(
                RecordKey::PurchaseOrder(order_id),
                ExpectedVersion::Exact(order.version()),
            );
            Ok((unit, true))
        })?;

        if deleted {
            info!(order_id = %order_id, "purchase order deleted");
        }
        Ok(())
    }

    /// Orders matching every given filter, most recently updated first.
    ///
    /// Buyer and keeper filters must name users holding that role.
    #[instrument(skip(self), err)]
    pub fn find_all(
        &self,
        buyer_id: Option<UserId>,
        keeper_id: Option<UserId>,
        status: Option<PurchaseOrderStatus>,
        page: PageRequest,
    ) -> WorkflowResult<Page<PurchaseOrder>> {
        if let Some(id) = buyer_id {
            self.lookup().user_with_role(id, Role::Buyer)?;
        }
        if let Some(id) = keeper_id {
            self.lookup().user_with_role(id, Role::WarehouseKeeper)?;
        }

        let filter = |order: &PurchaseOrder| {
            buyer_id.is_none_or(|id| order.buyer_id() == Some(id))
                && keeper_id.is_none_or(|id| order.warehouse_keeper_id() == Some(id))
                && status.is_none_or(|s| order.status() == s)
        };
        Ok(self
            .store
            .page_purchase_orders(&filter, self.config.page(page))?)
    }

    pub fn get(&self, order_id: PurchaseOrderId) -> WorkflowResult<PurchaseOrder> {
        self.lookup().purchase_order_with_status(order_id, &[])
    }

    /// The uploaded purchase photo.
    pub fn photo(&self, order_id: PurchaseOrderId) -> WorkflowResult<String> {
        let order = self.get(order_id)?;
        order.photo().map(str::to_string).ok_or_else(|| {
            DomainError::not_found(format!("photo of purchase order {order_id}")).into()
        })
    }

    /// The uploaded purchase invoice.
    pub fn invoice(&self, order_id: PurchaseOrderId) -> WorkflowResult<String> {
        let order = self.get(order_id)?;
        order.invoice().map(str::to_string).ok_or_else(|| {
            DomainError::not_found(format!("invoice of purchase order {order_id}")).into()
        })
    }
}
