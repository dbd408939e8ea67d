use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use globalsourcing_core::{
    Aggregate, AggregateRoot, DomainError, Event, ProductId, PurchaseOrderId, TransitionTable,
    UserId,
};

/// Purchase order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseOrderStatus {
    /// Requested, no buyer yet.
    Created,
    /// Assigned to a buyer.
    Ready,
    /// Purchase info uploaded, awaiting review.
    Pending,
    /// Purchase info refused; the buyer may upload again.
    Rejected,
    /// Reviewed and handed to a warehouse keeper.
    Confirmed,
    /// Warehousing finished (fully or forced).
    Warehoused,
}

/// Everything that can happen to a purchase order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PurchaseOrderAction {
    Assign,
    UploadPurchaseInfo,
    Confirm,
    Reject,
    Warehouse,
    CompleteWarehousing,
    ForceFinish,
    Delete,
}

pub const TRANSITIONS: TransitionTable<PurchaseOrderStatus, PurchaseOrderAction> = {
    use PurchaseOrderAction as A;
    use PurchaseOrderStatus as S;
    TransitionTable::new(
        "purchase order",
        &[
            (S::Created, A::Assign, S::Ready),
            (S::Ready, A::UploadPurchaseInfo, S::Pending),
            (S::Rejected, A::UploadPurchaseInfo, S::Pending),
            (S::Pending, A::Confirm, S::Confirmed),
            (S::Pending, A::Reject, S::Rejected),
            (S::Confirmed, A::Warehouse, S::Confirmed),
            (S::Confirmed, A::CompleteWarehousing, S::Warehoused),
            (S::Confirmed, A::ForceFinish, S::Warehoused),
            (S::Created, A::Delete, S::Created),
            (S::Ready, A::Delete, S::Ready),
        ],
    )
};

/// Buyer-reported purchase details. Attachments are opaque references
/// (storage keys or URLs) owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseInfo {
    pub invoice: String,
    pub invoice_date: NaiveDate,
    /// Unit price paid, in smallest currency unit.
    pub purchase_price: u64,
    pub purchased_quantity: u32,
    pub photo: String,
}

/// Aggregate root: PurchaseOrder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOrder {
    id: PurchaseOrderId,
    product_id: ProductId,
    buyer_id: Option<UserId>,
    warehouse_keeper_id: Option<UserId>,
    status: PurchaseOrderStatus,
    quantity: u32,
    purchased_quantity: u32,
    warehoused_quantity: u32,
    purchase_price: u64,
    invoice: Option<String>,
    invoice_date: Option<NaiveDate>,
    photo: Option<String>,
    reject_reason: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl PurchaseOrder {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: PurchaseOrderId) -> Self {
        Self {
            id,
            product_id: ProductId::new(0),
            buyer_id: None,
            warehouse_keeper_id: None,
            status: PurchaseOrderStatus::Created,
            quantity: 0,
            purchased_quantity: 0,
            warehoused_quantity: 0,
            purchase_price: 0,
            invoice: None,
            invoice_date: None,
            photo: None,
            reject_reason: None,
            created_at: None,
            updated_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PurchaseOrderId {
        self.id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn buyer_id(&self) -> Option<UserId> {
        self.buyer_id
    }

    pub fn warehouse_keeper_id(&self) -> Option<UserId> {
        self.warehouse_keeper_id
    }

    pub fn status(&self) -> PurchaseOrderStatus {
        self.status
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn purchased_quantity(&self) -> u32 {
        self.purchased_quantity
    }

    pub fn warehoused_quantity(&self) -> u32 {
        self.warehoused_quantity
    }

    pub fn purchase_price(&self) -> u64 {
        self.purchase_price
    }

    pub fn invoice(&self) -> Option<&str> {
        self.invoice.as_deref()
    }

    pub fn invoice_date(&self) -> Option<NaiveDate> {
        self.invoice_date
    }

    pub fn photo(&self) -> Option<&str> {
        self.photo.as_deref()
    }

    pub fn reject_reason(&self) -> Option<&str> {
        self.reject_reason.as_deref()
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// `purchase_price * quantity`.
    pub fn total_price(&self) -> u64 {
        self.purchase_price.saturating_mul(u64::from(self.quantity))
    }

    /// Units still expected before warehousing completes.
    pub fn remaining_quantity(&self) -> u32 {
        self.purchased_quantity.saturating_sub(self.warehoused_quantity)
    }

    /// Orders can only be destroyed before anything was bought.
    pub fn ensure_deletable(&self) -> Result<(), DomainError> {
        TRANSITIONS
            .next(self.status, PurchaseOrderAction::Delete)
            .map(|_| ())
    }
}

impl AggregateRoot for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreatePurchaseOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePurchaseOrder {
    pub order_id: PurchaseOrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AssignBuyer (CREATED -> READY).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignBuyer {
    pub order_id: PurchaseOrderId,
    pub buyer_id: UserId,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UploadPurchaseInfo (READY | REJECTED -> PENDING).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPurchaseInfo {
    pub order_id: PurchaseOrderId,
    /// The submitting buyer; must be the one the order is assigned to.
    pub buyer_id: UserId,
    pub info: PurchaseInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AssignWarehouseKeeper (PENDING -> CONFIRMED).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignWarehouseKeeper {
    pub order_id: PurchaseOrderId,
    pub keeper_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectPurchaseInfo (PENDING -> REJECTED).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectPurchaseInfo {
    pub order_id: PurchaseOrderId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: PutIntoWarehouse (CONFIRMED -> CONFIRMED | WAREHOUSED).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutIntoWarehouse {
    pub order_id: PurchaseOrderId,
    pub keeper_id: UserId,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ForceFinishWarehousing (CONFIRMED -> WAREHOUSED).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForceFinishWarehousing {
    pub order_id: PurchaseOrderId,
    pub keeper_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderCommand {
    Create(CreatePurchaseOrder),
    AssignBuyer(AssignBuyer),
    UploadPurchaseInfo(UploadPurchaseInfo),
    AssignWarehouseKeeper(AssignWarehouseKeeper),
    Reject(RejectPurchaseInfo),
    PutIntoWarehouse(PutIntoWarehouse),
    ForceFinishWarehousing(ForceFinishWarehousing),
}

/// Event: PurchaseOrderCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderCreated {
    pub order_id: PurchaseOrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BuyerAssigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerAssigned {
    pub order_id: PurchaseOrderId,
    pub buyer_id: UserId,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PurchaseInfoUploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseInfoUploaded {
    pub order_id: PurchaseOrderId,
    pub info: PurchaseInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Event: WarehouseKeeperAssigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseKeeperAssigned {
    pub order_id: PurchaseOrderId,
    pub keeper_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PurchaseInfoRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseInfoRejected {
    pub order_id: PurchaseOrderId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: GoodsWarehoused.
///
/// `quantity` units entered the origin warehouse; the caller must credit the
/// product's warehouse counter in the same commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodsWarehoused {
    pub order_id: PurchaseOrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    /// Cumulative warehoused quantity after this receipt.
    pub warehoused_quantity: u32,
    pub completed: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: WarehousingForceFinished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehousingForceFinished {
    pub order_id: PurchaseOrderId,
    pub warehoused_quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderEvent {
    Created(PurchaseOrderCreated),
    BuyerAssigned(BuyerAssigned),
    PurchaseInfoUploaded(PurchaseInfoUploaded),
    WarehouseKeeperAssigned(WarehouseKeeperAssigned),
    PurchaseInfoRejected(PurchaseInfoRejected),
    GoodsWarehoused(GoodsWarehoused),
    WarehousingForceFinished(WarehousingForceFinished),
}

impl Event for PurchaseOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PurchaseOrderEvent::Created(_) => "purchasing.order.created",
            PurchaseOrderEvent::BuyerAssigned(_) => "purchasing.order.buyer_assigned",
            PurchaseOrderEvent::PurchaseInfoUploaded(_) => "purchasing.order.info_uploaded",
            PurchaseOrderEvent::WarehouseKeeperAssigned(_) => "purchasing.order.keeper_assigned",
            PurchaseOrderEvent::PurchaseInfoRejected(_) => "purchasing.order.info_rejected",
            PurchaseOrderEvent::GoodsWarehoused(_) => "purchasing.order.goods_warehoused",
            PurchaseOrderEvent::WarehousingForceFinished(_) => {
                "purchasing.order.warehousing_force_finished"
            }
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PurchaseOrderEvent::Created(e) => e.occurred_at,
            PurchaseOrderEvent::BuyerAssigned(e) => e.occurred_at,
            PurchaseOrderEvent::PurchaseInfoUploaded(e) => e.occurred_at,
            PurchaseOrderEvent::WarehouseKeeperAssigned(e) => e.occurred_at,
            PurchaseOrderEvent::PurchaseInfoRejected(e) => e.occurred_at,
            PurchaseOrderEvent::GoodsWarehoused(e) => e.occurred_at,
            PurchaseOrderEvent::WarehousingForceFinished(e) => e.occurred_at,
        }
    }
}

impl Aggregate for PurchaseOrder {
    type Command = PurchaseOrderCommand;
    type Event = PurchaseOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PurchaseOrderEvent::Created(e) => {
                self.id = e.order_id;
                self.product_id = e.product_id;
                self.quantity = e.quantity;
                self.status = PurchaseOrderStatus::Created;
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            PurchaseOrderEvent::BuyerAssigned(e) => {
                self.buyer_id = Some(e.buyer_id);
                self.quantity = e.quantity;
                self.status = PurchaseOrderStatus::Ready;
            }
            PurchaseOrderEvent::PurchaseInfoUploaded(e) => {
                self.invoice = Some(e.info.invoice.clone());
                self.invoice_date = Some(e.info.invoice_date);
                self.purchase_price = e.info.purchase_price;
                self.purchased_quantity = e.info.purchased_quantity;
                self.photo = Some(e.info.photo.clone());
                self.status = PurchaseOrderStatus::Pending;
            }
            PurchaseOrderEvent::WarehouseKeeperAssigned(e) => {
                self.warehouse_keeper_id = Some(e.keeper_id);
                self.reject_reason = None;
                self.status = PurchaseOrderStatus::Confirmed;
            }
            PurchaseOrderEvent::PurchaseInfoRejected(e) => {
                self.reject_reason = Some(e.reason.clone());
                self.status = PurchaseOrderStatus::Rejected;
            }
            PurchaseOrderEvent::GoodsWarehoused(e) => {
                self.warehoused_quantity = e.warehoused_quantity;
                if e.completed {
                    self.status = PurchaseOrderStatus::Warehoused;
                }
            }
            PurchaseOrderEvent::WarehousingForceFinished(_) => {
                self.status = PurchaseOrderStatus::Warehoused;
            }
        }

        self.updated_at = Some(event.occurred_at());
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PurchaseOrderCommand::Create(cmd) => self.handle_create(cmd),
            PurchaseOrderCommand::AssignBuyer(cmd) => self.handle_assign_buyer(cmd),
            PurchaseOrderCommand::UploadPurchaseInfo(cmd) => self.handle_upload(cmd),
            PurchaseOrderCommand::AssignWarehouseKeeper(cmd) => self.handle_assign_keeper(cmd),
            PurchaseOrderCommand::Reject(cmd) => self.handle_reject(cmd),
            PurchaseOrderCommand::PutIntoWarehouse(cmd) => self.handle_put_into_warehouse(cmd),
            PurchaseOrderCommand::ForceFinishWarehousing(cmd) => self.handle_force_finish(cmd),
        }
    }
}

impl PurchaseOrder {
    fn ensure_order_id(&self, order_id: PurchaseOrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::validation("order_id mismatch"));
        }
        Ok(())
    }

    fn ensure_created(&self, order_id: PurchaseOrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("purchase order {order_id}")));
        }
        self.ensure_order_id(order_id)
    }

    fn ensure_keeper(&self, keeper_id: UserId) -> Result<(), DomainError> {
        if self.warehouse_keeper_id != Some(keeper_id) {
            return Err(DomainError::mismatch(format!(
                "purchase order {} is not assigned to warehouse keeper {keeper_id}",
                self.id
            )));
        }
        Ok(())
    }

    fn handle_create(
        &self,
        cmd: &CreatePurchaseOrder,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("purchase order already exists"));
        }
        if cmd.quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }

        Ok(vec![PurchaseOrderEvent::Created(PurchaseOrderCreated {
            order_id: cmd.order_id,
            product_id: cmd.product_id,
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign_buyer(&self, cmd: &AssignBuyer) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_created(cmd.order_id)?;
        TRANSITIONS.next(self.status, PurchaseOrderAction::Assign)?;
        if cmd.quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }

        Ok(vec![PurchaseOrderEvent::BuyerAssigned(BuyerAssigned {
            order_id: cmd.order_id,
            buyer_id: cmd.buyer_id,
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_upload(
        &self,
        cmd: &UploadPurchaseInfo,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_created(cmd.order_id)?;
        TRANSITIONS.next(self.status, PurchaseOrderAction::UploadPurchaseInfo)?;

        if self.buyer_id != Some(cmd.buyer_id) {
            return Err(DomainError::mismatch(format!(
                "purchase order {} is not assigned to buyer {}",
                self.id, cmd.buyer_id
            )));
        }

        let purchased = cmd.info.purchased_quantity;
        if purchased > self.quantity {
            return Err(DomainError::over_purchase(format!(
                "purchased {purchased} but only {} requested",
                self.quantity
            )));
        }
        if purchased < self.quantity {
            return Err(DomainError::validation(format!(
                "purchased quantity {purchased} does not match requested quantity {}",
                self.quantity
            )));
        }

        Ok(vec![PurchaseOrderEvent::PurchaseInfoUploaded(
            PurchaseInfoUploaded {
                order_id: cmd.order_id,
                info: cmd.info.clone(),
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_assign_keeper(
        &self,
        cmd: &AssignWarehouseKeeper,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_created(cmd.order_id)?;
        TRANSITIONS.next(self.status, PurchaseOrderAction::Confirm)?;

        Ok(vec![PurchaseOrderEvent::WarehouseKeeperAssigned(
            WarehouseKeeperAssigned {
                order_id: cmd.order_id,
                keeper_id: cmd.keeper_id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_reject(
        &self,
        cmd: &RejectPurchaseInfo,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_created(cmd.order_id)?;
        TRANSITIONS.next(self.status, PurchaseOrderAction::Reject)?;

        Ok(vec![PurchaseOrderEvent::PurchaseInfoRejected(
            PurchaseInfoRejected {
                order_id: cmd.order_id,
                reason: cmd.reason.clone(),
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_put_into_warehouse(
        &self,
        cmd: &PutIntoWarehouse,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_created(cmd.order_id)?;
        TRANSITIONS.next(self.status, PurchaseOrderAction::Warehouse)?;
        self.ensure_keeper(cmd.keeper_id)?;

        if cmd.quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }

        let warehoused = self
            .warehoused_quantity
            .checked_add(cmd.quantity)
            .filter(|total| *total <= self.purchased_quantity)
            .ok_or_else(|| {
                DomainError::over_purchase(format!(
                    "cannot warehouse {} more: {} of {} already warehoused",
                    cmd.quantity, self.warehoused_quantity, self.purchased_quantity
                ))
            })?;

        let completed = warehoused == self.purchased_quantity;
        if completed {
            TRANSITIONS.next(self.status, PurchaseOrderAction::CompleteWarehousing)?;
        }

        Ok(vec![PurchaseOrderEvent::GoodsWarehoused(GoodsWarehoused {
            order_id: cmd.order_id,
            product_id: self.product_id,
            quantity: cmd.quantity,
            warehoused_quantity: warehoused,
            completed,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_force_finish(
        &self,
        cmd: &ForceFinishWarehousing,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_created(cmd.order_id)?;
        TRANSITIONS.next(self.status, PurchaseOrderAction::ForceFinish)?;
        self.ensure_keeper(cmd.keeper_id)?;

        Ok(vec![PurchaseOrderEvent::WarehousingForceFinished(
            WarehousingForceFinished {
                order_id: cmd.order_id,
                warehoused_quantity: self.warehoused_quantity,
                occurred_at: cmd.occurred_at,
            },
        )])
    }
}
