use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use globalsourcing_core::{
    Aggregate, AggregateRoot, DomainError, Event, ExpressOrderId, ExpressOrderItemId, ProductId,
    TransitionTable, UserId,
};

/// Express order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpressOrderStatus {
    Created,
    Delivered,
    Received,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpressOrderAction {
    Deliver,
    Receive,
}

pub const TRANSITIONS: TransitionTable<ExpressOrderStatus, ExpressOrderAction> = TransitionTable::new(
    "express order",
    &[
        (
            ExpressOrderStatus::Created,
            ExpressOrderAction::Deliver,
            ExpressOrderStatus::Delivered,
        ),
        (
            ExpressOrderStatus::Delivered,
            ExpressOrderAction::Receive,
            ExpressOrderStatus::Received,
        ),
    ],
);

/// One shipped line. Membership is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressOrderItem {
    pub id: ExpressOrderItemId,
    pub product_id: ProductId,
    /// Shipped quantity.
    pub quantity: u32,
    pub received_quantity: u32,
}

impl ExpressOrderItem {
    /// Units lost between shipment and receipt.
    pub fn shortfall(&self) -> u32 {
        self.quantity.saturating_sub(self.received_quantity)
    }
}

/// Item of a new express order; the id is allocated by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExpressItem {
    pub item_id: ExpressOrderItemId,
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Quantity counted at the hub for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedQuantity {
    pub item_id: ExpressOrderItemId,
    pub quantity: u32,
}

/// Aggregate root: ExpressOrder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressOrder {
    id: ExpressOrderId,
    status: ExpressOrderStatus,
    deliverer_id: Option<UserId>,
    receiver_id: Option<UserId>,
    company: Option<String>,
    tracking_number: Option<String>,
    remark: Option<String>,
    items: Vec<ExpressOrderItem>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl ExpressOrder {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: ExpressOrderId) -> Self {
        Self {
            id,
            status: ExpressOrderStatus::Created,
            deliverer_id: None,
            receiver_id: None,
            company: None,
            tracking_number: None,
            remark: None,
            items: Vec::new(),
            created_at: None,
            updated_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ExpressOrderId {
        self.id
    }

    pub fn status(&self) -> ExpressOrderStatus {
        self.status
    }

    pub fn deliverer_id(&self) -> Option<UserId> {
        self.deliverer_id
    }

    pub fn receiver_id(&self) -> Option<UserId> {
        self.receiver_id
    }

    pub fn company(&self) -> Option<&str> {
        self.company.as_deref()
    }

    pub fn tracking_number(&self) -> Option<&str> {
        self.tracking_number.as_deref()
    }

    pub fn remark(&self) -> Option<&str> {
        self.remark.as_deref()
    }

    pub fn items(&self) -> &[ExpressOrderItem] {
        &self.items
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
}

impl AggregateRoot for ExpressOrder {
    type Id = ExpressOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateExpressOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateExpressOrder {
    pub order_id: ExpressOrderId,
    pub items: Vec<NewExpressItem>,
    pub remark: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeliverExpressOrder (CREATED -> DELIVERED).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverExpressOrder {
    pub order_id: ExpressOrderId,
    pub deliverer_id: UserId,
    pub company: String,
    pub tracking_number: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReceiveExpressOrder (DELIVERED -> RECEIVED).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveExpressOrder {
    pub order_id: ExpressOrderId,
    pub receiver_id: UserId,
    pub received: Vec<ReceivedQuantity>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpressOrderCommand {
    Create(CreateExpressOrder),
    Deliver(DeliverExpressOrder),
    Receive(ReceiveExpressOrder),
}

/// Event: ExpressOrderCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressOrderCreated {
    pub order_id: ExpressOrderId,
    pub items: Vec<ExpressOrderItem>,
    pub remark: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ExpressOrderDelivered.
///
/// Every item's quantity left the warehouse and is now in transit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressOrderDelivered {
    pub order_id: ExpressOrderId,
    pub deliverer_id: UserId,
    pub company: String,
    pub tracking_number: String,
    pub items: Vec<ExpressOrderItem>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ExpressOrderReceived.
///
/// Items carry the counted `received_quantity`; the full shipped quantity
/// leaves transit either way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressOrderReceived {
    pub order_id: ExpressOrderId,
    pub receiver_id: UserId,
    pub items: Vec<ExpressOrderItem>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpressOrderEvent {
    Created(ExpressOrderCreated),
    Delivered(ExpressOrderDelivered),
    Received(ExpressOrderReceived),
}

impl Event for ExpressOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ExpressOrderEvent::Created(_) => "shipping.express_order.created",
            ExpressOrderEvent::Delivered(_) => "shipping.express_order.delivered",
            ExpressOrderEvent::Received(_) => "shipping.express_order.received",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ExpressOrderEvent::Created(e) => e.occurred_at,
            ExpressOrderEvent::Delivered(e) => e.occurred_at,
            ExpressOrderEvent::Received(e) => e.occurred_at,
        }
    }
}

impl Aggregate for ExpressOrder {
    type Command = ExpressOrderCommand;
    type Event = ExpressOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ExpressOrderEvent::Created(e) => {
                self.id = e.order_id;
                self.items = e.items.clone();
                self.remark = e.remark.clone();
                self.status = ExpressOrderStatus::Created;
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            ExpressOrderEvent::Delivered(e) => {
                self.deliverer_id = Some(e.deliverer_id);
                self.company = Some(e.company.clone());
                self.tracking_number = Some(e.tracking_number.clone());
                self.status = ExpressOrderStatus::Delivered;
            }
            ExpressOrderEvent::Received(e) => {
                self.receiver_id = Some(e.receiver_id);
                self.items = e.items.clone();
                self.status = ExpressOrderStatus::Received;
            }
        }

        self.updated_at = Some(event.occurred_at());
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ExpressOrderCommand::Create(cmd) => self.handle_create(cmd),
            ExpressOrderCommand::Deliver(cmd) => self.handle_deliver(cmd),
            ExpressOrderCommand::Receive(cmd) => self.handle_receive(cmd),
        }
    }
}

impl ExpressOrder {
    fn ensure_created(&self, order_id: ExpressOrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("express order {order_id}")));
        }
        if self.id != order_id {
            return Err(DomainError::validation("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(
        &self,
        cmd: &CreateExpressOrder,
    ) -> Result<Vec<ExpressOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("express order already exists"));
        }
        if cmd.items.is_empty() {
            return Err(DomainError::validation("express order must have at least one item"));
        }

        let mut ids = HashSet::new();
        for item in &cmd.items {
            if item.quantity == 0 {
                return Err(DomainError::validation(format!(
                    "item for product {} must ship a positive quantity",
                    item.product_id
                )));
            }
            if !ids.insert(item.item_id) {
                return Err(DomainError::validation(format!(
                    "duplicate item id {}",
                    item.item_id
                )));
            }
        }

        let items = cmd
            .items
            .iter()
            .map(|item| ExpressOrderItem {
                id: item.item_id,
                product_id: item.product_id,
                quantity: item.quantity,
                received_quantity: 0,
            })
            .collect();

        Ok(vec![ExpressOrderEvent::Created(ExpressOrderCreated {
            order_id: cmd.order_id,
            items,
            remark: cmd.remark.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_deliver(
        &self,
        cmd: &DeliverExpressOrder,
    ) -> Result<Vec<ExpressOrderEvent>, DomainError> {
        self.ensure_created(cmd.order_id)?;
        TRANSITIONS.next(self.status, ExpressOrderAction::Deliver)?;

        if cmd.company.trim().is_empty() {
            return Err(DomainError::validation("express company cannot be empty"));
        }
        if cmd.tracking_number.trim().is_empty() {
            return Err(DomainError::validation("tracking number cannot be empty"));
        }

        Ok(vec![ExpressOrderEvent::Delivered(ExpressOrderDelivered {
            order_id: cmd.order_id,
            deliverer_id: cmd.deliverer_id,
            company: cmd.company.clone(),
            tracking_number: cmd.tracking_number.clone(),
            items: self.items.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_receive(
        &self,
        cmd: &ReceiveExpressOrder,
    ) -> Result<Vec<ExpressOrderEvent>, DomainError> {
        self.ensure_created(cmd.order_id)?;
        TRANSITIONS.next(self.status, ExpressOrderAction::Receive)?;

        let mut seen = HashSet::new();
        for entry in &cmd.received {
            if !self.items.iter().any(|item| item.id == entry.item_id) {
                return Err(DomainError::validation(format!(
                    "item {} does not belong to express order {}",
                    entry.item_id, self.id
                )));
            }
            if !seen.insert(entry.item_id) {
                return Err(DomainError::validation(format!(
                    "item {} reported more than once",
                    entry.item_id
                )));
            }
        }

        let mut items = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let received = cmd
                .received
                .iter()
                .find(|entry| entry.item_id == item.id)
                .ok_or_else(|| {
                    DomainError::validation(format!("no received quantity for item {}", item.id))
                })?;

            if received.quantity > item.quantity {
                return Err(DomainError::over_receipt(format!(
                    "item {} received {} but only {} shipped",
                    item.id, received.quantity, item.quantity
                )));
            }

            items.push(ExpressOrderItem {
                received_quantity: received.quantity,
                ..item.clone()
            });
        }

        Ok(vec![ExpressOrderEvent::Received(ExpressOrderReceived {
            order_id: cmd.order_id,
            receiver_id: cmd.receiver_id,
            items,
            occurred_at: cmd.occurred_at,
        })])
    }
}
