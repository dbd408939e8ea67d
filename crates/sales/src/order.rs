use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use globalsourcing_core::{
    Aggregate, AggregateRoot, DomainError, Event, ProductId, SaleOrderId, SaleOrderItemId,
    TransitionTable, UserId,
};

/// Sale order status.
///
/// Never stored: it is derived from payment and item delivery on every read
/// (see [`SaleOrder::status`]), so it cannot drift from the items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleOrderStatus {
    Created,
    Paid,
    Delivered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaleOrderAction {
    RecordPayment,
    Deliver,
    DeliverItem,
    EditItems,
    Delete,
}

pub const TRANSITIONS: TransitionTable<SaleOrderStatus, SaleOrderAction> = {
    use SaleOrderAction as A;
    use SaleOrderStatus as S;
    TransitionTable::new(
        "sale order",
        &[
            (S::Created, A::RecordPayment, S::Paid),
            (S::Paid, A::Deliver, S::Delivered),
            (S::Paid, A::DeliverItem, S::Paid),
            (S::Created, A::EditItems, S::Created),
            (S::Paid, A::EditItems, S::Paid),
            (S::Created, A::Delete, S::Created),
            (S::Paid, A::Delete, S::Paid),
        ],
    )
};

/// Carrier record of one outbound parcel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub company: String,
    pub tracking_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleOrderItem {
    pub id: SaleOrderItemId,
    pub product_id: ProductId,
    /// Unit price in smallest currency unit.
    pub sale_price: u64,
    pub quantity: u32,
    pub delivered_quantity: u32,
    pub shipments: Vec<Shipment>,
}

impl SaleOrderItem {
    pub fn is_delivered(&self) -> bool {
        self.delivered_quantity == self.quantity
    }

    pub fn remaining_quantity(&self) -> u32 {
        self.quantity.saturating_sub(self.delivered_quantity)
    }

    pub fn line_total(&self) -> u64 {
        self.sale_price.saturating_mul(u64::from(self.quantity))
    }
}

/// Item of a new or edited sale order; the id is allocated by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSaleItem {
    pub item_id: SaleOrderItemId,
    pub product_id: ProductId,
    pub sale_price: u64,
    pub quantity: u32,
}

impl NewSaleItem {
    fn validate(&self) -> Result<(), DomainError> {
        if self.quantity == 0 {
            return Err(DomainError::validation(format!(
                "item for product {} must order a positive quantity",
                self.product_id
            )));
        }
        if self.sale_price == 0 {
            return Err(DomainError::validation(format!(
                "item for product {} must carry a positive sale price",
                self.product_id
            )));
        }
        Ok(())
    }

    fn into_item(self) -> SaleOrderItem {
        SaleOrderItem {
            id: self.item_id,
            product_id: self.product_id,
            sale_price: self.sale_price,
            quantity: self.quantity,
            delivered_quantity: 0,
            shipments: Vec::new(),
        }
    }
}

/// Aggregate root: SaleOrder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleOrder {
    id: SaleOrderId,
    salesperson_id: UserId,
    address: String,
    remark: Option<String>,
    paid_amount: u64,
    certificate: Option<String>,
    items: Vec<SaleOrderItem>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl SaleOrder {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: SaleOrderId) -> Self {
        Self {
            id,
            salesperson_id: UserId::new(0),
            address: String::new(),
            remark: None,
            paid_amount: 0,
            certificate: None,
            items: Vec::new(),
            created_at: None,
            updated_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> SaleOrderId {
        self.id
    }

    pub fn salesperson_id(&self) -> UserId {
        self.salesperson_id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn remark(&self) -> Option<&str> {
        self.remark.as_deref()
    }

    pub fn paid_amount(&self) -> u64 {
        self.paid_amount
    }

    pub fn certificate(&self) -> Option<&str> {
        self.certificate.as_deref()
    }

    pub fn items(&self) -> &[SaleOrderItem] {
        &self.items
    }

    pub fn item(&self, item_id: SaleOrderItemId) -> Option<&SaleOrderItem> {
        self.items.iter().find(|item| item.id == item_id)
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

    /// Σ(quantity × sale price) over all items.
    pub fn total_price(&self) -> u64 {
        self.items
            .iter()
            .fold(0u64, |acc, item| acc.saturating_add(item.line_total()))
    }

    /// True once every item has been delivered in full.
    pub fn is_delivered(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(SaleOrderItem::is_delivered)
    }

    /// DELIVERED if every item is delivered, else PAID if the paid amount
    /// covers the total, else CREATED.
    pub fn status(&self) -> SaleOrderStatus {
        if self.is_delivered() {
            SaleOrderStatus::Delivered
        } else if self.created && self.paid_amount == self.total_price() {
            SaleOrderStatus::Paid
        } else {
            SaleOrderStatus::Created
        }
    }

    pub fn has_shipments(&self) -> bool {
        self.items.iter().any(|item| item.delivered_quantity > 0)
    }

    /// Undelivered units per product, summed across items.
    pub fn hub_demand(&self) -> BTreeMap<ProductId, u64> {
        let mut demand = BTreeMap::new();
        for item in &self.items {
            let remaining = u64::from(item.remaining_quantity());
            if remaining > 0 {
                *demand.entry(item.product_id).or_insert(0) += remaining;
            }
        }
        demand
    }

    /// Whole-order delivery is only possible for a paid order none of whose
    /// items has shipped yet. Hub stock is checked by the caller.
    pub fn ensure_deliverable_as_whole(&self) -> Result<(), DomainError> {
        TRANSITIONS.next(self.status(), SaleOrderAction::Deliver)?;
        if self.has_shipments() {
            return Err(DomainError::invalid_state(format!(
                "sale order {} is partially delivered",
                self.id
            )));
        }
        Ok(())
    }

    pub fn ensure_deletable(&self) -> Result<(), DomainError> {
        TRANSITIONS.next(self.status(), SaleOrderAction::Delete)?;
        if self.has_shipments() {
            return Err(DomainError::invalid_state(format!(
                "sale order {} has shipped items",
                self.id
            )));
        }
        Ok(())
    }
}

impl AggregateRoot for SaleOrder {
    type Id = SaleOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateSaleOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSaleOrder {
    pub order_id: SaleOrderId,
    pub salesperson_id: UserId,
    pub address: String,
    pub remark: Option<String>,
    pub items: Vec<NewSaleItem>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateDetails (address and remark only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDetails {
    pub order_id: SaleOrderId,
    pub address: String,
    pub remark: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordPayment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPayment {
    pub order_id: SaleOrderId,
    pub paid_amount: u64,
    pub certificate: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeliverSaleOrder (every item in full, one parcel).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverSaleOrder {
    pub order_id: SaleOrderId,
    pub shipment: Shipment,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeliverItem (partial delivery of one item).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverItem {
    pub order_id: SaleOrderId,
    pub item_id: SaleOrderItemId,
    pub quantity: u32,
    pub shipment: Shipment,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddItem {
    pub order_id: SaleOrderId,
    pub item: NewSaleItem,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateItem (product, price and quantity of an existing item).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateItem {
    pub order_id: SaleOrderId,
    pub item: NewSaleItem,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveItem {
    pub order_id: SaleOrderId,
    pub item_id: SaleOrderItemId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleOrderCommand {
    Create(CreateSaleOrder),
    UpdateDetails(UpdateDetails),
    RecordPayment(RecordPayment),
    Deliver(DeliverSaleOrder),
    DeliverItem(DeliverItem),
    AddItem(AddItem),
    UpdateItem(UpdateItem),
    RemoveItem(RemoveItem),
}

/// Units of one item leaving the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDispatch {
    pub item_id: SaleOrderItemId,
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Event: SaleOrderCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleOrderCreated {
    pub order_id: SaleOrderId,
    pub salesperson_id: UserId,
    pub address: String,
    pub remark: Option<String>,
    pub items: Vec<SaleOrderItem>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DetailsUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsUpdated {
    pub order_id: SaleOrderId,
    pub address: String,
    pub remark: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecorded {
    pub order_id: SaleOrderId,
    pub paid_amount: u64,
    pub certificate: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SaleOrderDelivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleOrderDelivered {
    pub order_id: SaleOrderId,
    pub dispatches: Vec<ItemDispatch>,
    pub shipment: Shipment,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemDelivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDelivered {
    pub order_id: SaleOrderId,
    pub dispatch: ItemDispatch,
    pub shipment: Shipment,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAdded {
    pub order_id: SaleOrderId,
    pub item: SaleOrderItem,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUpdated {
    pub order_id: SaleOrderId,
    pub item: SaleOrderItem,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRemoved {
    pub order_id: SaleOrderId,
    pub item_id: SaleOrderItemId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleOrderEvent {
    Created(SaleOrderCreated),
    DetailsUpdated(DetailsUpdated),
    PaymentRecorded(PaymentRecorded),
    Delivered(SaleOrderDelivered),
    ItemDelivered(ItemDelivered),
    ItemAdded(ItemAdded),
    ItemUpdated(ItemUpdated),
    ItemRemoved(ItemRemoved),
}

impl SaleOrderEvent {
    /// Hub stock leaving with this event, if any.
    pub fn dispatches(&self) -> &[ItemDispatch] {
        match self {
            SaleOrderEvent::Delivered(e) => &e.dispatches,
            SaleOrderEvent::ItemDelivered(e) => core::slice::from_ref(&e.dispatch),
            _ => &[],
        }
    }
}

impl Event for SaleOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SaleOrderEvent::Created(_) => "sales.order.created",
            SaleOrderEvent::DetailsUpdated(_) => "sales.order.details_updated",
            SaleOrderEvent::PaymentRecorded(_) => "sales.order.payment_recorded",
            SaleOrderEvent::Delivered(_) => "sales.order.delivered",
            SaleOrderEvent::ItemDelivered(_) => "sales.order.item_delivered",
            SaleOrderEvent::ItemAdded(_) => "sales.order.item_added",
            SaleOrderEvent::ItemUpdated(_) => "sales.order.item_updated",
            SaleOrderEvent::ItemRemoved(_) => "sales.order.item_removed",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SaleOrderEvent::Created(e) => e.occurred_at,
            SaleOrderEvent::DetailsUpdated(e) => e.occurred_at,
            SaleOrderEvent::PaymentRecorded(e) => e.occurred_at,
            SaleOrderEvent::Delivered(e) => e.occurred_at,
            SaleOrderEvent::ItemDelivered(e) => e.occurred_at,
            SaleOrderEvent::ItemAdded(e) => e.occurred_at,
            SaleOrderEvent::ItemUpdated(e) => e.occurred_at,
            SaleOrderEvent::ItemRemoved(e) => e.occurred_at,
        }
    }
}

impl Aggregate for SaleOrder {
    type Command = SaleOrderCommand;
    type Event = SaleOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SaleOrderEvent::Created(e) => {
                self.id = e.order_id;
                self.salesperson_id = e.salesperson_id;
                self.address = e.address.clone();
                self.remark = e.remark.clone();
                self.items = e.items.clone();
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            SaleOrderEvent::DetailsUpdated(e) => {
                self.address = e.address.clone();
                self.remark = e.remark.clone();
            }
            SaleOrderEvent::PaymentRecorded(e) => {
                self.paid_amount = e.paid_amount;
                self.certificate = e.certificate.clone();
            }
            SaleOrderEvent::Delivered(e) => {
                for dispatch in &e.dispatches {
                    if let Some(item) = self.items.iter_mut().find(|i| i.id == dispatch.item_id) {
                        item.delivered_quantity = item.delivered_quantity.saturating_add(dispatch.quantity);
                        item.shipments.push(e.shipment.clone());
                    }
                }
            }
            SaleOrderEvent::ItemDelivered(e) => {
                if let Some(item) = self.items.iter_mut().find(|i| i.id == e.dispatch.item_id) {
                    item.delivered_quantity = item.delivered_quantity.saturating_add(e.dispatch.quantity);
                    item.shipments.push(e.shipment.clone());
                }
            }
            SaleOrderEvent::ItemAdded(e) => {
                self.items.push(e.item.clone());
            }
            SaleOrderEvent::ItemUpdated(e) => {
                if let Some(item) = self.items.iter_mut().find(|i| i.id == e.item.id) {
                    *item = e.item.clone();
                }
            }
            SaleOrderEvent::ItemRemoved(e) => {
                self.items.retain(|item| item.id != e.item_id);
            }
        }

        self.updated_at = Some(event.occurred_at());
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SaleOrderCommand::Create(cmd) => self.handle_create(cmd),
            SaleOrderCommand::UpdateDetails(cmd) => self.handle_update_details(cmd),
            SaleOrderCommand::RecordPayment(cmd) => self.handle_record_payment(cmd),
            SaleOrderCommand::Deliver(cmd) => self.handle_deliver(cmd),
            SaleOrderCommand::DeliverItem(cmd) => self.handle_deliver_item(cmd),
            SaleOrderCommand::AddItem(cmd) => self.handle_add_item(cmd),
            SaleOrderCommand::UpdateItem(cmd) => self.handle_update_item(cmd),
            SaleOrderCommand::RemoveItem(cmd) => self.handle_remove_item(cmd),
        }
    }
}

impl SaleOrder {
    fn ensure_created(&self, order_id: SaleOrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("sale order {order_id}")));
        }
        if self.id != order_id {
            return Err(DomainError::validation("order_id mismatch"));
        }
        Ok(())
    }

    fn existing_item(&self, item_id: SaleOrderItemId) -> Result<&SaleOrderItem, DomainError> {
        self.item(item_id).ok_or_else(|| {
            DomainError::not_found(format!("item {item_id} of sale order {}", self.id))
        })
    }

    /// Item edits may not leave the order priced below what was already paid.
    fn ensure_total_covers_payment(&self, new_total: u64) -> Result<(), DomainError> {
        if new_total < self.paid_amount {
            return Err(DomainError::invalid_state(format!(
                "total {new_total} would drop below paid amount {}",
                self.paid_amount
            )));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateSaleOrder) -> Result<Vec<SaleOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("sale order already exists"));
        }
        if cmd.address.trim().is_empty() {
            return Err(DomainError::validation("address cannot be empty"));
        }
        if cmd.items.is_empty() {
            return Err(DomainError::validation("sale order must have at least one item"));
        }

        let mut ids = HashSet::new();
        for item in &cmd.items {
            item.validate()?;
            if !ids.insert(item.item_id) {
                return Err(DomainError::validation(format!(
                    "duplicate item id {}",
                    item.item_id
                )));
            }
        }

        Ok(vec![SaleOrderEvent::Created(SaleOrderCreated {
            order_id: cmd.order_id,
            salesperson_id: cmd.salesperson_id,
            address: cmd.address.clone(),
            remark: cmd.remark.clone(),
            items: cmd.items.iter().cloned().map(NewSaleItem::into_item).collect(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_details(
        &self,
        cmd: &UpdateDetails,
    ) -> Result<Vec<SaleOrderEvent>, DomainError> {
        self.ensure_created(cmd.order_id)?;
        if cmd.address.trim().is_empty() {
            return Err(DomainError::validation("address cannot be empty"));
        }

        Ok(vec![SaleOrderEvent::DetailsUpdated(DetailsUpdated {
            order_id: cmd.order_id,
            address: cmd.address.clone(),
            remark: cmd.remark.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record_payment(
        &self,
        cmd: &RecordPayment,
    ) -> Result<Vec<SaleOrderEvent>, DomainError> {
        self.ensure_created(cmd.order_id)?;
        TRANSITIONS.next(self.status(), SaleOrderAction::RecordPayment)?;

        let total = self.total_price();
        if cmd.paid_amount > total {
            return Err(DomainError::validation(format!(
                "paid amount {} exceeds total price {total}",
                cmd.paid_amount
            )));
        }

        Ok(vec![SaleOrderEvent::PaymentRecorded(PaymentRecorded {
            order_id: cmd.order_id,
            paid_amount: cmd.paid_amount,
            certificate: cmd.certificate.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_deliver(&self, cmd: &DeliverSaleOrder) -> Result<Vec<SaleOrderEvent>, DomainError> {
        self.ensure_created(cmd.order_id)?;
        self.ensure_deliverable_as_whole()?;

        let dispatches = self
            .items
            .iter()
            .map(|item| ItemDispatch {
                item_id: item.id,
                product_id: item.product_id,
                quantity: item.quantity,
            })
            .collect();

        Ok(vec![SaleOrderEvent::Delivered(SaleOrderDelivered {
            order_id: cmd.order_id,
            dispatches,
            shipment: cmd.shipment.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_deliver_item(&self, cmd: &DeliverItem) -> Result<Vec<SaleOrderEvent>, DomainError> {
        self.ensure_created(cmd.order_id)?;
        let item = self.existing_item(cmd.item_id)?;
        if item.is_delivered() {
            return Err(DomainError::invalid_state(format!(
                "item {} is already fully delivered",
                item.id
            )));
        }
        TRANSITIONS.next(self.status(), SaleOrderAction::DeliverItem)?;

        if cmd.quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if cmd.quantity > item.remaining_quantity() {
            return Err(DomainError::over_delivery(format!(
                "item {} has {} of {} delivered, cannot deliver {} more",
                item.id, item.delivered_quantity, item.quantity, cmd.quantity
            )));
        }

        Ok(vec![SaleOrderEvent::ItemDelivered(ItemDelivered {
            order_id: cmd.order_id,
            dispatch: ItemDispatch {
                item_id: item.id,
                product_id: item.product_id,
                quantity: cmd.quantity,
            },
            shipment: cmd.shipment.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_item(&self, cmd: &AddItem) -> Result<Vec<SaleOrderEvent>, DomainError> {
        self.ensure_created(cmd.order_id)?;
        TRANSITIONS.next(self.status(), SaleOrderAction::EditItems)?;
        cmd.item.validate()?;
        if self.item(cmd.item.item_id).is_some() {
            return Err(DomainError::conflict(format!(
                "item {} already exists",
                cmd.item.item_id
            )));
        }

        Ok(vec![SaleOrderEvent::ItemAdded(ItemAdded {
            order_id: cmd.order_id,
            item: cmd.item.clone().into_item(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_item(&self, cmd: &UpdateItem) -> Result<Vec<SaleOrderEvent>, DomainError> {
        self.ensure_created(cmd.order_id)?;
        TRANSITIONS.next(self.status(), SaleOrderAction::EditItems)?;
        cmd.item.validate()?;
        let current = self.existing_item(cmd.item.item_id)?;

        if cmd.item.quantity < current.delivered_quantity {
            return Err(DomainError::validation(format!(
                "quantity {} is below the {} units already delivered",
                cmd.item.quantity, current.delivered_quantity
            )));
        }
        if current.delivered_quantity > 0 && cmd.item.product_id != current.product_id {
            return Err(DomainError::invalid_state(format!(
                "item {} has shipped and cannot change product",
                current.id
            )));
        }

        let updated = SaleOrderItem {
            product_id: cmd.item.product_id,
            sale_price: cmd.item.sale_price,
            quantity: cmd.item.quantity,
            ..current.clone()
        };
        let new_total = self
            .total_price()
            .saturating_sub(current.line_total())
            .saturating_add(updated.line_total());
        self.ensure_total_covers_payment(new_total)?;

        Ok(vec![SaleOrderEvent::ItemUpdated(ItemUpdated {
            order_id: cmd.order_id,
            item: updated,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_item(&self, cmd: &RemoveItem) -> Result<Vec<SaleOrderEvent>, DomainError> {
        self.ensure_created(cmd.order_id)?;
        TRANSITIONS.next(self.status(), SaleOrderAction::EditItems)?;
        let current = self.existing_item(cmd.item_id)?;

        if current.delivered_quantity > 0 {
            return Err(DomainError::invalid_state(format!(
                "item {} has shipped and cannot be removed",
                current.id
            )));
        }
        if self.items.len() == 1 {
            return Err(DomainError::validation(
                "sale order must keep at least one item",
            ));
        }
        self.ensure_total_covers_payment(self.total_price().saturating_sub(current.line_total()))?;

        Ok(vec![SaleOrderEvent::ItemRemoved(ItemRemoved {
            order_id: cmd.order_id,
            item_id: cmd.item_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
