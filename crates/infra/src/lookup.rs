//! Lookup / guard layer.
//!
//! Resolves an entity by id and asserts what the caller needs from it (a
//! role, one of a set of statuses). Each failure is distinct:
//! `NotFound` when absent, `RoleMismatch` for the wrong role, `InvalidState`
//! for a status outside the allowed set. An empty status set allows any.

use tracing::debug;

use globalsourcing_auth::{Role, User};
use globalsourcing_core::{
    DomainError, ExpressOrderId, ProductId, PurchaseOrderId, SaleOrderId, SaleOrderItemId, UserId,
};
use globalsourcing_products::Product;
use globalsourcing_purchasing::{PurchaseOrder, PurchaseOrderStatus};
use globalsourcing_sales::{SaleOrder, SaleOrderStatus};
use globalsourcing_shipping::{ExpressOrder, ExpressOrderStatus};

use crate::error::WorkflowResult;
use crate::store::FulfillmentStore;

pub struct Lookup<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> Lookup<'a, S>
where
    S: FulfillmentStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn user(&self, id: UserId) -> WorkflowResult<User> {
        debug!(user_id = %id, "lookup user");
        self.store
            .user(id)?
            .ok_or_else(|| DomainError::not_found(format!("user {id}")).into())
    }

    pub fn user_with_role(&self, id: UserId, role: Role) -> WorkflowResult<User> {
        let user = self.user(id)?;
        if !user.has_role(role) {
            return Err(DomainError::role_mismatch(format!(
                "user {id} is a {}, not a {role}",
                user.role
            ))
            .into());
        }
        Ok(user)
    }

    pub fn product(&self, id: ProductId) -> WorkflowResult<Product> {
        debug!(product_id = %id, "lookup product");
        self.store
            .product(id)?
            .ok_or_else(|| DomainError::not_found(format!("product {id}")).into())
    }

    pub fn purchase_order_with_status(
        &self,
        id: PurchaseOrderId,
        allowed: &[PurchaseOrderStatus],
    ) -> WorkflowResult<PurchaseOrder> {
        debug!(order_id = %id, ?allowed, "lookup purchase order");
        let order = self
            .store
            .purchase_order(id)?
            .ok_or_else(|| DomainError::not_found(format!("purchase order {id}")))?;
        check_status("purchase order", id, order.status(), allowed)?;
        Ok(order)
    }

    pub fn express_order_with_status(
        &self,
        id: ExpressOrderId,
        allowed: &[ExpressOrderStatus],
    ) -> WorkflowResult<ExpressOrder> {
        debug!(order_id = %id, ?allowed, "lookup express order");
        let order = self
            .store
            .express_order(id)?
            .ok_or_else(|| DomainError::not_found(format!("express order {id}")))?;
        check_status("express order", id, order.status(), allowed)?;
        Ok(order)
    }

    pub fn sale_order_with_status(
        &self,
        id: SaleOrderId,
        allowed: &[SaleOrderStatus],
    ) -> WorkflowResult<SaleOrder> {
        debug!(order_id = %id, ?allowed, "lookup sale order");
        let order = self
            .store
            .sale_order(id)?
            .ok_or_else(|| DomainError::not_found(format!("sale order {id}")))?;
        check_status("sale order", id, order.status(), allowed)?;
        Ok(order)
    }

    pub fn sale_order_for_item(&self, item_id: SaleOrderItemId) -> WorkflowResult<SaleOrder> {
        debug!(item_id = %item_id, "lookup sale order item");
        self.store
            .sale_order_for_item(item_id)?
            .ok_or_else(|| DomainError::not_found(format!("sale order item {item_id}")).into())
    }
}

fn check_status<S>(
    entity: &str,
    id: impl core::fmt::Display,
    status: S,
    allowed: &[S],
) -> Result<(), DomainError>
where
    S: PartialEq + core::fmt::Debug,
{
    if allowed.is_empty() || allowed.contains(&status) {
        return Ok(());
    }
    Err(DomainError::invalid_state(format!(
        "{entity} {id} is {status:?}, expected one of {allowed:?}"
    )))
}
