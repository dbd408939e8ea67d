//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every workflow failure is one of these kinds, each carrying a human-readable
/// message. Infrastructure failures (storage, locking) are modelled separately
/// in the infra crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A structural precondition failed (e.g. an order without items).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A referenced user exists but does not hold the required role.
    #[error("role mismatch: {0}")]
    RoleMismatch(String),

    /// The entity is not in a status that allows the requested operation.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A ledger adjustment would drive a stock counter negative.
    #[error("insufficient stock: {0}")]
    InsufficientStock(String),

    /// Received quantity exceeds the shipped quantity.
    #[error("over receipt: {0}")]
    OverReceipt(String),

    /// Delivered quantity would exceed the ordered quantity.
    #[error("over delivery: {0}")]
    OverDelivery(String),

    /// Purchased or warehoused quantity exceeds the authorized quantity.
    #[error("over purchase: {0}")]
    OverPurchase(String),

    /// The caller is not the actor assigned to this order.
    #[error("actor mismatch: {0}")]
    Mismatch(String),

    /// A conflict occurred (e.g. stale version / aggregate already exists).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn role_mismatch(msg: impl Into<String>) -> Self {
        Self::RoleMismatch(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn insufficient_stock(msg: impl Into<String>) -> Self {
        Self::InsufficientStock(msg.into())
    }

    pub fn over_receipt(msg: impl Into<String>) -> Self {
        Self::OverReceipt(msg.into())
    }

    pub fn over_delivery(msg: impl Into<String>) -> Self {
        Self::OverDelivery(msg.into())
    }

    pub fn over_purchase(msg: impl Into<String>) -> Self {
        Self::OverPurchase(msg.into())
    }

    pub fn mismatch(msg: impl Into<String>) -> Self {
        Self::Mismatch(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Stable, machine-friendly name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation",
            DomainError::NotFound(_) => "not_found",
            DomainError::RoleMismatch(_) => "role_mismatch",
            DomainError::InvalidState(_) => "invalid_state",
            DomainError::InsufficientStock(_) => "insufficient_stock",
            DomainError::OverReceipt(_) => "over_receipt",
            DomainError::OverDelivery(_) => "over_delivery",
            DomainError::OverPurchase(_) => "over_purchase",
            DomainError::Mismatch(_) => "mismatch",
            DomainError::Conflict(_) => "conflict",
        }
    }
}
