use chrono::{DateTime, Utc};

/// A domain event decided by an aggregate.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **named** (stable dotted identifiers used in logs)
/// - **time-stamped** with business time
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "purchasing.order.warehoused").
    fn event_type(&self) -> &'static str;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
