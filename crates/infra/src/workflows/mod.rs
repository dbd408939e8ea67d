//! Workflow services (application-level orchestration).
//!
//! Every public operation follows the same pipeline:
//!
//! ```text
//! operation(args)
//!   ↓
//! 1. Load and guard (lookup: NotFound / RoleMismatch / InvalidState)
//!   ↓
//! 2. Execute the domain command (pure decision, produces events)
//!   ↓
//! 3. Turn goods-moving events into ledger adjustments (staged per product)
//!   ↓
//! 4. Commit every touched record in one unit of work (version CAS)
//! ```
//!
//! A version conflict at step 4 means another operation committed in between;
//! the whole pipeline is re-run against fresh state, up to
//! `WorkflowConfig::commit_attempts` times. Any other failure aborts with
//! nothing written.

mod products;
mod purchasing;
mod sales;
mod shipping;

pub use products::ProductService;
pub use purchasing::PurchaseOrderService;
pub use sales::{SaleItemRequest, SaleOrderService};
pub use shipping::{ExpressItemRequest, ExpressOrderService};

use tracing::{debug, warn};

use crate::config::WorkflowConfig;
use crate::error::WorkflowResult;
use crate::store::{FulfillmentStore, StoreError, UnitOfWork};

/// Run `attempt` and commit the unit of work it produces, re-running it on a
/// version conflict.
///
/// `attempt` must re-read everything it depends on; it is called once per
/// try. An empty unit of work is not committed.
pub(crate) fn commit_with_retry<S, T, F>(
    store: &S,
    config: &WorkflowConfig,
    operation: &'static str,
    mut attempt: F,
) -> WorkflowResult<T>
where
    S: FulfillmentStore + ?Sized,
    F: FnMut() -> WorkflowResult<(UnitOfWork, T)>,
{
    let max_attempts = config.commit_attempts.max(1);
    let mut tries = 0;
    loop {
        tries += 1;
        let (unit, output) = attempt()?;
        if unit.is_empty() {
            return Ok(output);
        }

        let writes = unit.len();
        match store.commit(unit) {
            Ok(()) => {
                debug!(operation, tries, writes, "unit of work committed");
                return Ok(output);
            }
            Err(StoreError::Conflict(reason)) if tries < max_attempts => {
                warn!(operation, tries, %reason, "commit conflict, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
}
