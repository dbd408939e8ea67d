//! Finance report.
//!
//! Sums what came in (delivered sale orders) and what went out (fully
//! warehoused purchase orders) over a time window. An order counts in the
//! window its last update falls in, i.e. when it was delivered or
//! warehoused.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use globalsourcing_core::{DomainError, PageRequest, UserId};
use globalsourcing_purchasing::{PurchaseOrder, PurchaseOrderStatus};
use globalsourcing_sales::SaleOrder;

use crate::clock::Clock;
use crate::error::WorkflowResult;
use crate::store::FulfillmentStore;

/// Per-salesperson share of the sales total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalespersonTotal {
    pub salesperson_id: UserId,
    pub amount: u64,
    pub orders: u32,
}

/// Per-buyer share of the purchases total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuyerTotal {
    pub buyer_id: UserId,
    pub amount: u64,
    pub orders: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinanceReport {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub sales_total: u64,
    pub sale_order_count: u32,
    pub purchases_total: u64,
    pub purchase_order_count: u32,
    /// Ordered by salesperson id.
    pub by_salesperson: Vec<SalespersonTotal>,
    /// Ordered by buyer id.
    pub by_buyer: Vec<BuyerTotal>,
}

impl FinanceReport {
    /// Sales minus purchases; negative when more was bought than sold.
    pub fn balance(&self) -> i128 {
        i128::from(self.sales_total) - i128::from(self.purchases_total)
    }
}

#[derive(Debug)]
pub struct FinanceService<S, C> {
    store: S,
    clock: C,
}

impl<S, C> FinanceService<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }
}

fn within(at: Option<DateTime<Utc>>, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    at.is_some_and(|at| start <= at && at <= end)
}

impl<S, C> FinanceService<S, C>
where
    S: FulfillmentStore,
    C: Clock,
{
    /// Report over `[start, end]`, both ends inclusive.
    #[instrument(skip(self), err)]
    pub fn summarize(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> WorkflowResult<FinanceReport> {
        if end < start {
            return Err(DomainError::validation(format!(
                "report window ends ({end}) before it starts ({start})"
            ))
            .into());
        }

        let sold = |order: &SaleOrder| order.is_delivered() && within(order.updated_at(), start, end);
        let sales = self
            .store
            .page_sale_orders(&sold, PageRequest::unbounded())?
            .items;

        let bought = |order: &PurchaseOrder| {
            order.status() == PurchaseOrderStatus::Warehoused
                && within(order.updated_at(), start, end)
        };
        let purchases = self
            .store
            .page_purchase_orders(&bought, PageRequest::unbounded())?
            .items;

        let mut by_salesperson: BTreeMap<UserId, (u64, u32)> = BTreeMap::new();
        let mut sales_total = 0u64;
        for order in &sales {
            let amount = order.total_price();
            sales_total = sales_total.saturating_add(amount);
            let entry = by_salesperson.entry(order.salesperson_id()).or_default();
            entry.0 = entry.0.saturating_add(amount);
            entry.1 += 1;
        }

        let mut by_buyer: BTreeMap<UserId, (u64, u32)> = BTreeMap::new();
        let mut purchases_total = 0u64;
        for order in &purchases {
            let amount = order.total_price();
            purchases_total = purchases_total.saturating_add(amount);
            if let Some(buyer_id) = order.buyer_id() {
                let entry = by_buyer.entry(buyer_id).or_default();
                entry.0 = entry.0.saturating_add(amount);
                entry.1 += 1;
            }
        }

        let report = FinanceReport {
            start,
            end,
            sales_total,
            sale_order_count: u32::try_from(sales.len()).unwrap_or(u32::MAX),
            purchases_total,
            purchase_order_count: u32::try_from(purchases.len()).unwrap_or(u32::MAX),
            by_salesperson: by_salesperson
                .into_iter()
                .map(|(salesperson_id, (amount, orders))| SalespersonTotal {
                    salesperson_id,
                    amount,
                    orders,
                })
                .collect(),
            by_buyer: by_buyer
                .into_iter()
                .map(|(buyer_id, (amount, orders))| BuyerTotal {
                    buyer_id,
                    amount,
                    orders,
                })
                .collect(),
        };

        info!(
            sales_total = report.sales_total,
            purchases_total = report.purchases_total,
            sale_orders = report.sale_order_count,
            purchase_orders = report.purchase_order_count,
            "finance report generated"
        );
        Ok(report)
    }

    /// Report from today's midnight (UTC) up to now.
    #[instrument(skip(self), err)]
    pub fn current_day_summary(&self) -> WorkflowResult<FinanceReport> {
        let now = self.clock.now();
        let midnight = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        self.summarize(midnight, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkflowError;
    use crate::store::InMemoryFulfillmentStore;
    use chrono::{Duration, TimeZone};

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[test]
    fn inverted_window_is_rejected() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let service = FinanceService::new(InMemoryFulfillmentStore::new(), FixedClock(now));
        let err = service.summarize(now, now - Duration::hours(1)).unwrap_err();
        assert!(matches!(err, WorkflowError::Domain(DomainError::Validation(_))));
    }

    #[test]
    fn empty_store_reports_zeroes_for_today() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap();
        let service = FinanceService::new(InMemoryFulfillmentStore::new(), FixedClock(now));
        let report = service.current_day_summary().unwrap();

        assert_eq!(report.start, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        assert_eq!(report.end, now);
        assert_eq!(report.sales_total, 0);
        assert_eq!(report.balance(), 0);
        assert!(report.by_salesperson.is_empty());
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let end = start + Duration::days(1);
        assert!(within(Some(start), start, end));
        assert!(within(Some(end), start, end));
        assert!(!within(Some(end + Duration::seconds(1)), start, end));
        assert!(!within(None, start, end));
    }

    #[test]
    fn report_serializes_ids_as_plain_numbers() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let report = FinanceReport {
            start,
            end: start + Duration::hours(1),
            sales_total: 0,
            sale_order_count: 0,
            purchases_total: 1_500,
            purchase_order_count: 1,
            by_salesperson: vec![],
            by_buyer: vec![BuyerTotal {
                buyer_id: UserId::new(3),
                amount: 1_500,
                orders: 1,
            }],
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["by_buyer"][0]["buyer_id"], 3);
        assert_eq!(json["purchases_total"], 1_500);
        assert_eq!(report.balance(), -1_500);
    }
}
