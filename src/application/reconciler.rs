//! Cache-or-refresh reconciliation of the local ledger snapshot.

use crate::application::classifier::TransactionClassifier;
use crate::application::status::PayableStatusEngine;
use crate::clock::SharedClock;
use crate::config::Config;
use crate::domain::ledger::PenaltyLedgerSnapshot;
use crate::domain::penalty::{PenaltyView, ReconciledView};
use crate::domain::ports::{SharedLedgerClient, SharedSnapshotStore};
use crate::error::Result;
use chrono::TimeDelta;
use log::debug;
use std::sync::Arc;
use uuid::Uuid;

/// Serves the caller-facing penalty view, refreshing the cached snapshot
/// from the external finance system when it has gone stale.
pub struct LedgerReconciler {
    snapshots: SharedSnapshotStore,
    ledger: SharedLedgerClient,
    classifier: Arc<TransactionClassifier>,
    status_engine: PayableStatusEngine,
    clock: SharedClock,
    ttl: TimeDelta,
}

impl LedgerReconciler {
    pub fn new(
        snapshots: SharedSnapshotStore,
        ledger: SharedLedgerClient,
        classifier: Arc<TransactionClassifier>,
        config: &Config,
        clock: SharedClock,
    ) -> Self {
        let status_engine = PayableStatusEngine::new(classifier.clone(), config);
        Self {
            snapshots,
            ledger,
            classifier,
            status_engine,
            clock,
            ttl: config.snapshot_ttl(),
        }
    }

    /// Produce the reconciled view for one (customer, company) pair.
    ///
    /// A fetch failure from the external system is fatal for the call; there
    /// is no partial or cached fallback. A fetch returning zero line items
    /// is a valid terminal state and is cached like any other result.
    pub async fn penalty_view(
        &self,
        customer_code: &str,
        company_code: &str,
    ) -> Result<ReconciledView> {
        let now = self.clock.now();

        let snapshot = match self.snapshots.get(customer_code, company_code).await? {
            None => {
                let items = self.ledger.get_transactions(customer_code, company_code).await?;
                debug!(
                    "no cached snapshot for {customer_code}/{company_code}, fetched {} items",
                    items.len()
                );
                let snapshot =
                    PenaltyLedgerSnapshot::new(customer_code, company_code, items, now);
                self.snapshots.insert(snapshot.clone()).await?;
                snapshot
            }
            Some(mut snapshot) => {
                let age = now - snapshot.staleness_anchor();
                if age >= self.ttl {
                    let items =
                        self.ledger.get_transactions(customer_code, company_code).await?;
                    debug!(
                        "snapshot for {customer_code}/{company_code} stale ({}s old), refetched {} items",
                        age.num_seconds(),
                        items.len()
                    );
                    snapshot.refresh(items, now);
                    self.snapshots.update(snapshot.clone()).await?;
                } else {
                    debug!(
                        "serving cached snapshot for {customer_code}/{company_code} ({}s old)",
                        age.num_seconds()
                    );
                }
                snapshot
            }
        };

        Ok(self.project(&snapshot))
    }

    fn project(&self, snapshot: &PenaltyLedgerSnapshot) -> ReconciledView {
        let today = self.clock.today();
        let items = snapshot
            .items
            .iter()
            .map(|item| {
                let classified = self.classifier.classify(item);
                let status = self.status_engine.status(item, snapshot, today);
                let reason = self
                    .classifier
                    .reason(&snapshot.company_code, &item.transaction_sub_type)
                    .map(str::to_string)
                    .unwrap_or_else(|| item.type_description.clone());
                PenaltyView::from_item(item, classified, status, reason, new_etag())
            })
            .collect();

        ReconciledView {
            customer_code: snapshot.customer_code.clone(),
            company_code: snapshot.company_code.clone(),
            etag: new_etag(),
            items,
        }
    }
}

fn new_etag() -> String {
    Uuid::new_v4().simple().to_string()
}
