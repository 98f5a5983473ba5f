//! In-memory store adapters, used in tests and by the CLI.

use crate::domain::ledger::PenaltyLedgerSnapshot;
use crate::domain::payable::{PayableResource, PaymentDetails, SagaStep};
use crate::domain::ports::{PayableStore, SnapshotStore};
use crate::error::{PenaltyError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Thread-safe snapshot store keyed by (customer code, company code).
#[derive(Default, Clone)]
pub struct InMemorySnapshotStore {
    snapshots: Arc<RwLock<HashMap<(String, String), PenaltyLedgerSnapshot>>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn get(
        &self,
        customer_code: &str,
        company_code: &str,
    ) -> Result<Option<PenaltyLedgerSnapshot>> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots
            .get(&(customer_code.to_string(), company_code.to_string()))
            .cloned())
    }

    async fn insert(&self, snapshot: PenaltyLedgerSnapshot) -> Result<()> {
        let mut snapshots = self.snapshots.write().await;
        let key = (snapshot.customer_code.clone(), snapshot.company_code.clone());
        snapshots.insert(key, snapshot);
        Ok(())
    }

    async fn update(&self, snapshot: PenaltyLedgerSnapshot) -> Result<()> {
        let mut snapshots = self.snapshots.write().await;
        let key = (snapshot.customer_code.clone(), snapshot.company_code.clone());
        match snapshots.get_mut(&key) {
            Some(existing) => {
                *existing = snapshot;
                Ok(())
            }
            None => Err(PenaltyError::Storage(format!(
                "no snapshot to update for {}/{}",
                key.0, key.1
            ))),
        }
    }
}

/// Thread-safe payable store keyed by (customer code, payable ref).
#[derive(Default, Clone)]
pub struct InMemoryPayableStore {
    payables: Arc<RwLock<HashMap<(String, String), PayableResource>>>,
}

impl InMemoryPayableStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn with_payable<F>(&self, customer_code: &str, payable_ref: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut PayableResource),
    {
        let mut payables = self.payables.write().await;
        match payables.get_mut(&(customer_code.to_string(), payable_ref.to_string())) {
            Some(payable) => {
                f(payable);
                Ok(())
            }
            None => Err(PenaltyError::Storage(format!(
                "no payable to update for {customer_code}/{payable_ref}"
            ))),
        }
    }
}

#[async_trait]
impl PayableStore for InMemoryPayableStore {
    async fn get(
        &self,
        customer_code: &str,
        payable_ref: &str,
    ) -> Result<Option<PayableResource>> {
        let payables = self.payables.read().await;
        Ok(payables
            .get(&(customer_code.to_string(), payable_ref.to_string()))
            .cloned())
    }

    async fn insert(&self, payable: PayableResource) -> Result<()> {
        let mut payables = self.payables.write().await;
        let key = (payable.customer_code.clone(), payable.payable_ref.clone());
        payables.insert(key, payable);
        Ok(())
    }

    async fn update_payment_details(
        &self,
        customer_code: &str,
        payable_ref: &str,
        payment: PaymentDetails,
    ) -> Result<()> {
        self.with_payable(customer_code, payable_ref, |payable| {
            payable.payment = payment;
        })
        .await
    }

    async fn save_saga_error(
        &self,
        customer_code: &str,
        payable_ref: &str,
        step: Option<SagaStep>,
    ) -> Result<()> {
        self.with_payable(customer_code, payable_ref, |payable| {
            payable.last_saga_error = step;
        })
        .await
    }
}
