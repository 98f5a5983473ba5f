//! Persistent store adapters backed by RocksDB, one column family per
//! document kind with JSON-encoded values.

use crate::domain::ledger::PenaltyLedgerSnapshot;
use crate::domain::payable::{PayableResource, PaymentDetails, SagaStep};
use crate::domain::ports::{PayableStore, SnapshotStore};
use crate::error::{PenaltyError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

/// Column family for ledger snapshots.
pub const CF_SNAPSHOTS: &str = "snapshots";
/// Column family for payable resources.
pub const CF_PAYABLES: &str = "payables";

/// A persistent store implementation using RocksDB.
///
/// Implements both `SnapshotStore` and `PayableStore`; `Clone` shares the
/// underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
}

impl RocksDbStore {
    /// Opens or creates a RocksDB instance at the given path, ensuring both
    /// column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_snapshots = ColumnFamilyDescriptor::new(CF_SNAPSHOTS, Options::default());
        let cf_payables = ColumnFamilyDescriptor::new(CF_PAYABLES, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_snapshots, cf_payables])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| PenaltyError::Storage(format!("column family {name} not found")))
    }

    fn snapshot_key(customer_code: &str, company_code: &str) -> Vec<u8> {
        format!("{customer_code}:{company_code}").into_bytes()
    }

    fn payable_key(customer_code: &str, payable_ref: &str) -> Vec<u8> {
        format!("{customer_code}:{payable_ref}").into_bytes()
    }

    fn put_snapshot(&self, snapshot: &PenaltyLedgerSnapshot) -> Result<()> {
        let cf = self.cf(CF_SNAPSHOTS)?;
        let key = Self::snapshot_key(&snapshot.customer_code, &snapshot.company_code);
        self.db.put_cf(cf, key, serde_json::to_vec(snapshot)?)?;
        Ok(())
    }

    fn put_payable(&self, payable: &PayableResource) -> Result<()> {
        let cf = self.cf(CF_PAYABLES)?;
        let key = Self::payable_key(&payable.customer_code, &payable.payable_ref);
        self.db.put_cf(cf, key, serde_json::to_vec(payable)?)?;
        Ok(())
    }

    fn read_payable(
        &self,
        customer_code: &str,
        payable_ref: &str,
    ) -> Result<Option<PayableResource>> {
        let cf = self.cf(CF_PAYABLES)?;
        let key = Self::payable_key(customer_code, payable_ref);
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn mutate_payable<F>(&self, customer_code: &str, payable_ref: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut PayableResource),
    {
        let mut payable = self.read_payable(customer_code, payable_ref)?.ok_or_else(|| {
            PenaltyError::Storage(format!(
                "no payable to update for {customer_code}/{payable_ref}"
            ))
        })?;
        f(&mut payable);
        self.put_payable(&payable)
    }
}

#[async_trait]
impl SnapshotStore for RocksDbStore {
    async fn get(
        &self,
        customer_code: &str,
        company_code: &str,
    ) -> Result<Option<PenaltyLedgerSnapshot>> {
        let cf = self.cf(CF_SNAPSHOTS)?;
        let key = Self::snapshot_key(customer_code, company_code);
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, snapshot: PenaltyLedgerSnapshot) -> Result<()> {
        self.put_snapshot(&snapshot)
    }

    async fn update(&self, snapshot: PenaltyLedgerSnapshot) -> Result<()> {
        let cf = self.cf(CF_SNAPSHOTS)?;
        let key = Self::snapshot_key(&snapshot.customer_code, &snapshot.company_code);
        if self.db.get_pinned_cf(cf, &key)?.is_none() {
            return Err(PenaltyError::Storage(format!(
                "no snapshot to update for {}/{}",
                snapshot.customer_code, snapshot.company_code
            )));
        }
        self.put_snapshot(&snapshot)
    }
}

#[async_trait]
impl PayableStore for RocksDbStore {
    async fn get(
        &self,
        customer_code: &str,
        payable_ref: &str,
    ) -> Result<Option<PayableResource>> {
        self.read_payable(customer_code, payable_ref)
    }

    async fn insert(&self, payable: PayableResource) -> Result<()> {
        self.put_payable(&payable)
    }

    async fn update_payment_details(
        &self,
        customer_code: &str,
        payable_ref: &str,
        payment: PaymentDetails,
    ) -> Result<()> {
        self.mutate_payable(customer_code, payable_ref, |payable| {
            payable.payment = payment;
        })
    }

    async fn save_saga_error(
        &self,
        customer_code: &str,
        payable_ref: &str,
        step: Option<SagaStep>,
    ) -> Result<()> {
        self.mutate_payable(customer_code, payable_ref, |payable| {
            payable.last_saga_error = step;
        })
    }
}
