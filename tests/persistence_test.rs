//! Documents written through the RocksDB adapters survive a close and
//! reopen of the database.

#![cfg(feature = "storage-rocksdb")]

use chrono::{TimeZone, Utc};
use penalty_ledger::domain::ledger::{DunningStatus, LedgerLineItem, PenaltyLedgerSnapshot};
use penalty_ledger::domain::payable::{PayableResource, PayableTransaction, SagaStep};
use penalty_ledger::domain::penalty::ClassifiedKind;
use penalty_ledger::domain::ports::{PayableStore, SnapshotStore};
use penalty_ledger::infrastructure::rocksdb::RocksDbStore;
use rust_decimal_macros::dec;
use tempfile::tempdir;

fn line_item() -> LedgerLineItem {
    LedgerLineItem {
        reference: "A1".to_string(),
        ledger_code: "EW".to_string(),
        transaction_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        made_up_date: chrono::NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
        due_date: chrono::NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
        amount: dec!(150),
        outstanding_amount: dec!(150),
        is_paid: false,
        transaction_type: "1".to_string(),
        transaction_sub_type: "EU".to_string(),
        type_description: "Late filing penalty".to_string(),
        account_status: "CHS".to_string(),
        dunning_status: DunningStatus::new("PEN1"),
    }
}

#[tokio::test]
async fn documents_survive_a_reopen() {
    let dir = tempdir().unwrap();
    let created = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();

    let snapshot = PenaltyLedgerSnapshot::new("NI038379", "LP", vec![line_item()], created);
    let payable = PayableResource::new(
        "NI038379",
        "LP",
        "customer@example.com",
        vec![PayableTransaction {
            reference: "A1".to_string(),
            amount: dec!(150),
            classified: ClassifiedKind::Penalty,
            made_up_date: chrono::NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
            is_dca: false,
            is_paid: false,
            reason: "Late filing of accounts".to_string(),
        }],
        created,
    );

    {
        let store = RocksDbStore::open(dir.path()).unwrap();
        SnapshotStore::insert(&store, snapshot.clone()).await.unwrap();
        PayableStore::insert(&store, payable.clone()).await.unwrap();
        store
            .save_saga_error("NI038379", &payable.payable_ref, Some(SagaStep::Authorise))
            .await
            .unwrap();
    }

    let reopened = RocksDbStore::open(dir.path()).unwrap();

    let stored_snapshot = SnapshotStore::get(&reopened, "NI038379", "LP")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored_snapshot, snapshot);

    let stored_payable = PayableStore::get(&reopened, "NI038379", &payable.payable_ref)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored_payable.transactions, payable.transactions);
    assert_eq!(stored_payable.last_saga_error, Some(SagaStep::Authorise));
}
