//! Caller-facing projection of a ledger snapshot.

use crate::domain::ledger::LedgerLineItem;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What the allow-list made of a line item's (type, sub-type) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifiedKind {
    Penalty,
    Other,
}

/// Whether and why a penalty can currently be paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PayableStatus {
    Open,
    Closed,
    /// Paid locally today but the external allocation routine has not yet
    /// zeroed the outstanding amount.
    ClosedPendingAllocation,
    /// Sub-type kill-switched by configuration.
    Disabled,
}

impl PayableStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayableStatus::Open => "open",
            PayableStatus::Closed => "closed",
            PayableStatus::ClosedPendingAllocation => "closed-pending-allocation",
            PayableStatus::Disabled => "disabled",
        }
    }
}

/// One reconciled line item as presented to callers. Derived on every
/// reconciliation; never persisted apart from the snapshot it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyView {
    pub reference: String,
    pub etag: String,
    pub classified: ClassifiedKind,
    /// Human-readable cause of the penalty. Informational only.
    pub reason: String,
    pub payable_status: PayableStatus,
    pub original_amount: Decimal,
    pub outstanding: Decimal,
    pub is_paid: bool,
    pub is_dca: bool,
    pub transaction_date: NaiveDate,
    pub made_up_date: NaiveDate,
    pub due_date: NaiveDate,
    pub transaction_type: String,
    pub transaction_sub_type: String,
}

impl PenaltyView {
    pub fn from_item(
        item: &LedgerLineItem,
        classified: ClassifiedKind,
        payable_status: PayableStatus,
        reason: String,
        etag: String,
    ) -> Self {
        Self {
            reference: item.reference.clone(),
            etag,
            classified,
            reason,
            payable_status,
            original_amount: item.amount,
            outstanding: item.outstanding_amount,
            is_paid: item.is_paid,
            is_dca: item.dunning_status.is_dca(),
            transaction_date: item.transaction_date,
            made_up_date: item.made_up_date,
            due_date: item.due_date,
            transaction_type: item.transaction_type.clone(),
            transaction_sub_type: item.transaction_sub_type.clone(),
        }
    }
}

/// The reconciled list for one (customer, company) pair, tagged for
/// idempotency checks by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledView {
    pub customer_code: String,
    pub company_code: String,
    pub etag: String,
    pub items: Vec<PenaltyView>,
}

impl ReconciledView {
    pub fn find(&self, reference: &str) -> Option<&PenaltyView> {
        self.items.iter().find(|item| item.reference == reference)
    }

    /// Items that are open penalties, i.e. currently payable.
    pub fn open_penalties(&self) -> impl Iterator<Item = &PenaltyView> {
        self.items.iter().filter(|item| {
            item.classified == ClassifiedKind::Penalty
                && item.payable_status == PayableStatus::Open
        })
    }
}
