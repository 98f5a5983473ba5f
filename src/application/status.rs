//! Payable status determination over noisy external status codes.

use crate::application::classifier::TransactionClassifier;
use crate::config::Config;
use crate::domain::ledger::{DunningStatus, LedgerLineItem, PenaltyLedgerSnapshot};
use crate::domain::penalty::{ClassifiedKind, PayableStatus};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;

/// Dunning stages under which a late filing penalty is payable.
const LATE_FILING_DUNNING: [&str; 3] = [
    DunningStatus::PEN1,
    DunningStatus::PEN2,
    DunningStatus::PEN3,
];
const LATE_FILING_ACCOUNT: [&str; 4] = ["CHS", "DCA", "HLD", "WDR"];

/// Sanctions have a narrower open window: PEN3 never reopens an item.
const SANCTIONS_DUNNING: [&str; 2] = [DunningStatus::PEN1, DunningStatus::PEN2];
const SANCTIONS_ACCOUNT: [&str; 3] = ["CHS", "DCA", "HLD"];

/// Computes the payable status of each line item. Pure: the same
/// (item, snapshot, today) always yields the same status.
#[derive(Debug, Clone)]
pub struct PayableStatusEngine {
    classifier: Arc<TransactionClassifier>,
    disabled_subtypes: HashSet<String>,
    late_filing_company_code: String,
    sanctions_company_code: String,
}

impl PayableStatusEngine {
    pub fn new(classifier: Arc<TransactionClassifier>, config: &Config) -> Self {
        Self {
            classifier,
            disabled_subtypes: config.disabled_subtypes(),
            late_filing_company_code: config.late_filing_company_code.clone(),
            sanctions_company_code: config.sanctions_company_code.clone(),
        }
    }

    /// Ordered decision, first matching rule wins. The whole snapshot is
    /// needed for the cross-item cost check.
    pub fn status(
        &self,
        item: &LedgerLineItem,
        snapshot: &PenaltyLedgerSnapshot,
        today: NaiveDate,
    ) -> PayableStatus {
        // Only penalties are independently payable.
        if self.classifier.classify(item) != ClassifiedKind::Penalty {
            return PayableStatus::Closed;
        }

        if self.disabled_subtypes.contains(&item.transaction_sub_type) {
            return PayableStatus::Disabled;
        }

        // Settled locally today but the external allocation routine has not
        // caught up yet: neither open nor fully closed.
        if item.is_paid
            && item.outstanding_amount != Decimal::ZERO
            && snapshot
                .closed_at
                .is_some_and(|closed| closed.date_naive() == today)
        {
            return PayableStatus::ClosedPendingAllocation;
        }

        if item.is_paid
            || item.outstanding_amount <= Decimal::ZERO
            || item.dunning_status.is_dca()
            || self.has_unpaid_linked_cost(item, snapshot)
        {
            return PayableStatus::Closed;
        }

        let open = if snapshot.company_code == self.late_filing_company_code {
            item.dunning_status.is_any_of(&LATE_FILING_DUNNING)
                && LATE_FILING_ACCOUNT.contains(&item.account_status.as_str())
        } else if snapshot.company_code == self.sanctions_company_code {
            item.dunning_status.is_any_of(&SANCTIONS_DUNNING)
                && SANCTIONS_ACCOUNT.contains(&item.account_status.as_str())
        } else {
            false
        };

        if open {
            PayableStatus::Open
        } else {
            PayableStatus::Closed
        }
    }

    /// An unpaid cost linked to the same filing period blocks payment of the
    /// penalty: partial settlement of a linked obligation set is disallowed.
    fn has_unpaid_linked_cost(
        &self,
        item: &LedgerLineItem,
        snapshot: &PenaltyLedgerSnapshot,
    ) -> bool {
        snapshot.items.iter().any(|other| {
            other.reference != item.reference
                && !other.is_paid
                && other.made_up_date == item.made_up_date
                && self.classifier.classify(other) == ClassifiedKind::Other
        })
    }
}
