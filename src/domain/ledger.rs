//! Line items and snapshots of the external penalty ledger.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Collections escalation code from the external finance system.
///
/// The external system returns these as fixed-width, space-padded fields;
/// the constructor normalises by trimming trailing padding so every
/// comparison site sees the bare code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct DunningStatus(String);

impl DunningStatus {
    pub const PEN1: &'static str = "PEN1";
    pub const PEN2: &'static str = "PEN2";
    pub const PEN3: &'static str = "PEN3";
    pub const DCA: &'static str = "DCA";

    pub fn new(raw: impl Into<String>) -> Self {
        let mut value = raw.into();
        value.truncate(value.trim_end().len());
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Handed off to a debt collection agency; not payable through this
    /// system.
    pub fn is_dca(&self) -> bool {
        self.0 == Self::DCA
    }

    pub fn is_any_of(&self, codes: &[&str]) -> bool {
        codes.contains(&self.0.as_str())
    }
}

impl From<String> for DunningStatus {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<DunningStatus> for String {
    fn from(status: DunningStatus) -> Self {
        status.0
    }
}

impl PartialEq<&str> for DunningStatus {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for DunningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One transaction on the external penalty ledger. Immutable once the
/// external system marks it paid; `outstanding_amount` reaching zero is the
/// authoritative paid-allocation signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerLineItem {
    /// Unique within a snapshot.
    pub reference: String,
    pub ledger_code: String,
    pub transaction_date: NaiveDate,
    /// Filing period the transaction relates to.
    pub made_up_date: NaiveDate,
    pub due_date: NaiveDate,
    /// Original amount.
    pub amount: Decimal,
    pub outstanding_amount: Decimal,
    pub is_paid: bool,
    pub transaction_type: String,
    pub transaction_sub_type: String,
    pub type_description: String,
    pub account_status: String,
    pub dunning_status: DunningStatus,
}

/// Locally cached copy of a customer's ledger for one company code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyLedgerSnapshot {
    pub customer_code: String,
    pub company_code: String,
    /// When the items were fetched from the external system. Never unset.
    pub created_at: DateTime<Utc>,
    /// When a payment against this account was most recently settled
    /// locally. Always >= `created_at` when present.
    pub closed_at: Option<DateTime<Utc>>,
    pub items: Vec<LedgerLineItem>,
}

impl PenaltyLedgerSnapshot {
    pub fn new(
        customer_code: impl Into<String>,
        company_code: impl Into<String>,
        items: Vec<LedgerLineItem>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            customer_code: customer_code.into(),
            company_code: company_code.into(),
            created_at,
            closed_at: None,
            items,
        }
    }

    /// Instant staleness is measured from. A settlement resets the ageing
    /// window so the external allocation routine has time to catch up before
    /// the next refetch.
    pub fn staleness_anchor(&self) -> DateTime<Utc> {
        self.closed_at.unwrap_or(self.created_at)
    }

    /// Replace the cached items after a refetch, preserving the snapshot's
    /// identity. Clears the settlement marker: the fresh fetch reflects
    /// whatever the external system has allocated since.
    pub fn refresh(&mut self, items: Vec<LedgerLineItem>, fetched_at: DateTime<Utc>) {
        self.items = items;
        self.created_at = fetched_at;
        self.closed_at = None;
    }

    /// Record a settled payment: stamp the settlement instant and mark the
    /// paid references. Outstanding amounts are left untouched; only the
    /// external allocation routine may zero them.
    pub fn close(&mut self, references: &[String], settled_at: DateTime<Utc>) {
        self.closed_at = Some(settled_at);
        for item in &mut self.items {
            if references.contains(&item.reference) {
                item.is_paid = true;
            }
        }
    }
}
