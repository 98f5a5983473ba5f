//! Allow-list classification of ledger line items.

use crate::domain::ledger::LedgerLineItem;
use crate::domain::penalty::ClassifiedKind;
use std::collections::{HashMap, HashSet};

/// Maps a line item's (transaction type, sub-type) pair through an
/// allow-list to `Penalty` or `Other`, and resolves the informational reason
/// text for a penalty from (company code, sub-type).
///
/// Pure and total: unknown pairs classify as `Other`, unknown reasons fall
/// back to the item's own type description at projection time.
#[derive(Debug, Clone, Default)]
pub struct TransactionClassifier {
    penalty_pairs: HashSet<(String, String)>,
    reasons: HashMap<(String, String), String>,
}

impl TransactionClassifier {
    pub fn new(
        penalty_pairs: HashSet<(String, String)>,
        reasons: HashMap<(String, String), String>,
    ) -> Self {
        Self {
            penalty_pairs,
            reasons,
        }
    }

    /// The built-in reference data: late filing penalties (type 1, sub-type
    /// EU) and sanctions penalties (type 1, sub-type S1).
    pub fn default_rules() -> Self {
        let mut penalty_pairs = HashSet::new();
        penalty_pairs.insert(("1".to_string(), "EU".to_string()));
        penalty_pairs.insert(("1".to_string(), "S1".to_string()));

        let mut reasons = HashMap::new();
        reasons.insert(
            ("LP".to_string(), "EU".to_string()),
            "Late filing of accounts".to_string(),
        );
        reasons.insert(
            ("C1".to_string(), "S1".to_string()),
            "Failure to file a confirmation statement".to_string(),
        );

        Self::new(penalty_pairs, reasons)
    }

    pub fn add_penalty_pair(&mut self, transaction_type: String, sub_type: String) {
        self.penalty_pairs.insert((transaction_type, sub_type));
    }

    pub fn add_reason(&mut self, company_code: String, sub_type: String, reason: String) {
        self.reasons.insert((company_code, sub_type), reason);
    }

    pub fn classify(&self, item: &LedgerLineItem) -> ClassifiedKind {
        let key = (
            item.transaction_type.clone(),
            item.transaction_sub_type.clone(),
        );
        if self.penalty_pairs.contains(&key) {
            ClassifiedKind::Penalty
        } else {
            ClassifiedKind::Other
        }
    }

    pub fn reason(&self, company_code: &str, sub_type: &str) -> Option<&str> {
        self.reasons
            .get(&(company_code.to_string(), sub_type.to_string()))
            .map(String::as_str)
    }
}
