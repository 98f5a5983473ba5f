//! Loads the classification allow-list and penalty reason reference data
//! from CSV.

use crate::application::classifier::TransactionClassifier;
use crate::domain::penalty::ClassifiedKind;
use crate::error::Result;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct RuleRow {
    company_code: String,
    transaction_type: String,
    transaction_sub_type: String,
    classification: ClassifiedKind,
    #[serde(default)]
    reason: String,
}

/// Reads classification rules from a CSV source with the header
/// `company_code,transaction_type,transaction_sub_type,classification,reason`.
pub struct RuleReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> RuleReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Consume the source and build a classifier from it.
    pub fn into_classifier(mut self) -> Result<TransactionClassifier> {
        let mut classifier = TransactionClassifier::default();
        for row in self.reader.deserialize() {
            let row: RuleRow = row?;
            if row.classification == ClassifiedKind::Penalty {
                classifier
                    .add_penalty_pair(row.transaction_type.clone(), row.transaction_sub_type.clone());
            }
            if !row.reason.is_empty() {
                classifier.add_reason(row.company_code, row.transaction_sub_type, row.reason);
            }
        }
        Ok(classifier)
    }
}
