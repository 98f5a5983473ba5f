//! A file-backed `LedgerClient` for the CLI: reads line items from CSV in
//! place of the external finance system. Read-only; payment operations are
//! refused.

use crate::domain::ledger::{DunningStatus, LedgerLineItem};
use crate::domain::ports::{
    AuthorisePaymentRequest, ConfirmPaymentRequest, CreatePaymentRequest, LedgerClient,
};
use crate::error::{PenaltyError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct LedgerRow {
    customer_code: String,
    company_code: String,
    reference: String,
    ledger_code: String,
    transaction_date: NaiveDate,
    made_up_date: NaiveDate,
    due_date: NaiveDate,
    amount: Decimal,
    outstanding_amount: Decimal,
    is_paid: bool,
    transaction_type: String,
    transaction_sub_type: String,
    type_description: String,
    account_status: String,
    dunning_status: String,
}

impl LedgerRow {
    fn into_keyed_item(self) -> ((String, String), LedgerLineItem) {
        let key = (self.customer_code, self.company_code);
        let item = LedgerLineItem {
            reference: self.reference,
            ledger_code: self.ledger_code,
            transaction_date: self.transaction_date,
            made_up_date: self.made_up_date,
            due_date: self.due_date,
            amount: self.amount,
            outstanding_amount: self.outstanding_amount,
            is_paid: self.is_paid,
            transaction_type: self.transaction_type,
            transaction_sub_type: self.transaction_sub_type,
            type_description: self.type_description,
            account_status: self.account_status,
            dunning_status: DunningStatus::new(self.dunning_status),
        };
        (key, item)
    }
}

pub struct FileLedgerClient {
    transactions: HashMap<(String, String), Vec<LedgerLineItem>>,
}

impl FileLedgerClient {
    pub fn from_reader<R: Read>(source: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        let mut transactions: HashMap<(String, String), Vec<LedgerLineItem>> = HashMap::new();
        for row in reader.deserialize() {
            let row: LedgerRow = row?;
            let (key, item) = row.into_keyed_item();
            transactions.entry(key).or_default().push(item);
        }
        Ok(Self { transactions })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(std::fs::File::open(path)?)
    }
}

#[async_trait]
impl LedgerClient for FileLedgerClient {
    async fn get_transactions(
        &self,
        customer_code: &str,
        company_code: &str,
    ) -> Result<Vec<LedgerLineItem>> {
        Ok(self
            .transactions
            .get(&(customer_code.to_string(), company_code.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn create_payment(&self, _request: &CreatePaymentRequest) -> Result<()> {
        Err(unsupported("create"))
    }

    async fn authorise_payment(&self, _request: &AuthorisePaymentRequest) -> Result<()> {
        Err(unsupported("authorise"))
    }

    async fn confirm_payment(&self, _request: &ConfirmPaymentRequest) -> Result<()> {
        Err(unsupported("confirm"))
    }
}

fn unsupported(operation: &str) -> PenaltyError {
    PenaltyError::LedgerBadRequest {
        operation: operation.to_string(),
        message: "payment operations are not supported by the file-backed ledger".to_string(),
    }
}
