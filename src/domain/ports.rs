//! Ports to the external collaborators: the document store, the external
//! finance system, and the notification bus. The settlement fan-out spawns
//! tasks that share these adapters, so the aliases are `Arc`ed.

use crate::domain::ledger::{LedgerLineItem, PenaltyLedgerSnapshot};
use crate::domain::payable::{PayableResource, PaymentDetails, SagaStep};
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

pub type SharedSnapshotStore = Arc<dyn SnapshotStore>;
pub type SharedPayableStore = Arc<dyn PayableStore>;
pub type SharedLedgerClient = Arc<dyn LedgerClient>;
pub type SharedNotificationSender = Arc<dyn NotificationSender>;

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn get(
        &self,
        customer_code: &str,
        company_code: &str,
    ) -> Result<Option<PenaltyLedgerSnapshot>>;
    async fn insert(&self, snapshot: PenaltyLedgerSnapshot) -> Result<()>;
    /// Update an existing snapshot in place. Fails if no snapshot exists for
    /// the (customer, company) pair.
    async fn update(&self, snapshot: PenaltyLedgerSnapshot) -> Result<()>;
}

#[async_trait]
pub trait PayableStore: Send + Sync {
    async fn get(&self, customer_code: &str, payable_ref: &str)
    -> Result<Option<PayableResource>>;
    async fn insert(&self, payable: PayableResource) -> Result<()>;
    async fn update_payment_details(
        &self,
        customer_code: &str,
        payable_ref: &str,
        payment: PaymentDetails,
    ) -> Result<()>;
    /// Persist the last failed saga step for a payable; `None` clears the
    /// marker to signal full settlement.
    async fn save_saga_error(
        &self,
        customer_code: &str,
        payable_ref: &str,
        step: Option<SagaStep>,
    ) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentItem {
    pub reference: String,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatePaymentRequest {
    pub company_code: String,
    pub customer_code: String,
    pub payment_id: String,
    pub total_value: Decimal,
    pub items: Vec<PaymentItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthorisePaymentRequest {
    pub company_code: String,
    pub customer_code: String,
    pub payment_id: String,
    pub card_reference: String,
    pub card_type: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmPaymentRequest {
    pub company_code: String,
    pub customer_code: String,
    pub payment_id: String,
}

/// The external, authoritative finance system.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn get_transactions(
        &self,
        customer_code: &str,
        company_code: &str,
    ) -> Result<Vec<LedgerLineItem>>;
    async fn create_payment(&self, request: &CreatePaymentRequest) -> Result<()>;
    async fn authorise_payment(&self, request: &AuthorisePaymentRequest) -> Result<()>;
    async fn confirm_payment(&self, request: &ConfirmPaymentRequest) -> Result<()>;
}

/// Message-bus publisher for customer confirmation emails. Schema and topic
/// are owned by the collaborator.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, payable: &PayableResource) -> Result<()>;
}
