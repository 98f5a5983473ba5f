//! A customer's request to pay specific line items, and its payment record.

use crate::domain::penalty::{ClassifiedKind, PenaltyView};
use crate::error::{PenaltyError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

/// Payment sub-record. Transitions pending -> paid exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub status: PaymentStatus,
    pub external_reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub amount: Decimal,
}

impl PaymentDetails {
    pub fn pending(amount: Decimal) -> Self {
        Self {
            status: PaymentStatus::Pending,
            external_reference: None,
            paid_at: None,
            amount,
        }
    }
}

/// The saga step whose failure is currently unresolved for a payable.
/// Persisted on every saga run; absent means fully settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SagaStep {
    Create,
    Authorise,
    Confirm,
}

impl SagaStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaStep::Create => "create",
            SagaStep::Authorise => "authorise",
            SagaStep::Confirm => "confirm",
        }
    }
}

/// A line item accepted by the matcher, with the view fields copied over at
/// match time. The amount comes from the request, already proven equal to
/// the outstanding amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayableTransaction {
    pub reference: String,
    pub amount: Decimal,
    pub classified: ClassifiedKind,
    pub made_up_date: NaiveDate,
    pub is_dca: bool,
    pub is_paid: bool,
    pub reason: String,
}

impl PayableTransaction {
    pub fn from_view(view: &PenaltyView, amount: Decimal) -> Self {
        Self {
            reference: view.reference.clone(),
            amount,
            classified: view.classified,
            made_up_date: view.made_up_date,
            is_dca: view.is_dca,
            is_paid: view.is_paid,
            reason: view.reason.clone(),
        }
    }
}

/// One payment attempt against one or more line items. Created once; its
/// payment record is mutated exactly once, on confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayableResource {
    pub customer_code: String,
    pub company_code: String,
    pub payable_ref: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub transactions: Vec<PayableTransaction>,
    pub payment: PaymentDetails,
    pub last_saga_error: Option<SagaStep>,
}

impl PayableResource {
    pub fn new(
        customer_code: impl Into<String>,
        company_code: impl Into<String>,
        created_by: impl Into<String>,
        transactions: Vec<PayableTransaction>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let total: Decimal = transactions.iter().map(|t| t.amount).sum();
        Self {
            customer_code: customer_code.into(),
            company_code: company_code.into(),
            payable_ref: Uuid::new_v4().to_string(),
            created_by: created_by.into(),
            created_at,
            transactions,
            payment: PaymentDetails::pending(total),
            last_saga_error: None,
        }
    }

    pub fn total_amount(&self) -> Decimal {
        self.transactions.iter().map(|t| t.amount).sum()
    }

    pub fn is_paid(&self) -> bool {
        self.payment.status == PaymentStatus::Paid
    }

    /// Flip the payment record to paid. Guarded: a second call fails rather
    /// than overwriting the settled record.
    pub fn mark_paid(
        &mut self,
        external_reference: impl Into<String>,
        paid_at: DateTime<Utc>,
    ) -> Result<()> {
        if self.is_paid() {
            return Err(PenaltyError::AlreadyPaid {
                payable_ref: self.payable_ref.clone(),
            });
        }
        self.payment.status = PaymentStatus::Paid;
        self.payment.external_reference = Some(external_reference.into());
        self.payment.paid_at = Some(paid_at);
        Ok(())
    }

    pub fn references(&self) -> Vec<String> {
        self.transactions.iter().map(|t| t.reference.clone()).collect()
    }
}

/// What the payment provider reported when the customer completed payment.
/// Input to the post-confirmation fan-out and the saga's authorise step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub external_reference: String,
    pub paid_at: DateTime<Utc>,
    pub amount: Decimal,
    pub card_reference: String,
    pub card_type: String,
    pub email: String,
}
