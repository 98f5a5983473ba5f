//! Validation of requested-to-pay line items against the reconciled view.

use crate::clock::SharedClock;
use crate::domain::payable::{PayableResource, PayableTransaction};
use crate::domain::penalty::{ClassifiedKind, ReconciledView};
use crate::domain::ports::SharedPayableStore;
use crate::error::{MatchRejection, PenaltyError, Result};
use log::info;
use rust_decimal::Decimal;
use serde::Deserialize;

/// A caller's claim that it wants to pay one line item in full.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RequestedTransaction {
    pub reference: String,
    pub amount: Decimal,
}

/// Enforces the payment-safety invariants per requested item. Rejections
/// are total and side-effect-free apart from logging.
#[derive(Debug, Clone, Copy, Default)]
pub struct PenaltyMatcher;

impl PenaltyMatcher {
    pub fn match_transactions(
        &self,
        view: &ReconciledView,
        requested: &[RequestedTransaction],
        customer_code: &str,
    ) -> Result<Vec<PayableTransaction>> {
        let mut matched = Vec::with_capacity(requested.len());
        for request in requested {
            matched.push(self.match_one(view, request, customer_code)?);
        }
        Ok(matched)
    }

    fn match_one(
        &self,
        view: &ReconciledView,
        request: &RequestedTransaction,
        customer_code: &str,
    ) -> Result<PayableTransaction> {
        let reference = request.reference.clone();
        let Some(entry) = view.find(&reference) else {
            info!("match rejected for {customer_code}: {reference} not in penalty view");
            return Err(MatchRejection::TransactionDoesNotExist { reference }.into());
        };

        // Part paid is its own terminal rejection, checked before the
        // generic paid check.
        if entry.outstanding > Decimal::ZERO && entry.outstanding < entry.original_amount {
            info!(
                "match rejected for {customer_code}: {reference} part paid \
                 ({} of {} outstanding)",
                entry.outstanding, entry.original_amount
            );
            return Err(MatchRejection::IsPartPaid { reference }.into());
        }

        if entry.is_paid {
            info!("match rejected for {customer_code}: {reference} already paid");
            return Err(MatchRejection::IsPaid { reference }.into());
        }

        if entry.classified != ClassifiedKind::Penalty {
            info!("match rejected for {customer_code}: {reference} is not a penalty");
            return Err(MatchRejection::NotPenaltyType { reference }.into());
        }

        // Partial payoff is never permitted: the request must cover the
        // outstanding amount exactly.
        if request.amount != entry.outstanding {
            info!(
                "match rejected for {customer_code}: {reference} amount {} does not \
                 equal outstanding {}",
                request.amount, entry.outstanding
            );
            return Err(MatchRejection::AmountMismatch {
                reference,
                requested: request.amount,
                outstanding: entry.outstanding,
            }
            .into());
        }

        if entry.is_dca {
            info!("match rejected for {customer_code}: {reference} is with a DCA");
            return Err(MatchRejection::IsDca { reference }.into());
        }

        Ok(PayableTransaction::from_view(entry, request.amount))
    }
}

/// Creates payable resources from validated requests. Owns the business
/// invariant the matcher itself does not check: at most one open penalty may
/// exist across the whole view when a new payable is created.
pub struct PayableService {
    matcher: PenaltyMatcher,
    payables: SharedPayableStore,
    clock: SharedClock,
}

impl PayableService {
    pub fn new(payables: SharedPayableStore, clock: SharedClock) -> Self {
        Self {
            matcher: PenaltyMatcher,
            payables,
            clock,
        }
    }

    pub async fn create_payable(
        &self,
        view: &ReconciledView,
        requested: &[RequestedTransaction],
        created_by: &str,
    ) -> Result<PayableResource> {
        if view.open_penalties().count() > 1 {
            info!(
                "refusing payable for {}: multiple open penalties in view",
                view.customer_code
            );
            return Err(PenaltyError::MultiplePenalties {
                customer_code: view.customer_code.clone(),
            });
        }

        let matched =
            self.matcher
                .match_transactions(view, requested, &view.customer_code)?;

        let payable = PayableResource::new(
            view.customer_code.clone(),
            view.company_code.clone(),
            created_by,
            matched,
            self.clock.now(),
        );
        self.payables.insert(payable.clone()).await?;
        Ok(payable)
    }
}
