//! Post-confirmation fan-out: notification, local paid-state write, and the
//! external settlement saga, joined before the caller is answered.

use crate::application::saga::PaymentSagaCoordinator;
use crate::clock::SharedClock;
use crate::domain::payable::{PayableResource, PaymentConfirmation};
use crate::domain::ports::{
    SharedNotificationSender, SharedPayableStore, SharedSnapshotStore,
};
use crate::error::{PenaltyError, Result};
use log::error;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub struct SettlementService {
    payables: SharedPayableStore,
    snapshots: SharedSnapshotStore,
    notifier: SharedNotificationSender,
    saga: Arc<PaymentSagaCoordinator>,
    clock: SharedClock,
}

impl SettlementService {
    pub fn new(
        payables: SharedPayableStore,
        snapshots: SharedSnapshotStore,
        notifier: SharedNotificationSender,
        saga: Arc<PaymentSagaCoordinator>,
        clock: SharedClock,
    ) -> Self {
        Self {
            payables,
            snapshots,
            notifier,
            saga,
            clock,
        }
    }

    /// Accept a confirmed payment. Three tasks all run to completion before
    /// this returns: (a) the confirmation notification, (b) the local
    /// paid-state write, (c) the ledger settlement saga. They are
    /// independent except that (c) only reports success once (b) has run:
    /// a confirmed external settlement with no local paid flag is the one
    /// state this system must not produce.
    ///
    /// This method is the single writer of the aggregate outcome; a failure
    /// is resolved in priority order persistence > ledger > notification,
    /// with the losing failures visible in logs only.
    pub async fn mark_paid(
        &self,
        customer_code: &str,
        payable_ref: &str,
        confirmation: PaymentConfirmation,
    ) -> Result<()> {
        let payable = self
            .payables
            .get(customer_code, payable_ref)
            .await?
            .ok_or_else(|| PenaltyError::PayableNotFound {
                customer_code: customer_code.to_string(),
                payable_ref: payable_ref.to_string(),
            })?;

        if payable.is_paid() {
            return Err(PenaltyError::AlreadyPaid {
                payable_ref: payable_ref.to_string(),
            });
        }

        let (persisted_tx, persisted_rx) = oneshot::channel::<()>();

        let notify: JoinHandle<Result<()>> = {
            let notifier = self.notifier.clone();
            let payable = payable.clone();
            tokio::spawn(async move { notifier.send(&payable).await })
        };

        let persist: JoinHandle<Result<()>> = {
            let payables = self.payables.clone();
            let snapshots = self.snapshots.clone();
            let clock = self.clock.clone();
            let payable = payable.clone();
            let confirmation = confirmation.clone();
            tokio::spawn(async move {
                let result = persist_paid(payables, snapshots, clock, &payable, &confirmation).await;
                // completion signal, regardless of outcome
                let _ = persisted_tx.send(());
                result
            })
        };

        let settle: JoinHandle<Result<()>> = {
            let saga = self.saga.clone();
            let payable = payable.clone();
            tokio::spawn(async move {
                let result = saga.settle(&payable, &confirmation).await;
                if result.is_ok() && persisted_rx.await.is_err() {
                    return Err(PenaltyError::Storage(
                        "local paid-state write did not complete".to_string(),
                    ));
                }
                result
            })
        };

        let notify_result = flatten(notify.await, "notification");
        let persist_result = flatten(persist.await, "persistence");
        let settle_result = flatten(settle.await, "ledger settlement");

        for (label, result) in [
            ("persistence", &persist_result),
            ("ledger settlement", &settle_result),
            ("notification", &notify_result),
        ] {
            if let Err(err) = result {
                error!("{label} failed for payable {}: {err}", payable.payable_ref);
            }
        }

        persist_result?;
        settle_result?;
        notify_result
    }
}

/// The authoritative local record of the settlement: flip the payment
/// sub-record to paid, then stamp the cached snapshot so freshly paid items
/// read as settled (pending external allocation) without a refetch.
async fn persist_paid(
    payables: SharedPayableStore,
    snapshots: SharedSnapshotStore,
    clock: SharedClock,
    payable: &PayableResource,
    confirmation: &PaymentConfirmation,
) -> Result<()> {
    let mut updated = payable.clone();
    updated.mark_paid(confirmation.external_reference.clone(), confirmation.paid_at)?;
    payables
        .update_payment_details(
            &payable.customer_code,
            &payable.payable_ref,
            updated.payment.clone(),
        )
        .await?;

    if let Some(mut snapshot) = snapshots
        .get(&payable.customer_code, &payable.company_code)
        .await?
    {
        snapshot.close(&payable.references(), clock.now());
        snapshots.update(snapshot).await?;
    }
    Ok(())
}

fn flatten(
    joined: std::result::Result<Result<()>, tokio::task::JoinError>,
    label: &str,
) -> Result<()> {
    match joined {
        Ok(result) => result,
        Err(err) => Err(PenaltyError::Internal(format!("{label} task panicked: {err}"))),
    }
}
