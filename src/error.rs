use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PenaltyError>;

#[derive(Error, Debug)]
pub enum PenaltyError {
    /// The external finance system could not be reached or answered with a
    /// server-side failure. Never recovered from cache.
    #[error("ledger backend unavailable: {0}")]
    LedgerUnavailable(String),
    /// The external finance system rejected a request (non-2xx on a payment
    /// operation).
    #[error("ledger rejected {operation} request: {message}")]
    LedgerBadRequest { operation: String, message: String },
    #[error("notification publish failed: {0}")]
    Notification(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("payable {payable_ref} for customer {customer_code} not found")]
    PayableNotFound {
        customer_code: String,
        payable_ref: String,
    },
    #[error("payable {payable_ref} is already paid")]
    AlreadyPaid { payable_ref: String },
    #[error("customer {customer_code} has more than one open penalty")]
    MultiplePenalties { customer_code: String },
    #[error(transparent)]
    Match(#[from] MatchRejection),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("rocksdb error: {0}")]
    RocksDb(#[from] rocksdb::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Why a requested line item was refused by the matcher. These are terminal
/// validation rejections, surfaced to the caller verbatim and never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchRejection {
    #[error("transaction {reference} does not exist in the penalty view")]
    TransactionDoesNotExist { reference: String },
    #[error("transaction {reference} is part paid")]
    IsPartPaid { reference: String },
    #[error("transaction {reference} is already paid")]
    IsPaid { reference: String },
    #[error("transaction {reference} is not a payable penalty type")]
    NotPenaltyType { reference: String },
    #[error(
        "transaction {reference} amount mismatch: requested {requested}, outstanding {outstanding}"
    )]
    AmountMismatch {
        reference: String,
        requested: Decimal,
        outstanding: Decimal,
    },
    #[error("transaction {reference} is with a debt collection agency")]
    IsDca { reference: String },
}
