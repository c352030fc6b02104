use crate::model::money::{Cents, Sats};
use thiserror::Error;

pub type SimResult<T> = Result<T, SimError>;

/// User-facing error taxonomy. Handlers return these as typed values
/// for the transport to render; they never escape as panics, so one
/// caller's bad command cannot take down processing for others.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The requested trade rounds to zero asset units.
    #[error("amount too small to buy any satoshis")]
    AmountTooSmall,

    #[error("insufficient funds: required {required} cents, available {available}")]
    InsufficientFunds { required: Cents, available: Cents },

    #[error("insufficient asset: required {required} sats, available {available}")]
    InsufficientAsset { required: Sats, available: Sats },

    #[error("order {0} not found")]
    NotFound(i64),

    #[error("order {0} is not open")]
    NotCancellable(i64),

    #[error("no price snapshot available yet")]
    PriceUnavailable,

    #[error("not authorized for admin commands")]
    Unauthorized,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("store unavailable: {0}")]
    Store(String),
}
