use thiserror::Error;

use crate::model::ModelError;
use crate::rates::RateKind;

/// Precondition failures reported before the solver is invoked
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimizeError {
    #[error("An item requested is not contained in any batch: '{0}'")]
    UnknownItem(String),
    #[error("maximum_{quantity} ({maximum}) cannot be less than minimum_{quantity} ({minimum})")]
    ContradictoryBounds {
        quantity: &'static str,
        minimum: f64,
        maximum: f64,
    },
    #[error("The {channel} has {actual} values but there are {expected} batches")]
    RateLength {
        channel: RateKind,
        expected: usize,
        actual: usize,
    },
    #[error(transparent)]
    Model(#[from] ModelError),
}
