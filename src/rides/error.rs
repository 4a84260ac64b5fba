//! Error types for ride operations

use thiserror::Error;

use crate::auth::UnknownRole;
use crate::ODM::store::StoreError;

/// A ride invariant that a mutation would break
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Invariant {
    #[error("available seats must stay between 0 and the seats offered")]
    SeatBounds,

    #[error("available seats must equal seats offered minus passengers")]
    SeatAccounting,

    #[error("passengers must not exceed the seats offered")]
    PassengerCapacity,

    #[error("a user can hold at most one seat")]
    DuplicatePassenger,

    #[error("the rider or driver cannot also be a passenger")]
    OwnerAboard,

    #[error("a terminal ride cannot change")]
    TerminalRide,

    #[error("an assigned driver cannot be removed or replaced")]
    DriverReassigned,

    #[error("the ride's identity and route are immutable")]
    ImmutableField,

    #[error("a ride needs a source, a destination and at least one seat")]
    MissingRoute,

    #[error("history is append-only")]
    HistoryRewritten,

    #[error("stored ride is malformed: {0}")]
    Malformed(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RideError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation failed: {0}")]
    Validation(Invariant),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("No seats left on ride {0}")]
    Capacity(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl RideError {
    /// Stable tag for clients
    pub fn kind(&self) -> &'static str {
        match self {
            RideError::InvalidInput(_) => "InvalidInput",
            RideError::Validation(_) => "Validation",
            RideError::NotFound(_) => "NotFound",
            RideError::Forbidden(_) => "Forbidden",
            RideError::Conflict(_) => "Conflict",
            RideError::Capacity(_) => "Capacity",
            RideError::Precondition(_) => "Precondition",
            RideError::StoreUnavailable(_) => "StoreUnavailable",
        }
    }

    /// Only infrastructure failures are worth retrying
    pub fn is_retriable(&self) -> bool {
        matches!(self, RideError::StoreUnavailable(_))
    }
}

impl From<StoreError> for RideError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Malformed(reason) => RideError::Validation(Invariant::Malformed(reason)),
            other => RideError::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<UnknownRole> for RideError {
    fn from(value: UnknownRole) -> Self {
        RideError::InvalidInput(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RideError>;
