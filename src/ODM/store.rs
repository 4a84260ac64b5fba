//!
//! Documentation of the store module.
//! The persistence port the ride engine is written against.
//!
//! Adapters: `odm::MongoRideStore` for MongoDB and `memory::MemoryRideStore`
//! for a single process.
//!

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::DateTime;
use thiserror::Error;

use super::models::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store did not answer in time")]
    Timeout,

    #[error("stored document is malformed: {0}")]
    Malformed(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The listing predicates; results are always sorted by `(date, time)`
#[derive(Debug, Clone, PartialEq)]
pub enum RideQuery {
    /// Seats left, not cancelled, dated on or after `from`
    Available { from: DateTime },
    ByDriver(ObjectId),
    ByRider(ObjectId),
    /// A rider and no driver yet
    PendingRequests,
}

impl RideQuery {
    pub fn matches(&self, ride: &RideDocument) -> bool {
        match self {
            RideQuery::Available { from } => {
                ride.available_seats > 0
                    && ride.date >= *from
                    && ride.status != RideStatus::Cancelled
            },
            RideQuery::ByDriver(driver) => ride.driver.as_ref() == Some(driver),
            RideQuery::ByRider(rider) => ride.rider.as_ref() == Some(rider),
            RideQuery::PendingRequests => ride.rider.is_some() && ride.driver.is_none(),
        }
    }
}

/// Orders rides ascending by `(date, time)`
pub fn sort_by_schedule(rides: &mut [RideDocument]) {
    rides.sort_by(|a, b| (a.date, &a.time).cmp(&(b.date, &b.time)));
}

///
/// Durable collection of rides, plus read access to users.
///
/// # Compare-and-update
///
/// `replace_if_version` is the only mutation after insertion: it writes the
/// replacement only while the stored document still carries `expected`
/// as its version, and reports whether it did.
///
#[async_trait]
pub trait RideStore: Send + Sync {
    async fn insert_ride(&self, ride: &RideDocument) -> StoreResult<()>;

    async fn find_ride(&self, id: &ObjectId) -> StoreResult<Option<RideDocument>>;

    async fn replace_if_version(&self, ride: &RideDocument, expected: i64) -> StoreResult<bool>;

    async fn find_rides(&self, query: &RideQuery) -> StoreResult<Vec<RideDocument>>;

    /// Users for the given ids, in no particular order; unknown ids are skipped
    async fn find_users(&self, ids: &[ObjectId]) -> StoreResult<Vec<UserDocument>>;
}
