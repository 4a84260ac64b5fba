//!
//! Documentation of the listing module.
//! Read views over the rides, with user references resolved.
//!
//! Views read without the commit protocol and may lag a concurrent
//! transition by one version.
//!

use std::collections::HashMap;

use bson::oid::ObjectId;

use super::error::{Result, RideError};
use super::service::RideService;
use super::validation::parse_id;
use crate::ODM::models::*;
use crate::ODM::odm_utils::*;
use crate::ODM::store::RideQuery;

impl RideService {
    /// A single ride with its driver, rider and passengers
    pub async fn get_ride(&self, ride_id: &str) -> Result<RideDetail> {
        let id = parse_id("ride id", ride_id)?;
        let ride = self.load(&id).await?;

        self.resolve(vec![ride], Disclosure::NameAndEmail)
            .await?
            .pop()
            .ok_or_else(|| RideError::NotFound(format!("ride {}", ride_id)))
    }

    /// Open seats, not cancelled, from today on
    pub async fn list_available_rides(&self) -> Result<Vec<RideDetail>> {
        self.list(RideQuery::Available { from: today_bson() }, Disclosure::NameOnly).await
    }

    pub async fn list_driver_rides(&self, driver_id: &str) -> Result<Vec<RideDetail>> {
        let driver = parse_id("driver id", driver_id)?;
        self.list(RideQuery::ByDriver(driver), Disclosure::NameAndEmail).await
    }

    pub async fn list_rider_rides(&self, rider_id: &str) -> Result<Vec<RideDetail>> {
        let rider = parse_id("rider id", rider_id)?;
        self.list(RideQuery::ByRider(rider), Disclosure::NameOnly).await
    }

    /// Requests still waiting for a driver
    pub async fn list_pending_requests(&self) -> Result<Vec<RideDetail>> {
        self.list(RideQuery::PendingRequests, Disclosure::NameAndEmail).await
    }

    async fn list(&self, query: RideQuery, disclosure: Disclosure) -> Result<Vec<RideDetail>> {
        let rides = self.bounded(self.store.find_rides(&query)).await?;
        self.resolve(rides, disclosure).await
    }

    /// One user lookup for every reference of every ride
    async fn resolve(&self, rides: Vec<RideDocument>, disclosure: Disclosure) -> Result<Vec<RideDetail>> {
        let mut ids: Vec<ObjectId> = rides.iter().flat_map(referenced_users).collect();
        ids.sort();
        ids.dedup();

        let users: HashMap<ObjectId, UserSummary> = self
            .bounded(self.store.find_users(&ids))
            .await?
            .iter()
            .map(|user| (user.id, doc_to_user_summary(user, disclosure)))
            .collect();
        let lookup = |id: &ObjectId| users.get(id).cloned();

        Ok(rides
            .iter()
            .map(|ride| RideDetail {
                ride:              doc_to_ride(ride),
                driver_details:    ride.driver.as_ref().and_then(lookup),
                rider_details:     ride.rider.as_ref().and_then(lookup),
                passenger_details: ride.passengers.iter().filter_map(lookup).collect(),
            })
            .collect())
    }
}
