//!
//! Documentation of the memory module.
//! An in-process `RideStore`, used for local runs and the test suite.
//!

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bson::oid::ObjectId;
use log::debug;

use super::models::*;
use super::store::*;

#[derive(Debug, Default)]
pub struct MemoryRideStore {
    rides: RwLock<HashMap<ObjectId, RideDocument>>,
    users: RwLock<HashMap<ObjectId, UserDocument>>,
}

impl MemoryRideStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the users collection
    pub fn with_users(users: Vec<UserDocument>) -> Self {
        let users: HashMap<ObjectId, UserDocument> = users.into_iter().map(|user| (user.id, user)).collect();
        MemoryRideStore {
            rides: RwLock::new(HashMap::new()),
            users: RwLock::new(users),
        }
    }

    pub fn insert_user(&self, user: UserDocument) -> StoreResult<()> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        users.insert(user.id, user);
        Ok(())
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".to_string())
}

#[async_trait]
impl RideStore for MemoryRideStore {
    async fn insert_ride(&self, ride: &RideDocument) -> StoreResult<()> {
        let mut rides = self.rides.write().map_err(|_| poisoned())?;
        if rides.contains_key(&ride.id) {
            return Err(StoreError::Unavailable(format!("duplicate ride id {}", ride.id)));
        }
        rides.insert(ride.id, ride.clone());
        Ok(())
    }

    async fn find_ride(&self, id: &ObjectId) -> StoreResult<Option<RideDocument>> {
        let rides = self.rides.read().map_err(|_| poisoned())?;
        Ok(rides.get(id).cloned())
    }

    async fn replace_if_version(&self, ride: &RideDocument, expected: i64) -> StoreResult<bool> {
        let mut rides = self.rides.write().map_err(|_| poisoned())?;
        match rides.get_mut(&ride.id) {
            Some(stored) if stored.version == expected => {
                *stored = ride.clone();
                Ok(true)
            },
            Some(stored) => {
                debug!("Ride {} is at version {}, expected {}", ride.id, stored.version, expected);
                Ok(false)
            },
            None => Ok(false),
        }
    }

    async fn find_rides(&self, query: &RideQuery) -> StoreResult<Vec<RideDocument>> {
        let rides = self.rides.read().map_err(|_| poisoned())?;
        let mut found: Vec<RideDocument> = rides
            .values()
            .filter(|ride| query.matches(ride))
            .cloned()
            .collect();
        sort_by_schedule(&mut found);
        Ok(found)
    }

    async fn find_users(&self, ids: &[ObjectId]) -> StoreResult<Vec<UserDocument>> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }
}
