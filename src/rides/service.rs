//!
//! Documentation of the service module.
//! The ride operations as callers see them.
//!
//! Every mutating operation runs the same steps: parse identifiers, check
//! the caller, load the ride, apply the transition, validate the result and
//! commit it with a compare-and-update on the ride's version. Losing the
//! race to another writer reloads and re-decides, so two callers can never
//! both be admitted into the last seat.
//!

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bson::oid::ObjectId;
use bson::DateTime;
use chrono::Utc;
use log::{debug, error, info, warn};

use super::error::{Result, RideError};
use super::guard::*;
use super::lifecycle::{self, Transition};
use super::validation::*;
use crate::auth::CallerIdentity;
use crate::ODM::models::*;
use crate::ODM::odm_utils::doc_to_ride;
use crate::ODM::store::*;

/// Reloads allowed when the ride keeps changing underneath a transition
pub const MAX_COMMIT_ATTEMPTS: usize = 16;

#[derive(Clone)]
pub struct RideService {
    pub(super) store: Arc<dyn RideStore>,
    timeout: Duration,
}

impl RideService {
    pub fn new(store: Arc<dyn RideStore>, timeout: Duration) -> Self {
        RideService { store, timeout }
    }

    /// Runs a store call under the configured deadline
    pub(super) async fn bounded<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(value)) => {
                error!("Store call failed: {}", value);
                Err(value.into())
            },
            Err(_) => {
                error!("Store did not answer within {:?}", self.timeout);
                Err(StoreError::Timeout.into())
            },
        }
    }

    pub(super) async fn load(&self, id: &ObjectId) -> Result<RideDocument> {
        self.bounded(self.store.find_ride(id))
            .await?
            .ok_or_else(|| RideError::NotFound(format!("ride {}", id.to_hex())))
    }

    ///
    /// Create a ride offer (driver) or ride request (rider)
    ///
    /// # Output
    ///
    /// * Ok(id) - hex id of the new ride
    /// * Err(InvalidInput) - missing or malformed fields
    /// * Err(Forbidden) - creating for someone else or in another role
    ///
    pub async fn create_ride(&self, caller: &CallerIdentity, input: &CreateRideInput) -> Result<String> {
        let new_ride = validate_new_ride(input, caller.role, Utc::now().date_naive())?;
        authorize_create(caller, &new_ride)?;

        let ride = lifecycle::create(&new_ride, DateTime::now());
        check_invariants(&ride)?;
        self.bounded(self.store.insert_ride(&ride)).await?;

        info!(
            "Ride {} created as {:?} by {}: {} -> {} on {} {}, {} seats",
            ride.id, ride.kind, caller, ride.source, ride.destination, new_ride.date, ride.time, ride.seats_offered
        );
        Ok(ride.id.to_hex())
    }

    /// A driver takes up a pending ride request
    pub async fn accept_ride(&self, caller: &CallerIdentity, ride_id: &str, driver_id: &str) -> Result<Ride> {
        let ride_id = parse_id("ride id", ride_id)?;
        let driver = parse_id("driver id", driver_id)?;
        authorize_accept(caller, &driver)?;

        let ride = self.transition(&ride_id, Transition::Accept { driver }).await?;
        Ok(doc_to_ride(&ride))
    }

    pub async fn join_ride(&self, caller: &CallerIdentity, ride_id: &str, user_id: &str) -> Result<()> {
        let ride_id = parse_id("ride id", ride_id)?;
        let user = parse_id("user id", user_id)?;
        authorize_self(caller, &user)?;

        self.transition(&ride_id, Transition::Join { user }).await?;
        Ok(())
    }

    pub async fn leave_ride(&self, caller: &CallerIdentity, ride_id: &str, user_id: &str) -> Result<()> {
        let ride_id = parse_id("ride id", ride_id)?;
        let user = parse_id("user id", user_id)?;
        authorize_self(caller, &user)?;

        self.transition(&ride_id, Transition::Leave { user }).await?;
        Ok(())
    }

    pub async fn cancel_ride(&self, caller: &CallerIdentity, ride_id: &str, user_id: &str) -> Result<()> {
        let ride_id = parse_id("ride id", ride_id)?;
        let by = parse_id("user id", user_id)?;
        authorize_self(caller, &by)?;

        self.transition(&ride_id, Transition::Cancel { by }).await?;
        Ok(())
    }

    pub async fn complete_ride(&self, caller: &CallerIdentity, ride_id: &str, driver_id: &str) -> Result<()> {
        let ride_id = parse_id("ride id", ride_id)?;
        let by = parse_id("driver id", driver_id)?;
        authorize_self(caller, &by)?;

        self.transition(&ride_id, Transition::Complete { by }).await?;
        Ok(())
    }

    async fn transition(&self, ride_id: &ObjectId, transition: Transition) -> Result<RideDocument> {
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let current = self.load(ride_id).await?;

            let mut next = current.clone();
            if let Err(value) = lifecycle::apply(&mut next, &transition, DateTime::now()) {
                warn!("Rejected {} on ride {}: {}", transition, ride_id, value);
                return Err(value);
            }
            if let Err(value) = validate_mutation(&current, &next) {
                error!("Refusing to commit {} on ride {}: {}", transition, ride_id, value);
                return Err(value);
            }
            next.version = current.version + 1;

            if self.bounded(self.store.replace_if_version(&next, current.version)).await? {
                info!(
                    "Ride {} {}: {} -> {}, {} of {} seats left",
                    ride_id, transition, current.status, next.status, next.available_seats, next.seats_offered
                );
                return Ok(next);
            }
            debug!("Ride {} changed during {} (attempt {}), reloading", ride_id, transition, attempt);
        }

        warn!("Giving up on {} for ride {} after {} attempts", transition, ride_id, MAX_COMMIT_ATTEMPTS);
        Err(RideError::StoreUnavailable(format!("ride {} is busy, try again", ride_id.to_hex())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::ODM::memory::MemoryRideStore;
    use async_trait::async_trait;
    use serde_json::json;

    fn service() -> RideService {
        RideService::new(Arc::new(MemoryRideStore::new()), Duration::from_secs(2))
    }

    fn caller(role: Role) -> CallerIdentity {
        CallerIdentity::new(ObjectId::new(), role)
    }

    fn next_week() -> String {
        (Utc::now().date_naive() + chrono::Duration::days(7)).to_string()
    }

    fn input(originator: &CallerIdentity, seats: i32) -> CreateRideInput {
        let id = Some(originator.user_id.to_hex());
        let (rider, driver) = match originator.role {
            Role::Driver => (None, id),
            _ => (id, None),
        };
        CreateRideInput {
            source: Some("Haifa".to_string()),
            destination: Some("Tel Aviv".to_string()),
            date: Some(next_week()),
            time: Some("08:00".to_string()),
            seats: Some(json!(seats)),
            notes: Some("two bags".to_string()),
            rider,
            driver,
            role: None,
        }
    }

    async fn stored(service: &RideService, id: &str) -> RideDocument {
        service.load(&ObjectId::parse_str(id).unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn seat_scenario() {
        let service = service();
        let driver = caller(Role::Driver);
        let (a, b, c) = (caller(Role::Rider), caller(Role::Rider), caller(Role::Rider));

        let id = service.create_ride(&driver, &input(&driver, 2)).await.unwrap();
        assert_eq!(stored(&service, &id).await.available_seats, 2);

        service.join_ride(&a, &id, &a.user_id.to_hex()).await.unwrap();
        let ride = stored(&service, &id).await;
        assert_eq!(ride.available_seats, 1);
        assert_eq!(ride.passengers, vec![a.user_id]);

        service.join_ride(&b, &id, &b.user_id.to_hex()).await.unwrap();
        let ride = stored(&service, &id).await;
        assert_eq!(ride.available_seats, 0);
        assert_eq!(ride.passengers, vec![a.user_id, b.user_id]);

        let err = service.join_ride(&c, &id, &c.user_id.to_hex()).await.unwrap_err();
        assert!(matches!(err, RideError::Capacity(_)));
        assert_eq!(stored(&service, &id).await, ride);

        service.leave_ride(&a, &id, &a.user_id.to_hex()).await.unwrap();
        let ride = stored(&service, &id).await;
        assert_eq!(ride.available_seats, 1);
        assert_eq!(ride.passengers, vec![b.user_id]);
        assert_eq!(ride.version, 3);
    }

    #[tokio::test]
    async fn accept_scenario() {
        let service = service();
        let rider = caller(Role::Rider);
        let (d, e) = (caller(Role::Driver), caller(Role::Driver));

        let id = service.create_ride(&rider, &input(&rider, 1)).await.unwrap();
        let ride = stored(&service, &id).await;
        assert_eq!(ride.status, RideStatus::Pending);
        assert_eq!(ride.driver, None);

        let accepted = service.accept_ride(&d, &id, &d.user_id.to_hex()).await.unwrap();
        assert_eq!(accepted.status, RideStatus::Confirmed);
        assert_eq!(accepted.driver, Some(d.user_id.to_hex()));

        let err = service.accept_ride(&e, &id, &e.user_id.to_hex()).await.unwrap_err();
        assert!(matches!(err, RideError::Conflict(_)));
    }

    #[tokio::test]
    async fn complete_scenario() {
        let service = service();
        let rider = caller(Role::Rider);
        let driver = caller(Role::Driver);
        let passenger = caller(Role::Rider);

        let id = service.create_ride(&rider, &input(&rider, 1)).await.unwrap();
        service.accept_ride(&driver, &id, &driver.user_id.to_hex()).await.unwrap();
        service.join_ride(&passenger, &id, &passenger.user_id.to_hex()).await.unwrap();

        // the rider is not the driver
        let err = service.complete_ride(&rider, &id, &rider.user_id.to_hex()).await.unwrap_err();
        assert!(matches!(err, RideError::Forbidden(_)));

        service.complete_ride(&driver, &id, &driver.user_id.to_hex()).await.unwrap();
        assert_eq!(stored(&service, &id).await.status, RideStatus::Completed);

        let err = service.complete_ride(&driver, &id, &driver.user_id.to_hex()).await.unwrap_err();
        assert!(matches!(err, RideError::Conflict(_)));
    }

    #[tokio::test]
    async fn second_cancel_conflicts_without_changing_state() {
        let service = service();
        let rider = caller(Role::Rider);
        let id = service.create_ride(&rider, &input(&rider, 2)).await.unwrap();

        service.cancel_ride(&rider, &id, &rider.user_id.to_hex()).await.unwrap();
        let cancelled = stored(&service, &id).await;
        assert_eq!(cancelled.status, RideStatus::Cancelled);
        assert_eq!(cancelled.cancelled_by, Some(rider.user_id));

        let err = service.cancel_ride(&rider, &id, &rider.user_id.to_hex()).await.unwrap_err();
        assert!(matches!(err, RideError::Conflict(_)));
        assert_eq!(stored(&service, &id).await, cancelled);
    }

    #[tokio::test]
    async fn strangers_cannot_cancel_or_act_for_others() {
        let service = service();
        let rider = caller(Role::Rider);
        let stranger = caller(Role::Rider);
        let id = service.create_ride(&rider, &input(&rider, 2)).await.unwrap();

        let err = service.cancel_ride(&stranger, &id, &stranger.user_id.to_hex()).await.unwrap_err();
        assert!(matches!(err, RideError::Forbidden(_)));

        let err = service.join_ride(&stranger, &id, &ObjectId::new().to_hex()).await.unwrap_err();
        assert!(matches!(err, RideError::Forbidden(_)));

        let err = service.create_ride(&stranger, &input(&rider, 1)).await.unwrap_err();
        assert!(matches!(err, RideError::Forbidden(_)));
    }

    #[tokio::test]
    async fn bad_ids_are_invalid_input_and_unknown_rides_not_found() {
        let service = service();
        let user = caller(Role::Rider);

        let err = service.join_ride(&user, "42", &user.user_id.to_hex()).await.unwrap_err();
        assert!(matches!(err, RideError::InvalidInput(_)));

        let err = service.join_ride(&user, &ObjectId::new().to_hex(), &user.user_id.to_hex()).await.unwrap_err();
        assert!(matches!(err, RideError::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_joins_for_the_last_seat_admit_exactly_one() {
        for _ in 0..20 {
            let service = service();
            let driver = caller(Role::Driver);
            let id = service.create_ride(&driver, &input(&driver, 1)).await.unwrap();

            let mut handles = vec![];
            for _ in 0..2 {
                let service = service.clone();
                let id = id.clone();
                let user = caller(Role::Rider);
                handles.push(tokio::spawn(async move {
                    service.join_ride(&user, &id, &user.user_id.to_hex()).await
                }));
            }

            let mut admitted = 0;
            let mut turned_away = 0;
            for handle in handles {
                match handle.await.unwrap() {
                    Ok(()) => admitted += 1,
                    Err(RideError::Capacity(_)) => turned_away += 1,
                    Err(other) => panic!("unexpected {:?}", other),
                }
            }
            assert_eq!((admitted, turned_away), (1, 1));

            let ride = stored(&service, &id).await;
            assert_eq!(ride.available_seats, 0);
            assert_eq!(ride.passengers.len(), 1);
        }
    }

    /// A store that never lets a replacement through
    struct ContendedStore(MemoryRideStore);

    #[async_trait]
    impl RideStore for ContendedStore {
        async fn insert_ride(&self, ride: &RideDocument) -> StoreResult<()> {
            self.0.insert_ride(ride).await
        }
        async fn find_ride(&self, id: &ObjectId) -> StoreResult<Option<RideDocument>> {
            self.0.find_ride(id).await
        }
        async fn replace_if_version(&self, _: &RideDocument, _: i64) -> StoreResult<bool> {
            Ok(false)
        }
        async fn find_rides(&self, query: &RideQuery) -> StoreResult<Vec<RideDocument>> {
            self.0.find_rides(query).await
        }
        async fn find_users(&self, ids: &[ObjectId]) -> StoreResult<Vec<UserDocument>> {
            self.0.find_users(ids).await
        }
    }

    /// A store that never answers
    struct StalledStore;

    #[async_trait]
    impl RideStore for StalledStore {
        async fn insert_ride(&self, _: &RideDocument) -> StoreResult<()> {
            std::future::pending().await
        }
        async fn find_ride(&self, _: &ObjectId) -> StoreResult<Option<RideDocument>> {
            std::future::pending().await
        }
        async fn replace_if_version(&self, _: &RideDocument, _: i64) -> StoreResult<bool> {
            std::future::pending().await
        }
        async fn find_rides(&self, _: &RideQuery) -> StoreResult<Vec<RideDocument>> {
            std::future::pending().await
        }
        async fn find_users(&self, _: &[ObjectId]) -> StoreResult<Vec<UserDocument>> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn endless_contention_gives_up_as_retriable() {
        let service = RideService::new(Arc::new(ContendedStore(MemoryRideStore::new())), Duration::from_secs(2));
        let driver = caller(Role::Driver);
        let rider = caller(Role::Rider);
        let id = service.create_ride(&driver, &input(&driver, 2)).await.unwrap();

        let err = service.join_ride(&rider, &id, &rider.user_id.to_hex()).await.unwrap_err();
        assert!(matches!(err, RideError::StoreUnavailable(_)));
        assert!(err.is_retriable());
    }

    #[tokio::test]
    async fn a_stalled_store_times_out() {
        let service = RideService::new(Arc::new(StalledStore), Duration::from_millis(50));
        let rider = caller(Role::Rider);

        let err = service.create_ride(&rider, &input(&rider, 1)).await.unwrap_err();
        assert!(matches!(err, RideError::StoreUnavailable(_)));

        let err = service.get_ride(&ObjectId::new().to_hex()).await.unwrap_err();
        assert!(err.is_retriable());
    }
}
