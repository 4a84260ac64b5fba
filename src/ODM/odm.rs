//!
//! Documentation of the odm module.
//! Used to connect to the rides database.
//!

use super::*;
use models::*;
use store::*;
use config::config::ConfyConfig;
use std::time::Duration;

use async_trait::async_trait;
use bson::oid::ObjectId;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::error::ErrorKind;
use mongodb::options::{ClientOptions, FindOneAndReplaceOptions, FindOptions, ListDatabasesOptions, ReturnDocument};
use mongodb::{Client, Collection, Database};
use log::{error, info};

const RIDES: &str = "rides";
const USERS: &str = "users";

///
/// Initiate DB connection
///
///
/// # Arguments
///
/// * `config` - A config object containing 'database', 'database_ip' and 'timeout'
///
///
/// # Log
///
/// * `info` - "Database Connected!", indicating success
/// * `error` - "Could not connect to MongoDB {error}", indicating error
///
pub async fn init(config: &ConfyConfig) -> mongodb::error::Result<Database> {
    connect(config).await
}

/// basic connection, isn't available out of the "odm.rs" module
async fn connect(config: &ConfyConfig) -> mongodb::error::Result<Database> {
    let mut client_options = ClientOptions::parse(&config.database_ip).await?;
    client_options.connect_timeout = Some(Duration::from_secs(config.timeout));
    client_options.heartbeat_freq = Some(Duration::from_secs(config.timeout));
    client_options.server_selection_timeout = Some(Duration::from_secs(config.timeout));
    let client = Client::with_options(client_options)?;

    match client.list_database_names(Document::new(), ListDatabasesOptions::builder().build()).await {
        Ok(_) => {
            info!("Database Connected!");
        },
        Err(value) => {
            error!("Could not connect to MongoDB {}", value);
            return Err(value);
        },
    }

    Ok(client.database(&config.database))
}

impl From<mongodb::error::Error> for StoreError {
    fn from(value: mongodb::error::Error) -> Self {
        match *value.kind {
            ErrorKind::BsonDeserialization(ref inner) => StoreError::Malformed(inner.to_string()),
            _ => StoreError::Unavailable(value.to_string()),
        }
    }
}

/// Turns a listing predicate into a MongoDB filter
pub fn query_filter(query: &RideQuery) -> Document {
    match query {
        RideQuery::Available { from } => doc! {
            "availableSeats": { "$gt": 0 },
            "date":           { "$gte": *from },
            "status":         { "$ne": RideStatus::Cancelled.as_str() },
        },
        RideQuery::ByDriver(driver) => doc! { "driver": *driver },
        RideQuery::ByRider(rider) => doc! { "rider": *rider },
        // `null` matches both a missing and an explicitly empty driver
        RideQuery::PendingRequests => doc! {
            "rider":  { "$exists": true, "$ne": null },
            "driver": null,
        },
    }
}

/// Matches a ride only while it still carries the `expected` version
pub fn version_filter(id: &ObjectId, expected: i64) -> Document {
    doc! { "_id": *id, "version": expected }
}

/// The rides and users collections of a connected database
#[derive(Clone)]
pub struct MongoRideStore {
    db: Database,
}

impl MongoRideStore {
    pub fn new(db: Database) -> Self {
        MongoRideStore { db }
    }

    fn rides(&self) -> Collection<RideDocument> {
        self.db.collection::<RideDocument>(RIDES)
    }

    fn users(&self) -> Collection<UserDocument> {
        self.db.collection::<UserDocument>(USERS)
    }
}

#[async_trait]
impl RideStore for MongoRideStore {
    async fn insert_ride(&self, ride: &RideDocument) -> StoreResult<()> {
        self.rides().insert_one(ride, None).await?;
        Ok(())
    }

    async fn find_ride(&self, id: &ObjectId) -> StoreResult<Option<RideDocument>> {
        let ride = self.rides().find_one(doc! { "_id": *id }, None).await?;
        Ok(ride)
    }

    ///
    /// Replace a ride, conditional on its stored version
    ///
    /// The filter carries both the id and the expected version, so the
    /// check and the write are one atomic document operation.
    ///
    async fn replace_if_version(&self, ride: &RideDocument, expected: i64) -> StoreResult<bool> {
        let find_one_and_replace_options = FindOneAndReplaceOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let ride_doc = self
            .rides()
            .find_one_and_replace(
                version_filter(&ride.id, expected),
                ride,
                find_one_and_replace_options,
            )
            .await?;

        Ok(ride_doc.is_some())
    }

    async fn find_rides(&self, query: &RideQuery) -> StoreResult<Vec<RideDocument>> {
        let find_options = FindOptions::builder()
            .sort(doc! { "date": 1, "time": 1 })
            .build();

        let mut cursor = self.rides().find(query_filter(query), find_options).await?;

        let mut rides: Vec<RideDocument> = vec![];
        while let Some(result) = cursor.try_next().await? {
            rides.push(result);
        }
        Ok(rides)
    }

    async fn find_users(&self, ids: &[ObjectId]) -> StoreResult<Vec<UserDocument>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let mut cursor = self.users().find(doc! { "_id": { "$in": ids.to_vec() } }, None).await?;

        let mut users: Vec<UserDocument> = vec![];
        while let Some(result) = cursor.try_next().await? {
            users.push(result);
        }
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::Bson;

    #[test]
    fn available_filter_excludes_cancelled_and_full_rides() {
        let from = odm_utils::today_bson();
        let filter = query_filter(&RideQuery::Available { from });

        assert_eq!(filter.get_document("availableSeats").unwrap().get("$gt"), Some(&Bson::Int32(0)));
        assert_eq!(filter.get_document("date").unwrap().get("$gte"), Some(&Bson::DateTime(from)));
        assert_eq!(filter.get_document("status").unwrap().get_str("$ne").unwrap(), "Cancelled");
    }

    #[test]
    fn pending_requests_filter_wants_a_rider_and_no_driver() {
        let filter = query_filter(&RideQuery::PendingRequests);

        assert_eq!(filter.get("driver"), Some(&Bson::Null));
        assert!(filter.get_document("rider").unwrap().get_bool("$exists").unwrap());
    }

    #[test]
    fn owner_filters_match_on_the_id() {
        let id = ObjectId::new();
        assert_eq!(query_filter(&RideQuery::ByDriver(id)), doc! { "driver": id });
        assert_eq!(query_filter(&RideQuery::ByRider(id)), doc! { "rider": id });
    }

    #[test]
    fn replacement_is_guarded_by_id_and_version() {
        let id = ObjectId::new();
        let filter = version_filter(&id, 7);

        assert_eq!(filter.get_object_id("_id").unwrap(), id);
        assert_eq!(filter.get_i64("version").unwrap(), 7);
        assert_eq!(filter.len(), 2);
    }
}
