//!
//! Documentation of the Models module.
//! Contains all the models stored in, and served from, the rides database.
//!

use std::fmt;

use bson::{oid::ObjectId, DateTime};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::auth::Role;

/// Lifecycle state of a ride
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum RideStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl RideStatus {
    /// No transition leaves a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, RideStatus::Completed | RideStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Pending => "Pending",
            RideStatus::Confirmed => "Confirmed",
            RideStatus::Completed => "Completed",
            RideStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who originated the ride
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RideKind {
    /// Created by a driver, driver pre-assigned
    Offer,
    /// Created by a rider, waiting for a driver
    Request,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Joined,
    Left,
}

/*
Models for the MongoDB operations
*/
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HistoryDocument {
    pub user: ObjectId,
    pub action: HistoryAction,
    pub timestamp: DateTime,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RideDocument {
    /// The ID of the model.
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub source: String,
    pub destination: String,
    /// Midnight UTC of the ride's calendar date
    pub date: DateTime,
    pub time: String,
    /// Total capacity
    pub seats_offered: i32,
    pub available_seats: i32,
    #[serde(default)]
    pub notes: String,
    pub kind: RideKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rider: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<ObjectId>,
    #[serde(default)]
    pub passengers: Vec<ObjectId>,
    pub status: RideStatus,
    #[serde(default)]
    pub history: Vec<HistoryDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_by: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    /// Bumped on every committed mutation, guards compare-and-update
    #[serde(default)]
    pub version: i64,
}

impl RideDocument {
    /// Is the user the ride's rider or driver
    pub fn is_owner(&self, user: &ObjectId) -> bool {
        self.rider.as_ref() == Some(user) || self.driver.as_ref() == Some(user)
    }

    pub fn has_passenger(&self, user: &ObjectId) -> bool {
        self.passengers.contains(user)
    }
}

/// Read-only view of the users collection; credentials are never deserialized
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserDocument {
    /// The ID of the model.
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_details: Option<bson::Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
}

/*
Models served to clients
*/
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HistoryRecord {
    pub user: String,
    pub action: HistoryAction,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
    #[serde(rename = "_id")]
    pub id: String,
    pub source: String,
    pub destination: String,
    pub date: NaiveDate,
    pub time: String,
    pub seats_offered: i32,
    pub available_seats: i32,
    pub notes: String,
    pub kind: RideKind,
    pub rider: Option<String>,
    pub driver: Option<String>,
    pub passengers: Vec<String>,
    pub status: RideStatus,
    pub history: Vec<HistoryRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// The display-safe part of a user
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// How much of a referenced user a view may show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disclosure {
    NameOnly,
    NameAndEmail,
}

/// A ride with its user references resolved
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RideDetail {
    #[serde(flatten)]
    pub ride: Ride,
    pub driver_details: Option<UserSummary>,
    pub rider_details: Option<UserSummary>,
    pub passenger_details: Vec<UserSummary>,
}
