//!
//! Documentation of the lifecycle module.
//! The ride state machine and its seat accounting.
//!
//! ```text
//! Pending ──accept / first join on an offer──▶ Confirmed ──complete──▶ Completed
//!    │                                            │
//!    └──────────────────cancel────────────────────┴──▶ Cancelled
//! ```
//!
//! Transitions here are pure: they check legality against the ride as
//! loaded and mutate it in place. Committing the result is the service's job.
//!

use std::fmt;

use bson::oid::ObjectId;
use bson::DateTime;

use super::error::{Result, RideError};
use super::validation::NewRide;
use crate::ODM::models::*;
use crate::ODM::odm_utils::date_to_bson;

/// A requested change to an existing ride
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Accept { driver: ObjectId },
    Join { user: ObjectId },
    Leave { user: ObjectId },
    Cancel { by: ObjectId },
    Complete { by: ObjectId },
}

impl Transition {
    pub fn name(&self) -> &'static str {
        match self {
            Transition::Accept { .. } => "accept",
            Transition::Join { .. } => "join",
            Transition::Leave { .. } => "leave",
            Transition::Cancel { .. } => "cancel",
            Transition::Complete { .. } => "complete",
        }
    }

    /// The user the transition acts for
    pub fn actor(&self) -> ObjectId {
        match *self {
            Transition::Accept { driver } => driver,
            Transition::Join { user } | Transition::Leave { user } => user,
            Transition::Cancel { by } | Transition::Complete { by } => by,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {}", self.name(), self.actor().to_hex())
    }
}

/// A fresh ride: `Pending`, every seat open, nobody aboard
pub fn create(new_ride: &NewRide, now: DateTime) -> RideDocument {
    let kind = new_ride.kind();
    let (rider, driver) = match kind {
        RideKind::Offer => (None, Some(new_ride.originator)),
        RideKind::Request => (Some(new_ride.originator), None),
    };

    RideDocument {
        id: ObjectId::new(),
        source: new_ride.source.clone(),
        destination: new_ride.destination.clone(),
        date: date_to_bson(new_ride.date),
        time: new_ride.time.clone(),
        seats_offered: new_ride.seats,
        available_seats: new_ride.seats,
        notes: new_ride.notes.clone(),
        kind,
        rider,
        driver,
        passengers: vec![],
        status: RideStatus::Pending,
        history: vec![],
        cancelled_by: None,
        cancelled_at: None,
        created_at: now,
        updated_at: now,
        version: 0,
    }
}

///
/// Apply a transition to a ride.
///
/// # Output
///
/// * Ok(()) - the ride now holds the new state, `updatedAt` refreshed
/// * Err(_) - the transition is illegal; the ride is left untouched
///
pub fn apply(ride: &mut RideDocument, transition: &Transition, now: DateTime) -> Result<()> {
    match *transition {
        Transition::Accept { driver } => accept(ride, driver)?,
        Transition::Join { user } => join(ride, user, now)?,
        Transition::Leave { user } => leave(ride, user, now)?,
        Transition::Cancel { by } => cancel(ride, by, now)?,
        Transition::Complete { by } => complete(ride, by)?,
    }
    ride.updated_at = now;
    Ok(())
}

fn ensure_open(ride: &RideDocument) -> Result<()> {
    if ride.status.is_terminal() {
        return Err(RideError::Conflict(format!("ride {} is already {}", ride.id, ride.status)));
    }
    Ok(())
}

fn accept(ride: &mut RideDocument, driver: ObjectId) -> Result<()> {
    if ride.driver.is_some() {
        return Err(RideError::Conflict(format!("ride {} already has a driver", ride.id)));
    }
    if ride.status != RideStatus::Pending {
        return Err(RideError::Conflict(format!("ride {} is {}, not Pending", ride.id, ride.status)));
    }
    if ride.has_passenger(&driver) {
        return Err(RideError::Conflict("a passenger cannot drive the same ride".to_string()));
    }

    ride.driver = Some(driver);
    ride.status = RideStatus::Confirmed;
    Ok(())
}

fn join(ride: &mut RideDocument, user: ObjectId, now: DateTime) -> Result<()> {
    ensure_open(ride)?;
    // a full ride refuses everyone the same way
    if ride.available_seats <= 0 {
        return Err(RideError::Capacity(ride.id.to_hex()));
    }
    if ride.is_owner(&user) {
        return Err(RideError::Conflict("the ride's rider or driver cannot join as a passenger".to_string()));
    }
    if ride.has_passenger(&user) {
        return Err(RideError::Conflict(format!("user {} already joined this ride", user.to_hex())));
    }

    ride.passengers.push(user);
    ride.available_seats -= 1;
    // a passenger taking up a driver's offer is the match
    if ride.kind == RideKind::Offer && ride.status == RideStatus::Pending {
        ride.status = RideStatus::Confirmed;
    }
    ride.history.push(HistoryDocument { user, action: HistoryAction::Joined, timestamp: now });
    Ok(())
}

fn leave(ride: &mut RideDocument, user: ObjectId, now: DateTime) -> Result<()> {
    ensure_open(ride)?;
    if !ride.has_passenger(&user) {
        return Err(RideError::Conflict(format!("user {} is not a passenger in this ride", user.to_hex())));
    }

    ride.passengers.retain(|passenger| passenger != &user);
    ride.available_seats = (ride.available_seats + 1).min(ride.seats_offered);
    ride.history.push(HistoryDocument { user, action: HistoryAction::Left, timestamp: now });
    Ok(())
}

fn cancel(ride: &mut RideDocument, by: ObjectId, now: DateTime) -> Result<()> {
    if !ride.is_owner(&by) {
        return Err(RideError::Forbidden("only the ride's rider or driver can cancel it".to_string()));
    }
    ensure_open(ride)?;

    ride.status = RideStatus::Cancelled;
    ride.cancelled_by = Some(by);
    ride.cancelled_at = Some(now);
    Ok(())
}

fn complete(ride: &mut RideDocument, by: ObjectId) -> Result<()> {
    if ride.driver != Some(by) {
        return Err(RideError::Forbidden("only the ride's driver can complete it".to_string()));
    }
    ensure_open(ride)?;
    if ride.status != RideStatus::Confirmed {
        return Err(RideError::Precondition(format!("ride {} is {}, not Confirmed", ride.id, ride.status)));
    }
    // full occupancy is required, even though a partly filled ride then never completes
    if ride.passengers.len() != ride.seats_offered as usize {
        return Err(RideError::Precondition(format!(
            "{} of {} seats are taken; a ride completes only when full",
            ride.passengers.len(),
            ride.seats_offered
        )));
    }

    ride.status = RideStatus::Completed;
    Ok(())
}
