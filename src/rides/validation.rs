//!
//! Documentation of the validation module.
//! Checks ride payloads before creation and every ride mutation before commit.
//!

use std::collections::HashSet;

use bson::oid::ObjectId;
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use serde_json::Value;

use super::error::{Invariant, Result, RideError};
use crate::auth::Role;
use crate::ODM::models::*;

/// A create payload as it arrives from the caller
#[derive(Deserialize, Debug, Default, Clone)]
pub struct CreateRideInput {
    pub source: Option<String>,
    pub destination: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    /// Any JSON value; coerced by `coerce_seats`
    pub seats: Option<Value>,
    pub notes: Option<String>,
    pub rider: Option<String>,
    pub driver: Option<String>,
    pub role: Option<String>,
}

/// A create payload that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct NewRide {
    pub source: String,
    pub destination: String,
    pub date: NaiveDate,
    pub time: String,
    pub seats: i32,
    pub notes: String,
    pub originator: ObjectId,
    pub role: Role,
}

impl NewRide {
    /// Drivers offer rides, everyone else requests them
    pub fn kind(&self) -> RideKind {
        match self.role {
            Role::Driver => RideKind::Offer,
            Role::Rider | Role::Admin => RideKind::Request,
        }
    }
}

/// Parses a caller-supplied identifier
pub fn parse_id(what: &str, value: &str) -> Result<ObjectId> {
    let value = value.trim();
    if value.is_empty() {
        return Err(RideError::InvalidInput(format!("missing {}", what)));
    }
    ObjectId::parse_str(value)
        .map_err(|_| RideError::InvalidInput(format!("'{}' is not a valid {}", value, what)))
}

fn required<'a>(value: &'a Option<String>, name: &'static str, missing: &mut Vec<&'static str>) -> &'a str {
    match value.as_deref().map(str::trim) {
        Some(inner) if !inner.is_empty() => inner,
        _ => {
            missing.push(name);
            ""
        },
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|stamp| stamp.date_naive())
        .map_err(|_| RideError::InvalidInput(format!("'{}' is not a date", value)))
}

/// Leading integer of a string ("3 seats" is 3)
fn leading_integer(value: &str) -> Option<i64> {
    let value = value.trim_start();
    let (sign, rest) = match value.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, value.strip_prefix('+').unwrap_or(value)),
    };
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse::<i64>().ok().map(|number| sign * number)
}

///
/// Seat count of a create payload.
///
/// Absent, non-numeric or zero counts default to 1; negative counts
/// are rejected.
///
pub fn coerce_seats(seats: Option<&Value>) -> Result<i32> {
    let parsed = match seats {
        Some(Value::Number(number)) => number.as_i64().or_else(|| number.as_f64().map(|float| float.trunc() as i64)),
        Some(Value::String(text)) => leading_integer(text),
        _ => None,
    };

    match parsed {
        None | Some(0) => Ok(1),
        Some(count) if count < 0 => Err(RideError::InvalidInput("seats must be a positive number".to_string())),
        Some(count) => i32::try_from(count)
            .map_err(|_| RideError::InvalidInput(format!("{} seats is more than a ride can offer", count))),
    }
}

///
/// Validate a create payload.
///
/// # Arguments
///
/// * `input` - the raw payload
/// * `caller_role` - used when the payload does not name a role
/// * `today` - rides dated before it are rejected
///
pub fn validate_new_ride(input: &CreateRideInput, caller_role: Role, today: NaiveDate) -> Result<NewRide> {
    let role = match input.role.as_deref() {
        Some(role) => role.trim().parse::<Role>()?,
        None => caller_role,
    };

    let (originator_field, originator, stray_field, stray) = match role {
        Role::Driver => ("driver", &input.driver, "rider", &input.rider),
        Role::Rider | Role::Admin => ("rider", &input.rider, "driver", &input.driver),
    };

    let mut missing = vec![];
    let source = required(&input.source, "source", &mut missing);
    let destination = required(&input.destination, "destination", &mut missing);
    let date = required(&input.date, "date", &mut missing);
    let time = required(&input.time, "time", &mut missing);
    let originator = required(originator, originator_field, &mut missing);

    if !missing.is_empty() {
        return Err(RideError::InvalidInput(format!("missing required fields: {}", missing.join(", "))));
    }

    if stray.as_deref().map(str::trim).is_some_and(|value| !value.is_empty()) {
        return Err(RideError::InvalidInput(format!(
            "a ride created by a {} cannot name a {}", role, stray_field
        )));
    }

    let date = parse_date(date)?;
    if date < today {
        return Err(RideError::InvalidInput(format!("{} is in the past", date)));
    }

    Ok(NewRide {
        source: source.to_string(),
        destination: destination.to_string(),
        date,
        time: time.to_string(),
        seats: coerce_seats(input.seats.as_ref())?,
        notes: input.notes.clone().unwrap_or_default(),
        originator: parse_id(originator_field, originator)?,
        role,
    })
}

/// Checks the invariants every stored ride holds
pub fn check_invariants(ride: &RideDocument) -> Result<()> {
    let violated = |invariant| Err(RideError::Validation(invariant));

    if ride.source.trim().is_empty() || ride.destination.trim().is_empty() || ride.seats_offered < 1 {
        return violated(Invariant::MissingRoute);
    }
    if ride.available_seats < 0 || ride.available_seats > ride.seats_offered {
        return violated(Invariant::SeatBounds);
    }
    if ride.passengers.len() > ride.seats_offered as usize {
        return violated(Invariant::PassengerCapacity);
    }

    let mut seen = HashSet::new();
    if !ride.passengers.iter().all(|passenger| seen.insert(passenger)) {
        return violated(Invariant::DuplicatePassenger);
    }
    if ride.available_seats as usize != ride.seats_offered as usize - ride.passengers.len() {
        return violated(Invariant::SeatAccounting);
    }
    if ride.passengers.iter().any(|passenger| ride.is_owner(passenger)) {
        return violated(Invariant::OwnerAboard);
    }

    Ok(())
}

/// Checks a mutation from `before` to `after` ahead of its commit
pub fn validate_mutation(before: &RideDocument, after: &RideDocument) -> Result<()> {
    if before.status.is_terminal() {
        return Err(RideError::Validation(Invariant::TerminalRide));
    }

    if before.driver.is_some() && after.driver != before.driver {
        return Err(RideError::Validation(Invariant::DriverReassigned));
    }

    let immutable_changed = before.id != after.id
        || before.source != after.source
        || before.destination != after.destination
        || before.date != after.date
        || before.time != after.time
        || before.seats_offered != after.seats_offered
        || before.kind != after.kind
        || before.rider != after.rider
        || before.created_at != after.created_at;
    if immutable_changed {
        return Err(RideError::Validation(Invariant::ImmutableField));
    }

    if !after.history.starts_with(&before.history) {
        return Err(RideError::Validation(Invariant::HistoryRewritten));
    }

    check_invariants(after)
}
