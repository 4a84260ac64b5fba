//!
//! Documentation of the guard module.
//! Which caller may ask for which ride operation.
//!
//! These checks look only at the caller and the operation's arguments;
//! ownership of the stored ride (cancel, complete) is checked by the
//! lifecycle against the ride as loaded.
//!

use bson::oid::ObjectId;

use super::error::{Result, RideError};
use super::validation::NewRide;
use crate::auth::{CallerIdentity, Role};

/// Any authenticated user may create, as themselves and in their own role
pub fn authorize_create(caller: &CallerIdentity, ride: &NewRide) -> Result<()> {
    if ride.role != caller.role {
        return Err(RideError::Forbidden(format!(
            "a {} cannot create a ride as a {}", caller.role, ride.role
        )));
    }
    if !caller.is(&ride.originator) {
        return Err(RideError::Forbidden("rides can only be created on your own behalf".to_string()));
    }
    Ok(())
}

/// Only a driver, accepting for themselves
pub fn authorize_accept(caller: &CallerIdentity, driver: &ObjectId) -> Result<()> {
    if caller.role != Role::Driver {
        return Err(RideError::Forbidden("only drivers can accept ride requests".to_string()));
    }
    authorize_self(caller, driver)
}

/// Join, leave, cancel and complete are self-service
pub fn authorize_self(caller: &CallerIdentity, user: &ObjectId) -> Result<()> {
    if !caller.is(user) {
        return Err(RideError::Forbidden(format!(
            "{} cannot act on behalf of {}", caller.user_id.to_hex(), user.to_hex()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn new_ride(originator: ObjectId, role: Role) -> NewRide {
        NewRide {
            source: "Haifa".to_string(),
            destination: "Acre".to_string(),
            date: NaiveDate::from_ymd_opt(2031, 1, 1).unwrap(),
            time: "09:00".to_string(),
            seats: 1,
            notes: String::new(),
            originator,
            role,
        }
    }

    #[test]
    fn create_must_be_on_own_behalf_and_role() {
        let caller = CallerIdentity::new(ObjectId::new(), Role::Rider);

        assert!(authorize_create(&caller, &new_ride(caller.user_id, Role::Rider)).is_ok());
        assert!(matches!(
            authorize_create(&caller, &new_ride(ObjectId::new(), Role::Rider)),
            Err(RideError::Forbidden(_))
        ));
        assert!(matches!(
            authorize_create(&caller, &new_ride(caller.user_id, Role::Driver)),
            Err(RideError::Forbidden(_))
        ));
    }

    #[test]
    fn accept_needs_a_driver_identity() {
        let rider = CallerIdentity::new(ObjectId::new(), Role::Rider);
        assert!(matches!(authorize_accept(&rider, &rider.user_id), Err(RideError::Forbidden(_))));

        let driver = CallerIdentity::new(ObjectId::new(), Role::Driver);
        assert!(authorize_accept(&driver, &driver.user_id).is_ok());
        assert!(matches!(authorize_accept(&driver, &ObjectId::new()), Err(RideError::Forbidden(_))));
    }

    #[test]
    fn admins_get_no_override() {
        let admin = CallerIdentity::new(ObjectId::new(), Role::Admin);
        assert!(matches!(authorize_self(&admin, &ObjectId::new()), Err(RideError::Forbidden(_))));
    }
}
