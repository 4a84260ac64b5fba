//!
//! Documentation of the Database Utilities module.
//! Conversions between the stored documents and the served models.
//!

use super::*;
use models::*;

use bson::oid::ObjectId;
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};

/// Calendar date to the stored form (midnight UTC)
pub fn date_to_bson(date: NaiveDate) -> bson::DateTime {
    bson::DateTime::from_chrono(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

/// Stored date back to a calendar date
pub fn bson_to_date(date: bson::DateTime) -> NaiveDate {
    date.to_chrono().date_naive()
}

/// Midnight UTC of the current day
pub fn today_bson() -> bson::DateTime {
    date_to_bson(Utc::now().date_naive())
}

fn ids_to_hex(ids: &[ObjectId]) -> Vec<String> {
    ids.iter().map(|id| id.to_hex()).collect()
}

/// Converts a RideDocument to Ride
pub fn doc_to_ride(document: &RideDocument) -> Ride {
    let history = document
        .history
        .iter()
        .map(|record| HistoryRecord {
            user:      record.user.to_hex(),
            action:    record.action,
            timestamp: record.timestamp.to_chrono(),
        })
        .collect();

    // transform ObjectId to String
    Ride {
        id:              document.id.to_hex(),
        source:          document.source.clone(),
        destination:     document.destination.clone(),
        date:            bson_to_date(document.date),
        time:            document.time.clone(),
        seats_offered:   document.seats_offered,
        available_seats: document.available_seats,
        notes:           document.notes.clone(),
        kind:            document.kind,
        rider:           document.rider.as_ref().map(|id| id.to_hex()),
        driver:          document.driver.as_ref().map(|id| id.to_hex()),
        passengers:      ids_to_hex(&document.passengers),
        status:          document.status,
        history,
        cancelled_by:    document.cancelled_by.as_ref().map(|id| id.to_hex()),
        cancelled_at:    document.cancelled_at.map(|at| at.to_chrono()),
        created_at:      document.created_at.to_chrono(),
        updated_at:      document.updated_at.to_chrono(),
    }
}

/// Converts a UserDocument to its display-safe summary
pub fn doc_to_user_summary(document: &UserDocument, disclosure: Disclosure) -> UserSummary {
    let email = match disclosure {
        Disclosure::NameOnly => None,
        Disclosure::NameAndEmail => Some(document.email.clone()),
    };

    UserSummary {
        id:   document.id.to_hex(),
        name: document.name.clone(),
        email,
    }
}

/// Every user a ride refers to, without duplicates
pub fn referenced_users(ride: &RideDocument) -> Vec<ObjectId> {
    let mut ids: Vec<ObjectId> = ride
        .driver
        .iter()
        .chain(ride.rider.iter())
        .chain(ride.passengers.iter())
        .copied()
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_survive_the_bson_form() {
        let date = NaiveDate::from_ymd_opt(2030, 2, 28).unwrap();
        let stored = date_to_bson(date);
        assert_eq!(bson_to_date(stored), date);
        assert_eq!(stored.timestamp_millis() % 86_400_000, 0);
    }

    #[test]
    fn summaries_hide_email_unless_disclosed() {
        let user = UserDocument {
            id: ObjectId::new(),
            name: "Dana".to_string(),
            email: "dana@example.com".to_string(),
            role: crate::auth::Role::Driver,
            home_location: Some("Haifa".to_string()),
            work_location: None,
            vehicle_details: None,
            license_number: Some("1234567".to_string()),
        };

        let short = doc_to_user_summary(&user, Disclosure::NameOnly);
        assert_eq!(short.email, None);
        assert_eq!(short.name, "Dana");

        let full = doc_to_user_summary(&user, Disclosure::NameAndEmail);
        assert_eq!(full.email.as_deref(), Some("dana@example.com"));
        assert_eq!(full.id, user.id.to_hex());
    }
}
