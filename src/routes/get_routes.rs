use super::{*};
use log::info;

/// Drops the session cookie
#[get("/logout")]
async fn logout(cookies: &CookieJar<'_>) -> Json<Value> {
    if cookies.get_private(SESSION_COOKIE).is_some() {
        cookies.remove_private(SESSION_COOKIE);
        info!("Server>>Client:\tSession closed");
    }
    ok("Logged out", json!({}))
}

///
///A single ride with driver, rider and passenger details
///
///INPUT:  user verification, ride id
///OUTPUT: the ride / NotFound / InvalidInput
///
#[get("/rides/<id>")]
async fn ride_details(id: &str, caller: Caller, rides: &State<RideState>, route: &Route) -> Result<Json<Value>, RideError> {
    let ride = rides.service.get_ride(id).await?;

    info!("Server>>Client:\tApproving action {} for {}", route, caller.0);
    Ok(ok("Ride found", json!({ "ride": ride })))
}

/// Rides with open seats from today on
#[get("/rides/available")]
async fn available_rides(rides: &State<RideState>) -> Result<Json<Value>, RideError> {
    let found = rides.service.list_available_rides().await?;
    Ok(ok("Available rides", json!({ "rides": found })))
}

/// Requests still waiting for a driver
#[get("/rides/requests")]
async fn pending_requests(rides: &State<RideState>) -> Result<Json<Value>, RideError> {
    let found = rides.service.list_pending_requests().await?;
    Ok(ok("Pending ride requests", json!({ "rides": found })))
}

#[get("/rides/driver/<id>")]
async fn driver_rides(id: &str, rides: &State<RideState>) -> Result<Json<Value>, RideError> {
    let found = rides.service.list_driver_rides(id).await?;
    Ok(ok("Driver rides", json!({ "rides": found })))
}

#[get("/rides/rider/<id>")]
async fn rider_rides(id: &str, rides: &State<RideState>) -> Result<Json<Value>, RideError> {
    let found = rides.service.list_rider_rides(id).await?;
    Ok(ok("Rider rides", json!({ "rides": found })))
}

pub fn get_routes() -> Vec<Route> {
    return routes![
        logout, ride_details, available_rides, pending_requests,
        driver_rides, rider_rides];
}
