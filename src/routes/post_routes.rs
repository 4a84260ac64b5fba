use super::{*};
use log::info;

use rides::CreateRideInput;

///
///Creates a ride offer (driver) or a ride request (rider)
///
///INPUT:  user verification, ride JSON, ride service
///OUTPUT: the new ride id / InvalidInput / Forbidden
///
#[post("/rides/create", data = "<input>")]
async fn create_ride(caller: Caller, input: Result<Json<CreateRideInput>, JsonError<'_>>, rides: &State<RideState>, route: &Route) -> Result<Json<Value>, RideError> {
    let input = body_or_invalid(input)?;
    let ride_id = rides.service.create_ride(&caller.0, &input).await?;

    info!("Server>>Client:\tApproving action {} for {}", route, caller.0);
    Ok(ok("Ride created", json!({ "rideId": ride_id })))
}

///
///A driver takes up a pending ride request
///
///INPUT:  user verification, ride id, {"driverId"}
///OUTPUT: the accepted ride / Conflict / Forbidden
///
#[post("/rides/accept/<id>", data = "<body>")]
async fn accept_ride(id: &str, caller: Caller, body: Result<Json<DriverIdBody>, JsonError<'_>>, rides: &State<RideState>, route: &Route) -> Result<Json<Value>, RideError> {
    let body = body_or_invalid(body)?;
    let ride = rides.service.accept_ride(&caller.0, id, &body.driver_id).await?;

    info!("Server>>Client:\tApproving action {} for {}", route, caller.0);
    Ok(ok("Ride accepted", json!({ "ride": ride })))
}

#[post("/rides/join/<id>", data = "<body>")]
async fn join_ride(id: &str, caller: Caller, body: Result<Json<UserIdBody>, JsonError<'_>>, rides: &State<RideState>, route: &Route) -> Result<Json<Value>, RideError> {
    let body = body_or_invalid(body)?;
    rides.service.join_ride(&caller.0, id, &body.user_id).await?;

    info!("Server>>Client:\tApproving action {} for {}", route, caller.0);
    Ok(ok("Joined ride", json!({})))
}

#[post("/rides/leave/<id>", data = "<body>")]
async fn leave_ride(id: &str, caller: Caller, body: Result<Json<UserIdBody>, JsonError<'_>>, rides: &State<RideState>, route: &Route) -> Result<Json<Value>, RideError> {
    let body = body_or_invalid(body)?;
    rides.service.leave_ride(&caller.0, id, &body.user_id).await?;

    info!("Server>>Client:\tApproving action {} for {}", route, caller.0);
    Ok(ok("Left ride", json!({})))
}

///
///Cancels a ride, only its rider or driver may
///
///INPUT:  user verification, ride id, {"userId"}
///OUTPUT: Ok / Forbidden / Conflict
///
#[post("/rides/cancel/<id>", data = "<body>")]
async fn cancel_ride(id: &str, caller: Caller, body: Result<Json<UserIdBody>, JsonError<'_>>, rides: &State<RideState>, route: &Route) -> Result<Json<Value>, RideError> {
    let body = body_or_invalid(body)?;
    rides.service.cancel_ride(&caller.0, id, &body.user_id).await?;

    info!("Server>>Client:\tApproving action {} for {}", route, caller.0);
    Ok(ok("Ride cancelled", json!({})))
}

#[post("/rides/complete/<id>", data = "<body>")]
async fn complete_ride(id: &str, caller: Caller, body: Result<Json<DriverIdBody>, JsonError<'_>>, rides: &State<RideState>, route: &Route) -> Result<Json<Value>, RideError> {
    let body = body_or_invalid(body)?;
    rides.service.complete_ride(&caller.0, id, &body.driver_id).await?;

    info!("Server>>Client:\tApproving action {} for {}", route, caller.0);
    Ok(ok("Ride completed", json!({})))
}

pub fn post_routes() -> Vec<Route> {
    return routes![
        create_ride, accept_ride, join_ride, leave_ride,
        cancel_ride, complete_ride];
}
