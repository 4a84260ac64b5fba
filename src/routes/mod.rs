pub mod get_routes;
pub mod post_routes;
pub mod routes_utils;

use super::auth;
use super::rides;

use rocket::serde::{ Deserialize, json::{ Json, Error as JsonError } };
use rocket::http::{CookieJar, Status};
use rocket::{Build, Catcher, Request, Rocket, Route, State};
use serde_json::{json, Value};

pub use routes_utils::*;

use log::{error, info, warn};

use get_routes::get_routes;
use post_routes::post_routes;

pub fn routes() -> Vec<Route> {
    let mut routes = get_routes();
    routes.append(&mut post_routes());
    routes
}

#[catch(401)]
fn unauthorized() -> Json<Value> {
    Json(json!({ "success": false, "error": "Unauthenticated", "message": "Authentication required" }))
}

#[catch(404)]
fn not_found(request: &Request<'_>) -> Json<Value> {
    Json(json!({ "success": false, "error": "NotFound", "message": format!("no route for {}", request.uri()) }))
}

#[catch(500)]
fn internal_error() -> Json<Value> {
    Json(json!({ "success": false, "error": "Internal", "message": "Internal server error" }))
}

pub fn catchers() -> Vec<Catcher> {
    catchers![unauthorized, not_found, internal_error]
}

/// The application, ready to launch or to drive from a local client
pub fn build(service: rides::RideService, oracle: Box<dyn auth::IdentityOracle>) -> Rocket<Build> {
    rocket::build()
        .mount("/", routes())
        .register("/", catchers())
        .manage(RideState { service })
        .manage(OracleState { oracle })
}
