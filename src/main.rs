//!
//! #  Rideshare - a ride-sharing backend
//!
//! Drivers offer rides, riders request them, and both sides meet on a
//! small JSON API:
//!
//! * Ride offers with a fixed number of seats
//! * Ride requests waiting for a driver to accept them
//! * Joining and leaving rides without ever overbooking a seat
//! * Cancelling and completing rides, with a full history of who came and went
//!

#![allow(dead_code)]
#![allow(non_snake_case)]
#[macro_use] extern crate rocket;

mod auth;
mod config;
mod rides;
mod routes;
mod ODM;

use std::sync::Arc;

use anyhow::Context;
use log::{error, warn};

use auth::SessionCookieOracle;
use config::config::StoreBackend;
use rides::RideService;
use ODM::memory::MemoryRideStore;
use ODM::odm::MongoRideStore;
use ODM::store::RideStore;


/// The main functions, runs w/ cargo run
#[rocket::main]
async fn main() -> anyhow::Result<()> {
    let config = config::config::init()
        .await
        .with_context(|| format!("CONFIG failed to load {}", config::config::CONFIG_PATH))?;
    config::config::setup_logger(&config).await.context("LOGGER failed to start")?;

    let store: Arc<dyn RideStore> = match config.store_backend {
        StoreBackend::Mongodb => {
            let db = ODM::odm::init(&config).await.context("DATABASE failed to connect")?;
            Arc::new(MongoRideStore::new(db))
        },
        StoreBackend::Memory => {
            warn!("Running on the in-memory store, nothing will be persisted");
            Arc::new(MemoryRideStore::new())
        },
    };
    let service = RideService::new(store, config.store_timeout());

    warn!("RIDESHARE IS LAUNCHING");

    let lift = routes::build(service, Box::new(SessionCookieOracle))
        .launch()
        .await;

    warn!("RIDESHARE OVER");
    if let Err(value) = lift {
        error!("Rocket could not run, error {}", value);
        return Err(anyhow::anyhow!("rocket failed: {}", value));
    }
    Ok(())
}
