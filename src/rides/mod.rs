//!
//! Documentation of the rides module.
//! Ride offers and requests: validation, lifecycle, authorization and listings.
//!

pub mod error;
pub mod guard;
pub mod lifecycle;
pub mod listing;
pub mod service;
pub mod validation;

pub use error::{Invariant, RideError};
pub use service::RideService;
pub use validation::CreateRideInput;
