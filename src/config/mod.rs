//!
//! Documentation of the config module.
//! Contains the service configuration and the logger setup.
//!

pub mod config;
