//!
//! Documentation of the ODM module.
//! Contains all the files needed for the rides database.
//!

use super::config;
pub mod odm;
pub mod models;
pub mod odm_utils;
pub mod store;
pub mod memory;
