//! Client for Dataverse-style research data archives.
//!
//! Two endpoints of the native API are enough for our purposes:
//!
//! ```text
//!  GET {server}/api/datasets/:persistentId/?persistentId=doi:...   list files
//!  GET {server}/api/access/datafile/{id}                           fetch one
//! ```
//!
//! The server comes from `DATAVERSE_SERVER`, an optional token from
//! `DATAVERSE_KEY`.  Requests are blocking with a fixed timeout; the UI
//! layer decides what thread they run on.

pub mod client;
pub mod config;
pub mod error;
