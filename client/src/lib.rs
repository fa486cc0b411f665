//! Native client for the compliance analysis service: HTTP access, the
//! progress poll loop with ETA estimation, and saved user preferences.

pub mod api;
pub mod error;
pub mod poller;
pub mod preferences;
pub mod progress;
