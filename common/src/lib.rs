//! Types shared between the analysis server (`backend`) and its clients.
//!
//! Everything here crosses the wire as JSON, so field names and enum
//! spellings are part of the HTTP contract.

pub mod jobs;
pub mod model;
pub mod requests;
