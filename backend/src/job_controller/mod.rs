pub mod cache;
pub mod job;
pub mod state;
