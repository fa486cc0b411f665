//! Client-side progress estimation for running analyses.

mod estimator;
mod format;
mod schedule;

pub use estimator::{Eta, EtaStrategy, EtaTuning, ProgressEstimator};
pub use format::format_eta;
pub use schedule::PollSchedule;
