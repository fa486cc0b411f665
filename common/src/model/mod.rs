pub mod analysis;
pub mod history;
pub mod issue;
pub mod rule_set;
