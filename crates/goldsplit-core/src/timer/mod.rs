mod attempt;
mod manager;

pub use attempt::{Attempt, AttemptMode};
pub use manager::RunManager;
