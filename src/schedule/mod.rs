//! Plans and the turn loop that executes them

pub mod plans;
pub mod runner;

pub use plans::{DuePlan, PlanQueue};
pub use runner::{Component, Simulation};
