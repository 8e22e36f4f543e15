//! Access discipline: the reentrancy gate and the permission rules

pub mod gate;
pub mod permission;

pub use gate::{AccessGate, GateState, ReadGuard, WriteGuard};
pub use permission::{authorize, Scope};
