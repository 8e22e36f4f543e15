//! Compartment Kernel - state kernel for agent-based compartmental simulations
//!
//! Components never touch state directly. They hold focus for one turn at a
//! time and go through [`Kernel`], which gates access, checks permissions
//! and preconditions, applies mutations through a single resolver, keeps
//! population indices current and queues notifications for delivery after
//! the turn.

pub mod access;
pub mod core;
pub mod kernel;
pub mod observation;
pub mod population;
pub mod report;
pub mod resolver;
pub mod scenario;
pub mod schedule;
pub mod store;

pub use crate::core::error::{ErrorCategory, ErrorKind, KernelError, Result};
pub use crate::core::types::*;
pub use crate::core::value::{PropertyValue, ValueType};
pub use crate::core::{KernelConfig, ReverseIndexPolicy};
pub use kernel::Kernel;
pub use population::{Comparison, Dimension, DimensionSource, Filter, Label, LabelQuery, PartitionSpec};
pub use report::{JsonLinesReport, MemoryReport, ReportEntry, ReportItem, ReportSink};
pub use scenario::{PersonSeed, PropertySchema, Scenario, ScenarioError};
pub use schedule::{Component, Simulation};
