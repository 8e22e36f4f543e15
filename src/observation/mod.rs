//! Publish/subscribe between components with deferred delivery

pub mod dispatcher;
pub mod topic;

pub use dispatcher::{DispatchState, Notification, ObservationDispatcher};
pub use topic::{GroupScope, Observation, PersonScope, ScopedEntity, StageScope, Topic};
