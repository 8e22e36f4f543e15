//! The kernel facade
//!
//! `Kernel` is the only way components reach simulation state. Every entry
//! point passes the access gate first. Writes then check authorization and
//! preconditions, and only a fully validated request reaches the mutation
//! resolver, so a rejected call leaves no trace.
//!
//! Focus is set by the scheduler: `begin_turn` hands the kernel to one
//! component, `end_turn` takes it back, and notifications queued during the
//! turn are drained afterwards with `next_notification`.

mod init;
mod mutations;
mod queries;
mod sampling;
mod validate;

use std::any::Any;
use std::cell::RefCell;

use rand_chacha::ChaCha8Rng;

use crate::access::permission::{authorize, ANY_COMPONENT, GLOBAL_ONLY};
use crate::access::{AccessGate, GateState};
use crate::core::config::KernelConfig;
use crate::core::error::{self, fatal, ErrorKind, KernelError};
use crate::core::types::*;
use crate::observation::{Notification, ObservationDispatcher, Topic};
use crate::population::{Filter, PartitionSpec, PopulationIndexManager};
use crate::report::{ReportHub, ReportSink};
use crate::resolver::MutationResolver;
use crate::schedule::plans::{DuePlan, PlanQueue};
use crate::store::Stores;

pub struct Kernel {
    config: KernelConfig,
    stores: Stores,
    indices: PopulationIndexManager,
    dispatcher: ObservationDispatcher,
    reports: ReportHub,
    plans: PlanQueue,
    gate: AccessGate,
    focus: Focus,
    global_components: Vec<ComponentId>,
    /// Shared by every sampling call; borrowed only for the draw itself
    rng: RefCell<ChaCha8Rng>,
}

impl Kernel {
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// The component currently driving the kernel
    pub fn focus(&self) -> &Focus {
        &self.focus
    }

    pub fn gate_state(&self) -> GateState {
        self.gate.state()
    }

    /// Runs a validation against the current state and attaches the
    /// operation and focus to any failure
    fn checked<'k, T>(
        &'k self,
        operation: &'static str,
        check: impl FnOnce(&'k Self) -> Result<T, ErrorKind>,
    ) -> error::Result<T> {
        check(self).map_err(|kind| {
            tracing::debug!(operation, focus = %self.focus, error = %kind, "operation rejected");
            KernelError::new(operation, self.focus.clone(), kind)
        })
    }

    fn resolver(&mut self) -> MutationResolver<'_> {
        let time = self.plans.current_time();
        MutationResolver::new(
            &mut self.stores,
            &mut self.indices,
            &mut self.dispatcher,
            &mut self.reports,
            &self.focus,
            time,
        )
    }

    /// The focused component; the simulation and "no component" have no
    /// identity to own plans or receive notifications
    fn caller(&self) -> Result<ComponentRef, ErrorKind> {
        self.focus
            .component()
            .cloned()
            .ok_or_else(|| ErrorKind::Unauthorized {
                acceptable: ANY_COMPONENT.to_vec(),
            })
    }

    // === TURNS ===

    /// Hands the kernel to `focus` until `end_turn`
    pub fn begin_turn(&mut self, focus: Focus) {
        const OP: &str = "begin_turn";
        if self.focus != Focus::None || self.gate.state() != GateState::Idle {
            fatal(
                OP,
                ErrorKind::AccessViolation(format!(
                    "turn for {} started while {} holds the kernel",
                    focus, self.focus
                )),
            );
        }
        if let Focus::Component(component) = &focus {
            if let Err(kind) = self.check_component(component) {
                fatal(OP, kind);
            }
        }
        tracing::trace!(focus = %focus, "turn started");
        self.focus = focus;
    }

    pub fn end_turn(&mut self) {
        tracing::trace!(focus = %self.focus, "turn ended");
        self.focus = Focus::None;
    }

    /// Next queued notification; only callable between turns
    pub fn next_notification(&mut self) -> Option<Notification> {
        if self.focus != Focus::None {
            fatal(
                "next_notification",
                ErrorKind::AccessViolation(format!("notifications drained during the turn of {}", self.focus)),
            );
        }
        self.dispatcher.pop()
    }

    pub fn pending_notifications(&self) -> usize {
        self.dispatcher.pending()
    }

    // === PLANS ===

    pub fn current_time(&self) -> Time {
        self.plans.current_time()
    }

    pub fn schedule_plan<P: Any>(&mut self, time: Time, payload: P) -> error::Result<()> {
        self.schedule(time, None, Box::new(payload))
    }

    /// A keyed plan can later be cancelled or peeked by its owner
    pub fn schedule_keyed_plan<P: Any>(
        &mut self,
        time: Time,
        key: impl Into<PlanKey>,
        payload: P,
    ) -> error::Result<()> {
        self.schedule(time, Some(key.into()), Box::new(payload))
    }

    fn schedule(&mut self, time: Time, key: Option<PlanKey>, payload: Box<dyn Any>) -> error::Result<()> {
        const OP: &str = "schedule_plan";
        let _gate = self.gate.enter_for_write(OP);
        let owner = self.checked(OP, |kernel| {
            let owner = kernel.caller()?;
            kernel.plans.validate(&owner, time, key.as_ref())?;
            Ok(owner)
        })?;
        if let Err(kind) = self.plans.schedule(owner, time, key, payload) {
            fatal(OP, kind);
        }
        Ok(())
    }

    pub fn cancel_plan(&mut self, key: &PlanKey) -> error::Result<Option<Box<dyn Any>>> {
        const OP: &str = "cancel_plan";
        let _gate = self.gate.enter_for_write(OP);
        let owner = self.checked(OP, Self::caller)?;
        Ok(self.plans.cancel(&owner, key))
    }

    /// A copy of a pending keyed plan and its time; None when there is no
    /// such plan or it holds a different payload type
    pub fn peek_plan<P: Any + Clone>(&self, key: &PlanKey) -> error::Result<Option<(P, Time)>> {
        const OP: &str = "peek_plan";
        let _gate = self.gate.enter_for_read(OP);
        let owner = self.checked(OP, Self::caller)?;
        Ok(self.plans.peek(&owner, key).and_then(|(payload, time)| {
            payload.downcast_ref::<P>().map(|payload| (payload.clone(), time))
        }))
    }

    /// Time of the next pending plan
    pub fn next_plan_time(&mut self) -> Option<Time> {
        self.plans.next_time()
    }

    /// Removes the next plan and advances time to it; only callable between
    /// turns
    pub fn next_plan(&mut self) -> Option<DuePlan> {
        if self.focus != Focus::None {
            fatal(
                "next_plan",
                ErrorKind::AccessViolation(format!("time advanced during the turn of {}", self.focus)),
            );
        }
        self.plans.pop_next()
    }

    pub fn pending_plans(&self) -> usize {
        self.plans.len()
    }

    // === OBSERVATION ===

    /// Subscribes the focused component; false if it already was
    pub fn observe(&mut self, topic: Topic) -> error::Result<bool> {
        const OP: &str = "observe";
        let _gate = self.gate.enter_for_write(OP);
        let component = self.checked(OP, |kernel| {
            let component = kernel.caller()?;
            kernel.check_topic(&topic)?;
            Ok(component)
        })?;
        Ok(self.dispatcher.subscribe(topic, component))
    }

    /// False if the focused component was not subscribed
    pub fn unobserve(&mut self, topic: &Topic) -> error::Result<bool> {
        const OP: &str = "unobserve";
        let _gate = self.gate.enter_for_write(OP);
        let component = self.checked(OP, Self::caller)?;
        Ok(self.dispatcher.unsubscribe(topic, &component))
    }

    // === POPULATION INDICES ===

    pub fn add_population_index(&mut self, key: impl Into<IndexKey>, filter: Filter) -> error::Result<()> {
        const OP: &str = "add_population_index";
        let _gate = self.gate.enter_for_write(OP);
        let key = key.into();
        self.checked(OP, |kernel| {
            authorize(&kernel.focus, ANY_COMPONENT)?;
            kernel.check_free_key(&key)?;
            kernel.check_filter(&filter)
        })?;
        self.resolver().add_index(key, filter);
        Ok(())
    }

    pub fn add_partition(&mut self, key: impl Into<IndexKey>, spec: PartitionSpec) -> error::Result<()> {
        const OP: &str = "add_partition";
        let _gate = self.gate.enter_for_write(OP);
        let key = key.into();
        self.checked(OP, |kernel| {
            authorize(&kernel.focus, ANY_COMPONENT)?;
            kernel.check_free_key(&key)?;
            kernel.check_partition(&spec)
        })?;
        self.resolver().add_partition(key, spec);
        Ok(())
    }

    /// Only the component that created an index or partition may remove it
    pub fn remove_population_index(&mut self, key: &IndexKey) -> error::Result<()> {
        const OP: &str = "remove_population_index";
        let _gate = self.gate.enter_for_write(OP);
        self.checked(OP, |kernel| {
            authorize(&kernel.focus, ANY_COMPONENT)?;
            let owner = kernel.indices.entry(key)?.owner();
            if kernel.focus != Focus::Simulation && owner != &kernel.focus {
                return Err(ErrorKind::NotOwner {
                    key: key.clone(),
                    owner: owner.clone(),
                });
            }
            Ok(())
        })?;
        self.resolver().remove_index(key);
        Ok(())
    }

    // === COMPONENTS AND REPORTS ===

    pub fn register_global_component(&mut self, component: impl Into<ComponentId>) -> error::Result<()> {
        const OP: &str = "add_global_component";
        let _gate = self.gate.enter_for_write(OP);
        let component = component.into();
        self.checked(OP, |kernel| {
            authorize(&kernel.focus, GLOBAL_ONLY)?;
            if kernel.global_components.contains(&component) {
                return Err(ErrorKind::DuplicateComponent(component.clone()));
            }
            Ok(())
        })?;
        tracing::debug!(component = %component, "global component registered");
        self.global_components.push(component);
        Ok(())
    }

    pub fn attach_report_sink(&mut self, sink: Box<dyn ReportSink>) {
        self.reports.attach(sink);
    }

    pub fn flush_reports(&mut self) {
        self.reports.flush();
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("focus", &self.focus)
            .field("time", &self.plans.current_time())
            .field("population", &self.stores.people.live_count())
            .field("indices", &self.indices.len())
            .field("pending_notifications", &self.dispatcher.pending())
            .finish()
    }
}
