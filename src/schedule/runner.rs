//! Minimal turn-based driver
//!
//! Each plan runs in its owner's turn. After every turn the notification
//! queue is drained in FIFO order, each delivery in the recipient's own
//! turn, until it is empty.

use std::any::Any;

use ahash::AHashMap;

use crate::core::error::Result;
use crate::core::types::{ComponentRef, Focus, Time};
use crate::kernel::Kernel;
use crate::observation::Notification;

/// Behavior attached to one component identity
pub trait Component {
    /// Runs once in the component's turn before any plan
    fn init(&mut self, _kernel: &mut Kernel) -> Result<()> {
        Ok(())
    }

    fn execute_plan(&mut self, kernel: &mut Kernel, plan: Box<dyn Any>) -> Result<()>;

    fn observe(&mut self, _kernel: &mut Kernel, _notification: &Notification) -> Result<()> {
        Ok(())
    }
}

pub struct Simulation {
    kernel: Kernel,
    slots: AHashMap<ComponentRef, usize>,
    components: Vec<(ComponentRef, Box<dyn Component>)>,
}

impl Simulation {
    pub fn new(kernel: Kernel) -> Self {
        Self {
            kernel,
            slots: AHashMap::new(),
            components: Vec::new(),
        }
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn kernel_mut(&mut self) -> &mut Kernel {
        &mut self.kernel
    }

    pub fn into_kernel(self) -> Kernel {
        self.kernel
    }

    /// Attaches behavior to a component; global components are registered
    /// with the kernel when they are not already known
    pub fn add_component(&mut self, identity: ComponentRef, component: Box<dyn Component>) -> Result<()> {
        if let ComponentRef::Global(id) = &identity {
            if !self.kernel.global_component_ids().contains(id) {
                self.kernel.begin_turn(Focus::Simulation);
                let registered = self.kernel.register_global_component(id.clone());
                self.kernel.end_turn();
                registered?;
            }
        }
        match self.slots.get(&identity) {
            Some(&slot) => self.components[slot].1 = component,
            None => {
                self.slots.insert(identity.clone(), self.components.len());
                self.components.push((identity, component));
            }
        }
        Ok(())
    }

    /// Runs every component's `init` in registration order
    pub fn init(&mut self) -> Result<()> {
        for slot in 0..self.components.len() {
            let (identity, component) = &mut self.components[slot];
            self.kernel.begin_turn(Focus::Component(identity.clone()));
            let result = component.init(&mut self.kernel);
            self.kernel.end_turn();
            result?;
            self.drain()?;
        }
        Ok(())
    }

    /// Executes the next plan; false when none remain
    pub fn step(&mut self) -> Result<bool> {
        let Some(plan) = self.kernel.next_plan() else {
            return Ok(false);
        };
        match self.slots.get(&plan.owner) {
            Some(&slot) => {
                let component = &mut self.components[slot].1;
                self.kernel.begin_turn(Focus::Component(plan.owner));
                let result = component.execute_plan(&mut self.kernel, plan.payload);
                self.kernel.end_turn();
                result?;
            }
            None => tracing::warn!(owner = %plan.owner, time = plan.time, "plan owner has no behavior"),
        }
        self.drain()?;
        Ok(true)
    }

    /// Steps until no plan remains; returns the number executed
    pub fn run(&mut self) -> Result<usize> {
        let mut executed = 0;
        while self.step()? {
            executed += 1;
        }
        Ok(executed)
    }

    /// Steps through every plan due at or before `end`
    pub fn run_until(&mut self, end: Time) -> Result<usize> {
        let mut executed = 0;
        while self.kernel.next_plan_time().is_some_and(|time| time <= end) {
            self.step()?;
            executed += 1;
        }
        Ok(executed)
    }

    fn drain(&mut self) -> Result<()> {
        while let Some(notification) = self.kernel.next_notification() {
            let Some(&slot) = self.slots.get(&notification.recipient) else {
                tracing::trace!(recipient = %notification.recipient, "notification without behavior dropped");
                continue;
            };
            let component = &mut self.components[slot].1;
            self.kernel
                .begin_turn(Focus::Component(notification.recipient.clone()));
            let result = component.observe(&mut self.kernel, &notification);
            self.kernel.end_turn();
            result?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("kernel", &self.kernel)
            .field("components", &self.components.len())
            .finish()
    }
}
