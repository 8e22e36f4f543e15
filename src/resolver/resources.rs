//! Resource levels and transfers

use super::{settle, MutationResolver};
use crate::core::error::{fatal, ErrorKind};
use crate::core::types::*;
use crate::observation::{Observation, Topic};
use crate::population::Attribute;
use crate::report::ReportItem;

#[derive(Debug, Clone, Copy)]
enum Direction {
    Credit,
    Debit,
}

impl<'a> MutationResolver<'a> {
    /// Applies one level change and brings indices up to date; returns the
    /// (previous, current) levels. Publishes nothing.
    fn apply_level(
        &mut self,
        operation: &'static str,
        holder: Holder,
        resource: ResourceId,
        amount: u64,
        direction: Direction,
    ) -> (u64, u64) {
        let (kind, slot) = settle(operation, self.stores.holder_slot(holder));
        let time = self.time;
        let levels = match self.stores.resources.levels_mut(kind, resource) {
            Some(levels) => levels,
            None => fatal(operation, ErrorKind::UnknownResource(resource)),
        };
        let previous = levels.get(slot);
        let current = match direction {
            Direction::Credit => settle(operation, levels.add(slot, amount, time)),
            Direction::Debit => settle(operation, levels.remove(slot, amount, time)),
        };
        if let Holder::Person(person) = holder {
            self.person_changed(person, &Attribute::Resource(resource));
        }
        (previous, current)
    }

    fn announce_level(
        &mut self,
        operation: &'static str,
        holder: Holder,
        resource: ResourceId,
        previous: u64,
        current: u64,
    ) {
        match holder {
            Holder::Person(person) => {
                let topics = self
                    .person_scopes(operation, person)
                    .map(|scope| Topic::PersonResource(scope, resource));
                self.publish(&topics, || Observation::PersonResource {
                    person,
                    resource,
                    previous,
                    current,
                });
            }
            Holder::Region(region) => {
                self.publish(&[Topic::RegionResource(region, resource)], || {
                    Observation::RegionResource {
                        region,
                        resource,
                        previous,
                        current,
                    }
                });
            }
            Holder::MaterialsProducer(producer) => {
                self.publish(&[Topic::ProducerResource(producer, resource)], || {
                    Observation::ProducerResource {
                        producer,
                        resource,
                        previous,
                        current,
                    }
                });
            }
        }
    }

    fn change_level(
        &mut self,
        operation: &'static str,
        holder: Holder,
        resource: ResourceId,
        amount: u64,
        direction: Direction,
    ) {
        let (previous, current) = self.apply_level(operation, holder, resource, amount, direction);
        self.announce_level(operation, holder, resource, previous, current);
        self.report(|| ReportItem::ResourceChanged {
            holder,
            resource,
            previous,
            current,
        });
    }

    pub fn add_resource(&mut self, holder: Holder, resource: ResourceId, amount: u64) {
        self.change_level("add_resource", holder, resource, amount, Direction::Credit);
    }

    pub fn remove_resource(&mut self, holder: Holder, resource: ResourceId, amount: u64) {
        self.change_level("remove_resource", holder, resource, amount, Direction::Debit);
    }

    /// Debits `from` and credits `to`; both levels are final before either
    /// holder's observers are notified
    pub fn transfer_resource(&mut self, resource: ResourceId, from: Holder, to: Holder, amount: u64) {
        const OP: &str = "transfer_resource";
        let (from_previous, from_current) =
            self.apply_level(OP, from, resource, amount, Direction::Debit);
        let (to_previous, to_current) = self.apply_level(OP, to, resource, amount, Direction::Credit);

        self.announce_level(OP, from, resource, from_previous, from_current);
        self.announce_level(OP, to, resource, to_previous, to_current);
        self.report(|| ReportItem::ResourceTransferred {
            resource,
            from,
            to,
            amount,
        });
    }
}
