//! Mutation resolver: the only code that writes kernel state
//!
//! Each operation follows the same pattern: capture the before values the
//! notification and report need, apply every store update, bring indices
//! up to date, then enqueue notifications and emit one report item.
//! Preconditions are checked by the kernel before a resolver is built, so a
//! store rejecting an update here is a defect and ends the run.

mod groups;
mod materials;
mod people;
mod resources;

use crate::core::error::{fatal, ErrorKind};
use crate::core::types::*;
use crate::core::value::PropertyValue;
use crate::observation::{GroupScope, Observation, ObservationDispatcher, PersonScope, Topic};
use crate::population::{Attribute, Filter, IndexEntry, PartitionSpec, PopulationIndexManager};
use crate::report::{ReportHub, ReportItem};
use crate::store::Stores;

/// Unwraps a store result the kernel already validated
pub(crate) fn settle<T>(operation: &'static str, result: Result<T, ErrorKind>) -> T {
    match result {
        Ok(value) => value,
        Err(kind) => fatal(operation, kind),
    }
}

pub struct MutationResolver<'a> {
    stores: &'a mut Stores,
    indices: &'a mut PopulationIndexManager,
    dispatcher: &'a mut ObservationDispatcher,
    reports: &'a mut ReportHub,
    focus: &'a Focus,
    time: Time,
}

impl<'a> MutationResolver<'a> {
    pub fn new(
        stores: &'a mut Stores,
        indices: &'a mut PopulationIndexManager,
        dispatcher: &'a mut ObservationDispatcher,
        reports: &'a mut ReportHub,
        focus: &'a Focus,
        time: Time,
    ) -> Self {
        Self {
            stores,
            indices,
            dispatcher,
            reports,
            focus,
            time,
        }
    }

    /// Current region and compartment of a live person
    fn location(&self, operation: &'static str, person: PersonId) -> (RegionId, CompartmentId) {
        match (
            self.stores.person_region(person),
            self.stores.person_compartment(person),
        ) {
            (Some(region), Some(compartment)) => (region, compartment),
            _ => fatal(
                operation,
                ErrorKind::Inconsistent(format!("person {} has no location", person)),
            ),
        }
    }

    /// The person-level scopes a change to `person` is visible under
    fn person_scopes(&self, operation: &'static str, person: PersonId) -> [PersonScope; 4] {
        let (region, compartment) = self.location(operation, person);
        [
            PersonScope::All,
            PersonScope::Region(region),
            PersonScope::Compartment(compartment),
            PersonScope::Person(person),
        ]
    }

    fn group_scopes(&self, operation: &'static str, group: GroupId) -> [GroupScope; 3] {
        let group_type = settle(operation, self.stores.require_group(group));
        [
            GroupScope::All,
            GroupScope::GroupType(group_type),
            GroupScope::Group(group),
        ]
    }

    fn publish(&mut self, topics: &[Topic], observation: impl FnOnce() -> Observation) {
        self.dispatcher.publish(self.focus, topics, observation);
    }

    fn report(&mut self, item: impl FnOnce() -> ReportItem) {
        self.reports.emit(self.time, item);
    }

    fn person_changed(&mut self, person: PersonId, attribute: &Attribute) {
        self.indices
            .on_attribute_changed(&*self.stores, person, attribute);
    }

    /// Writes one property value and notifies every granularity that covers
    /// the target
    pub fn set_property(&mut self, target: PropertyTarget, property: &PropertyId, value: &PropertyValue) {
        const OP: &str = "set_property";
        let slot = settle(OP, self.stores.property_slot(&target));
        let time = self.time;
        let store = match self.stores.properties_mut(target.kind()) {
            Some(store) => store,
            None => fatal(OP, ErrorKind::Inconsistent(format!("no property store for {}", target.kind()))),
        };
        let previous = settle(OP, store.set(slot, property, value, time));
        tracing::trace!(?target, property = %property, value = %value, "property set");

        if let PropertyTarget::Person(person) = target {
            self.person_changed(person, &Attribute::Property(property.clone()));
        }

        let current = value.clone();
        let before = previous.clone();
        let id = property.clone();
        match target {
            PropertyTarget::Global => self.publish(&[Topic::GlobalProperty(id.clone())], || {
                Observation::GlobalProperty {
                    property: id,
                    previous: before,
                    current,
                }
            }),
            PropertyTarget::Region(region) => {
                self.publish(&[Topic::RegionProperty(region, id.clone())], || {
                    Observation::RegionProperty {
                        region,
                        property: id,
                        previous: before,
                        current,
                    }
                })
            }
            PropertyTarget::Compartment(compartment) => {
                self.publish(&[Topic::CompartmentProperty(compartment, id.clone())], || {
                    Observation::CompartmentProperty {
                        compartment,
                        property: id,
                        previous: before,
                        current,
                    }
                })
            }
            PropertyTarget::Person(person) => {
                let topics = self
                    .person_scopes(OP, person)
                    .map(|scope| Topic::PersonProperty(scope, id.clone()));
                self.publish(&topics, || Observation::PersonProperty {
                    person,
                    property: id,
                    previous: before,
                    current,
                })
            }
            PropertyTarget::Group(group) => {
                let topics = self
                    .group_scopes(OP, group)
                    .map(|scope| Topic::GroupProperty(scope, id.clone()));
                self.publish(&topics, || Observation::GroupProperty {
                    group,
                    property: id,
                    previous: before,
                    current,
                })
            }
            PropertyTarget::Batch(_) => {}
            PropertyTarget::MaterialsProducer(producer) => {
                self.publish(&[Topic::ProducerProperty(producer, id.clone())], || {
                    Observation::ProducerProperty {
                        producer,
                        property: id,
                        previous: before,
                        current,
                    }
                })
            }
            PropertyTarget::Resource(resource) => {
                self.publish(&[Topic::ResourceProperty(resource, id.clone())], || {
                    Observation::ResourceProperty {
                        resource,
                        property: id,
                        previous: before,
                        current,
                    }
                })
            }
        }

        self.report(|| ReportItem::PropertyAssigned {
            target,
            property: property.clone(),
            previous,
            current: value.clone(),
        });
    }

    pub fn add_index(&mut self, key: IndexKey, filter: Filter) {
        const OP: &str = "add_population_index";
        let people: Vec<PersonId> = self.stores.live_people().collect();
        settle(
            OP,
            self.indices
                .add_index(key.clone(), self.focus.clone(), filter, &*self.stores, people),
        );
        let size = settle(OP, self.indices.entry(&key)).len();
        self.report(|| ReportItem::IndexAdded {
            key,
            partition: false,
            size,
        });
    }

    pub fn add_partition(&mut self, key: IndexKey, spec: PartitionSpec) {
        const OP: &str = "add_partition";
        let people: Vec<PersonId> = self.stores.live_people().collect();
        settle(
            OP,
            self.indices
                .add_partition(key.clone(), self.focus.clone(), spec, &*self.stores, people),
        );
        let size = settle(OP, self.indices.entry(&key)).len();
        self.report(|| ReportItem::IndexAdded {
            key,
            partition: true,
            size,
        });
    }

    pub fn remove_index(&mut self, key: &IndexKey) -> IndexEntry {
        let entry = settle("remove_population_index", self.indices.remove(key));
        self.report(|| ReportItem::IndexRemoved { key: key.clone() });
        entry
    }
}
