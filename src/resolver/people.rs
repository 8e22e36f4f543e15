//! Person lifecycle and placement

use super::{settle, MutationResolver};
use crate::core::error::{fatal, ErrorKind};
use crate::core::types::*;
use crate::observation::{GroupScope, Observation, PersonScope, ScopedEntity, Topic};
use crate::population::Attribute;
use crate::report::ReportItem;
use crate::scenario::PersonSeed;
use crate::store::HolderKind;

impl<'a> MutationResolver<'a> {
    pub fn add_person(&mut self, seed: &PersonSeed) -> PersonId {
        const OP: &str = "add_person";
        let time = self.time;
        let region_slot = settle(OP, self.stores.region_slot(seed.region));
        let compartment_slot = settle(OP, self.stores.compartment_slot(seed.compartment));

        let slot = self.stores.people.allocate();
        let person = PersonId(slot);
        if !self.stores.region_locations.place(person, region_slot, time)
            || !self
                .stores
                .compartment_locations
                .place(person, compartment_slot, time)
        {
            fatal(
                OP,
                ErrorKind::Inconsistent(format!("recycled person slot {} is still placed", slot)),
            );
        }
        self.stores.population.increment(time);

        for (property, value) in &seed.properties {
            settle(OP, self.stores.person_properties.set(slot, property, value, time));
        }
        for &(resource, amount) in &seed.resources {
            if amount == 0 {
                continue;
            }
            let levels = match self.stores.resources.levels_mut(HolderKind::Person, resource) {
                Some(levels) => levels,
                None => fatal(OP, ErrorKind::UnknownResource(resource)),
            };
            settle(OP, levels.add(slot, amount, time));
        }

        self.indices.on_person_added(&*self.stores, person);

        let (region, compartment) = (seed.region, seed.compartment);
        self.publish(
            &[
                Topic::PersonAddition(PersonScope::All),
                Topic::PersonAddition(PersonScope::Region(region)),
                Topic::PersonAddition(PersonScope::Compartment(compartment)),
            ],
            || Observation::PersonAdded { person },
        );
        self.report(|| ReportItem::PersonAdded {
            person,
            region,
            compartment,
        });
        tracing::debug!(person = %person, region = %region, compartment = %compartment, "person added");
        person
    }

    /// Removes a person and every trace of them: location, properties,
    /// resources, group memberships, index entries and person-scoped
    /// subscriptions
    pub fn remove_person(&mut self, person: PersonId) {
        const OP: &str = "remove_person";
        let time = self.time;
        let slot = person.index();
        let (region, compartment) = self.location(OP, person);
        let snapshot = self.reports.is_active().then(|| {
            (
                self.stores.person_properties.snapshot(slot),
                self.stores.resources.person_snapshot(slot),
            )
        });

        let groups = self.stores.groups.remove_person(person);
        self.stores.region_locations.displace(person, time);
        self.stores.compartment_locations.displace(person, time);
        self.stores.population.decrement(time);
        self.stores.person_properties.reset_slot(slot);
        self.stores.resources.clear_person(slot);
        self.indices.on_person_removed(person);
        if !self.stores.people.release(slot) {
            fatal(OP, ErrorKind::UnknownPerson(person));
        }

        for &group in &groups {
            let group_type = settle(OP, self.stores.require_group(group));
            self.publish(
                &[
                    Topic::GroupMembership(GroupScope::All),
                    Topic::GroupMembership(GroupScope::GroupType(group_type)),
                    Topic::GroupMembership(GroupScope::Group(group)),
                ],
                || Observation::GroupMembership {
                    group,
                    person,
                    joined: false,
                },
            );
        }
        self.publish(
            &[
                Topic::PersonRemoval(PersonScope::All),
                Topic::PersonRemoval(PersonScope::Region(region)),
                Topic::PersonRemoval(PersonScope::Compartment(compartment)),
                Topic::PersonRemoval(PersonScope::Person(person)),
            ],
            || Observation::PersonRemoved {
                person,
                region,
                compartment,
            },
        );
        self.dispatcher.purge(ScopedEntity::Person(person));

        self.report(|| {
            let (properties, resources) = snapshot.unwrap_or_default();
            ReportItem::PersonRemoved {
                person,
                region,
                compartment,
                properties,
                resources,
                groups,
            }
        });
        tracing::debug!(person = %person, "person removed");
    }

    pub fn set_person_region(&mut self, person: PersonId, region: RegionId) {
        const OP: &str = "set_person_region";
        let bucket = settle(OP, self.stores.region_slot(region));
        let previous_slot = match self.stores.region_locations.relocate(person, bucket, self.time) {
            Some(slot) => slot,
            None => fatal(OP, ErrorKind::UnknownPerson(person)),
        };
        let previous = self.stores.regions.id(previous_slot);
        self.person_changed(person, &Attribute::Region);

        let (_, compartment) = self.location(OP, person);
        self.publish(
            &[
                Topic::PersonRegion(PersonScope::All),
                Topic::PersonRegion(PersonScope::Region(previous)),
                Topic::PersonRegion(PersonScope::Region(region)),
                Topic::PersonRegion(PersonScope::Compartment(compartment)),
                Topic::PersonRegion(PersonScope::Person(person)),
            ],
            || Observation::PersonRegion {
                person,
                previous,
                current: region,
            },
        );
        self.report(|| ReportItem::RegionChanged {
            person,
            previous,
            current: region,
        });
    }

    pub fn set_person_compartment(&mut self, person: PersonId, compartment: CompartmentId) {
        const OP: &str = "set_person_compartment";
        let bucket = settle(OP, self.stores.compartment_slot(compartment));
        let previous_slot = match self
            .stores
            .compartment_locations
            .relocate(person, bucket, self.time)
        {
            Some(slot) => slot,
            None => fatal(OP, ErrorKind::UnknownPerson(person)),
        };
        let previous = self.stores.compartments.id(previous_slot);
        self.person_changed(person, &Attribute::Compartment);

        let (region, _) = self.location(OP, person);
        self.publish(
            &[
                Topic::PersonCompartment(PersonScope::All),
                Topic::PersonCompartment(PersonScope::Compartment(previous)),
                Topic::PersonCompartment(PersonScope::Compartment(compartment)),
                Topic::PersonCompartment(PersonScope::Region(region)),
                Topic::PersonCompartment(PersonScope::Person(person)),
            ],
            || Observation::PersonCompartment {
                person,
                previous,
                current: compartment,
            },
        );
        self.report(|| ReportItem::CompartmentChanged {
            person,
            previous,
            current: compartment,
        });
    }
}
