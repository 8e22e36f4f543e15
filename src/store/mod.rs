//! Dense state containers
//!
//! Structure of arrays keyed by small integer slots: every per-entity
//! column is indexed by the entity's slot, and closed id sets (regions,
//! compartments, resources, ...) are mapped to slots once at load.

pub mod column;
pub mod groups;
pub mod location;
pub mod materials;
pub mod property;
pub mod resources;
pub mod slots;

pub use groups::GroupStore;
pub use location::{LocationStore, PopulationCounter};
pub use materials::{BatchRecord, MaterialsStore, StageRecord};
pub use property::{Mutability, PropertyDefinition, PropertyStore, TimeTracking};
pub use resources::{HolderKind, ResourceLevels, ResourceStore};
pub use slots::{IdMap, SlotAllocator, SlotVec};

use crate::core::error::ErrorKind;
use crate::core::types::*;
use crate::core::value::PropertyValue;
use crate::population::filter::PersonView;

/// Every store the kernel owns, reachable only through the kernel
#[derive(Debug, Clone)]
pub struct Stores {
    pub people: SlotAllocator,
    pub population: PopulationCounter,
    pub regions: IdMap<RegionId>,
    pub compartments: IdMap<CompartmentId>,
    pub region_locations: LocationStore,
    pub compartment_locations: LocationStore,
    pub global_properties: PropertyStore,
    pub region_properties: PropertyStore,
    pub compartment_properties: PropertyStore,
    pub person_properties: PropertyStore,
    pub group_properties: PropertyStore,
    pub batch_properties: PropertyStore,
    pub producer_properties: PropertyStore,
    pub resource_properties: PropertyStore,
    pub groups: GroupStore,
    pub resources: ResourceStore,
    pub materials: MaterialsStore,
}

impl Stores {
    #[inline]
    pub fn person_exists(&self, person: PersonId) -> bool {
        self.people.is_live(person.index())
    }

    pub fn require_person(&self, person: PersonId) -> Result<(), ErrorKind> {
        if self.person_exists(person) {
            Ok(())
        } else {
            Err(ErrorKind::UnknownPerson(person))
        }
    }

    pub fn region_slot(&self, region: RegionId) -> Result<usize, ErrorKind> {
        self.regions
            .slot(region)
            .ok_or(ErrorKind::UnknownRegion(region))
    }

    pub fn compartment_slot(&self, compartment: CompartmentId) -> Result<usize, ErrorKind> {
        self.compartments
            .slot(compartment)
            .ok_or(ErrorKind::UnknownCompartment(compartment))
    }

    pub fn producer_slot(&self, producer: MaterialsProducerId) -> Result<usize, ErrorKind> {
        self.materials
            .producer_slot(producer)
            .ok_or(ErrorKind::UnknownMaterialsProducer(producer))
    }

    pub fn resource_slot(&self, resource: ResourceId) -> Result<usize, ErrorKind> {
        self.resources
            .slot(resource)
            .ok_or(ErrorKind::UnknownResource(resource))
    }

    pub fn require_group(&self, group: GroupId) -> Result<GroupTypeId, ErrorKind> {
        self.groups
            .group_type(group)
            .ok_or(ErrorKind::UnknownGroup(group))
    }

    pub fn require_group_type(&self, group_type: GroupTypeId) -> Result<(), ErrorKind> {
        if self.groups.has_group_type(group_type) {
            Ok(())
        } else {
            Err(ErrorKind::UnknownGroupType(group_type))
        }
    }

    pub fn person_region(&self, person: PersonId) -> Option<RegionId> {
        self.region_locations
            .location_of(person)
            .map(|slot| self.regions.id(slot))
    }

    pub fn person_compartment(&self, person: PersonId) -> Option<CompartmentId> {
        self.compartment_locations
            .location_of(person)
            .map(|slot| self.compartments.id(slot))
    }

    pub fn live_people(&self) -> impl Iterator<Item = PersonId> + '_ {
        self.people.iter_live().map(PersonId)
    }

    /// Dense slot of a property-bearing entity, checking that it exists
    pub fn property_slot(&self, target: &PropertyTarget) -> Result<usize, ErrorKind> {
        match *target {
            PropertyTarget::Global => Ok(0),
            PropertyTarget::Region(region) => self.region_slot(region),
            PropertyTarget::Compartment(compartment) => self.compartment_slot(compartment),
            PropertyTarget::Person(person) => {
                self.require_person(person)?;
                Ok(person.index())
            }
            PropertyTarget::Group(group) => {
                self.require_group(group)?;
                Ok(group.index())
            }
            PropertyTarget::Batch(batch) => {
                self.materials.batch(batch)?;
                Ok(batch.index())
            }
            PropertyTarget::MaterialsProducer(producer) => self.producer_slot(producer),
            PropertyTarget::Resource(resource) => self.resource_slot(resource),
        }
    }

    /// Property store for an entity kind; stages carry no properties
    pub fn properties(&self, kind: EntityKind) -> Option<&PropertyStore> {
        match kind {
            EntityKind::Global => Some(&self.global_properties),
            EntityKind::Region => Some(&self.region_properties),
            EntityKind::Compartment => Some(&self.compartment_properties),
            EntityKind::Person => Some(&self.person_properties),
            EntityKind::Group => Some(&self.group_properties),
            EntityKind::Batch => Some(&self.batch_properties),
            EntityKind::MaterialsProducer => Some(&self.producer_properties),
            EntityKind::Resource => Some(&self.resource_properties),
            EntityKind::Stage => None,
        }
    }

    pub fn properties_mut(&mut self, kind: EntityKind) -> Option<&mut PropertyStore> {
        match kind {
            EntityKind::Global => Some(&mut self.global_properties),
            EntityKind::Region => Some(&mut self.region_properties),
            EntityKind::Compartment => Some(&mut self.compartment_properties),
            EntityKind::Person => Some(&mut self.person_properties),
            EntityKind::Group => Some(&mut self.group_properties),
            EntityKind::Batch => Some(&mut self.batch_properties),
            EntityKind::MaterialsProducer => Some(&mut self.producer_properties),
            EntityKind::Resource => Some(&mut self.resource_properties),
            EntityKind::Stage => None,
        }
    }

    /// Store kind and slot of a resource holder
    pub fn holder_slot(&self, holder: Holder) -> Result<(HolderKind, usize), ErrorKind> {
        match holder {
            Holder::Person(person) => {
                self.require_person(person)?;
                Ok((HolderKind::Person, person.index()))
            }
            Holder::Region(region) => Ok((HolderKind::Region, self.region_slot(region)?)),
            Holder::MaterialsProducer(producer) => {
                Ok((HolderKind::Producer, self.producer_slot(producer)?))
            }
        }
    }

    pub fn holder_level(&self, holder: Holder, resource: ResourceId) -> Result<u64, ErrorKind> {
        let (kind, slot) = self.holder_slot(holder)?;
        self.resource_slot(resource)?;
        Ok(self.resources.level(kind, resource, slot))
    }
}

impl PersonView for Stores {
    fn property(&self, person: PersonId, property: &PropertyId) -> Option<PropertyValue> {
        self.person_properties.value(person.index(), property)
    }

    fn region(&self, person: PersonId) -> Option<RegionId> {
        self.person_region(person)
    }

    fn compartment(&self, person: PersonId) -> Option<CompartmentId> {
        self.person_compartment(person)
    }

    fn resource_level(&self, person: PersonId, resource: ResourceId) -> u64 {
        self.resources
            .level(HolderKind::Person, resource, person.index())
    }

    fn is_group_member(&self, person: PersonId, group: GroupId) -> bool {
        self.groups.is_member(person, group)
    }

    fn group_type_count(&self, person: PersonId, group_type: GroupTypeId) -> usize {
        self.groups.type_count_for_person(person, group_type)
    }
}
