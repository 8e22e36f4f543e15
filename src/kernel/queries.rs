//! Read-only entry points
//!
//! Queries never mutate and may nest: a weighting function evaluated during
//! a draw can itself call any of them.

use super::Kernel;
use crate::core::error::{self, ErrorKind};
use crate::core::types::*;
use crate::core::value::PropertyValue;
use crate::observation::Topic;
use crate::population::{Label, LabelQuery};
use crate::store::{BatchRecord, StageRecord};

impl Kernel {
    // === POPULATION ===

    pub fn population_count(&self) -> usize {
        let _gate = self.gate.enter_for_read("population_count");
        self.stores.population.count
    }

    /// Time of the last addition or removal
    pub fn population_time(&self) -> Time {
        let _gate = self.gate.enter_for_read("population_time");
        self.stores.population.last_change
    }

    pub fn person_exists(&self, person: PersonId) -> bool {
        let _gate = self.gate.enter_for_read("person_exists");
        self.stores.person_exists(person)
    }

    /// Every live person in slot order
    pub fn person_ids(&self) -> Vec<PersonId> {
        let _gate = self.gate.enter_for_read("person_ids");
        self.stores.live_people().collect()
    }

    // === CLOSED IDENTIFIER SETS ===

    pub fn region_ids(&self) -> &[RegionId] {
        self.stores.regions.ids()
    }

    pub fn compartment_ids(&self) -> &[CompartmentId] {
        self.stores.compartments.ids()
    }

    pub fn resource_ids(&self) -> &[ResourceId] {
        self.stores.resources.resource_ids()
    }

    pub fn material_ids(&self) -> &[MaterialId] {
        self.stores.materials.material_ids()
    }

    pub fn producer_ids(&self) -> &[MaterialsProducerId] {
        self.stores.materials.producer_ids()
    }

    pub fn group_type_ids(&self) -> &[GroupTypeId] {
        self.stores.groups.group_type_ids()
    }

    pub fn global_component_ids(&self) -> &[ComponentId] {
        &self.global_components
    }

    // === LOCATION ===

    pub fn person_region(&self, person: PersonId) -> error::Result<RegionId> {
        const OP: &str = "person_region";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| kernel.located(person, kernel.stores.person_region(person)))
    }

    pub fn person_compartment(&self, person: PersonId) -> error::Result<CompartmentId> {
        const OP: &str = "person_compartment";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| {
            kernel.located(person, kernel.stores.person_compartment(person))
        })
    }

    fn located<T>(&self, person: PersonId, location: Option<T>) -> Result<T, ErrorKind> {
        self.stores.require_person(person)?;
        location.ok_or_else(|| ErrorKind::Inconsistent(format!("person {} has no location", person)))
    }

    /// None unless arrival times are tracked for regions
    pub fn person_region_arrival_time(&self, person: PersonId) -> error::Result<Option<Time>> {
        const OP: &str = "person_region_arrival_time";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| {
            kernel.stores.require_person(person)?;
            Ok(kernel.stores.region_locations.arrival_time(person))
        })
    }

    /// None unless arrival times are tracked for compartments
    pub fn person_compartment_arrival_time(&self, person: PersonId) -> error::Result<Option<Time>> {
        const OP: &str = "person_compartment_arrival_time";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| {
            kernel.stores.require_person(person)?;
            Ok(kernel.stores.compartment_locations.arrival_time(person))
        })
    }

    pub fn region_population_count(&self, region: RegionId) -> error::Result<usize> {
        const OP: &str = "region_population_count";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| {
            let slot = kernel.stores.region_slot(region)?;
            Ok(kernel.stores.region_locations.count(slot))
        })
    }

    /// Time the region's population last changed
    pub fn region_population_time(&self, region: RegionId) -> error::Result<Time> {
        const OP: &str = "region_population_time";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| {
            let slot = kernel.stores.region_slot(region)?;
            Ok(kernel.stores.region_locations.counter(slot).last_change)
        })
    }

    pub fn compartment_population_count(&self, compartment: CompartmentId) -> error::Result<usize> {
        const OP: &str = "compartment_population_count";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| {
            let slot = kernel.stores.compartment_slot(compartment)?;
            Ok(kernel.stores.compartment_locations.count(slot))
        })
    }

    pub fn compartment_population_time(&self, compartment: CompartmentId) -> error::Result<Time> {
        const OP: &str = "compartment_population_time";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| {
            let slot = kernel.stores.compartment_slot(compartment)?;
            Ok(kernel.stores.compartment_locations.counter(slot).last_change)
        })
    }

    pub fn people_in_region(&self, region: RegionId) -> error::Result<Vec<PersonId>> {
        const OP: &str = "people_in_region";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| {
            let slot = kernel.stores.region_slot(region)?;
            Ok(kernel.stores.region_locations.members(slot))
        })
    }

    pub fn people_in_compartment(&self, compartment: CompartmentId) -> error::Result<Vec<PersonId>> {
        const OP: &str = "people_in_compartment";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| {
            let slot = kernel.stores.compartment_slot(compartment)?;
            Ok(kernel.stores.compartment_locations.members(slot))
        })
    }

    // === PROPERTIES ===

    pub fn property(&self, target: PropertyTarget, property: &PropertyId) -> error::Result<PropertyValue> {
        const OP: &str = "property";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| {
            let slot = kernel.stores.property_slot(&target)?;
            kernel.property_store(target.kind(), property)?.get(slot, property)
        })
    }

    /// Time of the last write; None when the property is untracked or was
    /// never written
    pub fn property_time(&self, target: PropertyTarget, property: &PropertyId) -> error::Result<Option<Time>> {
        const OP: &str = "property_time";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| {
            let slot = kernel.stores.property_slot(&target)?;
            kernel
                .property_store(target.kind(), property)?
                .last_write_time(slot, property)
        })
    }

    fn property_store(
        &self,
        kind: EntityKind,
        property: &PropertyId,
    ) -> Result<&crate::store::PropertyStore, ErrorKind> {
        self.stores
            .properties(kind)
            .ok_or_else(|| ErrorKind::UnknownProperty {
                kind,
                property: property.clone(),
            })
    }

    pub fn person_property(&self, person: PersonId, property: impl Into<PropertyId>) -> error::Result<PropertyValue> {
        self.property(PropertyTarget::Person(person), &property.into())
    }

    pub fn global_property(&self, property: impl Into<PropertyId>) -> error::Result<PropertyValue> {
        self.property(PropertyTarget::Global, &property.into())
    }

    pub fn property_ids(&self, kind: EntityKind) -> &[PropertyId] {
        self.stores
            .properties(kind)
            .map_or(&[], |store| store.property_ids())
    }

    // === RESOURCES ===

    pub fn resource_level(&self, holder: Holder, resource: ResourceId) -> error::Result<u64> {
        const OP: &str = "resource_level";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| kernel.stores.holder_level(holder, resource))
    }

    /// Time of the last change; None when the resource does not track time
    pub fn resource_time(&self, holder: Holder, resource: ResourceId) -> error::Result<Option<Time>> {
        const OP: &str = "resource_time";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| {
            let (kind, slot) = kernel.stores.holder_slot(holder)?;
            let levels = kernel
                .stores
                .resources
                .levels(kind, resource)
                .ok_or(ErrorKind::UnknownResource(resource))?;
            Ok(levels.time(slot))
        })
    }

    // === GROUPS ===

    pub fn group_exists(&self, group: GroupId) -> bool {
        let _gate = self.gate.enter_for_read("group_exists");
        self.stores.groups.exists(group)
    }

    pub fn group_ids(&self) -> Vec<GroupId> {
        let _gate = self.gate.enter_for_read("group_ids");
        self.stores.groups.group_ids()
    }

    pub fn group_type(&self, group: GroupId) -> error::Result<GroupTypeId> {
        const OP: &str = "group_type";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| kernel.stores.require_group(group))
    }

    pub fn group_members(&self, group: GroupId) -> error::Result<Vec<PersonId>> {
        const OP: &str = "group_members";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| {
            kernel.stores.require_group(group)?;
            Ok(kernel.stores.groups.members(group))
        })
    }

    pub fn group_size(&self, group: GroupId) -> error::Result<usize> {
        const OP: &str = "group_size";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| {
            kernel.stores.require_group(group)?;
            Ok(kernel.stores.groups.group_size(group))
        })
    }

    pub fn groups_for_person(&self, person: PersonId) -> error::Result<Vec<GroupId>> {
        const OP: &str = "groups_for_person";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| {
            kernel.stores.require_person(person)?;
            Ok(kernel.stores.groups.groups_for_person(person).to_vec())
        })
    }

    pub fn groups_of_type(&self, group_type: GroupTypeId) -> error::Result<Vec<GroupId>> {
        const OP: &str = "groups_of_type";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| {
            kernel.stores.require_group_type(group_type)?;
            Ok(kernel.stores.groups.groups_of_type(group_type).to_vec())
        })
    }

    pub fn is_group_member(&self, person: PersonId, group: GroupId) -> error::Result<bool> {
        const OP: &str = "is_group_member";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| {
            kernel.stores.require_person(person)?;
            kernel.stores.require_group(group)?;
            Ok(kernel.stores.groups.is_member(person, group))
        })
    }

    /// Number of groups of one type the person belongs to
    pub fn group_type_count_for_person(&self, person: PersonId, group_type: GroupTypeId) -> error::Result<usize> {
        const OP: &str = "group_type_count_for_person";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| {
            kernel.stores.require_person(person)?;
            kernel.stores.require_group_type(group_type)?;
            Ok(kernel.stores.groups.type_count_for_person(person, group_type))
        })
    }

    // === MATERIALS ===

    pub fn batch(&self, batch: BatchId) -> error::Result<BatchRecord> {
        const OP: &str = "batch";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| kernel.stores.materials.batch(batch).cloned())
    }

    pub fn stage(&self, stage: StageId) -> error::Result<StageRecord> {
        const OP: &str = "stage";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| kernel.stores.materials.stage(stage).cloned())
    }

    pub fn batch_exists(&self, batch: BatchId) -> bool {
        let _gate = self.gate.enter_for_read("batch_exists");
        self.stores.materials.batch_exists(batch)
    }

    pub fn stage_exists(&self, stage: StageId) -> bool {
        let _gate = self.gate.enter_for_read("stage_exists");
        self.stores.materials.stage_exists(stage)
    }

    /// Batches of a producer that are not on any stage
    pub fn inventory(&self, producer: MaterialsProducerId) -> error::Result<Vec<BatchId>> {
        const OP: &str = "inventory";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| {
            kernel.stores.producer_slot(producer)?;
            Ok(kernel.stores.materials.inventory(producer).to_vec())
        })
    }

    pub fn stages_of(&self, producer: MaterialsProducerId) -> error::Result<Vec<StageId>> {
        const OP: &str = "stages_of";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| {
            kernel.stores.producer_slot(producer)?;
            Ok(kernel.stores.materials.stages_of(producer).to_vec())
        })
    }

    // === POPULATION INDICES ===

    pub fn index_exists(&self, key: &IndexKey) -> bool {
        let _gate = self.gate.enter_for_read("index_exists");
        self.indices.contains(key)
    }

    /// Keys of every index and partition in creation order
    pub fn index_keys(&self) -> &[IndexKey] {
        self.indices.keys()
    }

    pub fn index_size(&self, key: &IndexKey) -> error::Result<usize> {
        const OP: &str = "index_size";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| Ok(kernel.indices.index(key)?.len()))
    }

    pub fn index_contains(&self, key: &IndexKey, person: PersonId) -> error::Result<bool> {
        const OP: &str = "index_contains";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| {
            let index = kernel.indices.index(key)?;
            kernel.stores.require_person(person)?;
            Ok(index.contains(person))
        })
    }

    /// Members in ascending id order
    pub fn index_members(&self, key: &IndexKey) -> error::Result<Vec<PersonId>> {
        const OP: &str = "index_members";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| Ok(kernel.indices.index(key)?.members().sorted()))
    }

    pub fn partition_size(&self, key: &IndexKey, query: &LabelQuery) -> error::Result<usize> {
        const OP: &str = "partition_size";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| kernel.indices.partition(key)?.size(query))
    }

    pub fn partition_contains(&self, key: &IndexKey, person: PersonId, query: &LabelQuery) -> error::Result<bool> {
        const OP: &str = "partition_contains";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| {
            let partition = kernel.indices.partition(key)?;
            kernel.stores.require_person(person)?;
            partition.contains_with(person, query)
        })
    }

    pub fn partition_members(&self, key: &IndexKey, query: &LabelQuery) -> error::Result<Vec<PersonId>> {
        const OP: &str = "partition_members";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| kernel.indices.partition(key)?.members(query))
    }

    /// Non-empty cells with their label tuples and sizes
    pub fn partition_cells(&self, key: &IndexKey) -> error::Result<Vec<(Vec<Label>, usize)>> {
        const OP: &str = "partition_cells";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| {
            Ok(kernel
                .indices
                .partition(key)?
                .cells()
                .map(|(labels, size)| (labels.to_vec(), size))
                .collect())
        })
    }

    // === OBSERVATION ===

    /// Components subscribed to exactly this topic, in subscription order
    pub fn subscribers(&self, topic: &Topic) -> Vec<ComponentRef> {
        let _gate = self.gate.enter_for_read("subscribers");
        self.dispatcher.subscribers(topic).to_vec()
    }
}
