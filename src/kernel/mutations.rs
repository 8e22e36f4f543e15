//! Mutating entry points
//!
//! Every method has the same shape: enter the gate for writing, authorize
//! and validate in one `checked` block, then hand the request to the
//! resolver.

use super::Kernel;
use crate::access::permission::{
    authorize, compartment_or_global, producer_or_global, region_or_global, Scope, GLOBAL_ONLY,
    PERSON_EDITORS,
};
use crate::core::error::{self, ErrorKind};
use crate::core::types::*;
use crate::core::value::PropertyValue;
use crate::scenario::PersonSeed;

/// Components allowed to change region resource levels
const REGION_RESOURCE_EDITORS: &[Scope] = &[Scope::AnyGlobal, Scope::AllRegions];

impl Kernel {
    // === PEOPLE ===

    pub fn add_person(&mut self, seed: PersonSeed) -> error::Result<PersonId> {
        const OP: &str = "add_person";
        let _gate = self.gate.enter_for_write(OP);
        self.checked(OP, |kernel| {
            authorize(&kernel.focus, PERSON_EDITORS)?;
            kernel.check_person_seed(&seed)
        })?;
        Ok(self.resolver().add_person(&seed))
    }

    pub(super) fn check_person_seed(&self, seed: &PersonSeed) -> Result<(), ErrorKind> {
        self.stores.region_slot(seed.region)?;
        self.stores.compartment_slot(seed.compartment)?;
        for (property, value) in &seed.properties {
            self.check_value(EntityKind::Person, property, value)?;
        }
        let mut totals: Vec<(ResourceId, u64)> = Vec::new();
        for &(resource, amount) in &seed.resources {
            self.stores.resource_slot(resource)?;
            match totals.iter_mut().find(|(id, _)| *id == resource) {
                Some((_, total)) => {
                    *total = total
                        .checked_add(amount)
                        .ok_or(ErrorKind::ResourceOverflow(resource))?;
                }
                None => totals.push((resource, amount)),
            }
        }
        Ok(())
    }

    pub fn remove_person(&mut self, person: PersonId) -> error::Result<()> {
        const OP: &str = "remove_person";
        let _gate = self.gate.enter_for_write(OP);
        self.checked(OP, |kernel| {
            authorize(&kernel.focus, PERSON_EDITORS)?;
            kernel.stores.require_person(person)
        })?;
        self.resolver().remove_person(person);
        Ok(())
    }

    pub fn set_person_region(&mut self, person: PersonId, region: RegionId) -> error::Result<()> {
        const OP: &str = "set_person_region";
        let _gate = self.gate.enter_for_write(OP);
        self.checked(OP, |kernel| {
            authorize(&kernel.focus, PERSON_EDITORS)?;
            kernel.stores.require_person(person)?;
            kernel.stores.region_slot(region)?;
            if kernel.stores.person_region(person) == Some(region) {
                return Err(ErrorKind::SameRegion { person, region });
            }
            Ok(())
        })?;
        self.resolver().set_person_region(person, region);
        Ok(())
    }

    pub fn set_person_compartment(
        &mut self,
        person: PersonId,
        compartment: CompartmentId,
    ) -> error::Result<()> {
        const OP: &str = "set_person_compartment";
        let _gate = self.gate.enter_for_write(OP);
        self.checked(OP, |kernel| {
            authorize(&kernel.focus, PERSON_EDITORS)?;
            kernel.stores.require_person(person)?;
            kernel.stores.compartment_slot(compartment)?;
            if kernel.stores.person_compartment(person) == Some(compartment) {
                return Err(ErrorKind::SameCompartment {
                    person,
                    compartment,
                });
            }
            Ok(())
        })?;
        self.resolver().set_person_compartment(person, compartment);
        Ok(())
    }

    // === PROPERTIES ===

    fn write_property(
        &mut self,
        operation: &'static str,
        acceptable: &[Scope],
        target: PropertyTarget,
        property: PropertyId,
        value: PropertyValue,
    ) -> error::Result<()> {
        let _gate = self.gate.enter_for_write(operation);
        self.checked(operation, |kernel| {
            authorize(&kernel.focus, acceptable)?;
            kernel.check_property_write(&target, &property, &value)
        })?;
        self.resolver().set_property(target, &property, &value);
        Ok(())
    }

    pub fn set_global_property(
        &mut self,
        property: impl Into<PropertyId>,
        value: impl Into<PropertyValue>,
    ) -> error::Result<()> {
        self.write_property(
            "set_global_property",
            GLOBAL_ONLY,
            PropertyTarget::Global,
            property.into(),
            value.into(),
        )
    }

    pub fn set_region_property(
        &mut self,
        region: RegionId,
        property: impl Into<PropertyId>,
        value: impl Into<PropertyValue>,
    ) -> error::Result<()> {
        self.write_property(
            "set_region_property",
            &region_or_global(region),
            PropertyTarget::Region(region),
            property.into(),
            value.into(),
        )
    }

    pub fn set_compartment_property(
        &mut self,
        compartment: CompartmentId,
        property: impl Into<PropertyId>,
        value: impl Into<PropertyValue>,
    ) -> error::Result<()> {
        self.write_property(
            "set_compartment_property",
            &compartment_or_global(compartment),
            PropertyTarget::Compartment(compartment),
            property.into(),
            value.into(),
        )
    }

    pub fn set_person_property(
        &mut self,
        person: PersonId,
        property: impl Into<PropertyId>,
        value: impl Into<PropertyValue>,
    ) -> error::Result<()> {
        self.write_property(
            "set_person_property",
            PERSON_EDITORS,
            PropertyTarget::Person(person),
            property.into(),
            value.into(),
        )
    }

    pub fn set_group_property(
        &mut self,
        group: GroupId,
        property: impl Into<PropertyId>,
        value: impl Into<PropertyValue>,
    ) -> error::Result<()> {
        self.write_property(
            "set_group_property",
            PERSON_EDITORS,
            PropertyTarget::Group(group),
            property.into(),
            value.into(),
        )
    }

    pub fn set_materials_producer_property(
        &mut self,
        producer: MaterialsProducerId,
        property: impl Into<PropertyId>,
        value: impl Into<PropertyValue>,
    ) -> error::Result<()> {
        self.write_property(
            "set_materials_producer_property",
            &producer_or_global(producer),
            PropertyTarget::MaterialsProducer(producer),
            property.into(),
            value.into(),
        )
    }

    pub fn set_resource_property(
        &mut self,
        resource: ResourceId,
        property: impl Into<PropertyId>,
        value: impl Into<PropertyValue>,
    ) -> error::Result<()> {
        self.write_property(
            "set_resource_property",
            GLOBAL_ONLY,
            PropertyTarget::Resource(resource),
            property.into(),
            value.into(),
        )
    }

    /// Batches on an offered stage are locked
    pub fn set_batch_property(
        &mut self,
        batch: BatchId,
        property: impl Into<PropertyId>,
        value: impl Into<PropertyValue>,
    ) -> error::Result<()> {
        const OP: &str = "set_batch_property";
        let _gate = self.gate.enter_for_write(OP);
        let (property, value) = (property.into(), value.into());
        let target = PropertyTarget::Batch(batch);
        self.checked(OP, |kernel| {
            kernel.authorize_batch_owner(batch)?;
            kernel.check_batch_unlocked(batch)?;
            kernel.check_property_write(&target, &property, &value)
        })?;
        self.resolver().set_property(target, &property, &value);
        Ok(())
    }

    // === RESOURCES ===

    pub fn add_resource_to_region(
        &mut self,
        region: RegionId,
        resource: ResourceId,
        amount: u64,
    ) -> error::Result<()> {
        const OP: &str = "add_resource_to_region";
        let _gate = self.gate.enter_for_write(OP);
        let holder = Holder::Region(region);
        self.checked(OP, |kernel| {
            authorize(&kernel.focus, REGION_RESOURCE_EDITORS)?;
            kernel.check_credit(holder, resource, amount)
        })?;
        self.resolver().add_resource(holder, resource, amount);
        Ok(())
    }

    pub fn remove_resource_from_region(
        &mut self,
        region: RegionId,
        resource: ResourceId,
        amount: u64,
    ) -> error::Result<()> {
        const OP: &str = "remove_resource_from_region";
        let _gate = self.gate.enter_for_write(OP);
        let holder = Holder::Region(region);
        self.checked(OP, |kernel| {
            authorize(&kernel.focus, REGION_RESOURCE_EDITORS)?;
            kernel.check_debit(holder, resource, amount)
        })?;
        self.resolver().remove_resource(holder, resource, amount);
        Ok(())
    }

    pub fn transfer_resource_between_regions(
        &mut self,
        resource: ResourceId,
        from: RegionId,
        to: RegionId,
        amount: u64,
    ) -> error::Result<()> {
        const OP: &str = "transfer_resource_between_regions";
        let _gate = self.gate.enter_for_write(OP);
        let (source, destination) = (Holder::Region(from), Holder::Region(to));
        self.checked(OP, |kernel| {
            authorize(&kernel.focus, REGION_RESOURCE_EDITORS)?;
            if from == to {
                return Err(ErrorKind::SelfTransfer(from));
            }
            kernel.check_debit(source, resource, amount)?;
            kernel.check_credit(destination, resource, amount)
        })?;
        self.resolver()
            .transfer_resource(resource, source, destination, amount);
        Ok(())
    }

    /// The person's current region pays
    pub fn transfer_resource_to_person(
        &mut self,
        person: PersonId,
        resource: ResourceId,
        amount: u64,
    ) -> error::Result<()> {
        const OP: &str = "transfer_resource_to_person";
        let _gate = self.gate.enter_for_write(OP);
        let region = self.checked(OP, |kernel| {
            authorize(&kernel.focus, PERSON_EDITORS)?;
            let region = kernel.region_of(person)?;
            kernel.check_debit(Holder::Region(region), resource, amount)?;
            kernel.check_credit(Holder::Person(person), resource, amount)?;
            Ok(region)
        })?;
        self.resolver().transfer_resource(
            resource,
            Holder::Region(region),
            Holder::Person(person),
            amount,
        );
        Ok(())
    }

    /// Returns resource to the person's current region
    pub fn transfer_resource_from_person(
        &mut self,
        person: PersonId,
        resource: ResourceId,
        amount: u64,
    ) -> error::Result<()> {
        const OP: &str = "transfer_resource_from_person";
        let _gate = self.gate.enter_for_write(OP);
        let region = self.checked(OP, |kernel| {
            authorize(&kernel.focus, PERSON_EDITORS)?;
            let region = kernel.region_of(person)?;
            kernel.check_debit(Holder::Person(person), resource, amount)?;
            kernel.check_credit(Holder::Region(region), resource, amount)?;
            Ok(region)
        })?;
        self.resolver().transfer_resource(
            resource,
            Holder::Person(person),
            Holder::Region(region),
            amount,
        );
        Ok(())
    }

    pub fn remove_resource_from_person(
        &mut self,
        person: PersonId,
        resource: ResourceId,
        amount: u64,
    ) -> error::Result<()> {
        const OP: &str = "remove_resource_from_person";
        let _gate = self.gate.enter_for_write(OP);
        let holder = Holder::Person(person);
        self.checked(OP, |kernel| {
            authorize(&kernel.focus, PERSON_EDITORS)?;
            kernel.check_debit(holder, resource, amount)
        })?;
        self.resolver().remove_resource(holder, resource, amount);
        Ok(())
    }

    pub fn transfer_produced_resource_to_region(
        &mut self,
        producer: MaterialsProducerId,
        resource: ResourceId,
        region: RegionId,
        amount: u64,
    ) -> error::Result<()> {
        const OP: &str = "transfer_produced_resource_to_region";
        let _gate = self.gate.enter_for_write(OP);
        let (source, destination) = (Holder::MaterialsProducer(producer), Holder::Region(region));
        self.checked(OP, |kernel| {
            authorize(&kernel.focus, &producer_or_global(producer))?;
            kernel.check_debit(source, resource, amount)?;
            kernel.check_credit(destination, resource, amount)
        })?;
        self.resolver()
            .transfer_resource(resource, source, destination, amount);
        Ok(())
    }

    fn region_of(&self, person: PersonId) -> Result<RegionId, ErrorKind> {
        self.stores.require_person(person)?;
        self.stores
            .person_region(person)
            .ok_or_else(|| ErrorKind::Inconsistent(format!("person {} has no region", person)))
    }

    // === GROUPS ===

    pub fn add_group(&mut self, group_type: GroupTypeId) -> error::Result<GroupId> {
        const OP: &str = "add_group";
        let _gate = self.gate.enter_for_write(OP);
        self.checked(OP, |kernel| {
            authorize(&kernel.focus, PERSON_EDITORS)?;
            kernel.stores.require_group_type(group_type)
        })?;
        Ok(self.resolver().create_group(group_type))
    }

    pub fn remove_group(&mut self, group: GroupId) -> error::Result<()> {
        const OP: &str = "remove_group";
        let _gate = self.gate.enter_for_write(OP);
        self.checked(OP, |kernel| {
            authorize(&kernel.focus, PERSON_EDITORS)?;
            kernel.stores.require_group(group).map(drop)
        })?;
        self.resolver().remove_group(group);
        Ok(())
    }

    pub fn add_person_to_group(&mut self, person: PersonId, group: GroupId) -> error::Result<()> {
        const OP: &str = "add_person_to_group";
        let _gate = self.gate.enter_for_write(OP);
        self.checked(OP, |kernel| {
            authorize(&kernel.focus, PERSON_EDITORS)?;
            kernel.stores.require_person(person)?;
            kernel.stores.require_group(group)?;
            if kernel.stores.groups.is_member(person, group) {
                return Err(ErrorKind::AlreadyGroupMember { person, group });
            }
            Ok(())
        })?;
        self.resolver().add_to_group(person, group);
        Ok(())
    }

    pub fn remove_person_from_group(&mut self, person: PersonId, group: GroupId) -> error::Result<()> {
        const OP: &str = "remove_person_from_group";
        let _gate = self.gate.enter_for_write(OP);
        self.checked(OP, |kernel| {
            authorize(&kernel.focus, PERSON_EDITORS)?;
            kernel.stores.require_person(person)?;
            kernel.stores.require_group(group)?;
            if !kernel.stores.groups.is_member(person, group) {
                return Err(ErrorKind::NotGroupMember { person, group });
            }
            Ok(())
        })?;
        self.resolver().remove_from_group(person, group);
        Ok(())
    }

    // === MATERIALS ===

    fn authorize_producer(&self, producer: MaterialsProducerId) -> Result<(), ErrorKind> {
        authorize(&self.focus, &producer_or_global(producer))
    }

    fn authorize_batch_owner(&self, batch: BatchId) -> Result<MaterialsProducerId, ErrorKind> {
        let producer = self.stores.materials.batch(batch)?.producer;
        self.authorize_producer(producer)?;
        Ok(producer)
    }

    fn authorize_stage_owner(&self, stage: StageId) -> Result<MaterialsProducerId, ErrorKind> {
        let producer = self.stores.materials.stage(stage)?.producer;
        self.authorize_producer(producer)?;
        Ok(producer)
    }

    pub fn create_batch(
        &mut self,
        producer: MaterialsProducerId,
        material: MaterialId,
        amount: f64,
    ) -> error::Result<BatchId> {
        self.create_batch_with_properties(producer, material, amount, &[])
    }

    pub fn create_batch_with_properties(
        &mut self,
        producer: MaterialsProducerId,
        material: MaterialId,
        amount: f64,
        properties: &[(PropertyId, PropertyValue)],
    ) -> error::Result<BatchId> {
        const OP: &str = "create_batch";
        let _gate = self.gate.enter_for_write(OP);
        self.checked(OP, |kernel| {
            kernel.authorize_producer(producer)?;
            kernel.stores.producer_slot(producer)?;
            if !kernel.stores.materials.has_material(material) {
                return Err(ErrorKind::UnknownMaterial(material));
            }
            kernel.check_amount(amount)?;
            properties
                .iter()
                .try_for_each(|(property, value)| kernel.check_value(EntityKind::Batch, property, value))
        })?;
        Ok(self
            .resolver()
            .create_batch(producer, material, amount, properties))
    }

    pub fn destroy_batch(&mut self, batch: BatchId) -> error::Result<()> {
        const OP: &str = "destroy_batch";
        let _gate = self.gate.enter_for_write(OP);
        self.checked(OP, |kernel| {
            kernel.authorize_batch_owner(batch)?;
            kernel.check_batch_unlocked(batch)
        })?;
        self.resolver().destroy_batch(batch);
        Ok(())
    }

    /// Moves part of one batch into another batch of the same material
    pub fn shift_batch_amount(
        &mut self,
        source: BatchId,
        destination: BatchId,
        amount: f64,
    ) -> error::Result<()> {
        const OP: &str = "shift_batch_amount";
        let _gate = self.gate.enter_for_write(OP);
        self.checked(OP, |kernel| {
            if source == destination {
                return Err(ErrorKind::SameBatch(source));
            }
            kernel.authorize_batch_owner(source)?;
            kernel.authorize_batch_owner(destination)?;
            let from = kernel.stores.materials.batch(source)?;
            let to = kernel.stores.materials.batch(destination)?;
            if from.producer != to.producer {
                return Err(ErrorKind::BatchProducerMismatch(source, destination));
            }
            if from.material != to.material {
                return Err(ErrorKind::MaterialMismatch(source, destination));
            }
            // Only inventory batches can be reshaped
            if from.stage.is_some() {
                return Err(ErrorKind::BatchOnStage(source));
            }
            if to.stage.is_some() {
                return Err(ErrorKind::BatchOnStage(destination));
            }
            kernel.check_amount(amount)?;
            if from.amount < amount {
                return Err(ErrorKind::InsufficientBatchAmount {
                    batch: source,
                    available: from.amount,
                    requested: amount,
                });
            }
            Ok(())
        })?;
        self.resolver()
            .shift_batch_amount(source, destination, amount);
        Ok(())
    }

    pub fn create_stage(&mut self, producer: MaterialsProducerId) -> error::Result<StageId> {
        const OP: &str = "create_stage";
        let _gate = self.gate.enter_for_write(OP);
        self.checked(OP, |kernel| {
            kernel.authorize_producer(producer)?;
            kernel.stores.producer_slot(producer).map(drop)
        })?;
        Ok(self.resolver().create_stage(producer))
    }

    /// Returns the batches destroyed with the stage; empty when they went
    /// back to inventory
    pub fn destroy_stage(&mut self, stage: StageId, destroy_batches: bool) -> error::Result<Vec<BatchId>> {
        const OP: &str = "destroy_stage";
        let _gate = self.gate.enter_for_write(OP);
        self.checked(OP, |kernel| {
            kernel.authorize_stage_owner(stage)?;
            kernel.check_stage_unlocked(stage)
        })?;
        Ok(self.resolver().destroy_stage(stage, destroy_batches))
    }

    pub fn move_batch_to_stage(&mut self, batch: BatchId, stage: StageId) -> error::Result<()> {
        const OP: &str = "move_batch_to_stage";
        let _gate = self.gate.enter_for_write(OP);
        self.checked(OP, |kernel| {
            let producer = kernel.authorize_batch_owner(batch)?;
            if kernel.stores.materials.stage(stage)?.producer != producer {
                return Err(ErrorKind::ProducerMismatch { batch, stage });
            }
            if kernel.stores.materials.batch(batch)?.stage.is_some() {
                return Err(ErrorKind::BatchOnStage(batch));
            }
            kernel.check_stage_unlocked(stage)
        })?;
        self.resolver().move_batch_to_stage(batch, stage);
        Ok(())
    }

    pub fn move_stage_batch_to_inventory(&mut self, batch: BatchId) -> error::Result<()> {
        const OP: &str = "move_stage_batch_to_inventory";
        let _gate = self.gate.enter_for_write(OP);
        self.checked(OP, |kernel| {
            kernel.authorize_batch_owner(batch)?;
            let stage = kernel
                .stores
                .materials
                .batch(batch)?
                .stage
                .ok_or(ErrorKind::BatchNotOnStage(batch))?;
            kernel.check_stage_unlocked(stage)
        })?;
        self.resolver().move_batch_to_inventory(batch);
        Ok(())
    }

    pub fn set_stage_offer(&mut self, stage: StageId, offered: bool) -> error::Result<()> {
        const OP: &str = "set_stage_offer";
        let _gate = self.gate.enter_for_write(OP);
        self.checked(OP, |kernel| kernel.authorize_stage_owner(stage).map(drop))?;
        self.resolver().set_stage_offer(stage, offered);
        Ok(())
    }

    /// Hands an offered stage to another producer; it arrives un-offered
    pub fn transfer_offered_stage(&mut self, stage: StageId, to: MaterialsProducerId) -> error::Result<()> {
        const OP: &str = "transfer_offered_stage";
        let _gate = self.gate.enter_for_write(OP);
        self.checked(OP, |kernel| {
            authorize(&kernel.focus, GLOBAL_ONLY)?;
            kernel.stores.producer_slot(to)?;
            let record = kernel.stores.materials.stage(stage)?;
            if !record.offered {
                return Err(ErrorKind::StageNotOffered(stage));
            }
            if record.producer == to {
                return Err(ErrorKind::SameProducer { stage, producer: to });
            }
            Ok(())
        })?;
        self.resolver().transfer_offered_stage(stage, to);
        Ok(())
    }

    pub fn convert_stage_to_batch(
        &mut self,
        stage: StageId,
        material: MaterialId,
        amount: f64,
    ) -> error::Result<BatchId> {
        const OP: &str = "convert_stage_to_batch";
        let _gate = self.gate.enter_for_write(OP);
        self.checked(OP, |kernel| {
            kernel.authorize_stage_owner(stage)?;
            kernel.check_stage_unlocked(stage)?;
            if !kernel.stores.materials.has_material(material) {
                return Err(ErrorKind::UnknownMaterial(material));
            }
            kernel.check_amount(amount)
        })?;
        Ok(self
            .resolver()
            .convert_stage_to_batch(stage, material, amount))
    }

    pub fn convert_stage_to_resource(
        &mut self,
        stage: StageId,
        resource: ResourceId,
        amount: u64,
    ) -> error::Result<()> {
        const OP: &str = "convert_stage_to_resource";
        let _gate = self.gate.enter_for_write(OP);
        self.checked(OP, |kernel| {
            let producer = kernel.authorize_stage_owner(stage)?;
            kernel.check_stage_unlocked(stage)?;
            kernel.check_credit(Holder::MaterialsProducer(producer), resource, amount)
        })?;
        self.resolver()
            .convert_stage_to_resource(stage, resource, amount);
        Ok(())
    }
}
