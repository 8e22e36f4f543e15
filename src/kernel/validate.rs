//! Precondition checks run before any mutation
//!
//! Each check reads current state and returns the first failing
//! precondition. Nothing here mutates.

use super::Kernel;
use crate::core::error::ErrorKind;
use crate::core::types::*;
use crate::core::value::PropertyValue;
use crate::observation::{GroupScope, PersonScope, StageScope, Topic};
use crate::population::{DimensionSource, Filter, PartitionSpec};

impl Kernel {
    pub(super) fn check_component(&self, component: &ComponentRef) -> Result<(), ErrorKind> {
        match component {
            ComponentRef::Global(id) => {
                if self.global_components.contains(id) {
                    Ok(())
                } else {
                    Err(ErrorKind::UnknownComponent(id.clone()))
                }
            }
            ComponentRef::Region(region) => self.stores.region_slot(*region).map(drop),
            ComponentRef::Compartment(compartment) => {
                self.stores.compartment_slot(*compartment).map(drop)
            }
            ComponentRef::MaterialsProducer(producer) => {
                self.stores.producer_slot(*producer).map(drop)
            }
        }
    }

    pub(super) fn check_excluded(&self, excluded: Option<PersonId>) -> Result<(), ErrorKind> {
        match excluded {
            Some(person) => self.stores.require_person(person),
            None => Ok(()),
        }
    }

    /// Type and finiteness of a value against the property's definition
    pub(super) fn check_value(
        &self,
        kind: EntityKind,
        property: &PropertyId,
        value: &PropertyValue,
    ) -> Result<(), ErrorKind> {
        let store = self
            .stores
            .properties(kind)
            .ok_or_else(|| ErrorKind::UnknownProperty {
                kind,
                property: property.clone(),
            })?;
        store.definition(property)?.check(property, value)
    }

    /// Everything a property write needs: the target exists, the value fits
    /// and the slot is not locked
    pub(super) fn check_property_write(
        &self,
        target: &PropertyTarget,
        property: &PropertyId,
        value: &PropertyValue,
    ) -> Result<(), ErrorKind> {
        let slot = self.stores.property_slot(target)?;
        let kind = target.kind();
        let store = self
            .stores
            .properties(kind)
            .ok_or_else(|| ErrorKind::UnknownProperty {
                kind,
                property: property.clone(),
            })?;
        store.validate_write(slot, property, value)
    }

    fn check_property_defined(&self, kind: EntityKind, property: &PropertyId) -> Result<(), ErrorKind> {
        let store = self
            .stores
            .properties(kind)
            .ok_or_else(|| ErrorKind::UnknownProperty {
                kind,
                property: property.clone(),
            })?;
        store.definition(property).map(drop)
    }

    pub(super) fn check_credit(&self, holder: Holder, resource: ResourceId, amount: u64) -> Result<(), ErrorKind> {
        let (kind, slot) = self.stores.holder_slot(holder)?;
        let levels = self
            .stores
            .resources
            .levels(kind, resource)
            .ok_or(ErrorKind::UnknownResource(resource))?;
        levels.check_add(slot, amount).map(drop)
    }

    pub(super) fn check_debit(&self, holder: Holder, resource: ResourceId, amount: u64) -> Result<(), ErrorKind> {
        let (kind, slot) = self.stores.holder_slot(holder)?;
        let levels = self
            .stores
            .resources
            .levels(kind, resource)
            .ok_or(ErrorKind::UnknownResource(resource))?;
        levels.check_remove(slot, amount).map(drop)
    }

    pub(super) fn check_amount(&self, amount: f64) -> Result<(), ErrorKind> {
        if amount.is_finite() && amount >= 0.0 {
            Ok(())
        } else {
            Err(ErrorKind::InvalidAmount(amount))
        }
    }

    /// Fails when the batch sits on an offered stage
    pub(super) fn check_batch_unlocked(&self, batch: BatchId) -> Result<(), ErrorKind> {
        if let Some(stage) = self.stores.materials.batch(batch)?.stage {
            self.check_stage_unlocked(stage)?;
        }
        Ok(())
    }

    pub(super) fn check_stage_unlocked(&self, stage: StageId) -> Result<(), ErrorKind> {
        if self.stores.materials.stage(stage)?.offered {
            return Err(ErrorKind::StageOffered(stage));
        }
        Ok(())
    }

    pub(super) fn check_free_key(&self, key: &IndexKey) -> Result<(), ErrorKind> {
        if self.indices.contains(key) {
            return Err(ErrorKind::DuplicateIndex(key.clone()));
        }
        Ok(())
    }

    /// Every identifier a filter names must exist and every compared value
    /// must fit its property
    pub(super) fn check_filter(&self, filter: &Filter) -> Result<(), ErrorKind> {
        match filter {
            Filter::All => Ok(()),
            Filter::Property { property, value, .. } => {
                self.check_value(EntityKind::Person, property, value)
            }
            Filter::Region(regions) => {
                if regions.is_empty() {
                    return Err(ErrorKind::MalformedFilter("empty region list".to_string()));
                }
                regions
                    .iter()
                    .try_for_each(|&region| self.stores.region_slot(region).map(drop))
            }
            Filter::Compartment(compartments) => {
                if compartments.is_empty() {
                    return Err(ErrorKind::MalformedFilter("empty compartment list".to_string()));
                }
                compartments
                    .iter()
                    .try_for_each(|&compartment| self.stores.compartment_slot(compartment).map(drop))
            }
            Filter::Resource { resource, .. } => self.stores.resource_slot(*resource).map(drop),
            Filter::GroupMember(group) => self.stores.require_group(*group).map(drop),
            Filter::GroupTypeCount { group_type, .. } => self.stores.require_group_type(*group_type),
            Filter::And(parts) | Filter::Or(parts) => {
                if parts.is_empty() {
                    return Err(ErrorKind::MalformedFilter("empty conjunction or disjunction".to_string()));
                }
                parts.iter().try_for_each(|part| self.check_filter(part))
            }
            Filter::Not(inner) => self.check_filter(inner),
        }
    }

    pub(super) fn check_partition(&self, spec: &PartitionSpec) -> Result<(), ErrorKind> {
        self.check_filter(&spec.filter)?;
        for dimension in &spec.dimensions {
            match &dimension.source {
                DimensionSource::Region | DimensionSource::Compartment => {}
                DimensionSource::Property(property) => {
                    self.check_property_defined(EntityKind::Person, property)?
                }
                DimensionSource::Resource(resource) => {
                    self.stores.resource_slot(*resource)?;
                }
                DimensionSource::GroupTypeCount(group_type) => {
                    self.stores.require_group_type(*group_type)?
                }
            }
        }
        Ok(())
    }

    fn check_person_scope(&self, scope: &PersonScope) -> Result<(), ErrorKind> {
        match *scope {
            PersonScope::All => Ok(()),
            PersonScope::Region(region) => self.stores.region_slot(region).map(drop),
            PersonScope::Compartment(compartment) => {
                self.stores.compartment_slot(compartment).map(drop)
            }
            PersonScope::Person(person) => self.stores.require_person(person),
        }
    }

    fn check_group_scope(&self, scope: &GroupScope) -> Result<(), ErrorKind> {
        match *scope {
            GroupScope::All => Ok(()),
            GroupScope::GroupType(group_type) => self.stores.require_group_type(group_type),
            GroupScope::Group(group) => self.stores.require_group(group).map(drop),
        }
    }

    fn check_stage_scope(&self, scope: &StageScope) -> Result<(), ErrorKind> {
        match *scope {
            StageScope::All => Ok(()),
            StageScope::Producer(producer) => self.stores.producer_slot(producer).map(drop),
            StageScope::Stage(stage) => self.stores.materials.stage(stage).map(drop),
        }
    }

    pub(super) fn check_topic(&self, topic: &Topic) -> Result<(), ErrorKind> {
        match topic {
            Topic::GlobalProperty(property) => {
                self.check_property_defined(EntityKind::Global, property)
            }
            Topic::RegionProperty(region, property) => {
                self.stores.region_slot(*region)?;
                self.check_property_defined(EntityKind::Region, property)
            }
            Topic::CompartmentProperty(compartment, property) => {
                self.stores.compartment_slot(*compartment)?;
                self.check_property_defined(EntityKind::Compartment, property)
            }
            Topic::ProducerProperty(producer, property) => {
                self.stores.producer_slot(*producer)?;
                self.check_property_defined(EntityKind::MaterialsProducer, property)
            }
            Topic::ResourceProperty(resource, property) => {
                self.stores.resource_slot(*resource)?;
                self.check_property_defined(EntityKind::Resource, property)
            }
            Topic::PersonProperty(scope, property) => {
                self.check_person_scope(scope)?;
                self.check_property_defined(EntityKind::Person, property)
            }
            Topic::PersonResource(scope, resource) => {
                self.check_person_scope(scope)?;
                self.stores.resource_slot(*resource).map(drop)
            }
            Topic::PersonRegion(scope)
            | Topic::PersonCompartment(scope)
            | Topic::PersonAddition(scope)
            | Topic::PersonRemoval(scope) => self.check_person_scope(scope),
            Topic::RegionResource(region, resource) => {
                self.stores.region_slot(*region)?;
                self.stores.resource_slot(*resource).map(drop)
            }
            Topic::ProducerResource(producer, resource) => {
                self.stores.producer_slot(*producer)?;
                self.stores.resource_slot(*resource).map(drop)
            }
            Topic::GroupProperty(scope, property) => {
                self.check_group_scope(scope)?;
                self.check_property_defined(EntityKind::Group, property)
            }
            Topic::GroupConstruction(scope)
            | Topic::GroupDestruction(scope)
            | Topic::GroupMembership(scope) => self.check_group_scope(scope),
            Topic::StageOffer(scope) | Topic::StageTransfer(scope) => self.check_stage_scope(scope),
        }
    }
}
