//! Building a kernel from a scenario
//!
//! Identifier sets and property schemas are fixed here. Initial state is
//! then loaded under the simulation's focus through the same validated
//! write paths components use, so a bad scenario fails with the error a
//! component would see.

use std::cell::RefCell;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::Kernel;
use crate::access::AccessGate;
use crate::core::types::*;
use crate::core::value::PropertyValue;
use crate::observation::ObservationDispatcher;
use crate::population::PopulationIndexManager;
use crate::report::ReportHub;
use crate::scenario::{BatchSeed, PropertyAssignment, ResourceAssignment, Scenario, ScenarioError};
use crate::schedule::plans::PlanQueue;
use crate::store::{
    GroupStore, IdMap, LocationStore, MaterialsStore, PopulationCounter, PropertyStore, ResourceStore,
    SlotAllocator, Stores,
};

fn id_map<K>(what: &str, ids: &[K]) -> Result<IdMap<K>, ScenarioError>
where
    K: Copy + Eq + std::hash::Hash + std::fmt::Display,
{
    IdMap::from_ids(ids.iter().copied())
        .map_err(|id| ScenarioError::Invalid(format!("duplicate {} {}", what, id)))
}

fn property_store(kind: EntityKind, scenario: &Scenario) -> Result<PropertyStore, ScenarioError> {
    let mut store = PropertyStore::new(kind);
    for schema in scenario.properties.for_kind(kind) {
        store
            .define(schema.id.clone(), schema.definition())
            .map_err(|error| ScenarioError::Invalid(error.to_string()))?;
    }
    Ok(store)
}

impl Kernel {
    pub fn from_scenario(scenario: &Scenario) -> Result<Kernel, ScenarioError> {
        Self::with_reports(scenario, ReportHub::new())
    }

    /// Builds a kernel whose report sinks also see the initial state
    pub fn with_reports(scenario: &Scenario, reports: ReportHub) -> Result<Kernel, ScenarioError> {
        let config = scenario.config.clone();
        config.validate().map_err(ScenarioError::Config)?;

        let regions = id_map("region", &scenario.regions)?;
        let compartments = id_map("compartment", &scenario.compartments)?;
        let group_types = id_map("group type", &scenario.group_types)?;
        let materials = id_map("material", &scenario.materials)?;
        let producers = id_map("materials producer", &scenario.producers)?;
        let resource_specs: Vec<(ResourceId, bool)> = scenario
            .resources
            .iter()
            .map(|spec| (spec.id, spec.track_person_time))
            .collect();
        let resources = ResourceStore::new(&resource_specs)
            .map_err(|id| ScenarioError::Invalid(format!("duplicate resource {}", id)))?;

        let stores = Stores {
            people: SlotAllocator::new(),
            population: PopulationCounter::default(),
            region_locations: LocationStore::new(
                regions.len(),
                config.region_members,
                config.track_region_arrival,
            ),
            compartment_locations: LocationStore::new(
                compartments.len(),
                config.compartment_members,
                config.track_compartment_arrival,
            ),
            regions,
            compartments,
            global_properties: property_store(EntityKind::Global, scenario)?,
            region_properties: property_store(EntityKind::Region, scenario)?,
            compartment_properties: property_store(EntityKind::Compartment, scenario)?,
            person_properties: property_store(EntityKind::Person, scenario)?,
            group_properties: property_store(EntityKind::Group, scenario)?,
            batch_properties: property_store(EntityKind::Batch, scenario)?,
            producer_properties: property_store(EntityKind::MaterialsProducer, scenario)?,
            resource_properties: property_store(EntityKind::Resource, scenario)?,
            groups: GroupStore::new(group_types, config.group_members),
            resources,
            materials: MaterialsStore::new(materials, producers),
        };

        let mut kernel = Kernel {
            dispatcher: ObservationDispatcher::new(config.notification_shrink_threshold),
            rng: RefCell::new(ChaCha8Rng::seed_from_u64(config.seed)),
            config,
            stores,
            indices: PopulationIndexManager::new(),
            reports,
            plans: PlanQueue::new(),
            gate: AccessGate::new(),
            focus: Focus::Simulation,
            global_components: Vec::new(),
        };
        let loaded = kernel.load(scenario);
        kernel.focus = Focus::None;
        loaded?;

        tracing::info!(
            regions = kernel.stores.regions.len(),
            compartments = kernel.stores.compartments.len(),
            people = kernel.stores.population.count,
            groups = kernel.stores.groups.group_count(),
            seed = kernel.config.seed,
            "kernel initialized"
        );
        Ok(kernel)
    }

    fn load(&mut self, scenario: &Scenario) -> Result<(), ScenarioError> {
        for component in &scenario.global_components {
            self.register_global_component(component.clone())?;
        }
        for assignment in &scenario.property_values {
            self.load_property(assignment)?;
        }
        for assignment in &scenario.resource_levels {
            self.load_resource(assignment)?;
        }

        let mut people = Vec::with_capacity(scenario.people.len());
        for seed in &scenario.people {
            people.push(self.add_person(seed.clone())?);
        }

        for seed in &scenario.groups {
            let group = self.add_group(seed.group_type)?;
            for &position in &seed.members {
                let person = people.get(position).copied().ok_or_else(|| {
                    ScenarioError::Invalid(format!(
                        "group member position {} is past the {} people listed",
                        position,
                        people.len()
                    ))
                })?;
                self.add_person_to_group(person, group)?;
            }
            for (property, value) in &seed.properties {
                self.set_group_property(group, property.clone(), value.clone())?;
            }
        }

        for seed in &scenario.batches {
            self.load_batch(seed)?;
        }
        for seed in &scenario.stages {
            let stage = self.create_stage(seed.producer)?;
            for batch_seed in &seed.batches {
                if batch_seed.producer != seed.producer {
                    return Err(ScenarioError::Invalid(format!(
                        "batch of producer {} listed on a stage of producer {}",
                        batch_seed.producer, seed.producer
                    )));
                }
                let batch = self.load_batch(batch_seed)?;
                self.move_batch_to_stage(batch, stage)?;
            }
            if seed.offered {
                self.set_stage_offer(stage, true)?;
            }
        }
        Ok(())
    }

    fn load_property(&mut self, assignment: &PropertyAssignment) -> Result<(), ScenarioError> {
        let PropertyAssignment {
            target,
            property,
            value,
        } = assignment.clone();
        match target {
            PropertyTarget::Global => self.set_global_property(property, value)?,
            PropertyTarget::Region(region) => self.set_region_property(region, property, value)?,
            PropertyTarget::Compartment(compartment) => {
                self.set_compartment_property(compartment, property, value)?
            }
            PropertyTarget::MaterialsProducer(producer) => {
                self.set_materials_producer_property(producer, property, value)?
            }
            PropertyTarget::Resource(resource) => self.set_resource_property(resource, property, value)?,
            PropertyTarget::Person(_) | PropertyTarget::Group(_) | PropertyTarget::Batch(_) => {
                return Err(ScenarioError::Invalid(format!(
                    "{} properties are set on the seed that creates the entity",
                    target.kind()
                )))
            }
        }
        Ok(())
    }

    fn load_resource(&mut self, assignment: &ResourceAssignment) -> Result<(), ScenarioError> {
        const OP: &str = "load_resource";
        let ResourceAssignment {
            holder,
            resource,
            amount,
        } = *assignment;
        if let Holder::Person(_) = holder {
            return Err(ScenarioError::Invalid(
                "person resource levels are set on the person seed".to_string(),
            ));
        }
        let _gate = self.gate.enter_for_write(OP);
        self.checked(OP, |kernel| kernel.check_credit(holder, resource, amount))?;
        self.resolver().add_resource(holder, resource, amount);
        Ok(())
    }

    fn load_batch(&mut self, seed: &BatchSeed) -> Result<BatchId, ScenarioError> {
        let properties: Vec<(PropertyId, PropertyValue)> = seed
            .properties
            .iter()
            .map(|(property, value)| (property.clone(), value.clone()))
            .collect();
        Ok(self.create_batch_with_properties(seed.producer, seed.material, seed.amount, &properties)?)
    }
}
