//! Scenario description: identifier sets, property schemas and initial state
//!
//! A scenario is loaded once, before any component runs. It can be written
//! in TOML or assembled in code with the builder methods.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::KernelConfig;
use crate::core::error::KernelError;
use crate::core::types::*;
use crate::core::value::PropertyValue;
use crate::store::property::PropertyDefinition;

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse scenario: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("invalid scenario: {0}")]
    Invalid(String),
    #[error(transparent)]
    Kernel(#[from] KernelError),
}

/// One property declaration; the value type follows the default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    pub id: PropertyId,
    pub default: PropertyValue,
    #[serde(default)]
    pub write_once: bool,
    #[serde(default)]
    pub track_time: bool,
}

impl PropertySchema {
    pub fn new(id: impl Into<PropertyId>, default: impl Into<PropertyValue>) -> Self {
        Self {
            id: id.into(),
            default: default.into(),
            write_once: false,
            track_time: false,
        }
    }

    pub fn write_once(mut self) -> Self {
        self.write_once = true;
        self
    }

    pub fn tracked(mut self) -> Self {
        self.track_time = true;
        self
    }

    pub fn definition(&self) -> PropertyDefinition {
        let mut definition = PropertyDefinition::new(self.default.clone());
        if self.write_once {
            definition = definition.write_once();
        }
        if self.track_time {
            definition = definition.tracked();
        }
        definition
    }
}

/// Property schemas per entity kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertySchemas {
    pub global: Vec<PropertySchema>,
    pub region: Vec<PropertySchema>,
    pub compartment: Vec<PropertySchema>,
    pub person: Vec<PropertySchema>,
    pub group: Vec<PropertySchema>,
    pub batch: Vec<PropertySchema>,
    pub materials_producer: Vec<PropertySchema>,
    pub resource: Vec<PropertySchema>,
}

impl PropertySchemas {
    pub fn for_kind(&self, kind: EntityKind) -> &[PropertySchema] {
        match kind {
            EntityKind::Global => &self.global,
            EntityKind::Region => &self.region,
            EntityKind::Compartment => &self.compartment,
            EntityKind::Person => &self.person,
            EntityKind::Group => &self.group,
            EntityKind::Batch => &self.batch,
            EntityKind::MaterialsProducer => &self.materials_producer,
            EntityKind::Resource => &self.resource,
            EntityKind::Stage => &[],
        }
    }

    fn for_kind_mut(&mut self, kind: EntityKind) -> Option<&mut Vec<PropertySchema>> {
        Some(match kind {
            EntityKind::Global => &mut self.global,
            EntityKind::Region => &mut self.region,
            EntityKind::Compartment => &mut self.compartment,
            EntityKind::Person => &mut self.person,
            EntityKind::Group => &mut self.group,
            EntityKind::Batch => &mut self.batch,
            EntityKind::MaterialsProducer => &mut self.materials_producer,
            EntityKind::Resource => &mut self.resource,
            EntityKind::Stage => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub id: ResourceId,
    /// Track the last change time of person levels
    #[serde(default)]
    pub track_person_time: bool,
}

/// Everything needed to create one person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonSeed {
    pub region: RegionId,
    pub compartment: CompartmentId,
    #[serde(default)]
    pub properties: BTreeMap<PropertyId, PropertyValue>,
    /// `(resource, amount)` pairs
    #[serde(default)]
    pub resources: Vec<(ResourceId, u64)>,
}

impl PersonSeed {
    pub fn new(region: RegionId, compartment: CompartmentId) -> Self {
        Self {
            region,
            compartment,
            properties: BTreeMap::new(),
            resources: Vec::new(),
        }
    }

    pub fn property(mut self, property: impl Into<PropertyId>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(property.into(), value.into());
        self
    }

    pub fn resource(mut self, resource: ResourceId, amount: u64) -> Self {
        self.resources.push((resource, amount));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSeed {
    pub group_type: GroupTypeId,
    /// Positions in the scenario's person list
    #[serde(default)]
    pub members: Vec<usize>,
    #[serde(default)]
    pub properties: BTreeMap<PropertyId, PropertyValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSeed {
    pub producer: MaterialsProducerId,
    pub material: MaterialId,
    pub amount: f64,
    #[serde(default)]
    pub properties: BTreeMap<PropertyId, PropertyValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSeed {
    pub producer: MaterialsProducerId,
    #[serde(default)]
    pub offered: bool,
    /// Batches created directly on the stage; their producer must match
    #[serde(default)]
    pub batches: Vec<BatchSeed>,
}

/// An initial property value for a non-person entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyAssignment {
    pub target: PropertyTarget,
    pub property: PropertyId,
    pub value: PropertyValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAssignment {
    pub holder: Holder,
    pub resource: ResourceId,
    pub amount: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub config: KernelConfig,
    pub regions: Vec<RegionId>,
    pub compartments: Vec<CompartmentId>,
    pub resources: Vec<ResourceSpec>,
    pub materials: Vec<MaterialId>,
    pub producers: Vec<MaterialsProducerId>,
    pub group_types: Vec<GroupTypeId>,
    pub global_components: Vec<ComponentId>,
    pub properties: PropertySchemas,
    pub property_values: Vec<PropertyAssignment>,
    pub resource_levels: Vec<ResourceAssignment>,
    pub people: Vec<PersonSeed>,
    pub groups: Vec<GroupSeed>,
    pub batches: Vec<BatchSeed>,
    pub stages: Vec<StageSeed>,
}

impl Scenario {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = toml::from_str(content)?;
        scenario.config.validate().map_err(ScenarioError::Config)?;
        Ok(scenario)
    }

    pub fn with_config(mut self, config: KernelConfig) -> Self {
        self.config = config;
        self
    }

    pub fn region(mut self, region: RegionId) -> Self {
        self.regions.push(region);
        self
    }

    pub fn compartment(mut self, compartment: CompartmentId) -> Self {
        self.compartments.push(compartment);
        self
    }

    pub fn resource(mut self, resource: ResourceId, track_person_time: bool) -> Self {
        self.resources.push(ResourceSpec {
            id: resource,
            track_person_time,
        });
        self
    }

    pub fn material(mut self, material: MaterialId) -> Self {
        self.materials.push(material);
        self
    }

    pub fn producer(mut self, producer: MaterialsProducerId) -> Self {
        self.producers.push(producer);
        self
    }

    pub fn group_type(mut self, group_type: GroupTypeId) -> Self {
        self.group_types.push(group_type);
        self
    }

    pub fn global_component(mut self, component: impl Into<ComponentId>) -> Self {
        self.global_components.push(component.into());
        self
    }

    /// Stage properties don't exist; they are ignored
    pub fn define(mut self, kind: EntityKind, schema: PropertySchema) -> Self {
        if let Some(schemas) = self.properties.for_kind_mut(kind) {
            schemas.push(schema);
        }
        self
    }

    pub fn property_value(
        mut self,
        target: PropertyTarget,
        property: impl Into<PropertyId>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.property_values.push(PropertyAssignment {
            target,
            property: property.into(),
            value: value.into(),
        });
        self
    }

    /// Regions and producers only; person levels come with the person
    pub fn resource_level(mut self, holder: Holder, resource: ResourceId, amount: u64) -> Self {
        self.resource_levels.push(ResourceAssignment {
            holder,
            resource,
            amount,
        });
        self
    }

    pub fn person(mut self, seed: PersonSeed) -> Self {
        self.people.push(seed);
        self
    }

    pub fn group(mut self, seed: GroupSeed) -> Self {
        self.groups.push(seed);
        self
    }

    pub fn batch(mut self, seed: BatchSeed) -> Self {
        self.batches.push(seed);
        self
    }

    pub fn stage(mut self, seed: StageSeed) -> Self {
        self.stages.push(seed);
        self
    }
}
