//! Schema-checked property storage for one entity kind

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::ErrorKind;
use crate::core::types::{EntityKind, PropertyId, Time};
use crate::core::value::{PropertyValue, ValueType};
use crate::store::column::ValueColumn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutability {
    #[default]
    Mutable,
    /// Locked after the first write to a slot
    WriteOnce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeTracking {
    #[default]
    Untracked,
    /// Keep the simulation time of the last write per slot
    LastWrite,
}

/// Schema of one property, fixed at initialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub value_type: ValueType,
    pub default: PropertyValue,
    #[serde(default)]
    pub mutability: Mutability,
    #[serde(default)]
    pub time_tracking: TimeTracking,
}

impl PropertyDefinition {
    /// A mutable, untracked property whose type is taken from its default
    pub fn new(default: impl Into<PropertyValue>) -> Self {
        let default = default.into();
        Self {
            value_type: default.value_type(),
            default,
            mutability: Mutability::Mutable,
            time_tracking: TimeTracking::Untracked,
        }
    }

    pub fn write_once(mut self) -> Self {
        self.mutability = Mutability::WriteOnce;
        self
    }

    pub fn tracked(mut self) -> Self {
        self.time_tracking = TimeTracking::LastWrite;
        self
    }

    /// Checks that a value fits this definition
    pub fn check(&self, property: &PropertyId, value: &PropertyValue) -> Result<(), ErrorKind> {
        if value.value_type() != self.value_type {
            return Err(ErrorKind::IncompatibleValue {
                property: property.clone(),
                expected: self.value_type,
                found: value.value_type(),
            });
        }
        if !value.is_finite() {
            return Err(ErrorKind::NonFiniteValue(property.clone()));
        }
        Ok(())
    }
}

/// Dense container of one property's values, keyed by slot
#[derive(Debug, Clone)]
pub struct PropertyContainer {
    definition: PropertyDefinition,
    column: ValueColumn,
    /// Present only for write-once properties
    written: Option<Vec<bool>>,
    /// Present only for time-tracked properties
    times: Option<Vec<Time>>,
}

impl PropertyContainer {
    pub fn new(definition: PropertyDefinition) -> Self {
        let written = (definition.mutability == Mutability::WriteOnce).then(Vec::new);
        let times = (definition.time_tracking == TimeTracking::LastWrite).then(Vec::new);
        Self {
            column: ValueColumn::new(&definition.default),
            definition,
            written,
            times,
        }
    }

    pub fn definition(&self) -> &PropertyDefinition {
        &self.definition
    }

    #[inline]
    pub fn get(&self, slot: usize) -> PropertyValue {
        self.column.get(slot)
    }

    /// Last write time, or None when the property is untracked
    pub fn last_write_time(&self, slot: usize) -> Option<Time> {
        self.times
            .as_ref()
            .map(|times| times.get(slot).copied().unwrap_or(0.0))
    }

    pub fn is_locked(&self, slot: usize) -> bool {
        self.written
            .as_ref()
            .map(|written| written.get(slot).copied().unwrap_or(false))
            .unwrap_or(false)
    }

    /// Writes the value and its timestamp together; returns the previous value
    pub fn write(
        &mut self,
        property: &PropertyId,
        slot: usize,
        value: &PropertyValue,
        time: Time,
    ) -> Result<PropertyValue, ErrorKind> {
        self.definition.check(property, value)?;
        if self.is_locked(slot) {
            return Err(ErrorKind::WriteOnceProperty(property.clone()));
        }
        let previous = self.column.get(slot);
        if !self.column.set(slot, value) {
            return Err(ErrorKind::Inconsistent(format!(
                "column for '{}' rejected a checked value",
                property
            )));
        }
        if let Some(times) = self.times.as_mut() {
            if times.len() <= slot {
                times.resize(slot + 1, 0.0);
            }
            times[slot] = time;
        }
        if let Some(written) = self.written.as_mut() {
            if written.len() <= slot {
                written.resize(slot + 1, false);
            }
            written[slot] = true;
        }
        Ok(previous)
    }

    /// Returns the slot to its default, unlocked and untimed
    pub fn reset(&mut self, slot: usize) {
        self.column.reset(slot);
        if let Some(times) = self.times.as_mut() {
            if let Some(time) = times.get_mut(slot) {
                *time = 0.0;
            }
        }
        if let Some(written) = self.written.as_mut() {
            if let Some(flag) = written.get_mut(slot) {
                *flag = false;
            }
        }
    }
}

/// All properties of one entity kind
#[derive(Debug, Clone)]
pub struct PropertyStore {
    kind: EntityKind,
    containers: AHashMap<PropertyId, PropertyContainer>,
    /// Definition order, for deterministic snapshots
    ordered: Vec<PropertyId>,
}

impl PropertyStore {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            containers: AHashMap::new(),
            ordered: Vec::new(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn define(
        &mut self,
        property: PropertyId,
        definition: PropertyDefinition,
    ) -> Result<(), ErrorKind> {
        if self.containers.contains_key(&property) {
            return Err(ErrorKind::DuplicateProperty {
                kind: self.kind,
                property,
            });
        }
        definition.check(&property, &definition.default)?;
        self.containers
            .insert(property.clone(), PropertyContainer::new(definition));
        self.ordered.push(property);
        Ok(())
    }

    pub fn contains(&self, property: &PropertyId) -> bool {
        self.containers.contains_key(property)
    }

    pub fn property_ids(&self) -> &[PropertyId] {
        &self.ordered
    }

    pub fn definition(&self, property: &PropertyId) -> Result<&PropertyDefinition, ErrorKind> {
        self.container(property).map(PropertyContainer::definition)
    }

    fn container(&self, property: &PropertyId) -> Result<&PropertyContainer, ErrorKind> {
        self.containers
            .get(property)
            .ok_or_else(|| self.unknown(property))
    }

    fn unknown(&self, property: &PropertyId) -> ErrorKind {
        ErrorKind::UnknownProperty {
            kind: self.kind,
            property: property.clone(),
        }
    }

    pub fn get(&self, slot: usize, property: &PropertyId) -> Result<PropertyValue, ErrorKind> {
        self.container(property).map(|container| container.get(slot))
    }

    /// Infallible read used by filters; unknown properties read as None
    pub fn value(&self, slot: usize, property: &PropertyId) -> Option<PropertyValue> {
        self.containers.get(property).map(|container| container.get(slot))
    }

    pub fn last_write_time(
        &self,
        slot: usize,
        property: &PropertyId,
    ) -> Result<Option<Time>, ErrorKind> {
        self.container(property)
            .map(|container| container.last_write_time(slot))
    }

    /// Every check `set` performs, without writing
    pub fn validate_write(
        &self,
        slot: usize,
        property: &PropertyId,
        value: &PropertyValue,
    ) -> Result<(), ErrorKind> {
        let container = self.container(property)?;
        container.definition().check(property, value)?;
        if container.is_locked(slot) {
            return Err(ErrorKind::WriteOnceProperty(property.clone()));
        }
        Ok(())
    }

    pub fn set(
        &mut self,
        slot: usize,
        property: &PropertyId,
        value: &PropertyValue,
        time: Time,
    ) -> Result<PropertyValue, ErrorKind> {
        let kind = self.kind;
        let container = self
            .containers
            .get_mut(property)
            .ok_or_else(|| ErrorKind::UnknownProperty {
                kind,
                property: property.clone(),
            })?;
        container.write(property, slot, value, time)
    }

    /// Resets every property of a slot, e.g. when its entity is removed
    pub fn reset_slot(&mut self, slot: usize) {
        for container in self.containers.values_mut() {
            container.reset(slot);
        }
    }

    /// Current values of a slot in definition order
    pub fn snapshot(&self, slot: usize) -> Vec<(PropertyId, PropertyValue)> {
        self.ordered
            .iter()
            .map(|property| (property.clone(), self.containers[property].get(slot)))
            .collect()
    }
}
