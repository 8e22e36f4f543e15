//! Core type definitions used throughout the kernel

use serde::{Deserialize, Serialize};
use std::fmt;

/// Simulation time, owned and advanced by the plan scheduler
pub type Time = f64;

/// Dense identifier backed by a recyclable slot.
///
/// Slots are reused after removal, so a stale id may later name a
/// different entity of the same kind.
macro_rules! slot_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            Serialize, Deserialize, derive_more::Display, derive_more::From,
        )]
        pub struct $name(pub usize);

        impl $name {
            pub fn new(index: usize) -> Self {
                Self(index)
            }

            #[inline]
            pub fn index(self) -> usize {
                self.0
            }
        }
    };
}

/// Identifier drawn from a set that is closed once the scenario loads
macro_rules! closed_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            Serialize, Deserialize, derive_more::Display, derive_more::From,
        )]
        pub struct $name(pub u32);
    };
}

/// Identifier carried as a name
macro_rules! named_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord,
            Serialize, Deserialize, derive_more::Display, derive_more::From,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(name: impl Into<String>) -> Self {
                Self(name.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(name: &str) -> Self {
                Self(name.to_string())
            }
        }
    };
}

slot_id!(
    /// A person in the simulated population
    PersonId
);
slot_id!(GroupId);
slot_id!(BatchId);
slot_id!(StageId);

closed_id!(RegionId);
closed_id!(CompartmentId);
closed_id!(ResourceId);
closed_id!(MaterialId);
closed_id!(MaterialsProducerId);
closed_id!(GroupTypeId);

named_id!(
    /// Property name, unique within one entity kind
    PropertyId
);
named_id!(
    /// Name of a global-scope component
    ComponentId
);
named_id!(
    /// Key of a population index or partition
    IndexKey
);
named_id!(
    /// Optional per-component key of a scheduled plan
    PlanKey
);

/// The kinds of entity that carry properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Global,
    Region,
    Compartment,
    Person,
    Group,
    Batch,
    Stage,
    MaterialsProducer,
    Resource,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Global => "global",
            EntityKind::Region => "region",
            EntityKind::Compartment => "compartment",
            EntityKind::Person => "person",
            EntityKind::Group => "group",
            EntityKind::Batch => "batch",
            EntityKind::Stage => "stage",
            EntityKind::MaterialsProducer => "materials producer",
            EntityKind::Resource => "resource",
        };
        f.write_str(name)
    }
}

/// Addresses one property-bearing entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyTarget {
    Global,
    Region(RegionId),
    Compartment(CompartmentId),
    Person(PersonId),
    Group(GroupId),
    Batch(BatchId),
    MaterialsProducer(MaterialsProducerId),
    Resource(ResourceId),
}

impl PropertyTarget {
    pub fn kind(&self) -> EntityKind {
        match self {
            PropertyTarget::Global => EntityKind::Global,
            PropertyTarget::Region(_) => EntityKind::Region,
            PropertyTarget::Compartment(_) => EntityKind::Compartment,
            PropertyTarget::Person(_) => EntityKind::Person,
            PropertyTarget::Group(_) => EntityKind::Group,
            PropertyTarget::Batch(_) => EntityKind::Batch,
            PropertyTarget::MaterialsProducer(_) => EntityKind::MaterialsProducer,
            PropertyTarget::Resource(_) => EntityKind::Resource,
        }
    }
}

/// Holder of a resource level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Holder {
    Person(PersonId),
    Region(RegionId),
    MaterialsProducer(MaterialsProducerId),
}

/// A component that can hold focus, own indices and receive notifications
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentRef {
    Global(ComponentId),
    Region(RegionId),
    Compartment(CompartmentId),
    MaterialsProducer(MaterialsProducerId),
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentRef::Global(id) => write!(f, "global component '{}'", id),
            ComponentRef::Region(id) => write!(f, "region component {}", id),
            ComponentRef::Compartment(id) => write!(f, "compartment component {}", id),
            ComponentRef::MaterialsProducer(id) => write!(f, "materials producer {}", id),
        }
    }
}

/// Whoever is currently driving the kernel
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Focus {
    /// Between turns; nothing may mutate
    #[default]
    None,
    /// The simulation itself (initialization and scheduler bookkeeping)
    Simulation,
    Component(ComponentRef),
}

impl Focus {
    pub fn component(&self) -> Option<&ComponentRef> {
        match self {
            Focus::Component(component) => Some(component),
            _ => None,
        }
    }

    /// True when `component` is the one currently holding focus
    pub fn is(&self, component: &ComponentRef) -> bool {
        self.component() == Some(component)
    }
}

impl From<ComponentRef> for Focus {
    fn from(component: ComponentRef) -> Self {
        Focus::Component(component)
    }
}

impl fmt::Display for Focus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Focus::None => f.write_str("no component"),
            Focus::Simulation => f.write_str("simulation"),
            Focus::Component(component) => component.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_id_index() {
        let id = PersonId::new(7);
        assert_eq!(id.index(), 7);
        assert_eq!(PersonId::from(7), id);
        assert_eq!(id.to_string(), "7");
    }

    #[test]
    fn test_named_id_from_str() {
        let a = PropertyId::from("age");
        let b = PropertyId::new(String::from("age"));
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "age");
    }

    #[test]
    fn test_focus_matches_component() {
        let region = ComponentRef::Region(RegionId(3));
        let focus = Focus::from(region.clone());
        assert!(focus.is(&region));
        assert!(!Focus::Simulation.is(&region));
        assert_eq!(Focus::None.component(), None);
    }

    #[test]
    fn test_property_target_kind() {
        assert_eq!(PropertyTarget::Global.kind(), EntityKind::Global);
        assert_eq!(PropertyTarget::Batch(BatchId(2)).kind(), EntityKind::Batch);
    }

    #[test]
    fn test_focus_display() {
        assert_eq!(Focus::None.to_string(), "no component");
        let focus = Focus::Component(ComponentRef::Global(ComponentId::from("vaccinator")));
        assert_eq!(focus.to_string(), "global component 'vaccinator'");
    }
}
