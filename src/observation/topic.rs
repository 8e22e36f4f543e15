//! Subscription topics and notification payloads

use serde::Serialize;

use crate::core::types::*;
use crate::core::value::PropertyValue;

/// Which people a person-level subscription covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonScope {
    All,
    Region(RegionId),
    Compartment(CompartmentId),
    Person(PersonId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupScope {
    All,
    GroupType(GroupTypeId),
    Group(GroupId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageScope {
    All,
    Producer(MaterialsProducerId),
    Stage(StageId),
}

/// Something a component can subscribe to.
///
/// Granularities are independent: a change to one person's property is
/// published on the all-people, region, compartment and single-person
/// topics at once, and each subscriber hears it once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    GlobalProperty(PropertyId),
    RegionProperty(RegionId, PropertyId),
    CompartmentProperty(CompartmentId, PropertyId),
    ProducerProperty(MaterialsProducerId, PropertyId),
    ResourceProperty(ResourceId, PropertyId),
    PersonProperty(PersonScope, PropertyId),
    PersonRegion(PersonScope),
    PersonCompartment(PersonScope),
    PersonResource(PersonScope, ResourceId),
    PersonAddition(PersonScope),
    PersonRemoval(PersonScope),
    RegionResource(RegionId, ResourceId),
    ProducerResource(MaterialsProducerId, ResourceId),
    GroupConstruction(GroupScope),
    GroupDestruction(GroupScope),
    GroupProperty(GroupScope, PropertyId),
    GroupMembership(GroupScope),
    StageOffer(StageScope),
    StageTransfer(StageScope),
}

/// A removable entity that topics can be scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopedEntity {
    Person(PersonId),
    Group(GroupId),
    Stage(StageId),
}

impl Topic {
    /// The removable entity this topic is bound to, if any
    pub fn scoped_entity(&self) -> Option<ScopedEntity> {
        match self {
            Topic::PersonProperty(PersonScope::Person(person), _)
            | Topic::PersonRegion(PersonScope::Person(person))
            | Topic::PersonCompartment(PersonScope::Person(person))
            | Topic::PersonResource(PersonScope::Person(person), _)
            | Topic::PersonAddition(PersonScope::Person(person))
            | Topic::PersonRemoval(PersonScope::Person(person)) => Some(ScopedEntity::Person(*person)),
            Topic::GroupConstruction(GroupScope::Group(group))
            | Topic::GroupDestruction(GroupScope::Group(group))
            | Topic::GroupProperty(GroupScope::Group(group), _)
            | Topic::GroupMembership(GroupScope::Group(group)) => Some(ScopedEntity::Group(*group)),
            Topic::StageOffer(StageScope::Stage(stage))
            | Topic::StageTransfer(StageScope::Stage(stage)) => Some(ScopedEntity::Stage(*stage)),
            _ => None,
        }
    }
}

/// What changed, with before and after values
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Observation {
    GlobalProperty {
        property: PropertyId,
        previous: PropertyValue,
        current: PropertyValue,
    },
    RegionProperty {
        region: RegionId,
        property: PropertyId,
        previous: PropertyValue,
        current: PropertyValue,
    },
    CompartmentProperty {
        compartment: CompartmentId,
        property: PropertyId,
        previous: PropertyValue,
        current: PropertyValue,
    },
    ProducerProperty {
        producer: MaterialsProducerId,
        property: PropertyId,
        previous: PropertyValue,
        current: PropertyValue,
    },
    ResourceProperty {
        resource: ResourceId,
        property: PropertyId,
        previous: PropertyValue,
        current: PropertyValue,
    },
    PersonProperty {
        person: PersonId,
        property: PropertyId,
        previous: PropertyValue,
        current: PropertyValue,
    },
    PersonRegion {
        person: PersonId,
        previous: RegionId,
        current: RegionId,
    },
    PersonCompartment {
        person: PersonId,
        previous: CompartmentId,
        current: CompartmentId,
    },
    PersonResource {
        person: PersonId,
        resource: ResourceId,
        previous: u64,
        current: u64,
    },
    PersonAdded {
        person: PersonId,
    },
    PersonRemoved {
        person: PersonId,
        region: RegionId,
        compartment: CompartmentId,
    },
    RegionResource {
        region: RegionId,
        resource: ResourceId,
        previous: u64,
        current: u64,
    },
    ProducerResource {
        producer: MaterialsProducerId,
        resource: ResourceId,
        previous: u64,
        current: u64,
    },
    GroupConstructed {
        group: GroupId,
        group_type: GroupTypeId,
    },
    GroupDestroyed {
        group: GroupId,
        group_type: GroupTypeId,
    },
    GroupProperty {
        group: GroupId,
        property: PropertyId,
        previous: PropertyValue,
        current: PropertyValue,
    },
    GroupMembership {
        group: GroupId,
        person: PersonId,
        joined: bool,
    },
    StageOffer {
        stage: StageId,
        offered: bool,
    },
    StageTransfer {
        stage: StageId,
        from: MaterialsProducerId,
        to: MaterialsProducerId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_entity() {
        assert_eq!(
            Topic::PersonRegion(PersonScope::Person(PersonId(3))).scoped_entity(),
            Some(ScopedEntity::Person(PersonId(3)))
        );
        assert_eq!(
            Topic::GroupProperty(GroupScope::Group(GroupId(1)), "size".into()).scoped_entity(),
            Some(ScopedEntity::Group(GroupId(1)))
        );
        assert_eq!(Topic::PersonRegion(PersonScope::Region(RegionId(1))).scoped_entity(), None);
        assert_eq!(
            Topic::StageOffer(StageScope::Stage(StageId(0))).scoped_entity(),
            Some(ScopedEntity::Stage(StageId(0)))
        );
    }

    #[test]
    fn test_observation_serializes_with_kind_tag() {
        let observation = Observation::PersonRegion {
            person: PersonId(1),
            previous: RegionId(1),
            current: RegionId(2),
        };
        let json = serde_json::to_string(&observation).unwrap();
        assert!(json.contains("\"kind\":\"person_region\""));
    }
}
