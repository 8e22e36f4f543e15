//! Composable person predicates
//!
//! Filters are plain data: a tree of leaf tests over person properties,
//! location, resource levels and group membership, combined with and/or/not.
//! Indices and partitions evaluate them against a `PersonView`.

use serde::{Deserialize, Serialize};

use crate::core::types::*;
use crate::core::value::PropertyValue;

/// Read access to the person state a filter can test
pub trait PersonView {
    fn property(&self, person: PersonId, property: &PropertyId) -> Option<PropertyValue>;
    fn region(&self, person: PersonId) -> Option<RegionId>;
    fn compartment(&self, person: PersonId) -> Option<CompartmentId>;
    fn resource_level(&self, person: PersonId, resource: ResourceId) -> u64;
    fn is_group_member(&self, person: PersonId, group: GroupId) -> bool;
    fn group_type_count(&self, person: PersonId, group_type: GroupTypeId) -> usize;
}

/// Comparison operators for leaf tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl Comparison {
    pub fn test<T: PartialOrd + ?Sized>(self, left: &T, right: &T) -> bool {
        match self {
            Comparison::Equal => left == right,
            Comparison::NotEqual => left != right,
            Comparison::Less => left < right,
            Comparison::LessOrEqual => left <= right,
            Comparison::Greater => left > right,
            Comparison::GreaterOrEqual => left >= right,
        }
    }
}

/// A person attribute that indices can depend on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Attribute {
    Property(PropertyId),
    Region,
    Compartment,
    Resource(ResourceId),
    GroupMembership,
}

/// Predicate expression over a single person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Every person
    All,
    Property {
        property: PropertyId,
        comparison: Comparison,
        value: PropertyValue,
    },
    /// Person is in one of the listed regions
    Region(Vec<RegionId>),
    Compartment(Vec<CompartmentId>),
    Resource {
        resource: ResourceId,
        comparison: Comparison,
        amount: u64,
    },
    GroupMember(GroupId),
    /// Number of groups of a type the person belongs to
    GroupTypeCount {
        group_type: GroupTypeId,
        comparison: Comparison,
        count: usize,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn property(
        property: impl Into<PropertyId>,
        comparison: Comparison,
        value: impl Into<PropertyValue>,
    ) -> Self {
        Filter::Property {
            property: property.into(),
            comparison,
            value: value.into(),
        }
    }

    pub fn region(region: RegionId) -> Self {
        Filter::Region(vec![region])
    }

    pub fn compartment(compartment: CompartmentId) -> Self {
        Filter::Compartment(vec![compartment])
    }

    pub fn resource(resource: ResourceId, comparison: Comparison, amount: u64) -> Self {
        Filter::Resource {
            resource,
            comparison,
            amount,
        }
    }

    pub fn and(self, other: Filter) -> Self {
        match self {
            Filter::And(mut parts) => {
                parts.push(other);
                Filter::And(parts)
            }
            filter => Filter::And(vec![filter, other]),
        }
    }

    pub fn or(self, other: Filter) -> Self {
        match self {
            Filter::Or(mut parts) => {
                parts.push(other);
                Filter::Or(parts)
            }
            filter => Filter::Or(vec![filter, other]),
        }
    }

    pub fn negate(self) -> Self {
        Filter::Not(Box::new(self))
    }

    pub fn evaluate<V: PersonView + ?Sized>(&self, view: &V, person: PersonId) -> bool {
        match self {
            Filter::All => true,
            Filter::Property {
                property,
                comparison,
                value,
            } => view
                .property(person, property)
                .map_or(false, |current| comparison.test(&current, value)),
            Filter::Region(regions) => view
                .region(person)
                .map_or(false, |region| regions.contains(&region)),
            Filter::Compartment(compartments) => view
                .compartment(person)
                .map_or(false, |compartment| compartments.contains(&compartment)),
            Filter::Resource {
                resource,
                comparison,
                amount,
            } => comparison.test(&view.resource_level(person, *resource), amount),
            Filter::GroupMember(group) => view.is_group_member(person, *group),
            Filter::GroupTypeCount {
                group_type,
                comparison,
                count,
            } => comparison.test(&view.group_type_count(person, *group_type), count),
            Filter::And(parts) => parts.iter().all(|part| part.evaluate(view, person)),
            Filter::Or(parts) => parts.iter().any(|part| part.evaluate(view, person)),
            Filter::Not(inner) => !inner.evaluate(view, person),
        }
    }

    /// Replaces every membership test on `group` with a test nobody
    /// passes; true when any leaf was replaced
    pub fn forget_group(&mut self, group: GroupId) -> bool {
        match self {
            Filter::GroupMember(member_of) if *member_of == group => {
                *self = Filter::All.negate();
                true
            }
            Filter::And(parts) | Filter::Or(parts) => parts
                .iter_mut()
                .fold(false, |forgot, part| part.forget_group(group) || forgot),
            Filter::Not(inner) => inner.forget_group(group),
            _ => false,
        }
    }

    /// Attributes whose change can flip this filter's result
    pub fn dependencies(&self) -> Vec<Attribute> {
        let mut attributes = Vec::new();
        self.collect_dependencies(&mut attributes);
        attributes
    }

    fn collect_dependencies(&self, out: &mut Vec<Attribute>) {
        let attribute = match self {
            Filter::All => return,
            Filter::Property { property, .. } => Attribute::Property(property.clone()),
            Filter::Region(_) => Attribute::Region,
            Filter::Compartment(_) => Attribute::Compartment,
            Filter::Resource { resource, .. } => Attribute::Resource(*resource),
            Filter::GroupMember(_) | Filter::GroupTypeCount { .. } => Attribute::GroupMembership,
            Filter::And(parts) | Filter::Or(parts) => {
                for part in parts {
                    part.collect_dependencies(out);
                }
                return;
            }
            Filter::Not(inner) => {
                inner.collect_dependencies(out);
                return;
            }
        };
        if !out.contains(&attribute) {
            out.push(attribute);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ahash::AHashMap;

    /// Hand-filled person state for filter and index tests
    #[derive(Default)]
    pub(crate) struct FakeView {
        pub properties: AHashMap<(PersonId, PropertyId), PropertyValue>,
        pub regions: AHashMap<PersonId, RegionId>,
        pub compartments: AHashMap<PersonId, CompartmentId>,
        pub resources: AHashMap<(PersonId, ResourceId), u64>,
        pub groups: AHashMap<PersonId, Vec<(GroupId, GroupTypeId)>>,
    }

    impl PersonView for FakeView {
        fn property(&self, person: PersonId, property: &PropertyId) -> Option<PropertyValue> {
            self.properties.get(&(person, property.clone())).cloned()
        }
        fn region(&self, person: PersonId) -> Option<RegionId> {
            self.regions.get(&person).copied()
        }
        fn compartment(&self, person: PersonId) -> Option<CompartmentId> {
            self.compartments.get(&person).copied()
        }
        fn resource_level(&self, person: PersonId, resource: ResourceId) -> u64 {
            self.resources.get(&(person, resource)).copied().unwrap_or(0)
        }
        fn is_group_member(&self, person: PersonId, group: GroupId) -> bool {
            self.groups
                .get(&person)
                .map_or(false, |groups| groups.iter().any(|(g, _)| *g == group))
        }
        fn group_type_count(&self, person: PersonId, group_type: GroupTypeId) -> usize {
            self.groups
                .get(&person)
                .map_or(0, |groups| groups.iter().filter(|(_, t)| *t == group_type).count())
        }
    }

    fn view() -> FakeView {
        let mut view = FakeView::default();
        view.properties.insert((PersonId(0), "age".into()), PropertyValue::Int(70));
        view.properties.insert((PersonId(1), "age".into()), PropertyValue::Int(30));
        view.regions.insert(PersonId(0), RegionId(1));
        view.regions.insert(PersonId(1), RegionId(2));
        view.resources.insert((PersonId(1), ResourceId(5)), 3);
        view.groups.insert(PersonId(1), vec![(GroupId(0), GroupTypeId(1))]);
        view
    }

    #[test]
    fn test_leaf_filters() {
        let view = view();
        let elderly = Filter::property("age", Comparison::GreaterOrEqual, 65i64);
        assert!(elderly.evaluate(&view, PersonId(0)));
        assert!(!elderly.evaluate(&view, PersonId(1)));

        assert!(Filter::region(RegionId(2)).evaluate(&view, PersonId(1)));
        assert!(Filter::resource(ResourceId(5), Comparison::Greater, 0).evaluate(&view, PersonId(1)));
        assert!(Filter::GroupMember(GroupId(0)).evaluate(&view, PersonId(1)));
        assert!(!Filter::GroupMember(GroupId(0)).evaluate(&view, PersonId(0)));
    }

    #[test]
    fn test_missing_property_is_false() {
        let view = view();
        let filter = Filter::property("height", Comparison::Equal, 1i64);
        assert!(!filter.evaluate(&view, PersonId(0)));
        assert!(filter.negate().evaluate(&view, PersonId(0)));
    }

    #[test]
    fn test_combinators() {
        let view = view();
        let filter = Filter::region(RegionId(1))
            .or(Filter::resource(ResourceId(5), Comparison::Equal, 3))
            .and(Filter::property("age", Comparison::Less, 50i64));
        assert!(!filter.evaluate(&view, PersonId(0)));
        assert!(filter.evaluate(&view, PersonId(1)));
    }

    #[test]
    fn test_forget_group_rewrites_only_that_group() {
        let mut view = view();
        let mut filter = Filter::GroupMember(GroupId(0))
            .or(Filter::GroupMember(GroupId(4)))
            .and(Filter::GroupMember(GroupId(0)).negate().negate());
        assert!(filter.forget_group(GroupId(0)));
        assert!(!filter.forget_group(GroupId(0)));
        assert!(!filter.evaluate(&view, PersonId(1)));

        // A recycled id gains members without reviving the old test
        view.groups.insert(PersonId(0), vec![(GroupId(0), GroupTypeId(1))]);
        assert!(!filter.evaluate(&view, PersonId(0)));
        view.groups.insert(PersonId(0), vec![(GroupId(0), GroupTypeId(1)), (GroupId(4), GroupTypeId(1))]);
        assert!(!filter.evaluate(&view, PersonId(0)));
        assert!(Filter::GroupMember(GroupId(0))
            .negate()
            .forget_group(GroupId(0)));
    }

    #[test]
    fn test_dependencies_are_deduplicated() {
        let filter = Filter::property("age", Comparison::Less, 50i64)
            .and(Filter::property("age", Comparison::Greater, 10i64))
            .and(Filter::region(RegionId(1)).negate())
            .and(Filter::GroupTypeCount {
                group_type: GroupTypeId(1),
                comparison: Comparison::Greater,
                count: 0,
            });
        assert_eq!(
            filter.dependencies(),
            vec![
                Attribute::Property("age".into()),
                Attribute::Region,
                Attribute::GroupMembership,
            ]
        );
        assert!(Filter::All.dependencies().is_empty());
    }
}
