//! Property tests: indices, location counters and reverse indices stay
//! consistent with state under arbitrary mutation sequences, for every
//! reverse index policy

use proptest::prelude::*;

use compartment_kernel::*;

const REGIONS: u32 = 3;
const COMPARTMENTS: u32 = 2;
const GROUPS: usize = 2;
const HOUSEHOLD: GroupTypeId = GroupTypeId(1);

#[derive(Debug, Clone)]
enum Op {
    Add { region: u32, compartment: u32, flagged: bool },
    Move { pick: usize, region: u32 },
    Progress { pick: usize, compartment: u32 },
    Toggle { pick: usize },
    Regroup { pick: usize, group: usize },
    Remove { pick: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1..=REGIONS, 1..=COMPARTMENTS, any::<bool>())
            .prop_map(|(region, compartment, flagged)| Op::Add { region, compartment, flagged }),
        (any::<usize>(), 1..=REGIONS).prop_map(|(pick, region)| Op::Move { pick, region }),
        (any::<usize>(), 1..=COMPARTMENTS)
            .prop_map(|(pick, compartment)| Op::Progress { pick, compartment }),
        any::<usize>().prop_map(|pick| Op::Toggle { pick }),
        (any::<usize>(), 0..GROUPS).prop_map(|(pick, group)| Op::Regroup { pick, group }),
        any::<usize>().prop_map(|pick| Op::Remove { pick }),
    ]
}

fn policy() -> impl Strategy<Value = ReverseIndexPolicy> {
    prop_oneof![
        Just(ReverseIndexPolicy::None),
        Just(ReverseIndexPolicy::Array),
        Just(ReverseIndexPolicy::Hash),
    ]
}

fn kernel(policy: ReverseIndexPolicy) -> Kernel {
    let config = KernelConfig {
        region_members: policy,
        compartment_members: policy,
        group_members: policy,
        ..KernelConfig::default()
    };
    let mut scenario = Scenario::new()
        .with_config(config)
        .group_type(HOUSEHOLD)
        .global_component("driver")
        .define(EntityKind::Person, PropertySchema::new("flagged", false));
    for region in 1..=REGIONS {
        scenario = scenario.region(RegionId(region));
    }
    for compartment in 1..=COMPARTMENTS {
        scenario = scenario.compartment(CompartmentId(compartment));
    }
    let mut kernel = Kernel::from_scenario(&scenario).unwrap();
    kernel.begin_turn(Focus::Component(ComponentRef::Global(ComponentId::from("driver"))));
    for _ in 0..GROUPS {
        kernel.add_group(HOUSEHOLD).unwrap();
    }
    kernel
        .add_population_index(
            "flagged_in_r1",
            Filter::property("flagged", Comparison::Equal, true).and(Filter::region(RegionId(1))),
        )
        .unwrap();
    kernel
        .add_population_index(
            "not_c1",
            Filter::compartment(CompartmentId(1)).negate(),
        )
        .unwrap();
    kernel
        .add_population_index("housed_first", Filter::GroupMember(GroupId(0)))
        .unwrap();
    kernel
        .add_partition(
            "grid",
            PartitionSpec::new(Filter::All)
                .by(DimensionSource::Region)
                .by(DimensionSource::Compartment),
        )
        .unwrap();
    kernel
}

fn pick(kernel: &Kernel, pick: usize) -> Option<PersonId> {
    let people = kernel.person_ids();
    (!people.is_empty()).then(|| people[pick % people.len()])
}

fn apply(kernel: &mut Kernel, op: &Op) {
    match *op {
        Op::Add { region, compartment, flagged } => {
            kernel
                .add_person(
                    PersonSeed::new(RegionId(region), CompartmentId(compartment))
                        .property("flagged", flagged),
                )
                .unwrap();
        }
        Op::Move { pick: p, region } => {
            if let Some(person) = pick(kernel, p) {
                let region = RegionId(region);
                let result = kernel.set_person_region(person, region);
                if kernel.person_region(person).unwrap() != region {
                    panic!("move to {} failed: {:?}", region, result);
                }
            }
        }
        Op::Progress { pick: p, compartment } => {
            if let Some(person) = pick(kernel, p) {
                let _ = kernel.set_person_compartment(person, CompartmentId(compartment));
                assert_eq!(kernel.person_compartment(person).unwrap(), CompartmentId(compartment));
            }
        }
        Op::Toggle { pick: p } => {
            if let Some(person) = pick(kernel, p) {
                let flagged = kernel.person_property(person, "flagged").unwrap().as_bool() == Some(true);
                kernel.set_person_property(person, "flagged", !flagged).unwrap();
            }
        }
        Op::Regroup { pick: p, group } => {
            if let Some(person) = pick(kernel, p) {
                let group = kernel.group_ids()[group];
                if kernel.is_group_member(person, group).unwrap() {
                    kernel.remove_person_from_group(person, group).unwrap();
                } else {
                    kernel.add_person_to_group(person, group).unwrap();
                }
            }
        }
        Op::Remove { pick: p } => {
            if let Some(person) = pick(kernel, p) {
                kernel.remove_person(person).unwrap();
            }
        }
    }
}

fn expected_flagged_in_r1(kernel: &Kernel) -> Vec<PersonId> {
    kernel
        .person_ids()
        .into_iter()
        .filter(|&person| {
            kernel.person_property(person, "flagged").unwrap() == PropertyValue::Bool(true)
                && kernel.person_region(person).unwrap() == RegionId(1)
        })
        .collect()
}

fn check_consistent(kernel: &Kernel) {
    let mut expected = expected_flagged_in_r1(kernel);
    expected.sort();
    assert_eq!(kernel.index_members(&"flagged_in_r1".into()).unwrap(), expected);

    let not_c1 = kernel
        .person_ids()
        .into_iter()
        .filter(|&person| kernel.person_compartment(person).unwrap() != CompartmentId(1))
        .count();
    assert_eq!(kernel.index_size(&"not_c1".into()).unwrap(), not_c1);

    let mut placed = 0;
    for &region in kernel.region_ids() {
        let members = kernel.people_in_region(region).unwrap();
        assert_eq!(kernel.region_population_count(region).unwrap(), members.len());
        for &compartment in kernel.compartment_ids() {
            let cell = LabelQuery::exact([Label::Region(region), Label::Compartment(compartment)]);
            let in_cell = members
                .iter()
                .filter(|&&person| kernel.person_compartment(person).unwrap() == compartment)
                .count();
            assert_eq!(kernel.partition_size(&"grid".into(), &cell).unwrap(), in_cell);
        }
        placed += members.len();
    }
    assert_eq!(placed, kernel.population_count());

    let by_compartment: usize = kernel
        .compartment_ids()
        .iter()
        .map(|&compartment| {
            let members = kernel.people_in_compartment(compartment).unwrap();
            assert_eq!(kernel.compartment_population_count(compartment).unwrap(), members.len());
            members.len()
        })
        .sum();
    assert_eq!(by_compartment, kernel.population_count());

    for group in kernel.group_ids() {
        let members = kernel.group_members(group).unwrap();
        assert_eq!(kernel.group_size(group).unwrap(), members.len());
        let direct: Vec<PersonId> = kernel
            .person_ids()
            .into_iter()
            .filter(|&person| kernel.is_group_member(person, group).unwrap())
            .collect();
        let mut sorted = members.clone();
        sorted.sort();
        assert_eq!(sorted, direct);
        if group == GroupId(0) {
            assert_eq!(kernel.index_members(&"housed_first".into()).unwrap(), direct);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_indices_match_direct_evaluation(
        policy in policy(),
        ops in prop::collection::vec(op(), 1..80),
    ) {
        let mut kernel = kernel(policy);
        for op in &ops {
            apply(&mut kernel, op);
            check_consistent(&kernel);
        }
    }

    #[test]
    fn prop_index_added_late_matches_index_added_early(
        policy in policy(),
        ops in prop::collection::vec(op(), 1..60),
    ) {
        let mut kernel = kernel(policy);
        for op in &ops {
            apply(&mut kernel, op);
        }
        kernel
            .add_population_index(
                "late",
                Filter::property("flagged", Comparison::Equal, true).and(Filter::region(RegionId(1))),
            )
            .unwrap();
        prop_assert_eq!(
            kernel.index_members(&"late".into()).unwrap(),
            kernel.index_members(&"flagged_in_r1".into()).unwrap()
        );
    }
}
