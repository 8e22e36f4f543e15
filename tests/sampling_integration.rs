//! Sampling integration tests

use compartment_kernel::*;

const R1: RegionId = RegionId(1);
const R2: RegionId = RegionId(2);
const C1: CompartmentId = CompartmentId(1);
const HOUSEHOLD: GroupTypeId = GroupTypeId(1);

fn base() -> Scenario {
    Scenario::new()
        .region(R1)
        .region(R2)
        .compartment(C1)
        .group_type(HOUSEHOLD)
        .global_component("sampler")
        .define(EntityKind::Person, PropertySchema::new("weight", 0.0))
}

/// One person per weight, all in R1
fn weighted(weights: &[f64]) -> Kernel {
    let scenario = weights.iter().fold(base(), |scenario, &w| {
        scenario.person(PersonSeed::new(R1, C1).property("weight", w))
    });
    let mut kernel = Kernel::from_scenario(&scenario).unwrap();
    kernel.begin_turn(Focus::Component(ComponentRef::Global(ComponentId::from("sampler"))));
    kernel
}

fn weight_property(kernel: &Kernel, person: PersonId) -> f64 {
    kernel
        .person_property(person, "weight")
        .ok()
        .and_then(|value| value.as_real())
        .unwrap_or(0.0)
}

#[test]
fn test_all_zero_weights_return_none() {
    let kernel = weighted(&[0.0, 0.0, 0.0]);
    assert_eq!(kernel.sample_population_weighted(None, weight_property).unwrap(), None);
    assert_eq!(kernel.sample_region_weighted(R1, None, weight_property).unwrap(), None);
}

#[test]
fn test_weighted_draws_follow_weights() {
    let kernel = weighted(&[1.0, 0.0, 2.0]);
    let mut counts = [0usize; 3];
    for _ in 0..3000 {
        let person = kernel
            .sample_population_weighted(None, weight_property)
            .unwrap()
            .unwrap();
        counts[person.index()] += 1;
    }
    assert_eq!(counts[1], 0);
    let ratio = counts[2] as f64 / counts[0] as f64;
    assert!((1.7..2.4).contains(&ratio), "ratio {} from {:?}", ratio, counts);
}

#[test]
fn test_malformed_weights_rejected() {
    let kernel = weighted(&[1.0, 1.0]);
    let err = kernel
        .sample_population_weighted(None, |_, person| if person.index() == 1 { -1.0 } else { 1.0 })
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::MalformedWeight(-1.0));
    assert_eq!(err.category(), ErrorCategory::Input);

    let err = kernel
        .sample_population_weighted(None, |_, _| f64::NAN)
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MalformedWeight(w) if w.is_nan()));

    let err = kernel
        .sample_population_weighted(None, |_, _| f64::INFINITY)
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MalformedWeight(_)));
}

#[test]
fn test_excluded_person_never_drawn_from_group() {
    let mut kernel = weighted(&[1.0, 1.0, 1.0, 1.0, 1.0, 3.0, 3.0, 3.0, 3.0, 3.0, 9.0, 9.0]);
    let group = kernel.add_group(HOUSEHOLD).unwrap();
    for person in kernel.person_ids().into_iter().take(10) {
        kernel.add_person_to_group(person, group).unwrap();
    }
    let excluded = PersonId(3);
    for _ in 0..1000 {
        let person = kernel.sample_group(group, Some(excluded)).unwrap().unwrap();
        assert_ne!(person, excluded);
        assert!(person.index() < 10);
    }

    // Four remaining light members weigh 4 in total, five heavy ones 15
    let mut heavy = 0;
    for _ in 0..1000 {
        let person = kernel
            .sample_group_weighted(group, Some(excluded), weight_property)
            .unwrap()
            .unwrap();
        assert_ne!(person, excluded);
        assert!(person.index() < 10);
        if person.index() >= 5 {
            heavy += 1;
        }
    }
    let share = heavy as f64 / 1000.0;
    assert!((0.72..0.86).contains(&share), "heavy share {}", share);
}

#[test]
fn test_only_candidate_excluded_returns_none() {
    let kernel = weighted(&[1.0]);
    assert_eq!(kernel.sample_population(Some(PersonId(0))).unwrap(), None);
    assert_eq!(kernel.sample_region(R2, None).unwrap(), None);
    assert_eq!(kernel.sample_compartment(C1, Some(PersonId(0))).unwrap(), None);
}

#[test]
fn test_population_draws_skip_removed_people() {
    let mut kernel = weighted(&[1.0; 40]);
    let survivors = [PersonId(4), PersonId(17), PersonId(33)];
    for person in kernel.person_ids() {
        if !survivors.contains(&person) {
            kernel.remove_person(person).unwrap();
        }
    }
    let mut seen = [0usize; 3];
    for _ in 0..600 {
        let person = kernel.sample_population(Some(PersonId(17))).unwrap().unwrap();
        let at = survivors.iter().position(|&p| p == person).unwrap();
        seen[at] += 1;
    }
    assert_eq!(seen[1], 0);
    assert!(seen[0] > 200 && seen[2] > 200, "{:?}", seen);

    // Recycled slots are drawn again once refilled
    let added = kernel.add_person(PersonSeed::new(R2, C1)).unwrap();
    let drawn: Vec<PersonId> = (0..200)
        .filter_map(|_| kernel.sample_population(None).unwrap())
        .collect();
    assert!(drawn.contains(&added));
    assert!(drawn.iter().all(|&person| kernel.person_exists(person)));
}

#[test]
fn test_index_draw_excludes_member_anywhere_in_set() {
    let mut kernel = weighted(&[1.0; 30]);
    kernel.add_population_index("everyone", Filter::All).unwrap();
    kernel.remove_person(PersonId(0)).unwrap();
    let key = IndexKey::from("everyone");
    for excluded in [PersonId(1), PersonId(29), PersonId(15)] {
        for _ in 0..200 {
            let person = kernel.sample_index(&key, Some(excluded)).unwrap().unwrap();
            assert_ne!(person, excluded);
            assert_ne!(person, PersonId(0));
        }
    }
}

#[test]
fn test_unknown_excluded_person_is_an_error() {
    let kernel = weighted(&[1.0]);
    let err = kernel.sample_population(Some(PersonId(9))).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownPerson(PersonId(9)));
}

#[test]
fn test_index_and_partition_sampling_respect_membership() {
    let mut kernel = weighted(&[0.0, 3.0, 0.0, 5.0]);
    kernel
        .add_population_index(
            "heavy",
            Filter::property("weight", Comparison::Greater, 1.0),
        )
        .unwrap();
    kernel
        .add_partition(
            "by_region",
            PartitionSpec::new(Filter::All).by(DimensionSource::Region),
        )
        .unwrap();
    kernel.set_person_region(PersonId(3), R2).unwrap();

    let heavy = IndexKey::from("heavy");
    for _ in 0..100 {
        let person = kernel.sample_index(&heavy, None).unwrap().unwrap();
        assert!(person == PersonId(1) || person == PersonId(3));
    }
    assert_eq!(
        kernel.sample_index(&heavy, Some(PersonId(1))).unwrap(),
        Some(PersonId(3))
    );
    assert_eq!(
        kernel
            .sample_index_weighted(&heavy, Some(PersonId(3)), weight_property)
            .unwrap(),
        Some(PersonId(1))
    );

    let by_region = IndexKey::from("by_region");
    let in_r2 = LabelQuery::exact([Label::Region(R2)]);
    assert_eq!(
        kernel.sample_partition(&by_region, &in_r2, None).unwrap(),
        Some(PersonId(3))
    );
    assert_eq!(
        kernel
            .sample_partition_weighted(&by_region, &LabelQuery::new(vec![None]), None, |_, p| {
                if p == PersonId(2) { 1.0 } else { 0.0 }
            })
            .unwrap(),
        Some(PersonId(2))
    );

    let err = kernel.sample_index(&"missing".into(), None).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownIndex("missing".into()));
}

#[test]
fn test_same_seed_same_draws() {
    let draws = |kernel: &Kernel| -> Vec<Option<PersonId>> {
        (0..50).map(|_| kernel.sample_population(None).unwrap()).collect()
    };
    let first = weighted(&[1.0; 20]);
    let second = weighted(&[1.0; 20]);
    assert_eq!(draws(&first), draws(&second));
}
