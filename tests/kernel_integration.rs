//! Kernel facade integration tests

use compartment_kernel::access::Scope;
use compartment_kernel::report::ReportHub;
use compartment_kernel::scenario::GroupSeed;
use compartment_kernel::store::BatchRecord;
use compartment_kernel::*;

const R1: RegionId = RegionId(1);
const R2: RegionId = RegionId(2);
const C1: CompartmentId = CompartmentId(1);
const C2: CompartmentId = CompartmentId(2);
const GOLD: ResourceId = ResourceId(1);
const HOUSEHOLD: GroupTypeId = GroupTypeId(1);
const VACCINE: MaterialId = MaterialId(1);
const FACTORY: MaterialsProducerId = MaterialsProducerId(1);
const OTHER_FACTORY: MaterialsProducerId = MaterialsProducerId(2);

fn scenario() -> Scenario {
    Scenario::new()
        .region(R1)
        .region(R2)
        .compartment(C1)
        .compartment(C2)
        .resource(GOLD, true)
        .group_type(HOUSEHOLD)
        .material(VACCINE)
        .producer(FACTORY)
        .producer(OTHER_FACTORY)
        .global_component("manager")
        .define(EntityKind::Person, PropertySchema::new("age", 0i64).write_once())
        .define(EntityKind::Person, PropertySchema::new("vaccinated", false).tracked())
        .define(EntityKind::Region, PropertySchema::new("lockdown", false))
        .define(EntityKind::Global, PropertySchema::new("r0", 2.5))
        .define(EntityKind::Batch, PropertySchema::new("lot", "none"))
        .resource_level(Holder::Region(R1), GOLD, 100)
}

fn manager() -> Focus {
    Focus::Component(ComponentRef::Global(ComponentId::from("manager")))
}

fn kernel() -> Kernel {
    let mut kernel = Kernel::from_scenario(&scenario()).unwrap();
    kernel.begin_turn(manager());
    kernel
}

#[test]
fn test_person_lifecycle_updates_counts_and_indices() {
    let mut kernel = kernel();
    kernel.add_population_index("in_r1", Filter::region(R1)).unwrap();

    let person = kernel.add_person(PersonSeed::new(R1, C1)).unwrap();
    assert_eq!(kernel.region_population_count(R1).unwrap(), 1);
    assert_eq!(kernel.compartment_population_count(C1).unwrap(), 1);
    assert!(kernel.index_contains(&"in_r1".into(), person).unwrap());

    kernel.set_person_region(person, R2).unwrap();
    assert_eq!(kernel.region_population_count(R1).unwrap(), 0);
    assert_eq!(kernel.region_population_count(R2).unwrap(), 1);
    assert_eq!(kernel.compartment_population_count(C1).unwrap(), 1);
    assert_eq!(kernel.person_region(person).unwrap(), R2);
    assert_eq!(kernel.people_in_region(R2).unwrap(), vec![person]);
    assert!(kernel.people_in_region(R1).unwrap().is_empty());
    assert_eq!(kernel.index_size(&"in_r1".into()).unwrap(), 0);

    kernel.set_person_region(person, R1).unwrap();
    assert!(kernel.index_contains(&"in_r1".into(), person).unwrap());

    kernel.remove_person(person).unwrap();
    assert_eq!(kernel.region_population_count(R1).unwrap(), 0);
    assert_eq!(kernel.population_count(), 0);
    assert!(!kernel.person_exists(person));
    assert!(kernel.index_members(&"in_r1".into()).unwrap().is_empty());
}

#[test]
fn test_write_once_property_keeps_first_value() {
    let mut kernel = kernel();
    let person = kernel.add_person(PersonSeed::new(R1, C1)).unwrap();

    kernel.set_person_property(person, "age", 30i64).unwrap();
    let err = kernel.set_person_property(person, "age", 31i64).unwrap_err();
    assert_eq!(err.kind, ErrorKind::WriteOnceProperty("age".into()));
    assert_eq!(err.category(), ErrorCategory::StateConflict);
    assert_eq!(kernel.person_property(person, "age").unwrap(), PropertyValue::Int(30));
}

#[test]
fn test_seeded_write_once_property_is_locked() {
    let mut kernel = kernel();
    let person = kernel
        .add_person(PersonSeed::new(R1, C1).property("age", 44i64))
        .unwrap();
    assert!(kernel.set_person_property(person, "age", 45i64).is_err());

    // A recycled slot starts unlocked
    kernel.remove_person(person).unwrap();
    let reused = kernel.add_person(PersonSeed::new(R1, C1)).unwrap();
    assert_eq!(reused, person);
    assert_eq!(kernel.person_property(reused, "age").unwrap(), PropertyValue::Int(0));
    kernel.set_person_property(reused, "age", 7i64).unwrap();
}

#[test]
fn test_incompatible_value_rejected_without_change() {
    let mut kernel = kernel();
    let person = kernel.add_person(PersonSeed::new(R1, C1)).unwrap();
    let err = kernel.set_person_property(person, "vaccinated", 1i64).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::IncompatibleValue { .. }));
    assert_eq!(err.category(), ErrorCategory::Input);
    assert_eq!(err.operation, "set_person_property");
    assert_eq!(err.focus, manager());
    assert_eq!(
        kernel.person_property(person, "vaccinated").unwrap(),
        PropertyValue::Bool(false)
    );
}

#[test]
fn test_reads_do_not_touch_timestamps() {
    let mut kernel = kernel();
    let person = kernel.add_person(PersonSeed::new(R1, C1)).unwrap();
    kernel.set_person_property(person, "vaccinated", true).unwrap();
    let target = PropertyTarget::Person(person);
    let time = kernel.property_time(target, &"vaccinated".into()).unwrap();
    for _ in 0..3 {
        assert_eq!(
            kernel.property(target, &"vaccinated".into()).unwrap(),
            PropertyValue::Bool(true)
        );
    }
    assert_eq!(kernel.property_time(target, &"vaccinated".into()).unwrap(), time);
    assert_eq!(time, Some(0.0));
}

#[test]
fn test_same_region_is_a_state_conflict() {
    let mut kernel = kernel();
    let person = kernel.add_person(PersonSeed::new(R1, C1)).unwrap();
    let err = kernel.set_person_region(person, R1).unwrap_err();
    assert_eq!(err.kind, ErrorKind::SameRegion { person, region: R1 });
    let err = kernel.set_person_compartment(person, C1).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::StateConflict);
}

#[test]
fn test_unknown_identifiers_are_input_errors() {
    let mut kernel = kernel();
    let err = kernel.add_person(PersonSeed::new(RegionId(99), C1)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownRegion(RegionId(99)));
    let err = kernel.remove_person(PersonId(5)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownPerson(PersonId(5)));
    assert_eq!(kernel.population_count(), 0);
}

#[test]
fn test_authorization_by_component_kind() {
    let mut kernel = Kernel::from_scenario(&scenario()).unwrap();

    kernel.begin_turn(Focus::Component(ComponentRef::Region(R2)));
    let err = kernel.set_region_property(R1, "lockdown", true).unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::Unauthorized {
            acceptable: vec![Scope::AnyGlobal, Scope::Region(R1)]
        }
    );
    assert_eq!(err.category(), ErrorCategory::Authorization);
    kernel.set_region_property(R2, "lockdown", true).unwrap();
    assert!(kernel.set_global_property("r0", 3.0).is_err());
    kernel.end_turn();

    let err = kernel.add_person(PersonSeed::new(R1, C1)).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Unauthorized { .. }));

    kernel.begin_turn(Focus::Component(ComponentRef::MaterialsProducer(FACTORY)));
    assert!(kernel.add_person(PersonSeed::new(R1, C1)).is_err());
    assert!(kernel.create_stage(OTHER_FACTORY).is_err());
    kernel.create_stage(FACTORY).unwrap();
    kernel.end_turn();
}

#[test]
fn test_resource_transfers_conserve_amounts() {
    let mut kernel = kernel();
    let person = kernel.add_person(PersonSeed::new(R1, C1)).unwrap();

    kernel.transfer_resource_to_person(person, GOLD, 30).unwrap();
    assert_eq!(kernel.resource_level(Holder::Person(person), GOLD).unwrap(), 30);
    assert_eq!(kernel.resource_level(Holder::Region(R1), GOLD).unwrap(), 70);

    kernel.transfer_resource_between_regions(GOLD, R1, R2, 20).unwrap();
    assert_eq!(kernel.resource_level(Holder::Region(R2), GOLD).unwrap(), 20);

    let err = kernel.transfer_resource_to_person(person, GOLD, 51).unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::InsufficientResource {
            resource: GOLD,
            available: 50,
            requested: 51
        }
    );
    assert_eq!(kernel.resource_level(Holder::Person(person), GOLD).unwrap(), 30);

    kernel.transfer_resource_from_person(person, GOLD, 10).unwrap();
    kernel.remove_resource_from_person(person, GOLD, 20).unwrap();
    assert_eq!(kernel.resource_level(Holder::Person(person), GOLD).unwrap(), 0);
    assert_eq!(kernel.resource_level(Holder::Region(R1), GOLD).unwrap(), 60);

    let err = kernel.transfer_resource_between_regions(GOLD, R1, R1, 1).unwrap_err();
    assert_eq!(err.kind, ErrorKind::SelfTransfer(R1));
    let err = kernel.add_resource_to_region(R1, GOLD, u64::MAX).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ResourceOverflow(GOLD));
}

#[test]
fn test_group_membership_round_trip() {
    let mut kernel = kernel();
    let a = kernel.add_person(PersonSeed::new(R1, C1)).unwrap();
    let b = kernel.add_person(PersonSeed::new(R1, C1)).unwrap();
    let group = kernel.add_group(HOUSEHOLD).unwrap();
    kernel.add_population_index("housed", Filter::GroupMember(group)).unwrap();

    kernel.add_person_to_group(a, group).unwrap();
    kernel.add_person_to_group(b, group).unwrap();
    assert_eq!(kernel.group_members(group).unwrap(), vec![a, b]);
    assert_eq!(kernel.group_type_count_for_person(a, HOUSEHOLD).unwrap(), 1);
    assert_eq!(kernel.index_size(&"housed".into()).unwrap(), 2);

    let err = kernel.add_person_to_group(a, group).unwrap_err();
    assert_eq!(err.kind, ErrorKind::AlreadyGroupMember { person: a, group });

    kernel.remove_person(b).unwrap();
    assert_eq!(kernel.group_members(group).unwrap(), vec![a]);

    kernel.remove_group(group).unwrap();
    assert!(!kernel.group_exists(group));
    assert!(kernel.groups_for_person(a).unwrap().is_empty());
    assert_eq!(kernel.index_size(&"housed".into()).unwrap(), 0);
}

#[test]
fn test_removed_group_id_recycled_without_reviving_indices() {
    let mut kernel = kernel();
    let a = kernel.add_person(PersonSeed::new(R1, C1)).unwrap();
    let b = kernel.add_person(PersonSeed::new(R2, C1)).unwrap();
    let old = kernel.add_group(HOUSEHOLD).unwrap();
    kernel.add_population_index("housed", Filter::GroupMember(old)).unwrap();
    kernel
        .add_population_index("unhoused", Filter::GroupMember(old).negate())
        .unwrap();
    kernel
        .add_partition(
            "housed_by_region",
            PartitionSpec::new(Filter::GroupMember(old).or(Filter::compartment(C2)))
                .by(DimensionSource::Region),
        )
        .unwrap();
    kernel.add_person_to_group(b, old).unwrap();
    assert_eq!(kernel.index_size(&"housed".into()).unwrap(), 1);

    kernel.remove_group(old).unwrap();
    let fresh = kernel.add_group(HOUSEHOLD).unwrap();
    assert_eq!(fresh, old);
    kernel.add_person_to_group(a, fresh).unwrap();
    kernel.add_person_to_group(b, fresh).unwrap();

    assert_eq!(kernel.index_size(&"housed".into()).unwrap(), 0);
    assert_eq!(kernel.index_members(&"unhoused".into()).unwrap(), vec![a, b]);
    let partition = IndexKey::from("housed_by_region");
    assert_eq!(kernel.partition_size(&partition, &LabelQuery::new(vec![None])).unwrap(), 0);

    // The rest of the filter still tracks state
    kernel.set_person_compartment(a, C2).unwrap();
    assert_eq!(
        kernel.partition_members(&partition, &LabelQuery::exact([Label::Region(R1)])).unwrap(),
        vec![a]
    );
    kernel.add_population_index("housed_fresh", Filter::GroupMember(fresh)).unwrap();
    assert_eq!(kernel.index_size(&"housed_fresh".into()).unwrap(), 2);
}

#[test]
fn test_resource_levels_drive_indices_and_partitions() {
    let mut kernel = kernel();
    let person = kernel.add_person(PersonSeed::new(R1, C1)).unwrap();
    let other = kernel.add_person(PersonSeed::new(R1, C1)).unwrap();
    kernel
        .add_population_index("rich", Filter::resource(GOLD, Comparison::GreaterOrEqual, 10))
        .unwrap();
    kernel
        .add_partition("wealth", PartitionSpec::new(Filter::All).by(DimensionSource::Resource(GOLD)))
        .unwrap();
    let rich = IndexKey::from("rich");
    let wealth = IndexKey::from("wealth");
    let holding = |amount| LabelQuery::exact([Label::Amount(amount)]);
    assert_eq!(kernel.partition_size(&wealth, &holding(0)).unwrap(), 2);

    kernel.transfer_resource_to_person(person, GOLD, 30).unwrap();
    assert_eq!(kernel.index_members(&rich).unwrap(), vec![person]);
    assert_eq!(kernel.partition_members(&wealth, &holding(30)).unwrap(), vec![person]);
    assert_eq!(kernel.partition_size(&wealth, &holding(0)).unwrap(), 1);

    kernel.remove_resource_from_person(person, GOLD, 25).unwrap();
    assert!(!kernel.index_contains(&rich, person).unwrap());
    assert_eq!(kernel.partition_size(&wealth, &holding(30)).unwrap(), 0);
    assert!(kernel.partition_contains(&wealth, person, &holding(5)).unwrap());

    kernel.transfer_resource_to_person(other, GOLD, 10).unwrap();
    kernel.transfer_resource_from_person(person, GOLD, 5).unwrap();
    assert_eq!(kernel.index_members(&rich).unwrap(), vec![other]);
    let mut cells = kernel.partition_cells(&wealth).unwrap();
    cells.sort();
    assert_eq!(cells, vec![(vec![Label::Amount(0)], 1), (vec![Label::Amount(10)], 1)]);
}

#[test]
fn test_hash_reverse_indices_match_counters() {
    let policy = ReverseIndexPolicy::Hash;
    let config = KernelConfig {
        region_members: policy,
        compartment_members: policy,
        group_members: policy,
        ..KernelConfig::default()
    };
    let mut kernel = Kernel::from_scenario(&scenario().with_config(config)).unwrap();
    kernel.begin_turn(manager());
    let people: Vec<PersonId> = (0..6)
        .map(|i| {
            let region = if i % 2 == 0 { R1 } else { R2 };
            kernel.add_person(PersonSeed::new(region, C1)).unwrap()
        })
        .collect();
    kernel.set_person_region(people[0], R2).unwrap();
    kernel.set_person_compartment(people[3], C2).unwrap();
    kernel.remove_person(people[5]).unwrap();
    let group = kernel.add_group(HOUSEHOLD).unwrap();
    for &person in &people[..3] {
        kernel.add_person_to_group(person, group).unwrap();
    }
    kernel.remove_person_from_group(people[1], group).unwrap();

    assert_eq!(kernel.people_in_region(R1).unwrap(), vec![people[2], people[4]]);
    assert_eq!(kernel.region_population_count(R1).unwrap(), 2);
    assert_eq!(kernel.people_in_region(R2).unwrap(), vec![people[0], people[1], people[3]]);
    assert_eq!(kernel.region_population_count(R2).unwrap(), 3);
    assert_eq!(kernel.people_in_compartment(C2).unwrap(), vec![people[3]]);
    assert_eq!(kernel.compartment_population_count(C1).unwrap(), 4);
    assert_eq!(kernel.group_members(group).unwrap(), vec![people[0], people[2]]);
    assert_eq!(kernel.group_size(group).unwrap(), 2);
}

#[test]
fn test_offered_stage_is_locked() {
    let mut kernel = kernel();
    let stage = kernel.create_stage(FACTORY).unwrap();
    let batch = kernel.create_batch(FACTORY, VACCINE, 10.0).unwrap();
    kernel.move_batch_to_stage(batch, stage).unwrap();
    kernel.set_stage_offer(stage, true).unwrap();

    assert_eq!(
        kernel.set_batch_property(batch, "lot", "A1").unwrap_err().kind,
        ErrorKind::StageOffered(stage)
    );
    assert!(kernel.move_stage_batch_to_inventory(batch).is_err());
    assert!(kernel.destroy_stage(stage, true).is_err());
    assert!(kernel.convert_stage_to_batch(stage, VACCINE, 1.0).is_err());

    kernel.transfer_offered_stage(stage, OTHER_FACTORY).unwrap();
    let record = kernel.stage(stage).unwrap();
    assert_eq!(record.producer, OTHER_FACTORY);
    assert!(!record.offered);
    assert_eq!(kernel.batch(batch).unwrap().producer, OTHER_FACTORY);
}

#[test]
fn test_stage_conversion_produces_batch_and_resource() {
    let mut kernel = kernel();
    let stage = kernel.create_stage(FACTORY).unwrap();
    let batch = kernel.create_batch(FACTORY, VACCINE, 4.0).unwrap();
    kernel.move_batch_to_stage(batch, stage).unwrap();

    let produced = kernel.convert_stage_to_batch(stage, VACCINE, 8.0).unwrap();
    assert!(!kernel.stage_exists(stage));
    assert_eq!(kernel.inventory(FACTORY).unwrap(), vec![produced]);
    let record: BatchRecord = kernel.batch(produced).unwrap();
    assert_eq!(record.amount, 8.0);
    assert_eq!(record.stage, None);

    let stage = kernel.create_stage(FACTORY).unwrap();
    kernel.move_batch_to_stage(produced, stage).unwrap();
    kernel.convert_stage_to_resource(stage, GOLD, 5).unwrap();
    assert_eq!(
        kernel.resource_level(Holder::MaterialsProducer(FACTORY), GOLD).unwrap(),
        5
    );
    kernel
        .transfer_produced_resource_to_region(FACTORY, GOLD, R2, 5)
        .unwrap();
    assert_eq!(kernel.resource_level(Holder::Region(R2), GOLD).unwrap(), 5);
}

#[test]
fn test_shift_batch_amount() {
    let mut kernel = kernel();
    let a = kernel.create_batch(FACTORY, VACCINE, 5.0).unwrap();
    let b = kernel.create_batch(FACTORY, VACCINE, 1.0).unwrap();
    kernel.shift_batch_amount(a, b, 2.0).unwrap();
    assert_eq!(kernel.batch(a).unwrap().amount, 3.0);
    assert_eq!(kernel.batch(b).unwrap().amount, 3.0);
    assert!(matches!(
        kernel.shift_batch_amount(a, b, 10.0).unwrap_err().kind,
        ErrorKind::InsufficientBatchAmount { .. }
    ));
    assert_eq!(kernel.shift_batch_amount(a, a, 1.0).unwrap_err().kind, ErrorKind::SameBatch(a));

    let elsewhere = kernel.create_batch(OTHER_FACTORY, VACCINE, 1.0).unwrap();
    let err = kernel.shift_batch_amount(a, elsewhere, 1.0).unwrap_err();
    assert_eq!(err.kind, ErrorKind::BatchProducerMismatch(a, elsewhere));
    assert_eq!(err.category(), ErrorCategory::StateConflict);

    let stage = kernel.create_stage(FACTORY).unwrap();
    kernel.move_batch_to_stage(b, stage).unwrap();
    assert_eq!(kernel.shift_batch_amount(a, b, 1.0).unwrap_err().kind, ErrorKind::BatchOnStage(b));
    assert_eq!(kernel.shift_batch_amount(b, a, 1.0).unwrap_err().kind, ErrorKind::BatchOnStage(b));
    assert_eq!(kernel.batch(a).unwrap().amount, 3.0);
    assert_eq!(kernel.batch(b).unwrap().amount, 3.0);
    assert_eq!(kernel.batch(elsewhere).unwrap().amount, 1.0);
    assert!(matches!(
        kernel.create_batch(FACTORY, VACCINE, f64::NAN).unwrap_err().kind,
        ErrorKind::InvalidAmount(_)
    ));
}

#[test]
fn test_index_ownership() {
    let mut kernel = Kernel::from_scenario(&scenario()).unwrap();
    kernel.begin_turn(Focus::Component(ComponentRef::Region(R1)));
    kernel.add_population_index("mine", Filter::All).unwrap();
    kernel.end_turn();

    kernel.begin_turn(Focus::Component(ComponentRef::Region(R2)));
    let err = kernel.remove_population_index(&"mine".into()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NotOwner { .. }));
    assert_eq!(
        kernel.add_population_index("mine", Filter::All).unwrap_err().kind,
        ErrorKind::DuplicateIndex("mine".into())
    );
    kernel.end_turn();

    kernel.begin_turn(Focus::Component(ComponentRef::Region(R1)));
    kernel.remove_population_index(&"mine".into()).unwrap();
    assert!(!kernel.index_exists(&"mine".into()));
    kernel.end_turn();
}

#[test]
fn test_malformed_filter_rejected() {
    let mut kernel = kernel();
    let err = kernel.add_population_index("empty", Filter::Or(vec![])).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MalformedFilter(_)));
    let err = kernel
        .add_population_index("typo", Filter::property("agee", Comparison::Equal, 3i64))
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnknownProperty { .. }));
    assert!(kernel.index_keys().is_empty());
}

#[test]
fn test_partition_counts_by_region_and_compartment() {
    let mut kernel = kernel();
    for (region, compartment) in [(R1, C1), (R1, C2), (R2, C2), (R2, C2)] {
        kernel.add_person(PersonSeed::new(region, compartment)).unwrap();
    }
    kernel
        .add_partition(
            "grid",
            PartitionSpec::new(Filter::All)
                .by(DimensionSource::Region)
                .by(DimensionSource::Compartment),
        )
        .unwrap();
    let key = IndexKey::from("grid");
    let c2 = LabelQuery::new(vec![None, Some(Label::Compartment(C2))]);
    assert_eq!(kernel.partition_size(&key, &c2).unwrap(), 3);
    let cell = LabelQuery::exact([Label::Region(R2), Label::Compartment(C2)]);
    assert_eq!(kernel.partition_size(&key, &cell).unwrap(), 2);
    assert_eq!(kernel.partition_cells(&key).unwrap().len(), 3);

    let err = kernel
        .partition_size(&key, &LabelQuery::new(vec![None]))
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MalformedLabelQuery { .. }));
}

#[test]
fn test_plans_are_owned_and_keyed() {
    let mut kernel = kernel();
    kernel.schedule_keyed_plan(5.0, "review", 42u32).unwrap();
    assert_eq!(
        kernel.peek_plan::<u32>(&"review".into()).unwrap(),
        Some((42, 5.0))
    );
    assert_eq!(
        kernel.schedule_keyed_plan(6.0, "review", 1u32).unwrap_err().kind,
        ErrorKind::DuplicatePlanKey("review".into())
    );
    let cancelled = kernel.cancel_plan(&"review".into()).unwrap().unwrap();
    assert_eq!(cancelled.downcast_ref::<u32>(), Some(&42));

    kernel.schedule_plan(2.0, "later").unwrap();
    kernel.end_turn();
    let plan = kernel.next_plan().unwrap();
    assert_eq!(plan.time, 2.0);
    assert_eq!(kernel.current_time(), 2.0);

    kernel.begin_turn(manager());
    assert!(matches!(
        kernel.schedule_plan(1.0, ()).unwrap_err().kind,
        ErrorKind::PastPlanTime { .. }
    ));
}

#[test]
fn test_reports_capture_removed_person_snapshot() {
    let report = MemoryReport::new();
    let mut hub = ReportHub::new();
    hub.attach(Box::new(report.clone()));
    let mut kernel = Kernel::with_reports(&scenario(), hub).unwrap();
    kernel.begin_turn(manager());

    let person = kernel
        .add_person(PersonSeed::new(R1, C1).property("age", 70i64))
        .unwrap();
    kernel.transfer_resource_to_person(person, GOLD, 3).unwrap();
    report.clear();
    kernel.remove_person(person).unwrap();

    let items = report.items();
    assert_eq!(items.len(), 1);
    match &items[0] {
        ReportItem::PersonRemoved {
            person: removed,
            region,
            properties,
            resources,
            ..
        } => {
            assert_eq!(*removed, person);
            assert_eq!(*region, R1);
            assert!(properties.contains(&(PropertyId::from("age"), PropertyValue::Int(70))));
            assert_eq!(resources, &vec![(GOLD, 3)]);
        }
        other => panic!("unexpected report item {:?}", other),
    }
}

#[test]
fn test_scenario_initial_state_loaded() {
    let scenario = scenario()
        .property_value(PropertyTarget::Region(R2), "lockdown", true)
        .person(PersonSeed::new(R2, C2).property("age", 12i64).resource(GOLD, 4))
        .person(PersonSeed::new(R1, C1))
        .group(GroupSeed {
            group_type: HOUSEHOLD,
            members: vec![0, 1],
            properties: Default::default(),
        });
    let kernel = Kernel::from_scenario(&scenario).unwrap();
    assert_eq!(*kernel.focus(), Focus::None);
    assert_eq!(kernel.population_count(), 2);
    assert_eq!(
        kernel
            .property(PropertyTarget::Region(R2), &"lockdown".into())
            .unwrap(),
        PropertyValue::Bool(true)
    );
    let first = kernel.person_ids()[0];
    assert_eq!(kernel.resource_level(Holder::Person(first), GOLD).unwrap(), 4);
    assert_eq!(kernel.group_ids().len(), 1);
    assert_eq!(kernel.group_size(kernel.group_ids()[0]).unwrap(), 2);
}

#[test]
fn test_scenario_rejects_bad_group_position() {
    let scenario = scenario().group(GroupSeed {
        group_type: HOUSEHOLD,
        members: vec![3],
        properties: Default::default(),
    });
    assert!(matches!(
        Kernel::from_scenario(&scenario),
        Err(ScenarioError::Invalid(_))
    ));
}

#[test]
#[should_panic(expected = "kernel defect")]
fn test_turn_inside_turn_is_fatal() {
    let mut kernel = kernel();
    kernel.begin_turn(Focus::Simulation);
}
