//! Kernel stress driver
//!
//! Loads a scenario (or synthesizes one), keeps an index and a partition
//! alive while a churn component moves people, infects them and vaccinates
//! them, then prints population counts and timings.

use std::any::Any;
use std::cell::Cell;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use compartment_kernel::observation::{Notification, Observation, PersonScope, Topic};
use compartment_kernel::report::ReportHub;
use compartment_kernel::{
    Comparison, CompartmentId, Component, ComponentId, ComponentRef, DimensionSource, EntityKind, Filter,
    IndexKey, Kernel, KernelConfig, LabelQuery, PartitionSpec, PersonSeed, PropertySchema, ReportSink,
    ReverseIndexPolicy, RegionId, ResourceId, Scenario, Simulation, JsonLinesReport,
};

const SUSCEPTIBLE: CompartmentId = CompartmentId(1);
const INFECTED: CompartmentId = CompartmentId(2);
const RECOVERED: CompartmentId = CompartmentId(3);

/// Kernel stress driver - random churn against live indices
#[derive(Parser, Debug)]
#[command(name = "kernel-stress")]
#[command(about = "Churn a population through the kernel and report index and partition sizes")]
struct Args {
    /// TOML scenario; a synthetic one is generated when omitted. It must
    /// define compartments 1 to 3 and a boolean person property "vaccinated"
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// People in the synthetic scenario
    #[arg(long, default_value_t = 10_000)]
    people: usize,

    /// Regions in the synthetic scenario
    #[arg(long, default_value_t = 20)]
    regions: u32,

    /// Simulated days of churn
    #[arg(long, default_value_t = 30)]
    days: u32,

    /// Mutations per day
    #[arg(long, default_value_t = 5_000)]
    moves: usize,

    /// Random seed; overrides the scenario's
    #[arg(long)]
    seed: Option<u64>,

    /// Reverse index for region membership: none, array or hash
    #[arg(long, default_value = "array")]
    region_index: String,

    /// Write every state change as JSON lines to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

fn synthesize(args: &Args, policy: ReverseIndexPolicy) -> Scenario {
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed.unwrap_or(7));
    let config = KernelConfig {
        region_members: policy,
        track_region_arrival: true,
        ..KernelConfig::default()
    };
    let mut scenario = Scenario::new()
        .with_config(config)
        .compartment(SUSCEPTIBLE)
        .compartment(INFECTED)
        .compartment(RECOVERED)
        .resource(ResourceId(1), false)
        .define(EntityKind::Person, PropertySchema::new("age", 0i64).write_once())
        .define(EntityKind::Person, PropertySchema::new("vaccinated", false).tracked());
    for region in 1..=args.regions {
        scenario = scenario.region(RegionId(region));
    }
    for _ in 0..args.people {
        let region = RegionId(rng.gen_range(1..=args.regions));
        let compartment = if rng.gen_bool(0.01) { INFECTED } else { SUSCEPTIBLE };
        scenario = scenario.person(
            PersonSeed::new(region, compartment).property("age", rng.gen_range(0i64..90)),
        );
    }
    scenario
}

/// Daily churn: random moves, infections, recoveries and vaccinations
struct Churn {
    moves: usize,
    days: u32,
}

struct Day(u32);

impl Component for Churn {
    fn init(&mut self, kernel: &mut Kernel) -> compartment_kernel::Result<()> {
        kernel.add_population_index("vaccinated", Filter::property("vaccinated", Comparison::Equal, true))?;
        kernel.add_partition(
            "region_by_compartment",
            PartitionSpec::new(Filter::All)
                .by(DimensionSource::Region)
                .by(DimensionSource::Compartment),
        )?;
        kernel.schedule_plan(1.0, Day(1))
    }

    fn execute_plan(&mut self, kernel: &mut Kernel, plan: Box<dyn Any>) -> compartment_kernel::Result<()> {
        let Ok(day) = plan.downcast::<Day>() else {
            return Ok(());
        };
        let regions = kernel.region_ids().to_vec();
        for _ in 0..self.moves {
            let Some(person) = kernel.sample_population(None)? else {
                break;
            };
            let roll = kernel.random_unit();
            if roll < 0.4 {
                let region = regions[(kernel.random_unit() * regions.len() as f64) as usize % regions.len()];
                if kernel.person_region(person)? != region {
                    kernel.set_person_region(person, region)?;
                }
            } else if roll < 0.7 {
                let next = match kernel.person_compartment(person)? {
                    c if c == SUSCEPTIBLE => INFECTED,
                    c if c == INFECTED => RECOVERED,
                    _ => continue,
                };
                kernel.set_person_compartment(person, next)?;
            } else {
                let vaccinated = kernel.person_property(person, "vaccinated")?.as_bool() == Some(true);
                kernel.set_person_property(person, "vaccinated", !vaccinated)?;
            }
        }
        if day.0 < self.days {
            kernel.schedule_plan(f64::from(day.0 + 1), Day(day.0 + 1))?;
        }
        Ok(())
    }
}

/// Counts compartment transitions it hears about
#[derive(Default, Clone)]
struct Census {
    infections: Rc<Cell<usize>>,
    recoveries: Rc<Cell<usize>>,
}

impl Component for Census {
    fn init(&mut self, kernel: &mut Kernel) -> compartment_kernel::Result<()> {
        kernel.observe(Topic::PersonCompartment(PersonScope::All))?;
        Ok(())
    }

    fn execute_plan(&mut self, _kernel: &mut Kernel, _plan: Box<dyn Any>) -> compartment_kernel::Result<()> {
        Ok(())
    }

    fn observe(&mut self, _kernel: &mut Kernel, notification: &Notification) -> compartment_kernel::Result<()> {
        if let Observation::PersonCompartment { current, .. } = *notification.observation {
            if current == INFECTED {
                self.infections.set(self.infections.get() + 1);
            } else if current == RECOVERED {
                self.recoveries.set(self.recoveries.get() + 1);
            }
        }
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("compartment_kernel=info")),
        )
        .init();

    let args = Args::parse();
    let policy = match args.region_index.as_str() {
        "none" => ReverseIndexPolicy::None,
        "array" => ReverseIndexPolicy::Array,
        "hash" => ReverseIndexPolicy::Hash,
        other => return Err(format!("unknown region index policy '{}'", other).into()),
    };

    let mut scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => synthesize(&args, policy),
    };
    if let Some(seed) = args.seed {
        scenario.config.seed = seed;
    }

    let mut reports = ReportHub::new();
    if let Some(path) = &args.report {
        let sink: Box<dyn ReportSink> = Box::new(JsonLinesReport::new(BufWriter::new(File::create(path)?)));
        reports.attach(sink);
    }

    let start = Instant::now();
    let kernel = Kernel::with_reports(&scenario, reports)?;
    println!(
        "Loaded {} people in {} regions ({:.2?})",
        kernel.population_count(),
        kernel.region_ids().len(),
        start.elapsed()
    );

    let mut simulation = Simulation::new(kernel);
    let churn = ComponentRef::Global(ComponentId::from("churn"));
    let census = ComponentRef::Global(ComponentId::from("census"));
    simulation.add_component(
        churn,
        Box::new(Churn {
            moves: args.moves,
            days: args.days,
        }),
    )?;
    let counts = Census::default();
    simulation.add_component(census, Box::new(counts.clone()))?;

    let start = Instant::now();
    simulation.init()?;
    let days = simulation.run()?;
    let elapsed = start.elapsed();

    let kernel = simulation.kernel_mut();
    kernel.flush_reports();
    println!("\n=== After {} days ({:.2?}) ===", days, elapsed);
    println!("Population: {}", kernel.population_count());
    println!("Vaccinated: {}", kernel.index_size(&IndexKey::from("vaccinated"))?);
    for compartment in [SUSCEPTIBLE, INFECTED, RECOVERED] {
        println!(
            "Compartment {}: {}",
            compartment,
            kernel.compartment_population_count(compartment)?
        );
    }
    println!(
        "Observed {} infections and {} recoveries",
        counts.infections.get(),
        counts.recoveries.get()
    );
    let partition = IndexKey::from("region_by_compartment");
    let infected = LabelQuery::new(vec![None, Some(compartment_kernel::Label::Compartment(INFECTED))]);
    println!(
        "Partition cells: {}, infected across regions: {}",
        kernel.partition_cells(&partition)?.len(),
        kernel.partition_size(&partition, &infected)?
    );
    println!(
        "Per day: {:.2?} for {} mutations",
        elapsed / days.max(1) as u32,
        args.moves
    );
    Ok(())
}
