//! Reporting of state changes
//!
//! Every mutation emits one `ReportItem`. Items carry the pre-mutation data
//! a report needs (a removed person's final values, a destroyed group's
//! members), so nothing has to be re-queried after the fact. Reporting is
//! fire-and-forget: sinks cannot fail or veto a mutation.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use serde::Serialize;

use crate::core::types::*;
use crate::core::value::PropertyValue;
use crate::store::materials::BatchRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReportItem {
    PersonAdded {
        person: PersonId,
        region: RegionId,
        compartment: CompartmentId,
    },
    PersonRemoved {
        person: PersonId,
        region: RegionId,
        compartment: CompartmentId,
        properties: Vec<(PropertyId, PropertyValue)>,
        resources: Vec<(ResourceId, u64)>,
        groups: Vec<GroupId>,
    },
    PropertyAssigned {
        target: PropertyTarget,
        property: PropertyId,
        previous: PropertyValue,
        current: PropertyValue,
    },
    ResourceChanged {
        holder: Holder,
        resource: ResourceId,
        previous: u64,
        current: u64,
    },
    ResourceTransferred {
        resource: ResourceId,
        from: Holder,
        to: Holder,
        amount: u64,
    },
    RegionChanged {
        person: PersonId,
        previous: RegionId,
        current: RegionId,
    },
    CompartmentChanged {
        person: PersonId,
        previous: CompartmentId,
        current: CompartmentId,
    },
    GroupCreated {
        group: GroupId,
        group_type: GroupTypeId,
    },
    GroupRemoved {
        group: GroupId,
        group_type: GroupTypeId,
        members: Vec<PersonId>,
        properties: Vec<(PropertyId, PropertyValue)>,
    },
    MembershipChanged {
        group: GroupId,
        person: PersonId,
        joined: bool,
    },
    BatchCreated {
        batch: BatchId,
        producer: MaterialsProducerId,
        material: MaterialId,
        amount: f64,
    },
    BatchDestroyed {
        batch: BatchId,
        record: BatchRecord,
        properties: Vec<(PropertyId, PropertyValue)>,
    },
    BatchAmountShifted {
        source: BatchId,
        destination: BatchId,
        amount: f64,
    },
    StageCreated {
        stage: StageId,
        producer: MaterialsProducerId,
    },
    StageDestroyed {
        stage: StageId,
        producer: MaterialsProducerId,
        destroyed_batches: Vec<BatchId>,
    },
    BatchStaged {
        batch: BatchId,
        stage: StageId,
    },
    BatchUnstaged {
        batch: BatchId,
        stage: StageId,
    },
    StageOfferChanged {
        stage: StageId,
        offered: bool,
    },
    StageTransferred {
        stage: StageId,
        from: MaterialsProducerId,
        to: MaterialsProducerId,
    },
    IndexAdded {
        key: IndexKey,
        partition: bool,
        size: usize,
    },
    IndexRemoved {
        key: IndexKey,
    },
}

/// A report item stamped with the simulation time it happened at
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub time: Time,
    #[serde(flatten)]
    pub item: ReportItem,
}

pub trait ReportSink {
    fn record(&mut self, entry: &ReportEntry);

    fn flush(&mut self) {}
}

/// Fans each entry out to every attached sink
#[derive(Default)]
pub struct ReportHub {
    sinks: Vec<Box<dyn ReportSink>>,
}

impl ReportHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, sink: Box<dyn ReportSink>) {
        self.sinks.push(sink);
    }

    pub fn is_active(&self) -> bool {
        !self.sinks.is_empty()
    }

    /// Items are built only when a sink is attached
    pub fn emit(&mut self, time: Time, item: impl FnOnce() -> ReportItem) {
        if self.sinks.is_empty() {
            return;
        }
        let entry = ReportEntry { time, item: item() };
        for sink in &mut self.sinks {
            sink.record(&entry);
        }
    }

    pub fn flush(&mut self) {
        for sink in &mut self.sinks {
            sink.flush();
        }
    }
}

impl std::fmt::Debug for ReportHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportHub")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

/// In-memory log; clones share the same entries
#[derive(Debug, Clone, Default)]
pub struct MemoryReport {
    entries: Rc<RefCell<Vec<ReportEntry>>>,
}

impl MemoryReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<ReportEntry> {
        self.entries.borrow().clone()
    }

    pub fn items(&self) -> Vec<ReportItem> {
        self.entries
            .borrow()
            .iter()
            .map(|entry| entry.item.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl ReportSink for MemoryReport {
    fn record(&mut self, entry: &ReportEntry) {
        self.entries.borrow_mut().push(entry.clone());
    }
}

/// One JSON object per line
pub struct JsonLinesReport<W: Write> {
    writer: W,
    failures: usize,
}

impl<W: Write> JsonLinesReport<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, failures: 0 }
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_entry(&mut self, entry: &ReportEntry) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, entry)?;
        self.writer.write_all(b"\n")
    }
}

impl<W: Write> ReportSink for JsonLinesReport<W> {
    fn record(&mut self, entry: &ReportEntry) {
        if let Err(e) = self.write_entry(entry) {
            if self.failures == 0 {
                tracing::warn!(error = %e, "report write failed");
            }
            self.failures += 1;
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.writer.flush() {
            tracing::warn!(error = %e, "report flush failed");
        }
    }
}
