//! Multi-way labeled classification of the population
//!
//! A partition keeps every person that passes its filter in exactly one
//! cell, keyed by one label per dimension. Cells live in a slot vector;
//! the hash map only resolves a label tuple to its slot, so queries visit
//! cells in a deterministic order. A cell is released as soon as its last
//! member leaves and its slot is reused by the next new label tuple.

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::ErrorKind;
use crate::core::types::*;
use crate::core::value::PropertyValue;
use crate::population::filter::{Attribute, Filter, PersonView};
use crate::population::people_set::PeopleSet;
use crate::population::sampling::pick_index;

const UNASSIGNED: u32 = u32::MAX;

/// One coordinate of a cell
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Value(PropertyValue),
    Region(RegionId),
    Compartment(CompartmentId),
    Amount(u64),
    Count(usize),
}

/// What a dimension reads from a person
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimensionSource {
    Region,
    Compartment,
    Property(PropertyId),
    Resource(ResourceId),
    /// Number of groups of one type the person belongs to
    GroupTypeCount(GroupTypeId),
}

impl DimensionSource {
    fn attribute(&self) -> Attribute {
        match self {
            DimensionSource::Region => Attribute::Region,
            DimensionSource::Compartment => Attribute::Compartment,
            DimensionSource::Property(property) => Attribute::Property(property.clone()),
            DimensionSource::Resource(resource) => Attribute::Resource(*resource),
            DimensionSource::GroupTypeCount(_) => Attribute::GroupMembership,
        }
    }

    fn raw_label<V: PersonView + ?Sized>(&self, view: &V, person: PersonId) -> Option<Label> {
        Some(match self {
            DimensionSource::Region => Label::Region(view.region(person)?),
            DimensionSource::Compartment => Label::Compartment(view.compartment(person)?),
            DimensionSource::Property(property) => Label::Value(view.property(person, property)?),
            DimensionSource::Resource(resource) => {
                Label::Amount(view.resource_level(person, *resource))
            }
            DimensionSource::GroupTypeCount(group_type) => {
                Label::Count(view.group_type_count(person, *group_type))
            }
        })
    }
}

/// Maps a raw label to a coarser one, e.g. ages to age bands
pub type Relabel = Arc<dyn Fn(&Label) -> Label + Send + Sync>;

#[derive(Clone)]
pub struct Dimension {
    pub source: DimensionSource,
    pub relabel: Option<Relabel>,
}

impl Dimension {
    pub fn new(source: DimensionSource) -> Self {
        Self { source, relabel: None }
    }

    pub fn relabeled(source: DimensionSource, relabel: impl Fn(&Label) -> Label + Send + Sync + 'static) -> Self {
        Self {
            source,
            relabel: Some(Arc::new(relabel)),
        }
    }

    fn label<V: PersonView + ?Sized>(&self, view: &V, person: PersonId) -> Option<Label> {
        let raw = self.source.raw_label(view, person)?;
        Some(match &self.relabel {
            Some(relabel) => relabel(&raw),
            None => raw,
        })
    }
}

impl fmt::Debug for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dimension")
            .field("source", &self.source)
            .field("relabeled", &self.relabel.is_some())
            .finish()
    }
}

/// Filter plus dimensions declared when a partition is created
#[derive(Debug, Clone)]
pub struct PartitionSpec {
    pub filter: Filter,
    pub dimensions: Vec<Dimension>,
}

impl PartitionSpec {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            dimensions: Vec::new(),
        }
    }

    pub fn dimension(mut self, dimension: Dimension) -> Self {
        self.dimensions.push(dimension);
        self
    }

    pub fn by(self, source: DimensionSource) -> Self {
        self.dimension(Dimension::new(source))
    }
}

/// Selects cells: one entry per dimension, `None` matching any label
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LabelQuery(pub Vec<Option<Label>>);

impl LabelQuery {
    pub fn new(labels: Vec<Option<Label>>) -> Self {
        Self(labels)
    }

    /// A query matching exactly one cell
    pub fn exact(labels: impl IntoIterator<Item = Label>) -> Self {
        Self(labels.into_iter().map(Some).collect())
    }

    fn matches(&self, labels: &[Label]) -> bool {
        self.0
            .iter()
            .zip(labels)
            .all(|(wanted, label)| wanted.as_ref().map_or(true, |wanted| wanted == label))
    }
}

#[derive(Debug, Clone)]
struct Cell {
    labels: Vec<Label>,
    members: PeopleSet,
}

#[derive(Debug, Clone)]
pub struct Partition {
    key: IndexKey,
    owner: Focus,
    spec: PartitionSpec,
    dependencies: Vec<Attribute>,
    cells: Vec<Option<Cell>>,
    /// Released cell slots, reused LIFO
    free: Vec<usize>,
    lookup: AHashMap<Vec<Label>, usize>,
    /// Person slot → cell, or UNASSIGNED when filtered out
    person_cells: Vec<u32>,
    size: usize,
}

impl Partition {
    pub fn build<V, I>(key: IndexKey, owner: Focus, spec: PartitionSpec, view: &V, people: I) -> Self
    where
        V: PersonView + ?Sized,
        I: IntoIterator<Item = PersonId>,
    {
        let mut dependencies = spec.filter.dependencies();
        for dimension in &spec.dimensions {
            let attribute = dimension.source.attribute();
            if !dependencies.contains(&attribute) {
                dependencies.push(attribute);
            }
        }
        let mut partition = Self {
            key,
            owner,
            spec,
            dependencies,
            cells: Vec::new(),
            free: Vec::new(),
            lookup: AHashMap::new(),
            person_cells: Vec::new(),
            size: 0,
        };
        for person in people {
            partition.refresh(view, person);
        }
        partition
    }

    pub fn key(&self) -> &IndexKey {
        &self.key
    }

    pub fn owner(&self) -> &Focus {
        &self.owner
    }

    pub fn dimension_count(&self) -> usize {
        self.spec.dimensions.len()
    }

    pub fn dependencies(&self) -> &[Attribute] {
        &self.dependencies
    }

    /// Number of people in the partition
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    fn cell_of(&self, person: PersonId) -> Option<usize> {
        match self.person_cells.get(person.index()) {
            Some(&cell) if cell != UNASSIGNED => Some(cell as usize),
            _ => None,
        }
    }

    pub fn contains(&self, person: PersonId) -> bool {
        self.cell_of(person).is_some()
    }

    /// The labels of the cell a person is in
    pub fn labels_of(&self, person: PersonId) -> Option<&[Label]> {
        self.cell_of(person).and_then(|cell| self.labels_at(cell))
    }

    fn labels_at(&self, cell: usize) -> Option<&[Label]> {
        self.cells
            .get(cell)?
            .as_ref()
            .map(|cell| cell.labels.as_slice())
    }

    fn labels_for<V: PersonView + ?Sized>(&self, view: &V, person: PersonId) -> Option<Vec<Label>> {
        if !self.spec.filter.evaluate(view, person) {
            return None;
        }
        self.spec
            .dimensions
            .iter()
            .map(|dimension| dimension.label(view, person))
            .collect()
    }

    fn cell_for(&mut self, labels: Vec<Label>) -> usize {
        if let Some(&cell) = self.lookup.get(&labels) {
            return cell;
        }
        let created = Some(Cell {
            labels: labels.clone(),
            members: PeopleSet::new(),
        });
        let cell = match self.free.pop() {
            Some(cell) => {
                self.cells[cell] = created;
                cell
            }
            None => {
                self.cells.push(created);
                self.cells.len() - 1
            }
        };
        self.lookup.insert(labels, cell);
        cell
    }

    /// Drops a person from a cell, releasing the cell once it is empty
    fn leave(&mut self, cell: usize, person: PersonId) {
        let Some(slot) = self.cells.get_mut(cell) else {
            return;
        };
        let emptied = match slot {
            Some(occupied) => {
                occupied.members.remove(person);
                occupied.members.is_empty()
            }
            None => false,
        };
        if emptied {
            if let Some(released) = slot.take() {
                self.lookup.remove(&released.labels);
                self.free.push(cell);
            }
        }
    }

    /// Number of cell slots held, live or awaiting reuse
    pub fn allocated_cells(&self) -> usize {
        self.cells.len()
    }

    /// Reclassifies one person; true when their cell changed
    pub fn refresh<V: PersonView + ?Sized>(&mut self, view: &V, person: PersonId) -> bool {
        let current = self.cell_of(person);
        let labels = self.labels_for(view, person);
        let unchanged = match (current, &labels) {
            (None, None) => true,
            (Some(cell), Some(labels)) => self.labels_at(cell) == Some(labels.as_slice()),
            _ => false,
        };
        if unchanged {
            return false;
        }
        // Leave first so a cell vacated here can take the new labels
        if let Some(cell) = current {
            self.leave(cell, person);
            self.size -= 1;
        }
        let target = labels.map(|labels| self.cell_for(labels));
        let slot = person.index();
        if self.person_cells.len() <= slot {
            self.person_cells.resize(slot + 1, UNASSIGNED);
        }
        match target {
            Some(cell) => {
                if let Some(occupied) = self.cells[cell].as_mut() {
                    occupied.members.insert(person);
                }
                self.person_cells[slot] = cell as u32;
                self.size += 1;
            }
            None => self.person_cells[slot] = UNASSIGNED,
        }
        true
    }

    pub fn remove_person(&mut self, person: PersonId) -> bool {
        let Some(cell) = self.cell_of(person) else {
            return false;
        };
        self.leave(cell, person);
        self.person_cells[person.index()] = UNASSIGNED;
        self.size -= 1;
        true
    }

    pub fn forget_group(&mut self, group: GroupId) -> bool {
        self.spec.filter.forget_group(group)
    }

    fn check_query(&self, query: &LabelQuery) -> Result<(), ErrorKind> {
        if query.0.len() != self.dimension_count() {
            return Err(ErrorKind::MalformedLabelQuery {
                expected: self.dimension_count(),
                found: query.0.len(),
            });
        }
        Ok(())
    }

    fn matching_cells<'a>(&'a self, query: &'a LabelQuery) -> impl Iterator<Item = &'a Cell> + 'a {
        self.cells
            .iter()
            .flatten()
            .filter(move |cell| query.matches(&cell.labels))
    }

    /// Non-empty cells in slot order
    pub fn cells(&self) -> impl Iterator<Item = (&[Label], usize)> + '_ {
        self.cells
            .iter()
            .flatten()
            .map(|cell| (cell.labels.as_slice(), cell.members.len()))
    }

    pub fn size(&self, query: &LabelQuery) -> Result<usize, ErrorKind> {
        self.check_query(query)?;
        Ok(self.matching_cells(query).map(|cell| cell.members.len()).sum())
    }

    pub fn contains_with(&self, person: PersonId, query: &LabelQuery) -> Result<bool, ErrorKind> {
        self.check_query(query)?;
        Ok(self.labels_of(person).map_or(false, |labels| query.matches(labels)))
    }

    /// Matching people, cell by cell
    pub fn members(&self, query: &LabelQuery) -> Result<Vec<PersonId>, ErrorKind> {
        self.check_query(query)?;
        Ok(self
            .matching_cells(query)
            .flat_map(|cell| cell.members.iter())
            .collect())
    }

    /// Uniform draw over every matching cell without materializing them
    pub fn sample<R: rand::Rng + ?Sized>(
        &self,
        query: &LabelQuery,
        excluded: Option<PersonId>,
        rng: &mut R,
    ) -> Result<Option<PersonId>, ErrorKind> {
        self.check_query(query)?;
        let mut total = 0;
        let mut skip = None;
        for cell in self.matching_cells(query) {
            if let Some(pos) = excluded.and_then(|person| cell.members.position(person)) {
                skip = Some(total + pos);
            }
            total += cell.members.len();
        }
        let Some(mut index) = pick_index(total, skip, rng) else {
            return Ok(None);
        };
        for cell in self.matching_cells(query) {
            if index < cell.members.len() {
                return Ok(cell.members.get(index));
            }
            index -= cell.members.len();
        }
        Ok(None)
    }
}
