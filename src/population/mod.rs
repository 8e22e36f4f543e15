//! Population indices, partitions and sampling

pub mod filter;
pub mod index;
pub mod manager;
pub mod partition;
pub mod people_set;
pub mod sampling;

pub use filter::{Attribute, Comparison, Filter, PersonView};
pub use index::PopulationIndex;
pub use manager::{IndexEntry, PopulationIndexManager};
pub use partition::{Dimension, DimensionSource, Label, LabelQuery, Partition, PartitionSpec, Relabel};
pub use people_set::PeopleSet;
pub use sampling::{pick_index, pick_member, pick_uniform, WeightTable};
