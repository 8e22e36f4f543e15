//! Uniform and weighted draws over candidate lists
//!
//! Weighted draws happen in two steps: the weight table is built first,
//! calling the weighting function exactly once per candidate, and only then
//! is the generator touched. A weighting function may therefore read the
//! kernel (and even sample) without conflicting with the draw itself.

use rand::Rng;

use crate::core::error::ErrorKind;
use crate::core::types::PersonId;
use crate::population::people_set::PeopleSet;

/// Uniform index in `0..len`, skipping `excluded` in a single draw.
///
/// None when no candidate remains.
pub fn pick_index<R: Rng + ?Sized>(
    len: usize,
    excluded: Option<usize>,
    rng: &mut R,
) -> Option<usize> {
    match excluded {
        Some(skip) if skip < len => {
            if len == 1 {
                return None;
            }
            let index = rng.gen_range(0..len - 1);
            Some(if index >= skip { index + 1 } else { index })
        }
        _ => {
            if len == 0 {
                return None;
            }
            Some(rng.gen_range(0..len))
        }
    }
}

/// Uniform member of a slice, optionally skipping one person
pub fn pick_uniform<R: Rng + ?Sized>(
    candidates: &[PersonId],
    excluded: Option<PersonId>,
    rng: &mut R,
) -> Option<PersonId> {
    let skip = excluded.and_then(|person| candidates.iter().position(|&p| p == person));
    pick_index(candidates.len(), skip, rng).map(|index| candidates[index])
}

/// Uniform member of a set; the excluded person is located in O(1)
pub fn pick_member<R: Rng + ?Sized>(
    members: &PeopleSet,
    excluded: Option<PersonId>,
    rng: &mut R,
) -> Option<PersonId> {
    let skip = excluded.and_then(|person| members.position(person));
    pick_index(members.len(), skip, rng).and_then(|index| members.get(index))
}

/// Cumulative weights of the candidates that can be drawn
#[derive(Debug, Clone, Default)]
pub struct WeightTable {
    candidates: Vec<PersonId>,
    cumulative: Vec<f64>,
}

impl WeightTable {
    /// Evaluates every candidate once. Negative, NaN and infinite weights are
    /// malformed; zero-weight candidates are kept out of the table.
    pub fn build<I, F>(candidates: I, excluded: Option<PersonId>, mut weight: F) -> Result<Self, ErrorKind>
    where
        I: IntoIterator<Item = PersonId>,
        F: FnMut(PersonId) -> f64,
    {
        let mut table = WeightTable::default();
        let mut total = 0.0;
        for person in candidates {
            if Some(person) == excluded {
                continue;
            }
            let w = weight(person);
            if !w.is_finite() || w < 0.0 {
                return Err(ErrorKind::MalformedWeight(w));
            }
            if w == 0.0 {
                continue;
            }
            total += w;
            if !total.is_finite() {
                return Err(ErrorKind::MalformedWeight(total));
            }
            table.candidates.push(person);
            table.cumulative.push(total);
        }
        Ok(table)
    }

    pub fn total(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// None when every weight was zero
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<PersonId> {
        if self.is_empty() {
            return None;
        }
        let target = rng.gen::<f64>() * self.total();
        let index = self
            .cumulative
            .partition_point(|&c| c <= target)
            .min(self.candidates.len() - 1);
        Some(self.candidates[index])
    }
}
