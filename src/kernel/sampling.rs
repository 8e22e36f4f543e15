//! Random draws from population subsets
//!
//! Every draw uses the kernel's seeded generator, so a run is reproducible
//! from its configuration. Uniform draws return None when no eligible
//! person remains; weighted draws also return None when every weight is
//! zero.

use rand::Rng;

use super::Kernel;
use crate::core::error::{self, ErrorKind};
use crate::core::types::*;
use crate::population::{pick_member, pick_uniform, LabelQuery, WeightTable};

impl Kernel {
    /// Runs a uniform draw over a candidate list resolved under the read
    /// gate
    fn draw_uniform(
        &self,
        operation: &'static str,
        excluded: Option<PersonId>,
        candidates: impl FnOnce(&Self) -> Result<Vec<PersonId>, ErrorKind>,
    ) -> error::Result<Option<PersonId>> {
        let _gate = self.gate.enter_for_read(operation);
        let candidates = self.checked(operation, |kernel| {
            kernel.check_excluded(excluded)?;
            candidates(kernel)
        })?;
        let mut rng = self.rng.borrow_mut();
        Ok(pick_uniform(&candidates, excluded, &mut *rng))
    }

    /// Builds the weight table first, then borrows the generator for the
    /// draw alone
    fn draw_weighted(
        &self,
        operation: &'static str,
        excluded: Option<PersonId>,
        candidates: impl FnOnce(&Self) -> Result<Vec<PersonId>, ErrorKind>,
        weight: impl Fn(&Kernel, PersonId) -> f64,
    ) -> error::Result<Option<PersonId>> {
        let _gate = self.gate.enter_for_read(operation);
        let table = self.checked(operation, |kernel| {
            kernel.check_excluded(excluded)?;
            let candidates = candidates(kernel)?;
            WeightTable::build(candidates, excluded, |person| weight(kernel, person))
        })?;
        let mut rng = self.rng.borrow_mut();
        Ok(table.draw(&mut *rng))
    }

    /// Draws a live person slot directly, without listing the population
    pub fn sample_population(&self, excluded: Option<PersonId>) -> error::Result<Option<PersonId>> {
        const OP: &str = "sample_population";
        let _gate = self.gate.enter_for_read(OP);
        self.checked(OP, |kernel| kernel.check_excluded(excluded))?;
        let mut rng = self.rng.borrow_mut();
        Ok(self
            .stores
            .people
            .sample(excluded.map(PersonId::index), &mut *rng)
            .map(PersonId))
    }

    pub fn sample_population_weighted(
        &self,
        excluded: Option<PersonId>,
        weight: impl Fn(&Kernel, PersonId) -> f64,
    ) -> error::Result<Option<PersonId>> {
        self.draw_weighted(
            "sample_population_weighted",
            excluded,
            |kernel| Ok(kernel.stores.live_people().collect()),
            weight,
        )
    }

    pub fn sample_index(&self, key: &IndexKey, excluded: Option<PersonId>) -> error::Result<Option<PersonId>> {
        const OP: &str = "sample_index";
        let _gate = self.gate.enter_for_read(OP);
        let members = self.checked(OP, |kernel| {
            kernel.check_excluded(excluded)?;
            Ok(kernel.indices.index(key)?.members())
        })?;
        let mut rng = self.rng.borrow_mut();
        Ok(pick_member(members, excluded, &mut *rng))
    }

    pub fn sample_index_weighted(
        &self,
        key: &IndexKey,
        excluded: Option<PersonId>,
        weight: impl Fn(&Kernel, PersonId) -> f64,
    ) -> error::Result<Option<PersonId>> {
        self.draw_weighted(
            "sample_index_weighted",
            excluded,
            |kernel| Ok(kernel.indices.index(key)?.members().as_slice().to_vec()),
            weight,
        )
    }

    /// Uniform over every cell matching the query
    pub fn sample_partition(
        &self,
        key: &IndexKey,
        query: &LabelQuery,
        excluded: Option<PersonId>,
    ) -> error::Result<Option<PersonId>> {
        const OP: &str = "sample_partition";
        let _gate = self.gate.enter_for_read(OP);
        let partition = self.checked(OP, |kernel| {
            kernel.check_excluded(excluded)?;
            kernel.indices.partition(key)
        })?;
        let mut rng = self.rng.borrow_mut();
        self.checked(OP, |_| partition.sample(query, excluded, &mut *rng))
    }

    pub fn sample_partition_weighted(
        &self,
        key: &IndexKey,
        query: &LabelQuery,
        excluded: Option<PersonId>,
        weight: impl Fn(&Kernel, PersonId) -> f64,
    ) -> error::Result<Option<PersonId>> {
        self.draw_weighted(
            "sample_partition_weighted",
            excluded,
            |kernel| kernel.indices.partition(key)?.members(query),
            weight,
        )
    }

    pub fn sample_group(&self, group: GroupId, excluded: Option<PersonId>) -> error::Result<Option<PersonId>> {
        self.draw_uniform("sample_group", excluded, |kernel| {
            kernel.stores.require_group(group)?;
            Ok(kernel.stores.groups.members(group))
        })
    }

    pub fn sample_group_weighted(
        &self,
        group: GroupId,
        excluded: Option<PersonId>,
        weight: impl Fn(&Kernel, PersonId) -> f64,
    ) -> error::Result<Option<PersonId>> {
        self.draw_weighted(
            "sample_group_weighted",
            excluded,
            |kernel| {
                kernel.stores.require_group(group)?;
                Ok(kernel.stores.groups.members(group))
            },
            weight,
        )
    }

    pub fn sample_region(&self, region: RegionId, excluded: Option<PersonId>) -> error::Result<Option<PersonId>> {
        self.draw_uniform("sample_region", excluded, |kernel| {
            let slot = kernel.stores.region_slot(region)?;
            Ok(kernel.stores.region_locations.members(slot))
        })
    }

    pub fn sample_region_weighted(
        &self,
        region: RegionId,
        excluded: Option<PersonId>,
        weight: impl Fn(&Kernel, PersonId) -> f64,
    ) -> error::Result<Option<PersonId>> {
        self.draw_weighted(
            "sample_region_weighted",
            excluded,
            |kernel| {
                let slot = kernel.stores.region_slot(region)?;
                Ok(kernel.stores.region_locations.members(slot))
            },
            weight,
        )
    }

    pub fn sample_compartment(
        &self,
        compartment: CompartmentId,
        excluded: Option<PersonId>,
    ) -> error::Result<Option<PersonId>> {
        self.draw_uniform("sample_compartment", excluded, |kernel| {
            let slot = kernel.stores.compartment_slot(compartment)?;
            Ok(kernel.stores.compartment_locations.members(slot))
        })
    }

    pub fn sample_compartment_weighted(
        &self,
        compartment: CompartmentId,
        excluded: Option<PersonId>,
        weight: impl Fn(&Kernel, PersonId) -> f64,
    ) -> error::Result<Option<PersonId>> {
        self.draw_weighted(
            "sample_compartment_weighted",
            excluded,
            |kernel| {
                let slot = kernel.stores.compartment_slot(compartment)?;
                Ok(kernel.stores.compartment_locations.members(slot))
            },
            weight,
        )
    }

    /// Uniform value in `[0, 1)` from the kernel's generator
    pub fn random_unit(&self) -> f64 {
        self.rng.borrow_mut().gen::<f64>()
    }
}
