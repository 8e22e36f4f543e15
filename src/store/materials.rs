//! Batches and stages owned by materials producers
//!
//! A batch is an amount of one material. It sits either in its producer's
//! inventory or on one of the producer's stages. An offered stage is
//! locked until it is un-offered or transferred.

use serde::Serialize;

use crate::core::error::ErrorKind;
use crate::core::types::{BatchId, MaterialId, MaterialsProducerId, StageId, Time};
use crate::store::slots::{IdMap, SlotVec};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRecord {
    pub material: MaterialId,
    pub amount: f64,
    pub producer: MaterialsProducerId,
    pub stage: Option<StageId>,
    pub created: Time,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageRecord {
    pub producer: MaterialsProducerId,
    pub offered: bool,
    pub batches: Vec<BatchId>,
}

#[derive(Debug, Clone)]
pub struct MaterialsStore {
    materials: IdMap<MaterialId>,
    producers: IdMap<MaterialsProducerId>,
    batches: SlotVec<BatchRecord>,
    stages: SlotVec<StageRecord>,
    /// Unstaged batches per producer slot
    inventory: Vec<Vec<BatchId>>,
    /// Stages per producer slot
    producer_stages: Vec<Vec<StageId>>,
}

impl MaterialsStore {
    pub fn new(materials: IdMap<MaterialId>, producers: IdMap<MaterialsProducerId>) -> Self {
        let producer_count = producers.len();
        Self {
            materials,
            producers,
            batches: SlotVec::new(),
            stages: SlotVec::new(),
            inventory: vec![Vec::new(); producer_count],
            producer_stages: vec![Vec::new(); producer_count],
        }
    }

    pub fn material_ids(&self) -> &[MaterialId] {
        self.materials.ids()
    }

    pub fn producer_ids(&self) -> &[MaterialsProducerId] {
        self.producers.ids()
    }

    pub fn has_material(&self, material: MaterialId) -> bool {
        self.materials.contains(material)
    }

    pub fn producer_slot(&self, producer: MaterialsProducerId) -> Option<usize> {
        self.producers.slot(producer)
    }

    fn require_producer(&self, producer: MaterialsProducerId) -> Result<usize, ErrorKind> {
        self.producers
            .slot(producer)
            .ok_or(ErrorKind::UnknownMaterialsProducer(producer))
    }

    pub fn batch(&self, batch: BatchId) -> Result<&BatchRecord, ErrorKind> {
        self.batches
            .get(batch.index())
            .ok_or(ErrorKind::UnknownBatch(batch))
    }

    pub fn stage(&self, stage: StageId) -> Result<&StageRecord, ErrorKind> {
        self.stages
            .get(stage.index())
            .ok_or(ErrorKind::UnknownStage(stage))
    }

    pub fn batch_exists(&self, batch: BatchId) -> bool {
        self.batches.contains(batch.index())
    }

    pub fn stage_exists(&self, stage: StageId) -> bool {
        self.stages.contains(stage.index())
    }

    pub fn inventory(&self, producer: MaterialsProducerId) -> &[BatchId] {
        self.producers
            .slot(producer)
            .map(|slot| self.inventory[slot].as_slice())
            .unwrap_or(&[])
    }

    pub fn stages_of(&self, producer: MaterialsProducerId) -> &[StageId] {
        self.producers
            .slot(producer)
            .map(|slot| self.producer_stages[slot].as_slice())
            .unwrap_or(&[])
    }

    /// True when the batch sits on an offered stage
    pub fn is_batch_locked(&self, batch: BatchId) -> bool {
        self.batches
            .get(batch.index())
            .and_then(|record| record.stage)
            .and_then(|stage| self.stages.get(stage.index()))
            .map_or(false, |stage| stage.offered)
    }

    pub fn create_batch(
        &mut self,
        producer: MaterialsProducerId,
        material: MaterialId,
        amount: f64,
        time: Time,
    ) -> Result<BatchId, ErrorKind> {
        let slot = self.require_producer(producer)?;
        if !self.materials.contains(material) {
            return Err(ErrorKind::UnknownMaterial(material));
        }
        if !amount.is_finite() || amount < 0.0 {
            return Err(ErrorKind::InvalidAmount(amount));
        }
        let batch = BatchId(self.batches.insert(BatchRecord {
            material,
            amount,
            producer,
            stage: None,
            created: time,
        }));
        self.inventory[slot].push(batch);
        Ok(batch)
    }

    /// Removes a batch wherever it sits
    pub fn destroy_batch(&mut self, batch: BatchId) -> Result<BatchRecord, ErrorKind> {
        let record = self
            .batches
            .remove(batch.index())
            .ok_or(ErrorKind::UnknownBatch(batch))?;
        match record.stage {
            Some(stage) => {
                if let Some(stage) = self.stages.get_mut(stage.index()) {
                    stage.batches.retain(|&b| b != batch);
                }
            }
            None => {
                if let Some(slot) = self.producers.slot(record.producer) {
                    self.inventory[slot].retain(|&b| b != batch);
                }
            }
        }
        Ok(record)
    }

    /// Moves `amount` from one inventory batch to another of the same
    /// material; returns the new (source, destination) amounts
    pub fn shift_amount(
        &mut self,
        source: BatchId,
        destination: BatchId,
        amount: f64,
    ) -> Result<(f64, f64), ErrorKind> {
        let available = self.batch(source)?.amount;
        self.batch(destination)?;
        if !amount.is_finite() || amount < 0.0 {
            return Err(ErrorKind::InvalidAmount(amount));
        }
        if available < amount {
            return Err(ErrorKind::InsufficientBatchAmount {
                batch: source,
                available,
                requested: amount,
            });
        }
        let source_record = self
            .batches
            .get_mut(source.index())
            .ok_or(ErrorKind::UnknownBatch(source))?;
        source_record.amount -= amount;
        let source_amount = source_record.amount;
        let destination_record = self
            .batches
            .get_mut(destination.index())
            .ok_or(ErrorKind::UnknownBatch(destination))?;
        destination_record.amount += amount;
        Ok((source_amount, destination_record.amount))
    }

    pub fn create_stage(&mut self, producer: MaterialsProducerId) -> Result<StageId, ErrorKind> {
        let slot = self.require_producer(producer)?;
        let stage = StageId(self.stages.insert(StageRecord {
            producer,
            offered: false,
            batches: Vec::new(),
        }));
        self.producer_stages[slot].push(stage);
        Ok(stage)
    }

    /// Removes a stage. Its batches are destroyed or returned to the
    /// owner's inventory; the removed batch records are returned.
    pub fn destroy_stage(
        &mut self,
        stage: StageId,
        destroy_batches: bool,
    ) -> Result<(StageRecord, Vec<(BatchId, BatchRecord)>), ErrorKind> {
        let record = self
            .stages
            .remove(stage.index())
            .ok_or(ErrorKind::UnknownStage(stage))?;
        let slot = self.require_producer(record.producer)?;
        self.producer_stages[slot].retain(|&s| s != stage);
        let mut destroyed = Vec::new();
        for &batch in &record.batches {
            if destroy_batches {
                if let Some(batch_record) = self.batches.remove(batch.index()) {
                    destroyed.push((batch, batch_record));
                }
            } else if let Some(batch_record) = self.batches.get_mut(batch.index()) {
                batch_record.stage = None;
                self.inventory[slot].push(batch);
            }
        }
        Ok((record, destroyed))
    }

    pub fn move_to_stage(&mut self, batch: BatchId, stage: StageId) -> Result<(), ErrorKind> {
        let producer = self.batch(batch)?.producer;
        if self.batch(batch)?.stage.is_some() {
            return Err(ErrorKind::BatchOnStage(batch));
        }
        if self.stage(stage)?.offered {
            return Err(ErrorKind::StageOffered(stage));
        }
        let slot = self.require_producer(producer)?;
        self.inventory[slot].retain(|&b| b != batch);
        if let Some(record) = self.batches.get_mut(batch.index()) {
            record.stage = Some(stage);
        }
        if let Some(record) = self.stages.get_mut(stage.index()) {
            record.batches.push(batch);
        }
        Ok(())
    }

    /// Returns a staged batch to its producer's inventory; returns the stage
    /// it left
    pub fn move_to_inventory(&mut self, batch: BatchId) -> Result<StageId, ErrorKind> {
        let record = self.batch(batch)?;
        let stage = record.stage.ok_or(ErrorKind::BatchNotOnStage(batch))?;
        let producer = record.producer;
        if self.stage(stage)?.offered {
            return Err(ErrorKind::StageOffered(stage));
        }
        let slot = self.require_producer(producer)?;
        if let Some(stage_record) = self.stages.get_mut(stage.index()) {
            stage_record.batches.retain(|&b| b != batch);
        }
        if let Some(record) = self.batches.get_mut(batch.index()) {
            record.stage = None;
        }
        self.inventory[slot].push(batch);
        Ok(stage)
    }

    /// Returns the previous offer state
    pub fn set_offered(&mut self, stage: StageId, offered: bool) -> Result<bool, ErrorKind> {
        let record = self
            .stages
            .get_mut(stage.index())
            .ok_or(ErrorKind::UnknownStage(stage))?;
        Ok(std::mem::replace(&mut record.offered, offered))
    }

    /// Hands an offered stage and its batches to another producer. The
    /// stage arrives un-offered. Returns the previous owner.
    pub fn transfer_stage(
        &mut self,
        stage: StageId,
        to: MaterialsProducerId,
    ) -> Result<MaterialsProducerId, ErrorKind> {
        let record = self.stage(stage)?;
        let from = record.producer;
        if !record.offered {
            return Err(ErrorKind::StageNotOffered(stage));
        }
        if from == to {
            return Err(ErrorKind::SameProducer { stage, producer: to });
        }
        let from_slot = self.require_producer(from)?;
        let to_slot = self.require_producer(to)?;
        let batches = record.batches.clone();

        self.producer_stages[from_slot].retain(|&s| s != stage);
        self.producer_stages[to_slot].push(stage);
        if let Some(record) = self.stages.get_mut(stage.index()) {
            record.producer = to;
            record.offered = false;
        }
        for batch in batches {
            if let Some(batch_record) = self.batches.get_mut(batch.index()) {
                batch_record.producer = to;
            }
        }
        Ok(from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VACCINE: MaterialId = MaterialId(1);
    const PLANT: MaterialsProducerId = MaterialsProducerId(10);
    const DEPOT: MaterialsProducerId = MaterialsProducerId(20);

    fn store() -> MaterialsStore {
        MaterialsStore::new(
            IdMap::from_ids([VACCINE]).unwrap(),
            IdMap::from_ids([PLANT, DEPOT]).unwrap(),
        )
    }

    #[test]
    fn test_batches_start_in_inventory() {
        let mut materials = store();
        let batch = materials.create_batch(PLANT, VACCINE, 12.0, 0.0).unwrap();
        assert_eq!(materials.inventory(PLANT), &[batch]);
        assert_eq!(materials.batch(batch).unwrap().amount, 12.0);
        assert!(matches!(
            materials.create_batch(PLANT, VACCINE, -1.0, 0.0),
            Err(ErrorKind::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_shift_amount() {
        let mut materials = store();
        let a = materials.create_batch(PLANT, VACCINE, 10.0, 0.0).unwrap();
        let b = materials.create_batch(PLANT, VACCINE, 1.0, 0.0).unwrap();
        assert_eq!(materials.shift_amount(a, b, 4.0).unwrap(), (6.0, 5.0));
        assert!(matches!(
            materials.shift_amount(a, b, 7.0),
            Err(ErrorKind::InsufficientBatchAmount { .. })
        ));
    }

    #[test]
    fn test_offered_stage_is_locked() {
        let mut materials = store();
        let batch = materials.create_batch(PLANT, VACCINE, 5.0, 0.0).unwrap();
        let stage = materials.create_stage(PLANT).unwrap();
        materials.move_to_stage(batch, stage).unwrap();
        assert!(materials.inventory(PLANT).is_empty());

        materials.set_offered(stage, true).unwrap();
        assert!(materials.is_batch_locked(batch));
        assert_eq!(materials.move_to_inventory(batch).unwrap_err(), ErrorKind::StageOffered(stage));
    }

    #[test]
    fn test_transfer_moves_stage_and_batches() {
        let mut materials = store();
        let batch = materials.create_batch(PLANT, VACCINE, 5.0, 0.0).unwrap();
        let stage = materials.create_stage(PLANT).unwrap();
        materials.move_to_stage(batch, stage).unwrap();

        assert_eq!(materials.transfer_stage(stage, DEPOT).unwrap_err(), ErrorKind::StageNotOffered(stage));
        materials.set_offered(stage, true).unwrap();
        assert_eq!(materials.transfer_stage(stage, DEPOT).unwrap(), PLANT);

        assert_eq!(materials.stages_of(DEPOT), &[stage]);
        assert!(materials.stages_of(PLANT).is_empty());
        assert!(!materials.stage(stage).unwrap().offered);
        assert_eq!(materials.batch(batch).unwrap().producer, DEPOT);
    }

    #[test]
    fn test_destroy_stage_returns_batches() {
        let mut materials = store();
        let batch = materials.create_batch(PLANT, VACCINE, 5.0, 0.0).unwrap();
        let stage = materials.create_stage(PLANT).unwrap();
        materials.move_to_stage(batch, stage).unwrap();

        let (_, destroyed) = materials.destroy_stage(stage, false).unwrap();
        assert!(destroyed.is_empty());
        assert_eq!(materials.inventory(PLANT), &[batch]);
        assert_eq!(materials.batch(batch).unwrap().stage, None);
    }
}
