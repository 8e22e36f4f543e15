//! Batches, stages and their conversions

use super::{settle, MutationResolver};
use crate::core::types::*;
use crate::core::value::PropertyValue;
use crate::observation::{Observation, ScopedEntity, StageScope, Topic};
use crate::report::ReportItem;

impl<'a> MutationResolver<'a> {
    pub fn create_batch(
        &mut self,
        producer: MaterialsProducerId,
        material: MaterialId,
        amount: f64,
        properties: &[(PropertyId, PropertyValue)],
    ) -> BatchId {
        const OP: &str = "create_batch";
        let time = self.time;
        let batch = settle(
            OP,
            self.stores
                .materials
                .create_batch(producer, material, amount, time),
        );
        for (property, value) in properties {
            settle(
                OP,
                self.stores
                    .batch_properties
                    .set(batch.index(), property, value, time),
            );
        }
        self.report(|| ReportItem::BatchCreated {
            batch,
            producer,
            material,
            amount,
        });
        batch
    }

    pub fn destroy_batch(&mut self, batch: BatchId) {
        const OP: &str = "destroy_batch";
        let properties = self
            .reports
            .is_active()
            .then(|| self.stores.batch_properties.snapshot(batch.index()))
            .unwrap_or_default();
        let record = settle(OP, self.stores.materials.destroy_batch(batch));
        self.stores.batch_properties.reset_slot(batch.index());
        self.report(|| ReportItem::BatchDestroyed {
            batch,
            record,
            properties,
        });
    }

    pub fn shift_batch_amount(&mut self, source: BatchId, destination: BatchId, amount: f64) {
        settle(
            "shift_batch_amount",
            self.stores.materials.shift_amount(source, destination, amount),
        );
        self.report(|| ReportItem::BatchAmountShifted {
            source,
            destination,
            amount,
        });
    }

    pub fn create_stage(&mut self, producer: MaterialsProducerId) -> StageId {
        let stage = settle("create_stage", self.stores.materials.create_stage(producer));
        self.report(|| ReportItem::StageCreated { stage, producer });
        stage
    }

    /// Removes a stage; its batches are destroyed or go back to inventory.
    /// Returns the destroyed batches.
    pub fn destroy_stage(&mut self, stage: StageId, destroy_batches: bool) -> Vec<BatchId> {
        const OP: &str = "destroy_stage";
        let (record, destroyed) =
            settle(OP, self.stores.materials.destroy_stage(stage, destroy_batches));
        let destroyed: Vec<BatchId> = destroyed.into_iter().map(|(batch, _)| batch).collect();
        for batch in &destroyed {
            self.stores.batch_properties.reset_slot(batch.index());
        }
        self.dispatcher.purge(ScopedEntity::Stage(stage));
        self.report(|| ReportItem::StageDestroyed {
            stage,
            producer: record.producer,
            destroyed_batches: destroyed.clone(),
        });
        destroyed
    }

    pub fn move_batch_to_stage(&mut self, batch: BatchId, stage: StageId) {
        settle(
            "move_batch_to_stage",
            self.stores.materials.move_to_stage(batch, stage),
        );
        self.report(|| ReportItem::BatchStaged { batch, stage });
    }

    pub fn move_batch_to_inventory(&mut self, batch: BatchId) {
        let stage = settle(
            "move_stage_batch_to_inventory",
            self.stores.materials.move_to_inventory(batch),
        );
        self.report(|| ReportItem::BatchUnstaged { batch, stage });
    }

    pub fn set_stage_offer(&mut self, stage: StageId, offered: bool) {
        const OP: &str = "set_stage_offer";
        let producer = settle(OP, self.stores.materials.stage(stage)).producer;
        settle(OP, self.stores.materials.set_offered(stage, offered));
        self.publish(
            &[
                Topic::StageOffer(StageScope::All),
                Topic::StageOffer(StageScope::Producer(producer)),
                Topic::StageOffer(StageScope::Stage(stage)),
            ],
            || Observation::StageOffer { stage, offered },
        );
        self.report(|| ReportItem::StageOfferChanged { stage, offered });
    }

    pub fn transfer_offered_stage(&mut self, stage: StageId, to: MaterialsProducerId) {
        const OP: &str = "transfer_offered_stage";
        let from = settle(OP, self.stores.materials.transfer_stage(stage, to));
        self.publish(
            &[
                Topic::StageTransfer(StageScope::All),
                Topic::StageTransfer(StageScope::Producer(from)),
                Topic::StageTransfer(StageScope::Producer(to)),
                Topic::StageTransfer(StageScope::Stage(stage)),
            ],
            || Observation::StageTransfer { stage, from, to },
        );
        self.report(|| ReportItem::StageTransferred { stage, from, to });
    }

    /// Destroys a stage with its batches and puts a new batch of `material`
    /// into the producer's inventory
    pub fn convert_stage_to_batch(
        &mut self,
        stage: StageId,
        material: MaterialId,
        amount: f64,
    ) -> BatchId {
        let producer = settle("convert_stage_to_batch", self.stores.materials.stage(stage)).producer;
        self.destroy_stage(stage, true);
        self.create_batch(producer, material, amount, &[])
    }

    /// Destroys a stage with its batches and credits the producer with an
    /// amount of a resource
    pub fn convert_stage_to_resource(&mut self, stage: StageId, resource: ResourceId, amount: u64) {
        let producer =
            settle("convert_stage_to_resource", self.stores.materials.stage(stage)).producer;
        self.destroy_stage(stage, true);
        self.add_resource(Holder::MaterialsProducer(producer), resource, amount);
    }
}
