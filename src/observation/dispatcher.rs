//! Subscription registry and deferred delivery queue

use std::collections::VecDeque;
use std::rc::Rc;

use ahash::{AHashMap, AHashSet};

use crate::core::types::{ComponentRef, Focus};
use crate::observation::topic::{Observation, ScopedEntity, Topic};

/// One queued delivery
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub recipient: ComponentRef,
    /// Who caused the change
    pub focal: Focus,
    pub observation: Rc<Observation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    PendingDelivery,
}

#[derive(Debug, Clone)]
pub struct ObservationDispatcher {
    /// Subscribers per topic, in subscription order
    subscriptions: AHashMap<Topic, Vec<ComponentRef>>,
    /// Topics bound to a removable entity, for eager purge
    by_entity: AHashMap<ScopedEntity, Vec<Topic>>,
    queue: VecDeque<Notification>,
    high_water: usize,
    shrink_threshold: usize,
}

impl ObservationDispatcher {
    pub fn new(shrink_threshold: usize) -> Self {
        Self {
            subscriptions: AHashMap::new(),
            by_entity: AHashMap::new(),
            queue: VecDeque::new(),
            high_water: 0,
            shrink_threshold,
        }
    }

    /// False if the component was already subscribed
    pub fn subscribe(&mut self, topic: Topic, component: ComponentRef) -> bool {
        let subscribers = self.subscriptions.entry(topic.clone()).or_default();
        if subscribers.contains(&component) {
            return false;
        }
        subscribers.push(component);
        if let Some(entity) = topic.scoped_entity() {
            let topics = self.by_entity.entry(entity).or_default();
            if !topics.contains(&topic) {
                topics.push(topic);
            }
        }
        true
    }

    /// False if the component was not subscribed
    pub fn unsubscribe(&mut self, topic: &Topic, component: &ComponentRef) -> bool {
        let Some(subscribers) = self.subscriptions.get_mut(topic) else {
            return false;
        };
        let Some(pos) = subscribers.iter().position(|c| c == component) else {
            return false;
        };
        subscribers.remove(pos);
        if subscribers.is_empty() {
            self.subscriptions.remove(topic);
            if let Some(entity) = topic.scoped_entity() {
                if let Some(topics) = self.by_entity.get_mut(&entity) {
                    topics.retain(|t| t != topic);
                    if topics.is_empty() {
                        self.by_entity.remove(&entity);
                    }
                }
            }
        }
        true
    }

    pub fn subscribers(&self, topic: &Topic) -> &[ComponentRef] {
        self.subscriptions
            .get(topic)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_subscribed(&self, topic: &Topic, component: &ComponentRef) -> bool {
        self.subscribers(topic).contains(component)
    }

    /// Drops every subscription bound to a removed entity; returns how many
    /// topics were cleared
    pub fn purge(&mut self, entity: ScopedEntity) -> usize {
        let Some(topics) = self.by_entity.remove(&entity) else {
            return 0;
        };
        for topic in &topics {
            self.subscriptions.remove(topic);
        }
        tracing::trace!(?entity, topics = topics.len(), "subscriptions purged");
        topics.len()
    }

    /// Distinct recipients across `topics`, excluding the focal component
    fn recipients(&self, focal: &Focus, topics: &[Topic]) -> Vec<ComponentRef> {
        let mut seen = AHashSet::new();
        let mut recipients = Vec::new();
        for topic in topics {
            for component in self.subscribers(topic) {
                if focal.is(component) || !seen.insert(component) {
                    continue;
                }
                recipients.push(component.clone());
            }
        }
        recipients
    }

    /// Queues one notification per interested component. The payload is
    /// only built when somebody listens. Returns the number queued.
    pub fn publish(
        &mut self,
        focal: &Focus,
        topics: &[Topic],
        observation: impl FnOnce() -> Observation,
    ) -> usize {
        let recipients = self.recipients(focal, topics);
        if recipients.is_empty() {
            return 0;
        }
        let observation = Rc::new(observation());
        let count = recipients.len();
        for recipient in recipients {
            self.queue.push_back(Notification {
                recipient,
                focal: focal.clone(),
                observation: Rc::clone(&observation),
            });
        }
        self.high_water = self.high_water.max(self.queue.len());
        tracing::trace!(recipients = count, queued = self.queue.len(), "observation published");
        count
    }

    /// Next delivery in FIFO order. Once the queue drains after a large
    /// burst its storage is released.
    pub fn pop(&mut self) -> Option<Notification> {
        let next = self.queue.pop_front();
        if self.queue.is_empty() && self.high_water > self.shrink_threshold {
            tracing::debug!(high_water = self.high_water, "notification queue released");
            self.queue = VecDeque::new();
            self.high_water = 0;
        }
        next
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn state(&self) -> DispatchState {
        if self.queue.is_empty() {
            DispatchState::Idle
        } else {
            DispatchState::PendingDelivery
        }
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::*;
    use crate::observation::topic::PersonScope;

    fn region(id: u32) -> ComponentRef {
        ComponentRef::Region(RegionId(id))
    }

    fn added(person: usize) -> impl FnOnce() -> Observation {
        move || Observation::PersonAdded {
            person: PersonId(person),
        }
    }

    #[test]
    fn test_fan_out_dedupes_and_skips_focal() {
        let mut dispatcher = ObservationDispatcher::new(100);
        let all = Topic::PersonAddition(PersonScope::All);
        let in_r1 = Topic::PersonAddition(PersonScope::Region(RegionId(1)));
        dispatcher.subscribe(all.clone(), region(1));
        dispatcher.subscribe(all.clone(), region(2));
        dispatcher.subscribe(in_r1.clone(), region(2));

        let queued = dispatcher.publish(&Focus::from(region(1)), &[all, in_r1], added(0));
        assert_eq!(queued, 1);
        let notification = dispatcher.pop().unwrap();
        assert_eq!(notification.recipient, region(2));
        assert_eq!(notification.focal, Focus::from(region(1)));
        assert_eq!(dispatcher.state(), DispatchState::Idle);
    }

    #[test]
    fn test_fifo_order() {
        let mut dispatcher = ObservationDispatcher::new(100);
        let all = Topic::PersonAddition(PersonScope::All);
        dispatcher.subscribe(all.clone(), region(2));
        for person in 0..3 {
            dispatcher.publish(&Focus::Simulation, &[all.clone()], added(person));
        }
        assert_eq!(dispatcher.state(), DispatchState::PendingDelivery);
        let order: Vec<_> = std::iter::from_fn(|| dispatcher.pop())
            .map(|n| (*n.observation).clone())
            .collect();
        assert_eq!(
            order,
            (0..3)
                .map(|p| Observation::PersonAdded { person: PersonId(p) })
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_payload_not_built_without_listeners() {
        let mut dispatcher = ObservationDispatcher::new(100);
        let queued = dispatcher.publish(
            &Focus::Simulation,
            &[Topic::PersonAddition(PersonScope::All)],
            || panic!("built without listeners"),
        );
        assert_eq!(queued, 0);
    }

    #[test]
    fn test_queue_released_after_large_burst() {
        let mut dispatcher = ObservationDispatcher::new(10);
        let all = Topic::PersonAddition(PersonScope::All);
        dispatcher.subscribe(all.clone(), region(1));
        for person in 0..50 {
            dispatcher.publish(&Focus::Simulation, &[all.clone()], added(person));
        }
        assert!(dispatcher.queue_capacity() >= 50);
        while dispatcher.pop().is_some() {}
        assert_eq!(dispatcher.queue_capacity(), 0);
    }

    #[test]
    fn test_purge_person_scoped_subscriptions() {
        let mut dispatcher = ObservationDispatcher::new(100);
        let scoped = Topic::PersonRegion(PersonScope::Person(PersonId(4)));
        let broad = Topic::PersonRegion(PersonScope::All);
        dispatcher.subscribe(scoped.clone(), region(1));
        dispatcher.subscribe(broad.clone(), region(1));

        assert_eq!(dispatcher.purge(ScopedEntity::Person(PersonId(4))), 1);
        assert!(dispatcher.subscribers(&scoped).is_empty());
        assert!(dispatcher.is_subscribed(&broad, &region(1)));
        assert_eq!(dispatcher.purge(ScopedEntity::Person(PersonId(4))), 0);
    }

    #[test]
    fn test_unsubscribe() {
        let mut dispatcher = ObservationDispatcher::new(100);
        let topic = Topic::GroupMembership(crate::observation::topic::GroupScope::Group(GroupId(2)));
        assert!(dispatcher.subscribe(topic.clone(), region(1)));
        assert!(!dispatcher.subscribe(topic.clone(), region(1)));
        assert!(dispatcher.unsubscribe(&topic, &region(1)));
        assert!(!dispatcher.unsubscribe(&topic, &region(1)));
        assert_eq!(dispatcher.purge(ScopedEntity::Group(GroupId(2))), 0);
    }
}
