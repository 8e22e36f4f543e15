//! Group lifecycle and membership

use super::{settle, MutationResolver};
use crate::core::error::{fatal, ErrorKind};
use crate::core::types::*;
use crate::observation::{GroupScope, Observation, ScopedEntity, Topic};
use crate::population::Attribute;
use crate::report::ReportItem;

impl<'a> MutationResolver<'a> {
    pub fn create_group(&mut self, group_type: GroupTypeId) -> GroupId {
        const OP: &str = "add_group";
        let group = match self.stores.groups.create(group_type) {
            Some(group) => group,
            None => fatal(OP, ErrorKind::UnknownGroupType(group_type)),
        };
        self.publish(
            &[
                Topic::GroupConstruction(GroupScope::All),
                Topic::GroupConstruction(GroupScope::GroupType(group_type)),
            ],
            || Observation::GroupConstructed { group, group_type },
        );
        self.report(|| ReportItem::GroupCreated { group, group_type });
        tracing::debug!(group = %group, group_type = %group_type, "group created");
        group
    }

    /// Removes a group with all of its memberships and group-scoped
    /// subscriptions
    pub fn remove_group(&mut self, group: GroupId) {
        const OP: &str = "remove_group";
        let group_type = settle(OP, self.stores.require_group(group));
        let properties = self
            .reports
            .is_active()
            .then(|| self.stores.group_properties.snapshot(group.index()))
            .unwrap_or_default();

        let members = match self.stores.groups.remove(group) {
            Some(members) => members,
            None => fatal(OP, ErrorKind::UnknownGroup(group)),
        };
        self.stores.group_properties.reset_slot(group.index());
        for &person in &members {
            self.person_changed(person, &Attribute::GroupMembership);
        }
        self.indices.on_group_removed(group);

        self.publish(
            &[
                Topic::GroupDestruction(GroupScope::All),
                Topic::GroupDestruction(GroupScope::GroupType(group_type)),
                Topic::GroupDestruction(GroupScope::Group(group)),
            ],
            || Observation::GroupDestroyed { group, group_type },
        );
        self.dispatcher.purge(ScopedEntity::Group(group));
        tracing::debug!(group = %group, members = members.len(), "group removed");
        self.report(|| ReportItem::GroupRemoved {
            group,
            group_type,
            members,
            properties,
        });
    }

    pub fn add_to_group(&mut self, person: PersonId, group: GroupId) {
        const OP: &str = "add_person_to_group";
        if !self.stores.groups.add_member(person, group) {
            fatal(OP, ErrorKind::AlreadyGroupMember { person, group });
        }
        self.membership_changed(OP, person, group, true);
    }

    pub fn remove_from_group(&mut self, person: PersonId, group: GroupId) {
        const OP: &str = "remove_person_from_group";
        if !self.stores.groups.remove_member(person, group) {
            fatal(OP, ErrorKind::NotGroupMember { person, group });
        }
        self.membership_changed(OP, person, group, false);
    }

    fn membership_changed(&mut self, operation: &'static str, person: PersonId, group: GroupId, joined: bool) {
        self.person_changed(person, &Attribute::GroupMembership);
        let topics = self
            .group_scopes(operation, group)
            .map(Topic::GroupMembership);
        self.publish(&topics, || Observation::GroupMembership {
            group,
            person,
            joined,
        });
        self.report(|| ReportItem::MembershipChanged {
            group,
            person,
            joined,
        });
    }
}
