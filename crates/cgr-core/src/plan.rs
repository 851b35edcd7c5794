//! In-memory contact plan
//!
//! [`ContactPlan`] is an arena of contact slots addressed by generation
//! checked [`ContactId`]s, plus an ordered range table. Removing a contact
//! bumps its slot's generation, so stale handles fail [`ContactGraph::contains`]
//! in O(1) without any back-pointers into cached routes.
//!
//! Each live contact carries a residual maximum transmission volume per
//! priority, reduced by [`ContactPlan::reserve_volume`] as bundles are queued.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::contact::{Contact, ContactId, ContactKind, Range};
use crate::error::{ContactPlanError, ContactPlanResult};
use crate::graph::ContactGraph;
use crate::types::{DtnTime, NodeNbr, Priority, RegionNbr};

/// Departure index key: contacts from one node in one region sort by
/// destination node, then start time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct DepartureKey {
    from_node: NodeNbr,
    region: RegionNbr,
    to_node: NodeNbr,
    from_time: DtnTime,
    index: u32,
}

impl DepartureKey {
    fn of(contact: &Contact, index: u32) -> Self {
        Self {
            from_node: contact.from_node,
            region: contact.region,
            to_node: contact.to_node,
            from_time: contact.from_time,
            index,
        }
    }
}

#[derive(Debug)]
struct Entry {
    contact: Contact,
    /// Residual volume by priority index
    mtv: [i64; 3],
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

/// Owned store of contacts and ranges for one local node
#[derive(Debug)]
pub struct ContactPlan {
    local_node: NodeNbr,
    slots: Vec<Slot>,
    free: Vec<u32>,
    departures: BTreeMap<DepartureKey, ContactId>,
    /// Keyed by (from, to, start)
    ranges: BTreeMap<(NodeNbr, NodeNbr, DtnTime), Range>,
    edit_epoch: u64,
}

impl ContactPlan {
    /// Create an empty plan for the given local node
    pub fn new(local_node: NodeNbr) -> Self {
        Self {
            local_node,
            slots: Vec::new(),
            free: Vec::new(),
            departures: BTreeMap::new(),
            ranges: BTreeMap::new(),
            edit_epoch: 0,
        }
    }

    /// Insert a contact, returning its handle
    pub fn insert_contact(&mut self, contact: Contact) -> ContactPlanResult<ContactId> {
        contact.validate()?;

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index =
                    u32::try_from(self.slots.len()).map_err(|_| ContactPlanError::CapacityExceeded)?;
                self.slots.push(Slot::default());
                index
            }
        };

        let slot = &mut self.slots[index as usize];
        let id = ContactId {
            index,
            generation: slot.generation,
        };
        let volume = contact.volume();
        self.departures.insert(DepartureKey::of(&contact, index), id);
        debug!(
            %id,
            from = %contact.from_node,
            to = %contact.to_node,
            from_time = contact.from_time,
            to_time = contact.to_time,
            "contact inserted"
        );
        slot.entry = Some(Entry {
            contact,
            mtv: [volume; 3],
        });
        self.edit_epoch += 1;
        Ok(id)
    }

    /// Remove a contact; its handle and every copy of it stop resolving
    pub fn remove_contact(&mut self, id: ContactId) -> ContactPlanResult<Contact> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .ok_or(ContactPlanError::UnknownContact(id))?;
        let entry = slot.entry.take().ok_or(ContactPlanError::UnknownContact(id))?;

        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.departures
            .remove(&DepartureKey::of(&entry.contact, id.index));
        debug!(%id, "contact removed");
        Ok(entry.contact)
    }

    /// Insert or replace the range for a node pair starting at `range.from_time`
    pub fn insert_range(&mut self, range: Range) -> ContactPlanResult<()> {
        range.validate()?;
        trace!(
            from = %range.from_node,
            to = %range.to_node,
            owlt = range.owlt,
            "range inserted"
        );
        self.ranges
            .insert((range.from_node, range.to_node, range.from_time), range);
        self.edit_epoch += 1;
        Ok(())
    }

    /// Remove the range for a node pair starting at `from_time`
    pub fn remove_range(
        &mut self,
        from_node: NodeNbr,
        to_node: NodeNbr,
        from_time: DtnTime,
    ) -> Option<Range> {
        self.ranges.remove(&(from_node, to_node, from_time))
    }

    /// Drop every contact and range that has ended by `now`
    ///
    /// Returns the number of contacts removed.
    pub fn purge_expired(&mut self, now: DtnTime) -> usize {
        let expired: Vec<ContactId> = self
            .iter()
            .filter(|(_, contact)| !contact.is_live(now))
            .map(|(id, _)| id)
            .collect();
        let removed = expired
            .into_iter()
            .filter_map(|id| self.remove_contact(id).ok())
            .count();
        self.ranges.retain(|_, range| range.to_time > now);
        removed
    }

    /// Charge a queued bundle's estimated consumption against a contact
    ///
    /// Volume for the bundle's priority and every lower priority shrinks,
    /// since lower classes wait behind it.
    pub fn reserve_volume(
        &mut self,
        id: ContactId,
        priority: Priority,
        eccc: u64,
    ) -> ContactPlanResult<()> {
        let entry = self
            .entry_mut(id)
            .ok_or(ContactPlanError::UnknownContact(id))?;
        let eccc = i64::try_from(eccc).unwrap_or(i64::MAX);
        for volume in &mut entry.mtv[..=priority.index()] {
            *volume = volume.saturating_sub(eccc);
        }
        trace!(%id, %priority, eccc, residual = entry.mtv[priority.index()], "volume reserved");
        Ok(())
    }

    /// All live contacts in handle order
    pub fn iter(&self) -> impl Iterator<Item = (ContactId, &Contact)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.entry.as_ref().map(|entry| {
                (
                    ContactId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    &entry.contact,
                )
            })
        })
    }

    /// Number of contacts in the plan
    pub fn len(&self) -> usize {
        self.departures.len()
    }

    /// Check if the plan holds no contacts
    pub fn is_empty(&self) -> bool {
        self.departures.is_empty()
    }

    /// Number of ranges in the plan
    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    fn entry(&self, id: ContactId) -> Option<&Entry> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    fn entry_mut(&mut self, id: ContactId) -> Option<&mut Entry> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_mut())
    }
}

impl ContactGraph for ContactPlan {
    fn local_node(&self) -> NodeNbr {
        self.local_node
    }

    fn contact(&self, id: ContactId) -> Option<&Contact> {
        self.entry(id).map(|entry| &entry.contact)
    }

    fn contacts_from(
        &self,
        node: NodeNbr,
        region: RegionNbr,
        after: DtnTime,
    ) -> impl Iterator<Item = (ContactId, &Contact)> {
        let lo = DepartureKey {
            from_node: node,
            region,
            to_node: NodeNbr(0),
            from_time: DtnTime::MIN,
            index: 0,
        };
        let hi = DepartureKey {
            to_node: NodeNbr(u64::MAX),
            from_time: DtnTime::MAX,
            index: u32::MAX,
            ..lo
        };
        self.departures.range(lo..=hi).filter_map(move |(_, id)| {
            let contact = self.contact(*id)?;
            (contact.is_live(after) && contact.is_routable()).then_some((*id, contact))
        })
    }

    fn applicable_owlt(&self, contact: &Contact) -> Option<u32> {
        match contact.kind {
            ContactKind::Discovered | ContactKind::Hypothetical => Some(0),
            ContactKind::Registration => None,
            ContactKind::Scheduled => {
                let pair = (contact.from_node, contact.to_node);
                let lo = (pair.0, pair.1, DtnTime::MIN);
                let hi = (pair.0, pair.1, DtnTime::MAX);
                for range in self.ranges.range(lo..=hi).map(|(_, range)| range) {
                    if range.to_time <= contact.from_time {
                        continue;
                    }
                    if range.from_time > contact.from_time {
                        break;
                    }
                    return Some(range.owlt);
                }
                None
            }
        }
    }

    fn volume_left(&self, id: ContactId, priority: Priority) -> Option<i64> {
        self.entry(id).map(|entry| entry.mtv[priority.index()])
    }

    fn edit_epoch(&self) -> u64 {
        self.edit_epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(value: u64) -> NodeNbr {
        NodeNbr(value)
    }

    #[test]
    fn test_insert_and_resolve() {
        let mut plan = ContactPlan::new(n(1));
        let id = plan
            .insert_contact(Contact::scheduled(n(1), n(2), 0, 100, 10))
            .unwrap();

        assert!(plan.contains(id));
        assert_eq!(plan.contact(id).unwrap().to_node, n(2));
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.volume_left(id, Priority::Bulk), Some(1000));
    }

    #[test]
    fn test_removed_handle_is_stale_after_slot_reuse() {
        let mut plan = ContactPlan::new(n(1));
        let old = plan
            .insert_contact(Contact::scheduled(n(1), n(2), 0, 100, 10))
            .unwrap();
        plan.remove_contact(old).unwrap();
        let new = plan
            .insert_contact(Contact::scheduled(n(1), n(3), 0, 100, 10))
            .unwrap();

        assert_eq!(old.index, new.index);
        assert!(!plan.contains(old));
        assert!(plan.contains(new));
        assert_eq!(
            plan.remove_contact(old),
            Err(ContactPlanError::UnknownContact(old))
        );
    }

    #[test]
    fn test_contacts_from_ordering_and_filtering() {
        let mut plan = ContactPlan::new(n(1));
        let late = plan
            .insert_contact(Contact::scheduled(n(1), n(2), 50, 100, 10))
            .unwrap();
        let early = plan
            .insert_contact(Contact::scheduled(n(1), n(2), 0, 40, 10))
            .unwrap();
        let other = plan
            .insert_contact(Contact::scheduled(n(1), n(3), 0, 100, 10))
            .unwrap();
        plan.insert_contact(Contact::scheduled(n(2), n(1), 0, 100, 10))
            .unwrap();
        plan.insert_contact(Contact::registration(n(1), n(1))).unwrap();
        plan.insert_contact(
            Contact::scheduled(n(1), n(4), 0, 100, 10).with_region(RegionNbr(7)),
        )
        .unwrap();

        let all: Vec<_> = plan
            .contacts_from(n(1), RegionNbr::HOME, 0)
            .map(|(id, _)| id)
            .collect();
        assert_eq!(all, vec![early, late, other]);

        let after: Vec<_> = plan
            .contacts_from(n(1), RegionNbr::HOME, 40)
            .map(|(id, _)| id)
            .collect();
        assert_eq!(after, vec![late, other]);

        let between: Vec<_> = plan
            .contacts_between(n(1), n(2), RegionNbr::HOME, 0)
            .map(|(id, _)| id)
            .collect();
        assert_eq!(between, vec![early, late]);
    }

    #[test]
    fn test_applicable_owlt() {
        let mut plan = ContactPlan::new(n(1));
        plan.insert_range(Range::new(n(1), n(2), 0, 50, 1)).unwrap();
        plan.insert_range(Range::new(n(1), n(2), 50, 200, 3)).unwrap();

        let c = Contact::scheduled(n(1), n(2), 10, 20, 1);
        assert_eq!(plan.applicable_owlt(&c), Some(1));

        let c = Contact::scheduled(n(1), n(2), 60, 80, 1);
        assert_eq!(plan.applicable_owlt(&c), Some(3));

        // No range for the reverse direction
        let c = Contact::scheduled(n(2), n(1), 10, 20, 1);
        assert_eq!(plan.applicable_owlt(&c), None);

        // Discovered contacts are never range checked
        let c = c.with_kind(ContactKind::Discovered);
        assert_eq!(plan.applicable_owlt(&c), Some(0));
    }

    #[test]
    fn test_owlt_unknown_when_range_starts_late() {
        let mut plan = ContactPlan::new(n(1));
        plan.insert_range(Range::new(n(1), n(2), 30, 200, 2)).unwrap();
        let c = Contact::scheduled(n(1), n(2), 10, 100, 1);
        assert_eq!(plan.applicable_owlt(&c), None);
    }

    #[test]
    fn test_reserve_volume_charges_lower_priorities() {
        let mut plan = ContactPlan::new(n(1));
        let id = plan
            .insert_contact(Contact::scheduled(n(1), n(2), 0, 10, 100))
            .unwrap();
        plan.reserve_volume(id, Priority::Standard, 300).unwrap();

        assert_eq!(plan.volume_left(id, Priority::Bulk), Some(700));
        assert_eq!(plan.volume_left(id, Priority::Standard), Some(700));
        assert_eq!(plan.volume_left(id, Priority::Expedited), Some(1000));
    }

    #[test]
    fn test_purge_expired() {
        let mut plan = ContactPlan::new(n(1));
        let gone = plan
            .insert_contact(Contact::scheduled(n(1), n(2), 0, 10, 1))
            .unwrap();
        let kept = plan
            .insert_contact(Contact::scheduled(n(1), n(2), 5, 20, 1))
            .unwrap();
        plan.insert_range(Range::new(n(1), n(2), 0, 10, 1)).unwrap();

        assert_eq!(plan.purge_expired(10), 1);
        assert!(!plan.contains(gone));
        assert!(plan.contains(kept));
        assert_eq!(plan.range_count(), 0);

        // Nothing left to count the second time around
        assert_eq!(plan.purge_expired(10), 0);
        assert_eq!(plan.purge_expired(20), 1);
        assert!(!plan.contains(kept));
    }

    #[test]
    fn test_edit_epoch_advances_on_insert_only() {
        let mut plan = ContactPlan::new(n(1));
        let start = plan.edit_epoch();
        let id = plan
            .insert_contact(Contact::scheduled(n(1), n(2), 0, 10, 1))
            .unwrap();
        assert_eq!(plan.edit_epoch(), start + 1);
        plan.remove_contact(id).unwrap();
        assert_eq!(plan.edit_epoch(), start + 1);
    }
}
