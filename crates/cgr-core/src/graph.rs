//! Read-only query seam over the contact graph
//!
//! Route computation never edits contacts or ranges. It reads them through
//! [`ContactGraph`], which the in-memory [`ContactPlan`](crate::ContactPlan)
//! implements and which an external contact plan store can implement too.

use crate::contact::{Contact, ContactId};
use crate::types::{DtnTime, NodeNbr, Priority, RegionNbr};

/// Queries route computation needs from a contact plan store
pub trait ContactGraph {
    /// The node routes are computed from
    fn local_node(&self) -> NodeNbr;

    /// Resolve a handle, or `None` if the contact has been removed
    fn contact(&self, id: ContactId) -> Option<&Contact>;

    /// Whether a previously seen contact still exists
    fn contains(&self, id: ContactId) -> bool {
        self.contact(id).is_some()
    }

    /// Routable contacts departing `node` in `region` with `to_time > after`
    ///
    /// Ordered by destination node, then start time.
    fn contacts_from(
        &self,
        node: NodeNbr,
        region: RegionNbr,
        after: DtnTime,
    ) -> impl Iterator<Item = (ContactId, &Contact)>;

    /// Contacts from `from` to `to`, ordered by start time
    fn contacts_between(
        &self,
        from: NodeNbr,
        to: NodeNbr,
        region: RegionNbr,
        after: DtnTime,
    ) -> impl Iterator<Item = (ContactId, &Contact)> {
        self.contacts_from(from, region, after)
            .filter(move |(_, contact)| contact.to_node == to)
    }

    /// One-way light time in effect at the contact's start
    ///
    /// `None` means unknown; such a contact must not be used.
    fn applicable_owlt(&self, contact: &Contact) -> Option<u32>;

    /// Remaining transmission volume of a contact for one priority
    fn volume_left(&self, id: ContactId, priority: Priority) -> Option<i64>;

    /// Counter advanced whenever contacts or ranges are added
    ///
    /// Cached routes computed at an older epoch may have missed a better path.
    fn edit_epoch(&self) -> u64 {
        0
    }
}
