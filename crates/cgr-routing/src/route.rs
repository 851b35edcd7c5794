//! Computed routes
//!
//! A [`Route`] is an immutable hop list plus the summary values route
//! selection compares. Routes are shared as `Arc<Route>` between the
//! cache and callers; per-bundle capacity figures live in
//! [`CapacityAssessment`](crate::CapacityAssessment), never in the route.

use std::fmt::{self, Display};

use cgr_core::{ContactGraph, ContactId, DtnTime, MAX_TIME, NodeNbr};

/// Handle to a route inside one routing object
///
/// Handles are never reused within a routing object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RouteId(pub(crate) u64);

impl Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "route#{}", self.0)
    }
}

/// A path from the local node to a destination through a sequence of contacts
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Neighbor the bundle is handed to
    pub to_node_nbr: NodeNbr,
    /// Start of the first hop
    pub from_time: DtnTime,
    /// Earliest end among all hops
    pub to_time: DtnTime,
    /// Best-case end-to-end arrival time
    pub arrival_time: DtnTime,
    /// Product of hop confidences
    pub arrival_confidence: f32,
    /// Contacts in traversal order
    pub hops: Vec<ContactId>,
    /// Index of the hop this route branched from its parent, if any
    pub root_of_spur: Option<usize>,
}

impl Route {
    /// Summarize a hop list against the graph
    ///
    /// Returns `None` if the list is empty or any hop no longer exists.
    pub fn from_hops<G: ContactGraph>(
        graph: &G,
        hops: Vec<ContactId>,
        arrival_time: DtnTime,
        root_of_spur: Option<usize>,
    ) -> Option<Self> {
        let first = graph.contact(*hops.first()?)?;
        let mut to_time = MAX_TIME;
        let mut arrival_confidence = 1.0_f32;
        for hop in &hops {
            let contact = graph.contact(*hop)?;
            to_time = to_time.min(contact.to_time);
            arrival_confidence *= contact.confidence;
        }

        Some(Self {
            to_node_nbr: first.to_node,
            from_time: first.from_time,
            to_time,
            arrival_time,
            arrival_confidence,
            hops,
            root_of_spur,
        })
    }

    /// Number of contacts traversed
    pub fn hop_count(&self) -> usize {
        self.hops.len()
    }

    /// The contact the bundle leaves the local node on
    pub fn first_hop(&self) -> ContactId {
        self.hops[0]
    }

    /// Whether the route's window has closed at `now`
    pub fn is_expired(&self, now: DtnTime) -> bool {
        self.to_time <= now
    }

    /// Whether any cited contact has been removed from the graph
    pub fn is_disabled<G: ContactGraph>(&self, graph: &G) -> bool {
        self.hops.iter().any(|hop| !graph.contains(*hop))
    }

    /// Whether the route passes through the contact
    pub fn cites(&self, contact: ContactId) -> bool {
        self.hops.contains(&contact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgr_core::{Contact, ContactPlan};

    #[test]
    fn test_from_hops_summary() {
        let mut plan = ContactPlan::new(NodeNbr(1));
        let a = plan
            .insert_contact(
                Contact::scheduled(NodeNbr(1), NodeNbr(2), 0, 100, 10).with_confidence(0.5),
            )
            .unwrap();
        let b = plan
            .insert_contact(
                Contact::scheduled(NodeNbr(2), NodeNbr(3), 20, 80, 10).with_confidence(0.5),
            )
            .unwrap();

        let route = Route::from_hops(&plan, vec![a, b], 20, None).unwrap();
        assert_eq!(route.to_node_nbr, NodeNbr(2));
        assert_eq!(route.from_time, 0);
        assert_eq!(route.to_time, 80);
        assert_eq!(route.arrival_confidence, 0.25);
        assert_eq!(route.hop_count(), 2);
        assert!(route.is_expired(80));
        assert!(!route.is_disabled(&plan));

        plan.remove_contact(b).unwrap();
        assert!(route.is_disabled(&plan));
        assert!(Route::from_hops(&plan, vec![a, b], 20, None).is_none());
    }

    #[test]
    fn test_empty_hops_rejected() {
        let plan = ContactPlan::new(NodeNbr(1));
        assert!(Route::from_hops(&plan, Vec::new(), 0, None).is_none());
    }
}
