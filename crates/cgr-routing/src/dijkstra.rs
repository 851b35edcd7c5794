//! Temporal Dijkstra path search
//!
//! Distance is arrival time. Reaching a contact costs
//! `max(contact.from_time, predecessor_arrival) + owlt + margin`, so edge
//! cost depends on when data gets to the predecessor, and a contact is
//! only usable if it is still open when that data arrives.
//!
//! Per-contact scratch state lives in a side table owned by one search and
//! dropped when it returns, so nothing leaks between searches.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use cgr_core::{ContactGraph, ContactId, DtnTime, MAX_TIME, NodeNbr};
use tracing::trace;

use crate::config::CgrConfig;
use crate::error::CgrResult;
use crate::reason::ExclusionReason;

/// Where a search starts
#[derive(Debug, Clone, Copy)]
pub enum SearchRoot<'a> {
    /// The local node, reached at the current time
    Local,
    /// The last contact of an existing route prefix
    ///
    /// Every contact leaving a node the prefix departs from is suppressed,
    /// so the spur cannot loop back through the prefix.
    Spur(&'a [ContactId]),
}

/// Contacts found by one search, from the root's successor to the destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub hops: Vec<ContactId>,
    pub arrival_time: DtnTime,
}

/// Per-contact scratch for one search
#[derive(Debug, Clone, Copy)]
struct ContactNote {
    predecessor: Option<ContactId>,
    arrival_time: DtnTime,
    hop_count: usize,
    visited: bool,
    suppressed: bool,
}

impl Default for ContactNote {
    fn default() -> Self {
        Self {
            predecessor: None,
            arrival_time: MAX_TIME,
            hop_count: 0,
            visited: false,
            suppressed: false,
        }
    }
}

/// The contact being expanded, or the synthetic local root
#[derive(Debug, Clone, Copy)]
struct Current {
    node: NodeNbr,
    /// Node the current contact departs from; `None` at the local root
    previous: Option<NodeNbr>,
    arrival_time: DtnTime,
    hop_count: usize,
    contact: Option<ContactId>,
}

/// Single best-arrival path search over a contact graph
pub struct PathFinder<'a, G> {
    graph: &'a G,
    config: &'a CgrConfig,
}

impl<'a, G: ContactGraph> PathFinder<'a, G> {
    pub fn new(graph: &'a G, config: &'a CgrConfig) -> Self {
        Self { graph, config }
    }

    /// The graph searched
    pub fn graph(&self) -> &'a G {
        self.graph
    }

    /// Arrival time at the end of a route prefix, walking it from `now`
    ///
    /// `None` if a prefix contact is gone, has no known light time, or has
    /// closed by the time data reaches it.
    pub fn prefix_arrival(&self, prefix: &[ContactId], now: DtnTime) -> Option<DtnTime> {
        let mut arrival = now;
        for id in prefix {
            let contact = self.graph.contact(*id)?;
            let owlt = self.graph.applicable_owlt(contact)?;
            let transmit = contact.from_time.max(arrival);
            if transmit >= contact.to_time {
                return None;
            }
            arrival = transmit
                .saturating_add(i64::from(owlt))
                .saturating_add(self.config.owlt_margin(owlt));
        }
        Some(arrival)
    }

    /// Find the earliest-arrival path from `root` to `destination`
    ///
    /// Contacts in `excluded` are never used. Returns `Ok(None)` when the
    /// destination is unreachable; errors only if the hop list cannot be
    /// allocated.
    pub fn find(
        &self,
        root: SearchRoot<'_>,
        destination: NodeNbr,
        now: DtnTime,
        excluded: &HashSet<ContactId>,
    ) -> CgrResult<Option<Path>> {
        let mut notes: HashMap<ContactId, ContactNote> = HashMap::new();
        for id in excluded {
            notes.entry(*id).or_default().suppressed = true;
        }

        let (mut current, root_contact) = match root {
            SearchRoot::Local => (
                Current {
                    node: self.graph.local_node(),
                    previous: None,
                    arrival_time: now,
                    hop_count: 0,
                    contact: None,
                },
                None,
            ),
            SearchRoot::Spur(prefix) => {
                let Some(&root_id) = prefix.last() else {
                    return self.find(SearchRoot::Local, destination, now, excluded);
                };
                let Some(root_contact) = self.graph.contact(root_id) else {
                    return Ok(None);
                };
                let Some(arrival_time) = self.prefix_arrival(prefix, now) else {
                    return Ok(None);
                };
                for id in prefix {
                    let Some(hop) = self.graph.contact(*id) else {
                        return Ok(None);
                    };
                    for (departing, _) in self.graph.contacts_from(
                        hop.from_node,
                        self.config.home_region,
                        DtnTime::MIN,
                    ) {
                        notes.entry(departing).or_default().suppressed = true;
                    }
                }
                let note = notes.entry(root_id).or_default();
                note.arrival_time = arrival_time;
                note.hop_count = prefix.len();
                (
                    Current {
                        node: root_contact.to_node,
                        previous: Some(root_contact.from_node),
                        arrival_time,
                        hop_count: prefix.len(),
                        contact: Some(root_id),
                    },
                    Some(root_id),
                )
            }
        };

        let mut frontier: BinaryHeap<Reverse<(DtnTime, usize, NodeNbr, ContactId)>> =
            BinaryHeap::new();

        loop {
            for (id, contact) in self
                .graph
                .contacts_from(current.node, self.config.home_region, now)
            {
                let note = notes.entry(id).or_default();
                if note.suppressed {
                    trace!(%id, reason = %ExclusionReason::ContactSuppressed, "contact skipped");
                    continue;
                }
                if note.visited {
                    continue;
                }
                // Loopback only leaves the local root, and no hop turns straight back
                if let Some(previous) = current.previous
                    && (contact.to_node == previous || contact.from_node == contact.to_node)
                {
                    continue;
                }
                if contact.to_time <= current.arrival_time {
                    trace!(%id, reason = %ExclusionReason::ContactEndsEarly, "contact skipped");
                    continue;
                }
                let Some(owlt) = self.graph.applicable_owlt(contact) else {
                    trace!(%id, reason = %ExclusionReason::NoRange, "contact skipped");
                    note.suppressed = true;
                    continue;
                };

                let arrival_time = contact
                    .from_time
                    .max(current.arrival_time)
                    .saturating_add(i64::from(owlt))
                    .saturating_add(self.config.owlt_margin(owlt));
                if arrival_time < note.arrival_time {
                    note.arrival_time = arrival_time;
                    note.predecessor = current.contact;
                    note.hop_count = current.hop_count + 1;
                    frontier.push(Reverse((
                        arrival_time,
                        note.hop_count,
                        contact.to_node,
                        id,
                    )));
                }
            }

            if let Some(id) = current.contact {
                notes.entry(id).or_default().visited = true;
            }

            // Earliest arrival first, then fewest hops
            let next = loop {
                let Some(Reverse((arrival_time, hop_count, node, id))) = frontier.pop() else {
                    break None;
                };
                let Some(from_node) = self.graph.contact(id).map(|contact| contact.from_node)
                else {
                    continue;
                };
                let note = notes.entry(id).or_default();
                if note.visited
                    || note.suppressed
                    || note.arrival_time != arrival_time
                    || note.hop_count != hop_count
                {
                    continue;
                }
                break Some(Current {
                    node,
                    previous: Some(from_node),
                    arrival_time,
                    hop_count,
                    contact: Some(id),
                });
            };

            let Some(next) = next else {
                return Ok(None);
            };
            current = next;

            if current.node == destination {
                let terminal = current.contact;
                return self
                    .build_path(&notes, terminal, root_contact, current.arrival_time)
                    .map(Some);
            }
        }
    }

    fn build_path(
        &self,
        notes: &HashMap<ContactId, ContactNote>,
        terminal: Option<ContactId>,
        root_contact: Option<ContactId>,
        arrival_time: DtnTime,
    ) -> CgrResult<Path> {
        let mut hops = Vec::new();
        let mut cursor = terminal;
        while let Some(id) = cursor {
            if Some(id) == root_contact {
                break;
            }
            hops.try_reserve(1)?;
            hops.push(id);
            cursor = notes.get(&id).and_then(|note| note.predecessor);
        }
        hops.reverse();
        Ok(Path { hops, arrival_time })
    }
}
