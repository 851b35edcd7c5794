//! Route cache keyed by destination
//!
//! The [`RouteTable`] holds one [`RoutingObject`] per destination so route
//! computations are reused across forwarding decisions. It is passed
//! explicitly to the router rather than living in a global.
//!
//! Cached route lists cannot know about contacts added after they were
//! built, so the table remembers the graph edit epoch it was loaded at and
//! discards everything when the graph has moved on.

use std::sync::atomic::{AtomicU64, Ordering};

use cgr_core::NodeNbr;
use dashmap::DashMap;
use dashmap::mapref::one::{Ref, RefMut};
use tracing::debug;

use crate::route_set::RoutingObject;

/// Cached routing objects
#[derive(Debug, Default)]
pub struct RouteTable {
    /// Routing objects indexed by destination
    objects: DashMap<NodeNbr, RoutingObject>,
    /// Graph edit epoch the cached routes were computed against
    loaded_epoch: AtomicU64,
}

impl RouteTable {
    /// Create an empty route table
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard every routing object if the graph has been edited since load
    ///
    /// Returns true if the table was cleared.
    pub fn sync_epoch(&self, epoch: u64) -> bool {
        let previous = self.loaded_epoch.swap(epoch, Ordering::AcqRel);
        if previous == epoch {
            return false;
        }
        if !self.objects.is_empty() {
            debug!(previous, epoch, routes = self.objects.len(), "contact plan edited, clearing routes");
        }
        self.objects.clear();
        true
    }

    /// Graph edit epoch the cached routes belong to
    pub fn loaded_epoch(&self) -> u64 {
        self.loaded_epoch.load(Ordering::Acquire)
    }

    /// The routing object for a destination, created on first use
    ///
    /// Holds the destination's shard lock until the guard is dropped, so
    /// two decisions for the same destination cannot interleave.
    pub fn entry(&self, dest: NodeNbr) -> RefMut<'_, NodeNbr, RoutingObject> {
        self.objects
            .entry(dest)
            .or_insert_with(|| RoutingObject::new(dest))
    }

    /// The routing object for a destination, if one exists
    pub fn get(&self, dest: NodeNbr) -> Option<Ref<'_, NodeNbr, RoutingObject>> {
        self.objects.get(&dest)
    }

    /// Tear down the routing object for a destination
    pub fn remove(&self, dest: NodeNbr) -> Option<RoutingObject> {
        self.objects.remove(&dest).map(|(_, object)| object)
    }

    /// Get the number of destinations with a routing object
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Clear all routing objects
    pub fn clear(&self) {
        self.objects.clear();
    }

    /// Get all destinations with a routing object, ascending
    pub fn destinations(&self) -> Vec<NodeNbr> {
        let mut destinations: Vec<NodeNbr> =
            self.objects.iter().map(|entry| *entry.key()).collect();
        destinations.sort_unstable();
        destinations
    }
}
