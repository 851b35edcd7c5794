//! Egress plan queries
//!
//! Route selection needs to know, for a candidate first-hop neighbor,
//! whether its outbound queue is blocked and how many bytes are queued
//! ahead of a new bundle. [`EgressPlans`] is that query; [`EgressTable`] is
//! a concurrent in-memory implementation the forwarder can update while
//! routing reads it.

use std::collections::BTreeMap;

use dashmap::DashMap;
use tracing::debug;

use crate::types::{NodeNbr, Priority};

/// Bytes queued for a neighbor, split by class of service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Backlog {
    /// Bytes already committed to the outduct by rate control
    pub throttle_committed: u64,
    pub bulk: u64,
    pub standard: u64,
    /// All expedited bytes regardless of ordinal
    pub expedited: u64,
    /// Expedited bytes keyed by ordinal
    pub ordinals: BTreeMap<u8, u64>,
}

impl Backlog {
    /// Bytes queued across every priority
    pub fn total(&self) -> u64 {
        self.bulk
            .saturating_add(self.standard)
            .saturating_add(self.expedited)
    }

    /// Expedited bytes queued at `ordinal` or above
    pub fn expedited_from(&self, ordinal: u8) -> u64 {
        self.ordinals.range(ordinal..).map(|(_, bytes)| *bytes).sum()
    }

    /// Account for bytes entering the queue
    pub fn add(&mut self, priority: Priority, ordinal: u8, bytes: u64) {
        match priority {
            Priority::Bulk => self.bulk = self.bulk.saturating_add(bytes),
            Priority::Standard => self.standard = self.standard.saturating_add(bytes),
            Priority::Expedited => {
                self.expedited = self.expedited.saturating_add(bytes);
                let slot = self.ordinals.entry(ordinal).or_default();
                *slot = slot.saturating_add(bytes);
            }
        }
    }

    /// Account for bytes leaving the queue
    pub fn remove(&mut self, priority: Priority, ordinal: u8, bytes: u64) {
        match priority {
            Priority::Bulk => self.bulk = self.bulk.saturating_sub(bytes),
            Priority::Standard => self.standard = self.standard.saturating_sub(bytes),
            Priority::Expedited => {
                self.expedited = self.expedited.saturating_sub(bytes);
                if let Some(slot) = self.ordinals.get_mut(&ordinal) {
                    *slot = slot.saturating_sub(bytes);
                    if *slot == 0 {
                        self.ordinals.remove(&ordinal);
                    }
                }
            }
        }
    }
}

/// Outbound queue state for one neighbor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EgressPlan {
    pub blocked: bool,
    pub backlog: Backlog,
}

/// Lookup of egress plans by neighbor
pub trait EgressPlans {
    /// The plan for a neighbor, or `None` if there is no way to send to it
    fn plan(&self, neighbor: NodeNbr) -> Option<EgressPlan>;
}

/// Concurrent table of egress plans keyed by neighbor
#[derive(Debug, Default)]
pub struct EgressTable {
    plans: DashMap<NodeNbr, EgressPlan>,
}

impl EgressTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an unblocked, empty plan for each neighbor
    pub fn with_neighbors(neighbors: impl IntoIterator<Item = NodeNbr>) -> Self {
        let table = Self::new();
        for neighbor in neighbors {
            table.set_plan(neighbor, EgressPlan::default());
        }
        table
    }

    /// Insert or replace a neighbor's plan
    pub fn set_plan(&self, neighbor: NodeNbr, plan: EgressPlan) {
        self.plans.insert(neighbor, plan);
    }

    /// Remove a neighbor's plan
    pub fn remove(&self, neighbor: NodeNbr) -> Option<EgressPlan> {
        self.plans.remove(&neighbor).map(|(_, plan)| plan)
    }

    /// Stop sending to a neighbor
    pub fn block(&self, neighbor: NodeNbr) {
        if let Some(mut plan) = self.plans.get_mut(&neighbor) {
            plan.blocked = true;
            debug!(%neighbor, "egress plan blocked");
        }
    }

    /// Resume sending to a neighbor
    pub fn unblock(&self, neighbor: NodeNbr) {
        if let Some(mut plan) = self.plans.get_mut(&neighbor) {
            plan.blocked = false;
            debug!(%neighbor, "egress plan unblocked");
        }
    }

    /// Record bytes queued for a neighbor
    ///
    /// Returns false if the neighbor has no plan.
    pub fn enqueue(&self, neighbor: NodeNbr, priority: Priority, ordinal: u8, bytes: u64) -> bool {
        match self.plans.get_mut(&neighbor) {
            Some(mut plan) => {
                plan.backlog.add(priority, ordinal, bytes);
                true
            }
            None => false,
        }
    }

    /// Record bytes sent to a neighbor
    pub fn dequeue(&self, neighbor: NodeNbr, priority: Priority, ordinal: u8, bytes: u64) {
        if let Some(mut plan) = self.plans.get_mut(&neighbor) {
            plan.backlog.remove(priority, ordinal, bytes);
        }
    }

    /// Number of neighbors with a plan
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    /// Check if there are no plans
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

impl EgressPlans for EgressTable {
    fn plan(&self, neighbor: NodeNbr) -> Option<EgressPlan> {
        self.plans.get(&neighbor).map(|plan| plan.clone())
    }
}
