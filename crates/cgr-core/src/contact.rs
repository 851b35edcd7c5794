//! Contacts, ranges and contact handles
//!
//! A [`Contact`] is a directed, time-bounded transmission opportunity.
//! A [`Range`] gives the one-way light time between a node pair over an
//! interval. Both are immutable once inserted into a plan; residual
//! volume lives beside the contact in the plan, not in it.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::error::{ContactPlanError, ContactPlanResult};
use crate::types::{DtnTime, MAX_TIME, NodeNbr, RegionNbr};

/// Stable handle to a contact slot in a plan
///
/// The generation is bumped whenever the slot's contact is removed, so a
/// handle held across a removal no longer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContactId {
    pub index: u32,
    pub generation: u32,
}

impl Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "contact#{}.{}", self.index, self.generation)
    }
}

/// How a contact came to be known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContactKind {
    /// Managed contact plan entry with a real window and rate
    #[default]
    Scheduled,
    /// Region membership marker, never traversed by route search
    Registration,
    /// Learned at run time from neighbor discovery
    Discovered,
    /// Assumed possible, not confirmed
    Hypothetical,
}

/// A directed transmission opportunity from `from_node` to `to_node`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub region: RegionNbr,
    pub from_node: NodeNbr,
    pub to_node: NodeNbr,
    pub from_time: DtnTime,
    pub to_time: DtnTime,
    /// Bytes per second
    pub xmit_rate: u64,
    #[serde(default = "full_confidence")]
    pub confidence: f32,
    #[serde(default)]
    pub kind: ContactKind,
}

fn full_confidence() -> f32 {
    1.0
}

impl Contact {
    /// A scheduled contact in the home region with full confidence
    pub fn scheduled(
        from_node: NodeNbr,
        to_node: NodeNbr,
        from_time: DtnTime,
        to_time: DtnTime,
        xmit_rate: u64,
    ) -> Self {
        Self {
            region: RegionNbr::HOME,
            from_node,
            to_node,
            from_time,
            to_time,
            xmit_rate,
            confidence: 1.0,
            kind: ContactKind::Scheduled,
        }
    }

    /// A registration marker: unbounded window, no rate
    pub fn registration(from_node: NodeNbr, to_node: NodeNbr) -> Self {
        Self::scheduled(from_node, to_node, 0, MAX_TIME, 0).with_kind(ContactKind::Registration)
    }

    /// Set the contact's confidence
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    /// Set the contact's region
    pub fn with_region(mut self, region: RegionNbr) -> Self {
        self.region = region;
        self
    }

    /// Set how the contact was learned
    pub fn with_kind(mut self, kind: ContactKind) -> Self {
        self.kind = kind;
        self
    }

    /// Whether the contact is still open at `now`
    pub fn is_live(&self, now: DtnTime) -> bool {
        self.to_time > now
    }

    /// Whether route search may traverse this contact
    pub fn is_routable(&self) -> bool {
        self.kind != ContactKind::Registration
    }

    /// Total volume over the whole window, in bytes
    pub fn volume(&self) -> i64 {
        let duration = self.to_time.saturating_sub(self.from_time).max(0);
        duration.saturating_mul(i64::try_from(self.xmit_rate).unwrap_or(i64::MAX))
    }

    /// Check the contact is well formed
    pub fn validate(&self) -> ContactPlanResult<()> {
        for node in [self.from_node, self.to_node] {
            if !node.is_valid() {
                return Err(ContactPlanError::InvalidNode(node));
            }
        }
        if self.from_time >= self.to_time {
            return Err(ContactPlanError::InvalidWindow {
                from_time: self.from_time,
                to_time: self.to_time,
            });
        }
        if !(self.confidence > 0.0 && self.confidence <= 1.0) {
            return Err(ContactPlanError::InvalidConfidence(self.confidence));
        }
        Ok(())
    }
}

/// One-way light time between an ordered node pair over `[from_time, to_time)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub from_node: NodeNbr,
    pub to_node: NodeNbr,
    pub from_time: DtnTime,
    pub to_time: DtnTime,
    /// Seconds
    pub owlt: u32,
}

impl Range {
    pub fn new(
        from_node: NodeNbr,
        to_node: NodeNbr,
        from_time: DtnTime,
        to_time: DtnTime,
        owlt: u32,
    ) -> Self {
        Self {
            from_node,
            to_node,
            from_time,
            to_time,
            owlt,
        }
    }

    /// Check the range is well formed
    pub fn validate(&self) -> ContactPlanResult<()> {
        for node in [self.from_node, self.to_node] {
            if !node.is_valid() {
                return Err(ContactPlanError::InvalidNode(node));
            }
        }
        if self.from_time >= self.to_time {
            return Err(ContactPlanError::InvalidWindow {
                from_time: self.from_time,
                to_time: self.to_time,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_volume() {
        let c = Contact::scheduled(NodeNbr(1), NodeNbr(2), 0, 100, 100);
        assert_eq!(c.volume(), 10_000);
        assert!(c.is_live(99));
        assert!(!c.is_live(100));
    }

    #[test]
    fn test_contact_validation() {
        let c = Contact::scheduled(NodeNbr(1), NodeNbr(2), 10, 10, 100);
        assert!(matches!(
            c.validate(),
            Err(ContactPlanError::InvalidWindow { .. })
        ));

        let c = Contact::scheduled(NodeNbr(0), NodeNbr(2), 0, 10, 100);
        assert!(matches!(c.validate(), Err(ContactPlanError::InvalidNode(_))));

        let c = Contact::scheduled(NodeNbr(1), NodeNbr(2), 0, 10, 100).with_confidence(0.0);
        assert!(matches!(
            c.validate(),
            Err(ContactPlanError::InvalidConfidence(_))
        ));
    }

    #[test]
    fn test_registration_contact() {
        let c = Contact::registration(NodeNbr(1), NodeNbr(1));
        assert!(!c.is_routable());
        assert!(c.validate().is_ok());
        assert!(c.is_live(1_000_000));
    }

    #[test]
    fn test_contact_from_json() {
        let json = r#"{"from_node":1,"to_node":2,"from_time":0,"to_time":60,"xmit_rate":1000}"#;
        let c: Contact = serde_json::from_str(json).unwrap();
        assert_eq!(c.region, RegionNbr::HOME);
        assert_eq!(c.confidence, 1.0);
        assert_eq!(c.kind, ContactKind::Scheduled);
    }
}
