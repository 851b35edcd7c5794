//! What route selection needs to know about a bundle

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DtnTime, MAX_TIME, NodeNbr, Priority, dtn_time};

/// Routing-relevant view of a bundle awaiting forwarding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleDescriptor {
    pub destination: NodeNbr,
    /// Payload bytes
    pub payload_length: u64,
    /// Bytes of extension blocks
    pub extensions_length: u64,
    pub priority: Priority,
    /// Expedited sub-priority, 0-255
    pub ordinal: u8,
    /// Absolute time after which delivery is useless
    pub expiration: DtnTime,
    /// Whether the bundle may be split across contacts
    pub fragmentable: bool,
    /// Forward over every viable first hop instead of one
    pub critical: bool,
    /// Delivery confidence already achieved by earlier copies, in [0, 1]
    pub dlv_confidence: f32,
}

impl BundleDescriptor {
    /// A standard-priority, fragmentable bundle
    pub fn new(destination: NodeNbr, payload_length: u64, expiration: DtnTime) -> Self {
        Self {
            destination,
            payload_length,
            extensions_length: 0,
            priority: Priority::Standard,
            ordinal: 0,
            expiration,
            fragmentable: true,
            critical: false,
            dlv_confidence: 0.0,
        }
    }

    /// Build a descriptor from a creation time and lifetime
    pub fn with_lifetime(
        destination: NodeNbr,
        payload_length: u64,
        created: DateTime<Utc>,
        lifetime: Duration,
    ) -> Self {
        // Lifetimes past chrono's range never expire
        let expiration = created
            .checked_add_signed(lifetime)
            .map_or(MAX_TIME, dtn_time);
        Self::new(destination, payload_length, expiration)
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_ordinal(mut self, ordinal: u8) -> Self {
        self.ordinal = ordinal;
        self
    }

    pub fn with_extensions_length(mut self, bytes: u64) -> Self {
        self.extensions_length = bytes;
        self
    }

    pub fn with_dlv_confidence(mut self, confidence: f32) -> Self {
        self.dlv_confidence = confidence;
        self
    }

    /// Forbid fragmentation
    pub fn unfragmentable(mut self) -> Self {
        self.fragmentable = false;
        self
    }

    /// Mark the bundle critical
    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }
}
