//! # CGR Core
//!
//! Contact graph model and collaborator interfaces for contact graph routing.
//!
//! Route computation reads a predicted, time-varying topology: directed
//! [`Contact`]s that conduct traffic only inside their windows, and
//! [`Range`]s that give the one-way light time between node pairs.
//!
//! ## Key Traits
//!
//! - [`ContactGraph`]: Read-only contact/range queries with O(1) liveness checks
//! - [`EgressPlans`]: Per-neighbor queue state (blocked flag and backlog)
//!
//! ## Key Types
//!
//! - [`ContactPlan`]: In-memory arena of contacts and ranges with generation-checked handles
//! - [`ContactId`]: Stable handle that stops resolving once its contact is removed
//! - [`EgressTable`]: Concurrent egress plan table
//! - [`BundleDescriptor`]: Size, class of service, deadline and flags of a bundle
//!
//! ## Example
//!
//! ```rust,ignore
//! use cgr_core::{Contact, ContactPlan, NodeNbr, Range};
//!
//! let mut plan = ContactPlan::new(NodeNbr(1));
//! let id = plan.insert_contact(Contact::scheduled(NodeNbr(1), NodeNbr(2), 0, 100, 100))?;
//! plan.insert_range(Range::new(NodeNbr(1), NodeNbr(2), 0, 100, 1))?;
//! assert!(plan.contains(id));
//! ```

pub mod bundle;
pub mod contact;
pub mod egress;
pub mod error;
pub mod graph;
pub mod plan;
pub mod types;

// Re-export main types
pub use bundle::BundleDescriptor;
pub use contact::{Contact, ContactId, ContactKind, Range};
pub use egress::{Backlog, EgressPlan, EgressPlans, EgressTable};
pub use error::{ContactPlanError, ContactPlanResult};
pub use graph::ContactGraph;
pub use plan::ContactPlan;
pub use types::{DtnTime, MAX_TIME, NodeNbr, Priority, RegionNbr, dtn_time};
