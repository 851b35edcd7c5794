//! # CGR Routing
//!
//! Contact graph routing: choosing which neighbor to hand a bundle to when
//! the network is a predicted schedule of future contacts rather than a
//! static graph.
//!
//! ## Core Components
//!
//! - [`PathFinder`]: Temporal Dijkstra, earliest arrival from a root to a destination
//! - [`RoutingObject`]: Per-destination selected and candidate routes, Yen-style alternates
//! - [`CapacityAccountant`]: Predicted bundle arrival time given queued traffic and contact volume
//! - [`ContactGraphRouter`]: Entry point that applies exclusions and picks routes
//! - [`RouteTable`]: Cache of routing objects keyed by destination
//!
//! ## Routing Algorithm
//!
//! For each bundle the router:
//!
//! 1. **LOAD**: Reuses the destination's cached routes, computing the first one on demand
//! 2. **CHECK**: Drops stale routes and filters the rest by deadline, egress plan, exclusions
//! 3. **PREDICT**: Computes predicted arrival against backlog and residual volume
//! 4. **EXTEND**: If no cached route survives, computes the next alternate and repeats
//!
//! Critical bundles repeat this once per neighbor with a live contact and
//! go out over every neighbor that yields a route.
//!
//! ## Example
//!
//! ```rust,ignore
//! use cgr_core::{BundleDescriptor, ContactPlan, EgressTable, NodeNbr};
//! use cgr_routing::{CgrConfig, ContactGraphRouter, RouteTable};
//!
//! let router = ContactGraphRouter::new(CgrConfig::default());
//! let table = RouteTable::new();
//!
//! let bundle = BundleDescriptor::new(NodeNbr(3), 500, 200);
//! let routes = router.identify_best_routes(&table, &plan, &egress, &bundle, &[], now)?;
//! for best in &routes {
//!     // enqueue toward best.neighbor(), then charge the route's contacts
//!     router.accountant().reserve(&mut plan, &best.route, &bundle)?;
//! }
//! ```

pub mod capacity;
pub mod config;
pub mod dijkstra;
pub mod error;
pub mod reason;
pub mod route;
pub mod route_set;
pub mod selector;
pub mod table;

// Re-export main types
pub use capacity::{CapacityAccountant, CapacityAssessment, PriorClaims};
pub use config::{CgrConfig, ConfigWarning};
pub use dijkstra::{Path, PathFinder, SearchRoot};
pub use error::{CgrError, CgrResult};
pub use reason::ExclusionReason;
pub use route::{Route, RouteId};
pub use route_set::RoutingObject;
pub use selector::{BestRoute, ContactGraphRouter, delivery_confidence};
pub use table::RouteTable;
