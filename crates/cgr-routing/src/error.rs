//! Routing error types
//!
//! Only caller misuse and allocation failure are errors. Finding no route,
//! congestion and missed deadlines are ordinary outcomes and never show up
//! here.

use std::collections::TryReserveError;

use cgr_core::{DtnTime, NodeNbr};
use thiserror::Error;

/// Errors returned by contact graph routing
#[derive(Debug, Error)]
pub enum CgrError {
    /// Destination node number is not routable
    #[error("Invalid destination node: {0}")]
    InvalidDestination(NodeNbr),

    /// Current time supplied by the caller is negative
    #[error("Negative current time: {0}")]
    NegativeTime(DtnTime),

    /// Bundle descriptor fails basic sanity checks
    #[error("Invalid bundle descriptor: {0}")]
    InvalidBundle(String),

    /// Hop list storage could not be reserved
    #[error("Route allocation failed: {0}")]
    Allocation(#[from] TryReserveError),
}

/// Result type for routing operations
pub type CgrResult<T> = Result<T, CgrError>;
