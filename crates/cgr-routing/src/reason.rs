//! Why a contact or route was passed over
//!
//! These are ordinary outcomes, reported through tracing and returned by
//! the lower-level assessment calls so callers can see why nothing was
//! chosen.

use std::fmt;

/// Reason a contact was skipped during search or a route was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExclusionReason {
    // Search
    ContactEndsEarly,
    ContactSuppressed,
    NoRange,

    // Route liveness
    RouteDisabled,
    RouteExpired,

    // Route checks
    TooSlow,
    UncertainEntry,
    IrrelevantVia,
    NoEgressPlan,
    PlanBlocked,
    ViaSelf,
    ExcludedNeighbor,
    InsufficientConfidenceImprovement,

    // Capacity
    FirstContactGone,
    Congested,
    Depleted,
    VolumeTooSmall,
    MissesExpiration,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ExclusionReason::ContactEndsEarly => "contact ends before data arrives",
            ExclusionReason::ContactSuppressed => "contact is suppressed",
            ExclusionReason::NoRange => "no range for contact",
            ExclusionReason::RouteDisabled => "route cites a removed contact",
            ExclusionReason::RouteExpired => "route has expired",
            ExclusionReason::TooSlow => "route is too slow",
            ExclusionReason::UncertainEntry => "initial contact uncertain",
            ExclusionReason::IrrelevantVia => "route is not via the requested neighbor",
            ExclusionReason::NoEgressPlan => "no egress plan",
            ExclusionReason::PlanBlocked => "egress plan is blocked",
            ExclusionReason::ViaSelf => "route is via self",
            ExclusionReason::ExcludedNeighbor => "first node on route is an excluded neighbor",
            ExclusionReason::InsufficientConfidenceImprovement => {
                "insufficient delivery confidence improvement"
            }
            ExclusionReason::FirstContactGone => "first contact on route no longer exists",
            ExclusionReason::Congested => "route is congested, timely arrival impossible",
            ExclusionReason::Depleted => "contact volume is depleted for this priority",
            ExclusionReason::VolumeTooSmall => "contact volume too small for unfragmentable bundle",
            ExclusionReason::MissesExpiration => "bundle would arrive after expiration",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_text() {
        assert_eq!(ExclusionReason::TooSlow.to_string(), "route is too slow");
        assert_eq!(
            ExclusionReason::Congested.to_string(),
            "route is congested, timely arrival impossible"
        );
    }
}
