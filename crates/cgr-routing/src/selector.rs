//! Route selection for a bundle
//!
//! [`ContactGraphRouter`] is the entry point the forwarder calls for each
//! bundle. It pulls routes from the destination's routing object, computing
//! alternates only when the cached ones are exhausted, and runs each one
//! through liveness, policy and capacity checks:
//!
//! 1. **Liveness**: drop routes citing removed contacts or already closed
//! 2. **Deadline**: best-case arrival after the bundle expires
//! 3. **Via** (critical bundles): uncertain first contact, wrong neighbor
//! 4. **Egress**: no plan for the neighbor, or plan blocked
//! 5. **Self**: never hand a bundle to ourselves unless it is for us
//! 6. **Exclusions**: neighbors the caller ruled out
//! 7. **Confidence**: another copy must raise delivery confidence enough
//! 8. **Capacity**: predicted arrival given everything queued ahead
//!
//! Normal bundles get the single best surviving route. Critical bundles get
//! the best route through each neighbor the local node has a contact with.

use std::sync::Arc;

use cgr_core::{BundleDescriptor, ContactGraph, DtnTime, EgressPlans, NodeNbr};
use tracing::{debug, trace};

use crate::capacity::{CapacityAccountant, CapacityAssessment};
use crate::config::CgrConfig;
use crate::dijkstra::PathFinder;
use crate::error::{CgrError, CgrResult};
use crate::reason::ExclusionReason;
use crate::route::Route;
use crate::route_set::RoutingObject;
use crate::table::RouteTable;

/// A route chosen for a bundle, with the bundle's capacity figures on it
#[derive(Debug, Clone)]
pub struct BestRoute {
    /// Shared with the route cache; read-only
    pub route: Arc<Route>,
    pub assessment: CapacityAssessment,
}

impl BestRoute {
    /// Neighbor to hand the bundle to
    pub fn neighbor(&self) -> NodeNbr {
        self.route.to_node_nbr
    }

    /// Ordering key; smaller is better
    fn rank(&self) -> (DtnTime, usize, std::cmp::Reverse<DtnTime>, NodeNbr) {
        (
            self.assessment.pbat,
            self.route.hop_count(),
            std::cmp::Reverse(self.route.to_time),
            self.route.to_node_nbr,
        )
    }

    /// Whether this route beats `other` outright
    pub fn is_better_than(&self, other: &BestRoute) -> bool {
        self.rank() < other.rank()
    }
}

/// Delivery confidence after sending one more copy over a route
pub fn delivery_confidence(current: f32, route_confidence: f32) -> f32 {
    1.0 - (1.0 - current) * (1.0 - route_confidence)
}

/// Everything one routing request checks routes against
struct Request<'r, G, P> {
    graph: &'r G,
    plans: &'r P,
    bundle: &'r BundleDescriptor,
    excluded: &'r [NodeNbr],
    now: DtnTime,
}

/// Contact graph router
pub struct ContactGraphRouter {
    config: CgrConfig,
}

impl ContactGraphRouter {
    pub fn new(config: CgrConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CgrConfig {
        &self.config
    }

    /// Capacity accountant sharing this router's config
    pub fn accountant(&self) -> CapacityAccountant<'_> {
        CapacityAccountant::new(&self.config)
    }

    /// Pick the route or routes to forward a bundle on
    ///
    /// Returns an empty list when there is no usable route; that is not an
    /// error. `excluded` lists neighbors that must not be used as first hop.
    pub fn identify_best_routes<G, P>(
        &self,
        table: &RouteTable,
        graph: &G,
        plans: &P,
        bundle: &BundleDescriptor,
        excluded: &[NodeNbr],
        now: DtnTime,
    ) -> CgrResult<Vec<BestRoute>>
    where
        G: ContactGraph,
        P: EgressPlans,
    {
        validate_request(bundle.destination, now)?;
        if !(0.0..=1.0).contains(&bundle.dlv_confidence) {
            return Err(CgrError::InvalidBundle(format!(
                "delivery confidence {} outside [0, 1]",
                bundle.dlv_confidence
            )));
        }

        table.sync_epoch(graph.edit_epoch());
        let mut object = table.entry(bundle.destination);
        let finder = PathFinder::new(graph, &self.config);
        let request = Request {
            graph,
            plans,
            bundle,
            excluded,
            now,
        };

        let mut best_routes = Vec::new();
        if bundle.critical {
            let vias = object
                .proximate_nodes(graph, self.config.home_region, now)
                .to_vec();
            for via in vias {
                if let Some(best) = self.select(&mut object, &finder, &request, Some(via))? {
                    best_routes.push(best);
                }
            }
        } else if let Some(best) = self.select(&mut object, &finder, &request, None)? {
            best_routes.push(best);
        }

        debug!(
            destination = %bundle.destination,
            critical = bundle.critical,
            routes = best_routes.len(),
            "best routes identified"
        );
        Ok(best_routes)
    }

    /// Whether the destination can plausibly be reached by `deadline`
    ///
    /// Looks only at best-case arrival of cached routes, computing the first
    /// route if none is cached. Capacity is not considered.
    pub fn prospect<G: ContactGraph>(
        &self,
        table: &RouteTable,
        graph: &G,
        destination: NodeNbr,
        deadline: DtnTime,
        now: DtnTime,
    ) -> CgrResult<bool> {
        validate_request(destination, now)?;
        table.sync_epoch(graph.edit_epoch());
        let mut object = table.entry(destination);
        let finder = PathFinder::new(graph, &self.config);

        let mut index = 0;
        loop {
            if object.selected_len() == 0 && !object.compute_first_route(&finder, now)? {
                return Ok(false);
            }
            let Some((id, route)) = object.selected_at(index) else {
                return Ok(false);
            };
            if object.check_liveness(id, graph, now).is_some() {
                continue;
            }
            if route.arrival_time <= deadline {
                return Ok(true);
            }
            index += 1;
        }
    }

    /// Best route among selected routes, computing alternates as needed
    ///
    /// With `via`, only routes whose first hop is that neighbor qualify.
    fn select<G, P>(
        &self,
        object: &mut RoutingObject,
        finder: &PathFinder<'_, G>,
        request: &Request<'_, G, P>,
        via: Option<NodeNbr>,
    ) -> CgrResult<Option<BestRoute>>
    where
        G: ContactGraph,
        P: EgressPlans,
    {
        let mut best: Option<BestRoute> = None;
        let mut index = 0;

        loop {
            while let Some((id, route)) = object.selected_at(index) {
                if object
                    .check_liveness(id, request.graph, request.now)
                    .is_some()
                {
                    continue;
                }
                index += 1;

                match self.check_route(&route, request, via) {
                    Ok(assessment) => {
                        let candidate = BestRoute { route, assessment };
                        if best
                            .as_ref()
                            .is_none_or(|incumbent| candidate.is_better_than(incumbent))
                        {
                            best = Some(candidate);
                        }
                    }
                    Err(reason) => {
                        trace!(
                            destination = %object.destination(),
                            neighbor = %route.to_node_nbr,
                            %reason,
                            "route not used"
                        );
                    }
                }
            }

            if best.is_some() {
                break;
            }
            if !object.compute_another_route(finder, request.now, self.config.max_selected_routes)? {
                break;
            }
        }

        if let Some(best) = &best {
            debug!(
                destination = %object.destination(),
                neighbor = %best.neighbor(),
                pbat = best.assessment.pbat,
                overbooked = best.assessment.overbooked,
                "route selected"
            );
        }
        Ok(best)
    }

    fn check_route<G, P>(
        &self,
        route: &Route,
        request: &Request<'_, G, P>,
        via: Option<NodeNbr>,
    ) -> Result<CapacityAssessment, ExclusionReason>
    where
        G: ContactGraph,
        P: EgressPlans,
    {
        let bundle = request.bundle;
        let local = request.graph.local_node();

        if route.arrival_time > bundle.expiration {
            return Err(ExclusionReason::TooSlow);
        }

        if let Some(via) = via {
            let first = request
                .graph
                .contact(route.first_hop())
                .ok_or(ExclusionReason::RouteDisabled)?;
            if first.confidence < 1.0 {
                return Err(ExclusionReason::UncertainEntry);
            }
            if route.to_node_nbr != via {
                return Err(ExclusionReason::IrrelevantVia);
            }
        }

        let plan = request
            .plans
            .plan(route.to_node_nbr)
            .ok_or(ExclusionReason::NoEgressPlan)?;
        if plan.blocked {
            return Err(ExclusionReason::PlanBlocked);
        }

        if route.to_node_nbr == local && bundle.destination != local {
            return Err(ExclusionReason::ViaSelf);
        }

        if request.excluded.contains(&route.to_node_nbr) {
            return Err(ExclusionReason::ExcludedNeighbor);
        }

        if via.is_none() && bundle.dlv_confidence > 0.0 && bundle.dlv_confidence < 1.0 {
            let improved = delivery_confidence(bundle.dlv_confidence, route.arrival_confidence);
            if improved / bundle.dlv_confidence - 1.0 < self.config.min_confidence_improvement {
                return Err(ExclusionReason::InsufficientConfidenceImprovement);
            }
        }

        self.accountant()
            .assess(request.graph, route, bundle, &plan, request.now)
    }
}

fn validate_request(destination: NodeNbr, now: DtnTime) -> CgrResult<()> {
    if !destination.is_valid() {
        return Err(CgrError::InvalidDestination(destination));
    }
    if now < 0 {
        return Err(CgrError::NegativeTime(now));
    }
    Ok(())
}
