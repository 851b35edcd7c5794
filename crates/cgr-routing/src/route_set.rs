//! Per-destination route sets
//!
//! A [`RoutingObject`] holds the routes found so far toward one destination:
//! *selected* routes in discovery order (the first is the plain best path)
//! and *known* spur candidates waiting to be promoted. Alternates are found
//! with a Lawler variant of Yen's k-shortest-paths over the contact graph,
//! one at a time, only when route selection runs out of usable routes.
//!
//! Routes reference contacts by [`ContactId`] and the object keeps a
//! citation table from contact to citing routes. Liveness is checked lazily
//! when a route is about to be examined; a route citing a removed contact,
//! or whose window has closed, is dropped on the spot together with its
//! citations.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use cgr_core::{ContactGraph, ContactId, DtnTime, NodeNbr, RegionNbr};
use tracing::{debug, trace};

use crate::dijkstra::{PathFinder, SearchRoot};
use crate::error::CgrResult;
use crate::reason::ExclusionReason;
use crate::route::{Route, RouteId};

#[derive(Debug)]
struct RouteEntry {
    route: Arc<Route>,
    spurs_computed: bool,
}

/// Cached routes toward one destination
#[derive(Debug)]
pub struct RoutingObject {
    destination: NodeNbr,
    routes: HashMap<RouteId, RouteEntry>,
    selected: Vec<RouteId>,
    known: Vec<RouteId>,
    citations: HashMap<ContactId, Vec<RouteId>>,
    proximate_nodes: Option<Vec<NodeNbr>>,
    next_id: u64,
}

impl RoutingObject {
    pub fn new(destination: NodeNbr) -> Self {
        Self {
            destination,
            routes: HashMap::new(),
            selected: Vec::new(),
            known: Vec::new(),
            citations: HashMap::new(),
            proximate_nodes: None,
            next_id: 0,
        }
    }

    pub fn destination(&self) -> NodeNbr {
        self.destination
    }

    /// Number of selected routes
    pub fn selected_len(&self) -> usize {
        self.selected.len()
    }

    /// Number of spur candidates awaiting promotion
    pub fn known_len(&self) -> usize {
        self.known.len()
    }

    /// The selected route at `index`, in discovery order
    pub fn selected_at(&self, index: usize) -> Option<(RouteId, Arc<Route>)> {
        let id = *self.selected.get(index)?;
        self.routes.get(&id).map(|entry| (id, entry.route.clone()))
    }

    /// All selected routes, in discovery order
    pub fn selected_routes(&self) -> Vec<Arc<Route>> {
        self.selected
            .iter()
            .filter_map(|id| self.routes.get(id))
            .map(|entry| entry.route.clone())
            .collect()
    }

    /// All known routes
    pub fn known_routes(&self) -> Vec<Arc<Route>> {
        self.known
            .iter()
            .filter_map(|id| self.routes.get(id))
            .map(|entry| entry.route.clone())
            .collect()
    }

    /// Routes currently citing a contact
    pub fn citations_of(&self, contact: ContactId) -> &[RouteId] {
        self.citations
            .get(&contact)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of contacts with at least one citing route
    pub fn cited_contacts(&self) -> usize {
        self.citations.len()
    }

    /// Drop a route if it is disabled or expired
    ///
    /// Returns the reason it was dropped, or `None` if it is still usable.
    pub fn check_liveness<G: ContactGraph>(
        &mut self,
        id: RouteId,
        graph: &G,
        now: DtnTime,
    ) -> Option<ExclusionReason> {
        let route = &self.routes.get(&id)?.route;
        let reason = if route.is_disabled(graph) {
            ExclusionReason::RouteDisabled
        } else if route.is_expired(now) {
            ExclusionReason::RouteExpired
        } else {
            return None;
        };
        trace!(destination = %self.destination, %id, %reason, "route dropped");
        self.remove_route(id);
        Some(reason)
    }

    /// Remove a route from whichever list holds it and strip its citations
    pub fn remove_route(&mut self, id: RouteId) -> Option<Arc<Route>> {
        let entry = self.routes.remove(&id)?;
        self.selected.retain(|other| *other != id);
        self.known.retain(|other| *other != id);
        for hop in &entry.route.hops {
            if let Some(citers) = self.citations.get_mut(hop) {
                citers.retain(|other| *other != id);
                if citers.is_empty() {
                    self.citations.remove(hop);
                }
            }
        }
        Some(entry.route)
    }

    /// Forget every route
    pub fn clear(&mut self) {
        self.routes.clear();
        self.selected.clear();
        self.known.clear();
        self.citations.clear();
        self.proximate_nodes = None;
    }

    /// Neighbors reachable by at least one live contact from the local node
    ///
    /// Computed once and kept until the object is cleared.
    pub fn proximate_nodes<G: ContactGraph>(
        &mut self,
        graph: &G,
        region: RegionNbr,
        now: DtnTime,
    ) -> &[NodeNbr] {
        self.proximate_nodes.get_or_insert_with(|| {
            let mut nodes: Vec<NodeNbr> = graph
                .contacts_from(graph.local_node(), region, now)
                .map(|(_, contact)| contact.to_node)
                .collect();
            nodes.sort_unstable();
            nodes.dedup();
            nodes
        })
    }

    /// Compute the plain best route if nothing is selected yet
    ///
    /// Returns true if a route was added.
    pub fn compute_first_route<G: ContactGraph>(
        &mut self,
        finder: &PathFinder<'_, G>,
        now: DtnTime,
    ) -> CgrResult<bool> {
        if !self.selected.is_empty() {
            return Ok(false);
        }
        // Spur candidates were derived from routes that are gone
        for id in std::mem::take(&mut self.known) {
            self.remove_route(id);
        }

        let Some(path) = finder.find(SearchRoot::Local, self.destination, now, &HashSet::new())?
        else {
            debug!(destination = %self.destination, "no route to destination");
            return Ok(false);
        };
        let Some(route) = Route::from_hops(finder.graph(), path.hops, path.arrival_time, None)
        else {
            return Ok(false);
        };
        debug!(
            destination = %self.destination,
            neighbor = %route.to_node_nbr,
            arrival_time = route.arrival_time,
            hops = route.hop_count(),
            "first route computed"
        );
        let id = self.insert(route);
        self.selected.push(id);
        Ok(true)
    }

    /// Promote one more route into the selected list
    ///
    /// Computes spur routes off the last selected route if that has not
    /// been done yet, then moves the earliest-arriving known candidate into
    /// the selected list. Returns false once no further route exists or
    /// `max_selected` routes are already selected.
    pub fn compute_another_route<G: ContactGraph>(
        &mut self,
        finder: &PathFinder<'_, G>,
        now: DtnTime,
        max_selected: usize,
    ) -> CgrResult<bool> {
        // The spur base must be live or its prefixes are meaningless
        while let Some(&last) = self.selected.last() {
            if self.check_liveness(last, finder.graph(), now).is_none() {
                break;
            }
        }
        if self.selected.is_empty() {
            return self.compute_first_route(finder, now);
        }
        if self.selected.len() >= max_selected {
            trace!(destination = %self.destination, max_selected, "alternate route limit reached");
            return Ok(false);
        }

        let last = self.selected[self.selected.len() - 1];
        let pending = self
            .routes
            .get(&last)
            .filter(|entry| !entry.spurs_computed)
            .map(|entry| entry.route.clone());
        if let Some(route) = pending {
            self.compute_spurs(finder, &route, now)?;
            if let Some(entry) = self.routes.get_mut(&last) {
                entry.spurs_computed = true;
            }
        }

        Ok(self.promote_best_known(finder.graph(), now))
    }

    fn compute_spurs<G: ContactGraph>(
        &mut self,
        finder: &PathFinder<'_, G>,
        route: &Route,
        now: DtnTime,
    ) -> CgrResult<()> {
        let graph = finder.graph();
        let first_root = route.root_of_spur.map_or(0, |index| index + 1);

        for root_len in first_root..route.hop_count() {
            let prefix = &route.hops[..root_len];
            if let Some(root) = prefix.last().and_then(|id| graph.contact(*id))
                && root.to_node == self.destination
            {
                continue;
            }

            // Next edges already taken from this prefix by any route
            let excluded: HashSet<ContactId> = self
                .selected
                .iter()
                .chain(&self.known)
                .filter_map(|id| self.routes.get(id))
                .map(|entry| &entry.route.hops)
                .filter(|hops| hops.len() > root_len && hops[..root_len] == *prefix)
                .map(|hops| hops[root_len])
                .collect();

            let search_root = if root_len == 0 {
                SearchRoot::Local
            } else {
                SearchRoot::Spur(prefix)
            };
            let Some(path) = finder.find(search_root, self.destination, now, &excluded)? else {
                continue;
            };

            let mut hops = Vec::new();
            hops.try_reserve_exact(root_len + path.hops.len())?;
            hops.extend_from_slice(prefix);
            hops.extend(path.hops);
            let root_of_spur = root_len.checked_sub(1);
            let Some(spur) = Route::from_hops(graph, hops, path.arrival_time, root_of_spur) else {
                continue;
            };
            trace!(
                destination = %self.destination,
                root_len,
                arrival_time = spur.arrival_time,
                "spur route found"
            );
            let id = self.insert(spur);
            self.known.push(id);
        }
        Ok(())
    }

    fn promote_best_known<G: ContactGraph>(&mut self, graph: &G, now: DtnTime) -> bool {
        loop {
            let best = self
                .known
                .iter()
                .filter_map(|id| self.routes.get(id).map(|entry| (*id, &entry.route)))
                .min_by_key(|(id, route)| (route.arrival_time, route.hop_count(), *id))
                .map(|(id, _)| id);
            let Some(id) = best else {
                return false;
            };
            if self.check_liveness(id, graph, now).is_some() {
                continue;
            }
            self.known.retain(|other| *other != id);
            self.selected.push(id);
            debug!(
                destination = %self.destination,
                %id,
                selected = self.selected.len(),
                "alternate route selected"
            );
            return true;
        }
    }

    fn insert(&mut self, route: Route) -> RouteId {
        let id = RouteId(self.next_id);
        self.next_id += 1;
        for hop in &route.hops {
            self.citations.entry(*hop).or_default().push(id);
        }
        self.routes.insert(
            id,
            RouteEntry {
                route: Arc::new(route),
                spurs_computed: false,
            },
        );
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CgrConfig;
    use cgr_core::{Contact, ContactPlan, Range};

    fn n(value: u64) -> NodeNbr {
        NodeNbr(value)
    }

    fn contact(plan: &mut ContactPlan, from: u64, to: u64, start: i64, end: i64) -> ContactId {
        let id = plan
            .insert_contact(Contact::scheduled(n(from), n(to), start, end, 100))
            .unwrap();
        plan.insert_range(Range::new(n(from), n(to), 0, 10_000, 0))
            .unwrap();
        id
    }

    /// 1 -> {2, 3, 4} -> 5, with arrivals 10, 20, 30
    fn diamond() -> (ContactPlan, Vec<ContactId>) {
        let mut plan = ContactPlan::new(n(1));
        let mut first_hops = Vec::new();
        for (relay, start) in [(2, 10), (3, 20), (4, 30)] {
            first_hops.push(contact(&mut plan, 1, relay, 0, 100));
            contact(&mut plan, relay, 5, start, 100);
        }
        (plan, first_hops)
    }

    #[test]
    fn test_first_route() {
        let (plan, first_hops) = diamond();
        let config = CgrConfig::default();
        let finder = PathFinder::new(&plan, &config);
        let mut object = RoutingObject::new(n(5));

        assert!(object.compute_first_route(&finder, 0).unwrap());
        let (_, route) = object.selected_at(0).unwrap();
        assert_eq!(route.first_hop(), first_hops[0]);
        assert_eq!(route.arrival_time, 10);
        assert_eq!(object.citations_of(first_hops[0]).len(), 1);

        // Already computed
        assert!(!object.compute_first_route(&finder, 0).unwrap());
    }

    #[test]
    fn test_alternates_in_arrival_order() {
        let (plan, _) = diamond();
        let config = CgrConfig::default();
        let finder = PathFinder::new(&plan, &config);
        let mut object = RoutingObject::new(n(5));

        assert!(object.compute_another_route(&finder, 0, 10).unwrap());
        assert!(object.compute_another_route(&finder, 0, 10).unwrap());
        assert!(object.compute_another_route(&finder, 0, 10).unwrap());
        assert!(!object.compute_another_route(&finder, 0, 10).unwrap());

        let arrivals: Vec<_> = object
            .selected_routes()
            .iter()
            .map(|route| route.arrival_time)
            .collect();
        assert_eq!(arrivals, vec![10, 20, 30]);
        let neighbors: Vec<_> = object
            .selected_routes()
            .iter()
            .map(|route| route.to_node_nbr)
            .collect();
        assert_eq!(neighbors, vec![n(2), n(3), n(4)]);
        assert_eq!(object.known_len(), 0);
    }

    #[test]
    fn test_no_duplicate_routes() {
        let mut plan = ContactPlan::new(n(1));
        contact(&mut plan, 1, 2, 0, 100);
        contact(&mut plan, 2, 4, 10, 100);
        contact(&mut plan, 2, 3, 0, 100);
        contact(&mut plan, 3, 4, 20, 100);
        contact(&mut plan, 1, 4, 30, 100);
        let config = CgrConfig::default();
        let finder = PathFinder::new(&plan, &config);
        let mut object = RoutingObject::new(n(4));

        while object.compute_another_route(&finder, 0, 10).unwrap() {}

        let routes = object.selected_routes();
        let mut hop_lists: Vec<_> = routes.iter().map(|route| route.hops.clone()).collect();
        hop_lists.sort();
        hop_lists.dedup();
        assert_eq!(hop_lists.len(), routes.len());
        assert_eq!(routes.len(), 3);
        let arrivals: Vec<_> = routes.iter().map(|route| route.arrival_time).collect();
        assert_eq!(arrivals, vec![10, 20, 30]);
    }

    #[test]
    fn test_limit_stops_enumeration() {
        let (plan, _) = diamond();
        let config = CgrConfig::default();
        let finder = PathFinder::new(&plan, &config);
        let mut object = RoutingObject::new(n(5));

        assert!(object.compute_another_route(&finder, 0, 2).unwrap());
        assert!(object.compute_another_route(&finder, 0, 2).unwrap());
        assert!(!object.compute_another_route(&finder, 0, 2).unwrap());
        assert_eq!(object.selected_len(), 2);
    }

    #[test]
    fn test_removed_contact_disables_route_and_clears_citations() {
        let (mut plan, first_hops) = diamond();
        let config = CgrConfig::default();
        let mut object = RoutingObject::new(n(5));
        {
            let finder = PathFinder::new(&plan, &config);
            object.compute_first_route(&finder, 0).unwrap();
        }
        let (id, _) = object.selected_at(0).unwrap();

        plan.remove_contact(first_hops[0]).unwrap();
        assert_eq!(
            object.check_liveness(id, &plan, 0),
            Some(ExclusionReason::RouteDisabled)
        );
        assert_eq!(object.selected_len(), 0);
        assert!(object.citations_of(first_hops[0]).is_empty());
        assert_eq!(object.cited_contacts(), 0);
    }

    #[test]
    fn test_expired_route_dropped() {
        let (plan, _) = diamond();
        let config = CgrConfig::default();
        let finder = PathFinder::new(&plan, &config);
        let mut object = RoutingObject::new(n(5));
        object.compute_first_route(&finder, 0).unwrap();
        let (id, _) = object.selected_at(0).unwrap();

        assert_eq!(
            object.check_liveness(id, &plan, 100),
            Some(ExclusionReason::RouteExpired)
        );
    }

    #[test]
    fn test_proximate_nodes_sorted_and_distinct() {
        let (mut plan, _) = diamond();
        contact(&mut plan, 1, 3, 50, 100);
        let mut object = RoutingObject::new(n(5));
        assert_eq!(
            object.proximate_nodes(&plan, RegionNbr::HOME, 0),
            &[n(2), n(3), n(4)]
        );
    }
}
