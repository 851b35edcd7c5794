//! Stress tests for cgr-routing
//!
//! These tests verify the performance and correctness of route selection
//! on large contact plans, under contact churn, and with the route table
//! shared between threads.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use cgr_core::{
    BundleDescriptor, Contact, ContactGraph, ContactId, ContactPlan, EgressTable, NodeNbr, Range,
};
use cgr_routing::{CgrConfig, ContactGraphRouter, PathFinder, RouteTable, RoutingObject};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const LOCAL: NodeNbr = NodeNbr(1);

// Test helpers
fn random_plan(seed: u64, nodes: u64, contacts: usize) -> (ContactPlan, Vec<ContactId>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut plan = ContactPlan::new(LOCAL);
    let mut ids = Vec::with_capacity(contacts);

    for from in 1..=nodes {
        for to in 1..=nodes {
            if from != to {
                let owlt = rng.random_range(0..30);
                plan.insert_range(Range::new(NodeNbr(from), NodeNbr(to), 0, 1_000_000, owlt))
                    .unwrap();
            }
        }
    }
    for _ in 0..contacts {
        let from = rng.random_range(1..=nodes);
        let to = (from + rng.random_range(1..nodes) - 1) % nodes + 1;
        let start = rng.random_range(0..20_000);
        let length = rng.random_range(60..3_600);
        let rate = rng.random_range(1_000..100_000);
        ids.push(
            plan.insert_contact(Contact::scheduled(
                NodeNbr(from),
                NodeNbr(to),
                start,
                start + length,
                rate,
            ))
            .unwrap(),
        );
    }
    (plan, ids)
}

fn all_neighbors(nodes: u64) -> EgressTable {
    EgressTable::with_neighbors((2..=nodes).map(NodeNbr))
}

fn choices(
    router: &ContactGraphRouter,
    table: &RouteTable,
    plan: &ContactPlan,
    egress: &EgressTable,
    nodes: u64,
) -> Vec<Option<(NodeNbr, i64)>> {
    (2..=nodes)
        .map(|dest| {
            let bundle = BundleDescriptor::new(NodeNbr(dest), 2_000, 100_000);
            router
                .identify_best_routes(table, plan, egress, &bundle, &[], 0)
                .unwrap()
                .first()
                .map(|best| (best.neighbor(), best.assessment.pbat))
        })
        .collect()
}

#[test]
fn test_route_table_throughput() {
    const NODES: u64 = 60;
    const CONTACTS: usize = 3_000;

    let (plan, _) = random_plan(1, NODES, CONTACTS);
    let egress = all_neighbors(NODES);
    let router = ContactGraphRouter::new(CgrConfig::default());
    let table = RouteTable::new();

    let start = Instant::now();
    let cold = choices(&router, &table, &plan, &egress, NODES);
    let cold_duration = start.elapsed();
    println!(
        "Routed to {} destinations on a cold table in {:?}",
        NODES - 1,
        cold_duration
    );

    let start = Instant::now();
    for _ in 0..10 {
        let warm = choices(&router, &table, &plan, &egress, NODES);
        assert_eq!(warm, cold);
    }
    println!("Routed 10 warm passes in {:?}", start.elapsed());

    let routed = cold.iter().filter(|choice| choice.is_some()).count();
    println!("{} of {} destinations reachable", routed, NODES - 1);
    assert!(routed > 0, "Should route to at least some destinations");
    assert_eq!(table.len(), (NODES - 1) as usize);
}

#[test]
fn test_many_alternates() {
    const RELAYS: u64 = 80;
    let destination = NodeNbr(RELAYS + 2);

    let mut plan = ContactPlan::new(LOCAL);
    for relay in 2..RELAYS + 2 {
        plan.insert_contact(Contact::scheduled(LOCAL, NodeNbr(relay), 0, 10_000, 1_000))
            .unwrap();
        plan.insert_contact(Contact::scheduled(
            NodeNbr(relay),
            destination,
            relay as i64 * 10,
            10_000,
            1_000,
        ))
        .unwrap();
        plan.insert_range(Range::new(LOCAL, NodeNbr(relay), 0, 10_000, 1))
            .unwrap();
        plan.insert_range(Range::new(NodeNbr(relay), destination, 0, 10_000, 1))
            .unwrap();
    }

    let config = CgrConfig::default().with_max_selected_routes(200);
    let finder = PathFinder::new(&plan, &config);
    let mut object = RoutingObject::new(destination);

    let start = Instant::now();
    while object
        .compute_another_route(&finder, 0, config.max_selected_routes)
        .unwrap()
    {}
    println!(
        "Enumerated {} alternates in {:?}",
        object.selected_len(),
        start.elapsed()
    );

    assert_eq!(object.selected_len(), RELAYS as usize);
    let arrivals: Vec<i64> = object
        .selected_routes()
        .iter()
        .map(|route| route.arrival_time)
        .collect();
    assert!(arrivals.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn test_contact_churn() {
    const NODES: u64 = 20;

    let (mut plan, mut ids) = random_plan(7, NODES, 400);
    let egress = all_neighbors(NODES);
    let router = ContactGraphRouter::new(CgrConfig::default());
    let table = RouteTable::new();
    let mut rng = StdRng::seed_from_u64(99);
    let mut removed = Vec::new();
    let epoch = plan.edit_epoch();

    for _ in 0..100 {
        for dest in 2..=NODES {
            let bundle = BundleDescriptor::new(NodeNbr(dest), 500, 100_000);
            let routes = router
                .identify_best_routes(&table, &plan, &egress, &bundle, &[], 0)
                .unwrap();
            for best in &routes {
                assert!(
                    removed.iter().all(|id| !best.route.cites(*id)),
                    "route to {dest} cites a removed contact"
                );
            }
        }

        let victim = ids.swap_remove(rng.random_range(0..ids.len()));
        plan.remove_contact(victim).unwrap();
        removed.push(victim);
    }
    // Removals are handled lazily, without a table reload
    assert_eq!(plan.edit_epoch(), epoch);
    assert_eq!(table.loaded_epoch(), epoch);
}

#[test]
fn test_concurrent_routing() {
    const NODES: u64 = 40;
    const THREADS: usize = 8;

    let (plan, _) = random_plan(3, NODES, 1_500);
    let plan = Arc::new(plan);
    let egress = Arc::new(all_neighbors(NODES));
    let router = Arc::new(ContactGraphRouter::new(CgrConfig::default()));

    let expected = choices(&router, &RouteTable::new(), &plan, &egress, NODES);
    let table = Arc::new(RouteTable::new());
    table.sync_epoch(plan.edit_epoch());

    let start = Instant::now();
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let plan = Arc::clone(&plan);
            let egress = Arc::clone(&egress);
            let router = Arc::clone(&router);
            let table = Arc::clone(&table);
            thread::spawn(move || {
                (0..5)
                    .map(|_| choices(&router, &table, &plan, &egress, NODES))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        for observed in handle.join().unwrap() {
            assert_eq!(observed, expected);
        }
    }
    println!(
        "{} threads routed to {} destinations 5 times in {:?}",
        THREADS,
        NODES - 1,
        start.elapsed()
    );
    assert_eq!(table.len(), (NODES - 1) as usize);
}
