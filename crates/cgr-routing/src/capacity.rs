//! Capacity-aware arrival prediction
//!
//! A route's best-case arrival time ignores everything already queued.
//! The [`CapacityAccountant`] works out when a particular bundle would
//! actually arrive: it drains the bytes queued ahead of the bundle for the
//! first-hop neighbor, charges the bundle's estimated consumption (ECCC) at
//! every hop, and rejects the route if any hop is depleted, closes too
//! early, or cannot carry an unfragmentable bundle whole.
//!
//! Rejection is an ordinary outcome and is returned as an
//! [`ExclusionReason`].

use cgr_core::{
    Backlog, BundleDescriptor, ContactGraph, ContactPlan, ContactPlanResult, DtnTime,
    EgressPlan, Priority,
};
use tracing::trace;

use crate::config::CgrConfig;
use crate::reason::ExclusionReason;
use crate::route::Route;

/// Capacity figures for one bundle on one route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityAssessment {
    /// Predicted bundle arrival time at the destination
    pub pbat: DtnTime,
    /// Earliest time the bundle could start transmitting on the first hop
    pub eto: DtnTime,
    /// Queued bytes that fall inside the first contact
    pub committed: u64,
    /// Bytes by which the first contact is oversubscribed if the bundle is sent
    pub overbooked: u64,
    /// Largest portion of the bundle every hop can carry
    pub max_volume_avbl: u64,
    /// Estimated channel capacity consumption of the bundle
    pub bundle_eccc: u64,
}

/// Bytes queued ahead of a bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorClaims {
    /// Equal or higher priority bytes the bundle must wait behind
    pub prior: u64,
    /// Bytes queued across all priorities
    pub total: u64,
}

/// Prior claims, ECCC and predicted arrival for bundles on routes
pub struct CapacityAccountant<'a> {
    config: &'a CgrConfig,
}

impl<'a> CapacityAccountant<'a> {
    pub fn new(config: &'a CgrConfig) -> Self {
        Self { config }
    }

    /// Estimated serialized size of a bundle
    pub fn estimated_size(&self, bundle: &BundleDescriptor) -> u64 {
        self.config
            .nominal_primary_block_size
            .saturating_add(bundle.extensions_length)
            .saturating_add(bundle.payload_length)
    }

    /// Estimated channel capacity consumption: size plus framing overhead
    pub fn eccc(&self, bundle: &BundleDescriptor) -> u64 {
        let size = self.estimated_size(bundle);
        size.saturating_add((size >> 4).max(self.config.typical_stack_overhead))
    }

    /// Bytes queued for the neighbor that a bundle must wait behind
    pub fn prior_claims(&self, backlog: &Backlog, bundle: &BundleDescriptor) -> PriorClaims {
        let mut prior = backlog.throttle_committed;
        match bundle.priority {
            Priority::Bulk => {
                let standard = if self.config.bandwidth_reserved {
                    backlog.standard.min(backlog.bulk.saturating_mul(2))
                } else {
                    backlog.standard
                };
                prior = prior
                    .saturating_add(backlog.expedited)
                    .saturating_add(standard)
                    .saturating_add(backlog.bulk);
            }
            Priority::Standard => {
                prior = prior
                    .saturating_add(backlog.expedited)
                    .saturating_add(backlog.standard);
                if self.config.bandwidth_reserved {
                    prior = prior.saturating_add(backlog.bulk.min(backlog.standard / 2));
                }
            }
            Priority::Expedited if bundle.ordinal == 0 => {
                prior = prior.saturating_add(backlog.expedited);
            }
            Priority::Expedited => {
                prior = prior.saturating_add(backlog.expedited_from(bundle.ordinal));
            }
        }
        PriorClaims {
            prior,
            total: backlog.total(),
        }
    }

    /// Predict when `bundle` would arrive over `route`
    pub fn assess<G: ContactGraph>(
        &self,
        graph: &G,
        route: &Route,
        bundle: &BundleDescriptor,
        plan: &EgressPlan,
        now: DtnTime,
    ) -> Result<CapacityAssessment, ExclusionReason> {
        let claims = self.prior_claims(&plan.backlog, bundle);
        let mut prior_claims = claims.prior;
        let mut committed = claims.total;
        let mut allotment = 0;
        let mut first_volume = 0;
        let mut found_first = false;

        // Contacts to the same neighbor ahead of the first hop drain part
        // of the queue
        let first_hop = route.first_hop();
        for (id, contact) in graph.contacts_between(
            graph.local_node(),
            route.to_node_nbr,
            self.config.home_region,
            now,
        ) {
            if contact.from_time > route.from_time {
                break;
            }
            let start = now.max(contact.from_time);
            let volume = transmit_volume(contact.to_time - start, contact.xmit_rate);
            allotment = committed.min(volume);
            committed = committed.saturating_sub(volume);
            if id == first_hop {
                first_volume = volume;
                found_first = true;
                break;
            }
            prior_claims = prior_claims.saturating_sub(volume);
        }
        if !found_first {
            return Err(ExclusionReason::FirstContactGone);
        }

        let bundle_eccc = self.eccc(bundle);
        let overbooked = allotment
            .saturating_add(bundle_eccc)
            .saturating_sub(first_volume);

        let first = graph
            .contact(first_hop)
            .ok_or(ExclusionReason::FirstContactGone)?;
        if first.xmit_rate == 0 {
            return Err(ExclusionReason::Depleted);
        }
        let mut first_byte = now.max(first.from_time);
        let eto = first_byte.saturating_add(seconds(prior_claims, first.xmit_rate));
        let mut last_byte = first_byte.saturating_add(seconds(
            prior_claims.saturating_add(bundle_eccc),
            first.xmit_rate,
        ));
        first_byte = eto;

        let mut max_volume_avbl = bundle_eccc;
        let mut arrival = last_byte;

        for (index, hop) in route.hops.iter().enumerate() {
            let contact = graph.contact(*hop).ok_or(ExclusionReason::RouteDisabled)?;
            if contact.to_time <= first_byte || last_byte > contact.to_time {
                trace!(%hop, first_byte, last_byte, "hop closes before bundle can be sent");
                return Err(ExclusionReason::Congested);
            }
            let owlt = graph
                .applicable_owlt(contact)
                .ok_or(ExclusionReason::NoRange)?;
            arrival = last_byte
                .saturating_add(i64::from(owlt))
                .saturating_add(self.config.owlt_margin(owlt));

            let residual = graph
                .volume_left(*hop, bundle.priority)
                .ok_or(ExclusionReason::RouteDisabled)?;
            if residual <= 0 {
                trace!(%hop, residual, "hop volume depleted");
                return Err(ExclusionReason::Depleted);
            }

            // Volume is only usable while every later hop is still open
            let mut effective_stop = contact.to_time;
            for later in &route.hops[index + 1..] {
                let later = graph
                    .contact(*later)
                    .ok_or(ExclusionReason::RouteDisabled)?;
                effective_stop = effective_stop.min(later.to_time);
            }
            let duration = effective_stop - first_byte;
            if duration <= 0 {
                return Err(ExclusionReason::Congested);
            }
            let effective_volume =
                transmit_volume(duration, contact.xmit_rate).min(residual.unsigned_abs());
            if effective_volume < max_volume_avbl {
                if !bundle.fragmentable {
                    trace!(%hop, effective_volume, bundle_eccc, "hop too small for bundle");
                    return Err(ExclusionReason::VolumeTooSmall);
                }
                max_volume_avbl = effective_volume;
            }

            if let Some(next) = route.hops.get(index + 1) {
                let next = graph.contact(*next).ok_or(ExclusionReason::RouteDisabled)?;
                if next.xmit_rate == 0 {
                    return Err(ExclusionReason::Depleted);
                }
                first_byte = arrival.max(next.from_time);
                last_byte = first_byte.saturating_add(seconds(bundle_eccc, next.xmit_rate));
            }
        }

        if arrival > bundle.expiration {
            return Err(ExclusionReason::MissesExpiration);
        }

        Ok(CapacityAssessment {
            pbat: arrival,
            eto,
            committed: allotment,
            overbooked,
            max_volume_avbl,
            bundle_eccc,
        })
    }

    /// Charge a forwarded bundle against every contact on its route
    pub fn reserve(
        &self,
        plan: &mut ContactPlan,
        route: &Route,
        bundle: &BundleDescriptor,
    ) -> ContactPlanResult<()> {
        let eccc = self.eccc(bundle);
        for hop in &route.hops {
            plan.reserve_volume(*hop, bundle.priority, eccc)?;
        }
        Ok(())
    }
}

/// Bytes a contact can carry over `duration` seconds
fn transmit_volume(duration: DtnTime, rate: u64) -> u64 {
    u64::try_from(duration.max(0))
        .unwrap_or(0)
        .saturating_mul(rate)
}

/// Whole seconds to send `bytes` at `rate`
fn seconds(bytes: u64, rate: u64) -> DtnTime {
    i64::try_from(bytes / rate).unwrap_or(i64::MAX)
}
