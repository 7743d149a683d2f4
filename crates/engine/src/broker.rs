// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Site Broker: per-type required-delta -> per-site per-type orders
//! (spec §4.5).
//!
//! Pure decision logic plus one piece of state carried across cycles: a
//! per-type "shutdown armed at" timestamp used to implement
//! `shutdown_delay`. That timer is not part of the Registry snapshot (§9 —
//! losing it across a restart only delays one shutdown by at most
//! `shutdown_delay`, an acceptable approximation).

use chrono::{DateTime, Utc};
use roced_core::site::{MachineTypeDemand, Order, SiteInfo};
use std::collections::HashMap;
use tracing::warn;

/// Per-type spawn/shutdown knobs.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub default_max_instances: u32,
    pub max_instances_by_type: HashMap<String, u32>,
    pub shutdown_delay: chrono::Duration,
}

impl BrokerConfig {
    fn max_instances(&self, machine_type: &str) -> u32 {
        self.max_instances_by_type
            .get(machine_type)
            .copied()
            .unwrap_or(self.default_max_instances)
    }
}

/// Turns `{type -> (required, actual)}` into `{site -> {type -> delta}}`,
/// per spec §4.5's five-step algorithm.
pub struct Broker {
    config: BrokerConfig,
    shutdown_armed_at: HashMap<String, DateTime<Utc>>,
}

impl Broker {
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            config,
            shutdown_armed_at: HashMap::new(),
        }
    }

    pub fn decide(
        &mut self,
        demand: &HashMap<String, MachineTypeDemand>,
        sites: &[SiteInfo],
        now: DateTime<Utc>,
    ) -> HashMap<String, HashMap<String, i64>> {
        let mut orders: HashMap<String, HashMap<String, i64>> = HashMap::new();

        let mut spawn_sites = sites.to_vec();
        spawn_sites.sort_by(|a, b| a.cost.partial_cmp(&b.cost).unwrap_or(std::cmp::Ordering::Equal));
        let mut shutdown_sites = sites.to_vec();
        shutdown_sites
            .sort_by(|a, b| b.cost.partial_cmp(&a.cost).unwrap_or(std::cmp::Ordering::Equal));

        for (machine_type, type_demand) in demand {
            // `required = null` suppresses growth and shrink alike — delta
            // stays 0 and the timer is cleared so a later real shutdown
            // doesn't inherit a stale arm time.
            let Some(required) = type_demand.required else {
                self.shutdown_armed_at.remove(machine_type);
                continue;
            };

            let actual = type_demand.actual as i64;
            let max_instances = self.config.max_instances(machine_type) as i64;
            let delta = (max_instances - actual).min(required - actual);

            if delta > 0 {
                self.spawn(machine_type, delta as u32, &spawn_sites, &mut orders);
            } else if delta < 0 {
                self.maybe_shutdown(machine_type, delta, &shutdown_sites, now, &mut orders);
            } else {
                self.shutdown_armed_at.remove(machine_type);
            }
        }

        orders
    }

    fn spawn(
        &self,
        machine_type: &str,
        count: u32,
        sites: &[SiteInfo],
        orders: &mut HashMap<String, HashMap<String, i64>>,
    ) {
        // Open question #1 (spec §9): the entire delta goes to the first
        // supporting site rather than being split across capacity.
        match sites.iter().find(|s| s.supports(machine_type)) {
            Some(site) => push_order(
                orders,
                Order {
                    site_name: site.site_name.clone(),
                    machine_type: machine_type.to_string(),
                    delta: count as i64,
                },
            ),
            None => {
                warn!(machine_type, count, "no site supports this machine type, dropping spawn");
            }
        }
    }

    fn maybe_shutdown(
        &mut self,
        machine_type: &str,
        delta: i64,
        sites: &[SiteInfo],
        now: DateTime<Utc>,
        orders: &mut HashMap<String, HashMap<String, i64>>,
    ) {
        // shutdown_delay = 0 emits immediately: there is no deferral window
        // to arm a timer against, so the armed-at bookkeeping below (which
        // only ever fires on a *later* cycle, per its strict `>` check)
        // never applies here.
        if self.config.shutdown_delay <= chrono::Duration::zero() {
            self.emit_shutdown(machine_type, delta, sites, orders);
            self.shutdown_armed_at.remove(machine_type);
            return;
        }

        let armed_at = *self
            .shutdown_armed_at
            .entry(machine_type.to_string())
            .or_insert(now);

        if now - armed_at <= self.config.shutdown_delay {
            return;
        }

        self.emit_shutdown(machine_type, delta, sites, orders);
        self.shutdown_armed_at.remove(machine_type);
    }

    fn emit_shutdown(
        &self,
        machine_type: &str,
        delta: i64,
        sites: &[SiteInfo],
        orders: &mut HashMap<String, HashMap<String, i64>>,
    ) {
        match sites.iter().find(|s| s.supports(machine_type)) {
            Some(site) => push_order(
                orders,
                Order {
                    site_name: site.site_name.clone(),
                    machine_type: machine_type.to_string(),
                    delta,
                },
            ),
            None => {
                warn!(machine_type, delta, "no site supports this machine type, dropping shutdown");
            }
        }
    }
}

/// Folds one [`Order`] into the `{site -> {type -> delta}}` shape
/// `CoreScheduler::dispatch_orders` consumes — the Broker's real output
/// unit is `Order`; the nested map is just its grouped-by-site projection.
fn push_order(orders: &mut HashMap<String, HashMap<String, i64>>, order: Order) {
    orders
        .entry(order.site_name)
        .or_default()
        .insert(order.machine_type, order.delta);
}

#[cfg(test)]
#[path = "broker_tests.rs"]
mod tests;
