use thiserror::Error;

use std::net::Ipv4Addr;

use crate::cidr;
use crate::metric::{DEFAULT_MAX_RETRIES, MetricController};
use crate::rule::Rule;
use crate::state::{DesiredState, Role};
use crate::system::{AddOutcome, DeleteOutcome, RouteSpec, RoutingSystem};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("gateway for the {0} interface is unresolved")]
    UnresolvedGateway(Role),
}

/// Per-rule outcome of an apply pass. Pre-existing routes are skipped, a
/// failed rule never aborts the remaining ones.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuleOutcome {
    Added,
    AlreadyPresent,
    Failed(String),
}

/// Per-rule outcome of a reset pass. Routes that are already gone are an
/// expected no-op.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemovalOutcome {
    Deleted,
    NotFound,
    Failed(String),
}

#[derive(Debug)]
pub struct ApplyReport {
    pub metrics_ok: bool,
    pub rules: Vec<(Rule, RuleOutcome)>,
}

impl ApplyReport {
    /// Whether the desired state is safe to persist: every metric pinned and
    /// no rule in a failed state.
    pub fn fully_applied(&self) -> bool {
        self.metrics_ok
            && self
                .rules
                .iter()
                .all(|(_, outcome)| !matches!(outcome, RuleOutcome::Failed(_)))
    }
}

#[derive(Debug)]
pub struct ResetReport {
    pub metric_failures: usize,
    pub routes: Vec<(Rule, RemovalOutcome)>,
}

impl ResetReport {
    pub fn completed(&self) -> bool {
        self.metric_failures == 0
            && self
                .routes
                .iter()
                .all(|(_, outcome)| !matches!(outcome, RemovalOutcome::Failed(_)))
    }
}

/// Reconciles a [`DesiredState`] against the live routing system.
///
/// Apply and reset are idempotent: re-applying an applied state only skips
/// matching entries, re-resetting a reset state reports every route as not
/// found and still completes.
pub struct Engine<'a, S> {
    system: &'a S,
}

impl<'a, S: RoutingSystem> Engine<'a, S> {
    pub fn new(system: &'a S) -> Self {
        Self { system }
    }

    /// Pins the metric policy, then installs every missing rule route via
    /// the campus gateway. Requires both gateways resolved up front.
    pub async fn apply(&self, state: &DesiredState) -> Result<ApplyReport, Error> {
        for role in [Role::User, Role::Campus] {
            if !state.gateway(role).is_resolved() {
                return Err(Error::UnresolvedGateway(role));
            }
        }
        // checked above
        let campus_gateway = match state.campus_gateway.address() {
            Some(address) => address,
            None => return Err(Error::UnresolvedGateway(Role::Campus)),
        };

        let metrics = MetricController::new(self.system);
        let mut metrics_ok = true;
        for target in state.metric_policy.targets() {
            let interface = state.interface_name(target.role);
            if !metrics
                .set(interface, target.protocol, target.metric, DEFAULT_MAX_RETRIES)
                .await
            {
                metrics_ok = false;
            }
        }

        let mut rules = Vec::with_capacity(state.rules.len());
        for rule in &state.rules {
            let outcome = self.apply_rule(rule, campus_gateway).await;
            rules.push((rule.clone(), outcome));
        }

        Ok(ApplyReport { metrics_ok, rules })
    }

    async fn apply_rule(&self, rule: &Rule, gateway: Ipv4Addr) -> RuleOutcome {
        let netmask = match cidr::netmask(rule.prefix) {
            Ok(netmask) => netmask,
            Err(e) => return RuleOutcome::Failed(e.to_string()),
        };
        match self.system.route_exists(rule.network, netmask).await {
            Ok(true) => {
                tracing::info!(rule = %rule, "route already present, skipping");
                return RuleOutcome::AlreadyPresent;
            }
            Ok(false) => (),
            // a failed read-only check degrades to attempting the add
            Err(e) => tracing::warn!(rule = %rule, error = %e, "route existence check failed"),
        }
        let spec = RouteSpec {
            network: rule.network,
            netmask,
            gateway,
        };
        match self.system.add_route(&spec).await {
            Ok(AddOutcome::Added) => {
                tracing::info!(rule = %rule, gateway = %gateway, "route added");
                RuleOutcome::Added
            }
            Ok(AddOutcome::AlreadyExists) => {
                tracing::info!(rule = %rule, "route already present, skipping");
                RuleOutcome::AlreadyPresent
            }
            Err(e) => {
                tracing::error!(rule = %rule, gateway = %gateway, error = %e, "route add failed");
                RuleOutcome::Failed(e.to_string())
            }
        }
    }

    /// Restores automatic metrics on both interfaces, then deletes every
    /// route the persisted state had applied. Metric failures and per-route
    /// failures are collected, never short-circuited.
    pub async fn reset(&self, state: &DesiredState) -> ResetReport {
        let metrics = MetricController::new(self.system);
        let mut metric_failures = 0;
        for role in [Role::User, Role::Campus] {
            metric_failures += metrics.reset(state.interface_name(role)).await.len();
        }

        let mut routes = Vec::with_capacity(state.rules.len());
        for rule in &state.rules {
            let outcome = self.remove_rule(rule, state.campus_gateway.address()).await;
            routes.push((rule.clone(), outcome));
        }

        ResetReport {
            metric_failures,
            routes,
        }
    }

    async fn remove_rule(&self, rule: &Rule, gateway: Option<Ipv4Addr>) -> RemovalOutcome {
        let netmask = match cidr::netmask(rule.prefix) {
            Ok(netmask) => netmask,
            Err(e) => return RemovalOutcome::Failed(e.to_string()),
        };
        let gateway = match gateway {
            Some(address) => address,
            // only reachable with a hand-edited state file
            None => return RemovalOutcome::Failed("campus gateway unresolved".to_string()),
        };
        let spec = RouteSpec {
            network: rule.network,
            netmask,
            gateway,
        };
        match self.system.delete_route(&spec).await {
            Ok(DeleteOutcome::Deleted) => {
                tracing::info!(rule = %rule, "route deleted");
                RemovalOutcome::Deleted
            }
            Ok(DeleteOutcome::NotFound) => {
                tracing::info!(rule = %rule, "route not found, nothing to delete");
                RemovalOutcome::NotFound
            }
            Err(e) => {
                tracing::error!(rule = %rule, error = %e, "route delete failed");
                RemovalOutcome::Failed(e.to_string())
            }
        }
    }
}
