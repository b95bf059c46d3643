use serde::Deserialize;

use std::net::Ipv4Addr;

use crate::gateway::Gateway;
use crate::rule;
use crate::state::{DesiredState, MetricPolicy};

/// Unversioned file shape of the earliest iterations: interface names under
/// "connection" keys, gateways as plain strings, rules under "ip_cidrs".
/// Rule-only files carry none of the other keys, so every field defaults.
#[derive(Debug, Deserialize)]
pub(super) struct State {
    #[serde(default, alias = "user_interface")]
    user_connection: String,
    #[serde(default, alias = "campus_interface")]
    campus_connection: String,
    user_gateway: Option<String>,
    campus_gateway: Option<String>,
    #[serde(default, alias = "rules")]
    ip_cidrs: Vec<String>,
}

fn gateway_from_legacy(raw: Option<String>) -> Gateway {
    match raw.as_deref().map(str::parse::<Ipv4Addr>) {
        Some(Ok(address)) => Gateway::Resolved(address),
        Some(Err(_)) | None => Gateway::Unresolved,
    }
}

impl From<State> for DesiredState {
    fn from(old: State) -> Self {
        let validated = rule::validate(&old.ip_cidrs);
        for error in &validated.errors {
            tracing::warn!(%error, "dropping malformed rule from legacy desired-state file");
        }
        DesiredState {
            user_interface: old.user_connection,
            campus_interface: old.campus_connection,
            user_gateway: gateway_from_legacy(old.user_gateway),
            campus_gateway: gateway_from_legacy(old.campus_gateway),
            rules: validated.rules,
            metric_policy: MetricPolicy::default(),
        }
    }
}
