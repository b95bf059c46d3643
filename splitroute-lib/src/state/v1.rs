use serde::Deserialize;

use crate::gateway::Gateway;
use crate::rule::Rule;
use crate::state::{DesiredState, MetricPolicy};

/// Version 1 record: already versioned, no metric policy yet.
#[derive(Debug, Deserialize)]
pub(super) struct State {
    #[allow(dead_code)]
    version: u64,
    user_interface: String,
    campus_interface: String,
    user_gateway: Gateway,
    campus_gateway: Gateway,
    #[serde(default)]
    rules: Vec<Rule>,
}

impl From<State> for DesiredState {
    fn from(old: State) -> Self {
        DesiredState {
            user_interface: old.user_interface,
            campus_interface: old.campus_interface,
            user_gateway: old.user_gateway,
            campus_gateway: old.campus_gateway,
            rules: old.rules,
            metric_policy: MetricPolicy::default(),
        }
    }
}
