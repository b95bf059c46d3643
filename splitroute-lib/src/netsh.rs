use tokio::process::Command;

use std::net::Ipv4Addr;

use crate::gateway::{self, Gateway};
use crate::interface::{self, Interface};
use crate::routes::{self, RouteTableEntry};
use crate::shell::{self, CommandExt};
use crate::system::{AddOutcome, DeleteOutcome, Error, MetricMode, Protocol, RouteSpec, RoutingSystem};

// route.exe reports add/delete no-ops in prose, localized.
const ALREADY_EXISTS_MARKERS: [&str; 2] = ["already exists", "对象已存在"];
const NOT_FOUND_MARKERS: [&str; 3] = ["not found", "element not found", "找不到元素"];

/// Production [`RoutingSystem`] backed by `netsh` and `route`.
#[derive(Clone, Copy, Debug, Default)]
pub struct NetshSystem;

impl RoutingSystem for NetshSystem {
    async fn list_interfaces(&self) -> Vec<Interface> {
        let output = Command::new("netsh")
            .args(["interface", "show", "interface"])
            .run_stdout()
            .await;
        match output {
            Ok(text) => interface::parse_interface_table(&text),
            Err(e) => {
                tracing::error!(error = %e, "interface enumeration failed");
                Vec::new()
            }
        }
    }

    async fn resolve_gateway(&self, interface: &str) -> Gateway {
        let output = Command::new("netsh")
            .args(["interface", "ip", "show", "config"])
            .arg(interface)
            .run_stdout()
            .await;
        match output {
            Ok(text) => gateway::parse_gateway(&text),
            Err(e) => {
                tracing::error!(%interface, error = %e, "interface configuration query failed");
                Gateway::Unresolved
            }
        }
    }

    async fn set_metric(&self, interface: &str, protocol: Protocol, mode: MetricMode) -> Result<(), Error> {
        let metric = match mode {
            MetricMode::Automatic => "metric=automatic".to_string(),
            MetricMode::Value(value) => format!("metric={value}"),
        };
        Command::new("netsh")
            .arg("interface")
            .arg(protocol.to_string())
            .args(["set", "interface"])
            .arg(interface)
            .arg(metric)
            .arg("store=persistent")
            .run()
            .await
            .map_err(Error::from)
    }

    async fn route_exists(&self, network: Ipv4Addr, netmask: Ipv4Addr) -> Result<bool, Error> {
        // the command-side filter narrows the dump, the parsed comparison
        // makes the match exact
        let text = Command::new("route")
            .arg("print")
            .arg(network.to_string())
            .run_stdout()
            .await?;
        let entries = routes::parse_route_table(&text);
        Ok(routes::route_matches(&entries, network, netmask))
    }

    async fn list_routes(&self) -> Result<Vec<RouteTableEntry>, Error> {
        let text = Command::new("route").arg("print").run_stdout().await?;
        Ok(routes::parse_route_table(&text))
    }

    async fn add_route(&self, route: &RouteSpec) -> Result<AddOutcome, Error> {
        let output = Command::new("route")
            .args(["-p", "add"])
            .arg(route.network.to_string())
            .arg("mask")
            .arg(route.netmask.to_string())
            .arg(route.gateway.to_string())
            .output()
            .await
            .map_err(shell::Error::from)?;
        let text = combined_output(&output);
        if contains_marker(&text, &ALREADY_EXISTS_MARKERS) {
            return Ok(AddOutcome::AlreadyExists);
        }
        if output.status.success() {
            return Ok(AddOutcome::Added);
        }
        tracing::error!(network = %route.network, status_code = ?output.status.code(), output = %text, "route add failed");
        Err(shell::Error::CommandFailed.into())
    }

    async fn delete_route(&self, route: &RouteSpec) -> Result<DeleteOutcome, Error> {
        let output = Command::new("route")
            .arg("delete")
            .arg(route.network.to_string())
            .arg("mask")
            .arg(route.netmask.to_string())
            .arg(route.gateway.to_string())
            .output()
            .await
            .map_err(shell::Error::from)?;
        let text = combined_output(&output);
        if contains_marker(&text, &NOT_FOUND_MARKERS) {
            return Ok(DeleteOutcome::NotFound);
        }
        if output.status.success() {
            return Ok(DeleteOutcome::Deleted);
        }
        tracing::error!(network = %route.network, status_code = ?output.status.code(), output = %text, "route delete failed");
        Err(shell::Error::CommandFailed.into())
    }
}

fn combined_output(output: &std::process::Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

fn contains_marker(text: &str, markers: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    markers.iter().any(|marker| lowered.contains(marker))
}
