use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::fmt::{self, Display};
use std::future::Future;
use std::net::Ipv4Addr;

use crate::gateway::Gateway;
use crate::interface::Interface;
use crate::routes::RouteTableEntry;

#[derive(Debug, Error)]
pub enum Error {
    #[error("command execution failed: {0}")]
    Shell(#[from] crate::shell::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Ipv4,
    Ipv6,
}

impl Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Protocol::Ipv4 => write!(f, "ipv4"),
            Protocol::Ipv6 => write!(f, "ipv6"),
        }
    }
}

/// Route-preference metric setting: the sentinel "automatic" or an explicit
/// value. Lower explicit values are preferred by the OS route selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricMode {
    Automatic,
    Value(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// The route was already installed; a no-op, not an error.
    AlreadyExists,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// No such route; a no-op, not an error.
    NotFound,
}

/// A route to install or remove: destination network, dotted-quad mask and
/// the gateway that should carry it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RouteSpec {
    pub network: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub gateway: Ipv4Addr,
}

/// Capability over the host's mutable routing state.
///
/// The routing table and per-interface metrics are host-wide shared
/// resources that other processes mutate concurrently; callers re-verify
/// existence right before mutating and accept the remaining race window.
/// The production implementation shells out to the OS tools, tests run
/// against an in-memory stand-in.
pub trait RoutingSystem {
    /// Enumerate interfaces. Degrades to an empty list when the underlying
    /// command fails; partial parses return whatever rows were readable.
    fn list_interfaces(&self) -> impl Future<Output = Vec<Interface>> + Send;

    /// Resolve the default gateway of an interface. A missing gateway is
    /// reported as [`Gateway::Unresolved`], not as an error.
    fn resolve_gateway(&self, interface: &str) -> impl Future<Output = Gateway> + Send;

    /// One-shot persistent metric change for one protocol family.
    fn set_metric(
        &self,
        interface: &str,
        protocol: Protocol,
        mode: MetricMode,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Whether a route for exactly this network and mask is installed.
    fn route_exists(
        &self,
        network: Ipv4Addr,
        netmask: Ipv4Addr,
    ) -> impl Future<Output = Result<bool, Error>> + Send;

    fn list_routes(&self) -> impl Future<Output = Result<Vec<RouteTableEntry>, Error>> + Send;

    fn add_route(&self, route: &RouteSpec) -> impl Future<Output = Result<AddOutcome, Error>> + Send;

    fn delete_route(&self, route: &RouteSpec) -> impl Future<Output = Result<DeleteOutcome, Error>> + Send;
}
