#![allow(dead_code)]

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Mutex;

use splitroute_lib::gateway::Gateway;
use splitroute_lib::interface::{AdminState, Interface, OperState};
use splitroute_lib::routes::RouteTableEntry;
use splitroute_lib::shell;
use splitroute_lib::system::{
    AddOutcome, DeleteOutcome, Error, MetricMode, Protocol, RouteSpec, RoutingSystem,
};

/// In-memory routing system: routes and metrics live in a mutex-guarded
/// table, failures are injected per call.
#[derive(Default)]
pub struct FakeSystem {
    interfaces: Vec<Interface>,
    gateways: HashMap<String, Gateway>,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    routes: Vec<RouteSpec>,
    metric_calls: Vec<(String, Protocol, MetricMode)>,
    failing_metric_calls: u32,
    add_attempts: u32,
    fail_add_for: Option<Ipv4Addr>,
}

impl FakeSystem {
    pub fn with_interface(mut self, name: &str, gateway: Gateway) -> Self {
        self.interfaces.push(Interface {
            name: name.to_string(),
            admin_state: AdminState::Enabled,
            oper_state: OperState::Connected,
        });
        self.gateways.insert(name.to_string(), gateway);
        self
    }

    /// The next `count` metric commands fail, later ones succeed.
    pub fn fail_next_metric_calls(&self, count: u32) {
        self.inner.lock().unwrap().failing_metric_calls = count;
    }

    /// Every add for this destination network fails hard.
    pub fn fail_add_for(&self, network: Ipv4Addr) {
        self.inner.lock().unwrap().fail_add_for = Some(network);
    }

    pub fn installed_routes(&self) -> Vec<RouteSpec> {
        self.inner.lock().unwrap().routes.clone()
    }

    pub fn add_attempts(&self) -> u32 {
        self.inner.lock().unwrap().add_attempts
    }

    pub fn metric_calls(&self) -> Vec<(String, Protocol, MetricMode)> {
        self.inner.lock().unwrap().metric_calls.clone()
    }

    fn command_failed() -> Error {
        Error::Shell(shell::Error::CommandFailed)
    }
}

impl RoutingSystem for FakeSystem {
    async fn list_interfaces(&self) -> Vec<Interface> {
        self.interfaces.clone()
    }

    async fn resolve_gateway(&self, interface: &str) -> Gateway {
        self.gateways
            .get(interface)
            .copied()
            .unwrap_or(Gateway::Unresolved)
    }

    async fn set_metric(&self, interface: &str, protocol: Protocol, mode: MetricMode) -> Result<(), Error> {
        let mut inner = self.inner.lock().unwrap();
        if inner.failing_metric_calls > 0 {
            inner.failing_metric_calls -= 1;
            return Err(Self::command_failed());
        }
        inner.metric_calls.push((interface.to_string(), protocol, mode));
        Ok(())
    }

    async fn route_exists(&self, network: Ipv4Addr, netmask: Ipv4Addr) -> Result<bool, Error> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .routes
            .iter()
            .any(|route| route.network == network && route.netmask == netmask))
    }

    async fn list_routes(&self) -> Result<Vec<RouteTableEntry>, Error> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .routes
            .iter()
            .map(|route| RouteTableEntry {
                network: route.network,
                netmask: route.netmask,
                gateway: Some(route.gateway),
                interface: Ipv4Addr::UNSPECIFIED,
                metric: 1,
            })
            .collect())
    }

    async fn add_route(&self, route: &RouteSpec) -> Result<AddOutcome, Error> {
        let mut inner = self.inner.lock().unwrap();
        inner.add_attempts += 1;
        if inner.fail_add_for == Some(route.network) {
            return Err(Self::command_failed());
        }
        let exists = inner
            .routes
            .iter()
            .any(|r| r.network == route.network && r.netmask == route.netmask);
        if exists {
            return Ok(AddOutcome::AlreadyExists);
        }
        inner.routes.push(*route);
        Ok(AddOutcome::Added)
    }

    async fn delete_route(&self, route: &RouteSpec) -> Result<DeleteOutcome, Error> {
        let mut inner = self.inner.lock().unwrap();
        let position = inner
            .routes
            .iter()
            .position(|r| r.network == route.network && r.netmask == route.netmask);
        match position {
            Some(index) => {
                inner.routes.remove(index);
                Ok(DeleteOutcome::Deleted)
            }
            None => Ok(DeleteOutcome::NotFound),
        }
    }
}
