pub mod cidr;
pub mod engine;
pub mod gateway;
pub mod interface;
pub mod logging;
pub mod metric;
pub mod netsh;
pub mod routes;
pub mod rule;
pub mod shell;
pub mod state;
pub mod system;

mod dirs;
