pub mod config;
pub mod logging;

pub mod connect;
pub mod rules;
pub mod shipper;
pub mod tls;
pub mod token;
pub mod vault;
pub mod workload;
