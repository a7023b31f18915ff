#![allow(dead_code)]

mod builders;
mod mock_ports;

pub use builders::ClusterConfigBuilder;
pub use mock_ports::{FakeConnection, FakeConnector, ManualResolver, PendingResolve};
