use ferrous_lb_domain::{ConnectionOptions, DomainError};
use std::net::SocketAddr;

use super::Dispatcher;

/// Creates upstream connections on a worker dispatcher.
pub trait ConnectionFactory: Send + Sync + 'static {
    type Connection: Send;

    fn create_connection(
        &self,
        dispatcher: &Dispatcher,
        address: SocketAddr,
        options: &ConnectionOptions,
    ) -> Result<Self::Connection, DomainError>;
}
