use ferrous_lb_application::ports::{ConnectionFactory, Dispatcher};
use ferrous_lb_domain::{ConnectionOptions, DomainError};
use std::io;
use std::net::SocketAddr;
use tokio::net::{TcpSocket, TcpStream};
use tokio::task::JoinHandle;
use tracing::debug;

/// Opens plain TCP connections on the worker's runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnectionFactory;

impl TcpConnectionFactory {
    pub fn new() -> Self {
        Self
    }

    fn configure(address: SocketAddr, options: &ConnectionOptions) -> io::Result<TcpSocket> {
        let socket = if address.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_nodelay(options.nodelay)?;
        socket.set_keepalive(options.keepalive)?;
        if let Some(size) = options.send_buffer_size {
            socket.set_send_buffer_size(size)?;
        }
        if let Some(size) = options.recv_buffer_size {
            socket.set_recv_buffer_size(size)?;
        }
        Ok(socket)
    }
}

impl ConnectionFactory for TcpConnectionFactory {
    type Connection = UpstreamConnection;

    fn create_connection(
        &self,
        dispatcher: &Dispatcher,
        address: SocketAddr,
        options: &ConnectionOptions,
    ) -> Result<UpstreamConnection, DomainError> {
        let socket = Self::configure(address, options).map_err(|e| DomainError::ConnectionFailed {
            address: address.to_string(),
            reason: e.to_string(),
        })?;

        debug!(worker = dispatcher.name(), address = %address, "Connecting");
        let connecting = dispatcher.handle().spawn(socket.connect(address));

        Ok(UpstreamConnection {
            remote_address: address,
            connecting,
        })
    }
}

/// A TCP connection whose handshake runs on the worker that created it.
pub struct UpstreamConnection {
    remote_address: SocketAddr,
    connecting: JoinHandle<io::Result<TcpStream>>,
}

impl UpstreamConnection {
    pub fn remote_address(&self) -> SocketAddr {
        self.remote_address
    }

    /// Waits for the handshake to finish.
    pub async fn established(self) -> Result<TcpStream, DomainError> {
        let failed = |reason: String| DomainError::ConnectionFailed {
            address: self.remote_address.to_string(),
            reason,
        };
        match self.connecting.await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(failed(e.to_string())),
            Err(e) => Err(failed(e.to_string())),
        }
    }
}
