use async_trait::async_trait;
use ferrous_lb_application::ports::{ConnectionFactory, DnsResolver, Dispatcher};
use ferrous_lb_domain::{ConnectionOptions, DnsLookupFamily, DomainError};
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

// ============================================================================
// Manual DnsResolver: every query waits until the test answers it
// ============================================================================

pub struct PendingResolve {
    pub hostname: String,
    pub family: DnsLookupFamily,
    responder: oneshot::Sender<Vec<IpAddr>>,
}

impl PendingResolve {
    /// Answers the query. Returns false when the query was cancelled.
    pub fn respond(self, addresses: &[&str]) -> bool {
        let addresses = addresses.iter().map(|a| a.parse().unwrap()).collect();
        self.responder.send(addresses).is_ok()
    }

    /// Waits until the query has been dropped by its issuer.
    pub async fn cancelled(&mut self) {
        self.responder.closed().await;
    }
}

pub struct ManualResolver {
    requests: mpsc::UnboundedSender<PendingResolve>,
}

impl ManualResolver {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<PendingResolve>) {
        let (requests, receiver) = mpsc::unbounded_channel();
        (Arc::new(Self { requests }), receiver)
    }

    /// Next query issued by the cluster.
    pub async fn next(receiver: &mut mpsc::UnboundedReceiver<PendingResolve>) -> PendingResolve {
        timeout(Duration::from_secs(5), receiver.recv())
            .await
            .expect("no resolve request within 5s")
            .expect("resolver dropped")
    }
}

#[async_trait]
impl DnsResolver for ManualResolver {
    async fn resolve(&self, hostname: &str, family: DnsLookupFamily) -> Vec<IpAddr> {
        let (responder, answer) = oneshot::channel();
        let request = PendingResolve {
            hostname: hostname.to_string(),
            family,
            responder,
        };
        if self.requests.send(request).is_err() {
            return std::future::pending().await;
        }
        match answer.await {
            Ok(addresses) => addresses,
            Err(_) => std::future::pending().await,
        }
    }
}

// ============================================================================
// Fake ConnectionFactory
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeConnection {
    pub address: SocketAddr,
    pub worker: String,
}

#[derive(Default)]
pub struct FakeConnector {
    created: AtomicUsize,
}

impl FakeConnector {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl ConnectionFactory for FakeConnector {
    type Connection = FakeConnection;

    fn create_connection(
        &self,
        dispatcher: &Dispatcher,
        address: SocketAddr,
        _options: &ConnectionOptions,
    ) -> Result<FakeConnection, DomainError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(FakeConnection {
            address,
            worker: dispatcher.name().to_string(),
        })
    }
}
