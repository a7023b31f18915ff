use ferrous_lb_application::ports::{Dispatcher, Host};
use ferrous_lb_domain::config::WorkerConfig;
use ferrous_lb_domain::{ClusterPhase, ConfigError, ConnectionOptions, DnsLookupFamily, DomainError};
use ferrous_lb_infrastructure::upstream::{LogicalDnsCluster, LogicalHost, PrioritySet};
use ferrous_lb_infrastructure::worker::WorkerPool;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

mod helpers;
use helpers::{ClusterConfigBuilder, FakeConnection, FakeConnector, ManualResolver, PendingResolve};

const WORKERS: usize = 3;

struct Harness {
    workers: WorkerPool,
    registry: Arc<PrioritySet>,
    requests: mpsc::UnboundedReceiver<PendingResolve>,
    cluster: LogicalDnsCluster<FakeConnector>,
    initialized: Arc<AtomicUsize>,
}

impl Harness {
    fn start(builder: ClusterConfigBuilder) -> Self {
        let workers = WorkerPool::start(&WorkerConfig {
            threads: WORKERS,
            name_prefix: "test-worker".to_string(),
        })
        .unwrap();
        let registry = Arc::new(PrioritySet::new());
        let (resolver, requests) = ManualResolver::new();

        let mut cluster = LogicalDnsCluster::new(
            &builder.build(),
            resolver,
            registry.clone(),
            &workers,
            Arc::new(FakeConnector::default()),
        )
        .unwrap();

        let initialized = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&initialized);
        cluster
            .initialize(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        Self {
            workers,
            registry,
            requests,
            cluster,
            initialized,
        }
    }

    async fn next_request(&mut self) -> PendingResolve {
        ManualResolver::next(&mut self.requests).await
    }

    /// Answers the pending query and waits for the cycle to be fully processed,
    /// which is the case once the following query has been issued.
    async fn complete_cycle(&mut self, addresses: &[&str]) -> PendingResolve {
        let request = self.next_request().await;
        assert!(request.respond(addresses));
        self.next_request().await
    }

    async fn wait_initialized(&self) {
        timeout(Duration::from_secs(5), self.cluster.wait_initialized())
            .await
            .expect("cluster did not initialize");
    }

    fn host(&self) -> Arc<LogicalHost<FakeConnector>> {
        self.cluster.logical_host().expect("logical host not created")
    }

    /// Runs an empty job on every worker, so everything queued before it has
    /// run, and returns the pool's job count.
    async fn settled_job_count(&self) -> u64 {
        for index in 0..self.workers.len() {
            self.workers.run_on(index, || ()).await.unwrap();
        }
        self.workers.jobs_run()
    }

    /// Creates a connection on every worker and returns the addresses used.
    async fn connect_on_all_workers(&self) -> Vec<Result<SocketAddr, String>> {
        let mut results = Vec::new();
        for index in 0..self.workers.len() {
            let host = self.host();
            let result = self
                .workers
                .run_on(index, move || {
                    let dispatcher = Dispatcher::current().expect("not a worker thread");
                    host.create_connection(&dispatcher, &ConnectionOptions::default())
                        .map(|data| data.connection.address)
                        .map_err(|e| e.to_string())
                })
                .await
                .unwrap();
            results.push(result);
        }
        results
    }
}

fn addr(s: &str) -> SocketAddr {
    s.parse().unwrap()
}

#[tokio::test]
async fn test_first_cycle_creates_host_and_broadcasts() {
    let mut harness = Harness::start(
        ClusterConfigBuilder::new("backend.internal", 443)
            .refresh_ms(5000)
            .family(DnsLookupFamily::V4Only),
    );

    let request = harness.next_request().await;
    assert_eq!(request.hostname, "backend.internal");
    assert_eq!(request.family, DnsLookupFamily::V4Only);
    assert_eq!(harness.cluster.phase(), ClusterPhase::Initializing);
    assert!(request.respond(&["10.0.0.5"]));

    harness.wait_initialized().await;

    let host = harness.host();
    assert_eq!(host.address(), addr("0.0.0.0:0"));
    assert_eq!(host.health_check_address(), Some(addr("10.0.0.5:443")));
    assert_eq!(harness.cluster.current_resolved_address(), Some(addr("10.0.0.5:443")));
    assert_eq!(harness.cluster.phase(), ClusterPhase::Active);
    assert_eq!(harness.initialized.load(Ordering::SeqCst), 1);
    assert_eq!(harness.registry.host_count(), 1);
    assert_eq!(harness.registry.hosts(0)[0].hostname(), "backend.internal");

    for result in harness.connect_on_all_workers().await {
        assert_eq!(result, Ok(addr("10.0.0.5:443")));
    }

    let stats = harness.cluster.stats();
    assert_eq!(stats.update_attempt(), 1);
    assert_eq!(stats.update_success(), 1);
    assert_eq!(stats.update_address_changed(), 1);
}

#[tokio::test]
async fn test_unchanged_address_is_not_broadcast_again() {
    let mut harness = Harness::start(ClusterConfigBuilder::new("backend.internal", 443).refresh_ms(10));

    let pending = harness.complete_cycle(&["10.0.0.5"]).await;
    harness.wait_initialized().await;
    let host = harness.host();

    assert!(pending.respond(&["10.0.0.5"]));
    let _pending = harness.next_request().await;

    let stats = harness.cluster.stats();
    assert_eq!(stats.update_attempt(), 3);
    assert_eq!(stats.update_success(), 2);
    assert_eq!(stats.update_address_changed(), 1);
    assert!(Arc::ptr_eq(&host, &harness.host()));
    assert_eq!(harness.registry.host_count(), 1);

    for result in harness.connect_on_all_workers().await {
        assert_eq!(result, Ok(addr("10.0.0.5:443")));
    }
}

#[tokio::test]
async fn test_empty_result_keeps_previous_address() {
    let mut harness = Harness::start(ClusterConfigBuilder::new("backend.internal", 443).refresh_ms(10));

    let pending = harness.complete_cycle(&["10.0.0.5"]).await;
    harness.wait_initialized().await;
    assert!(pending.respond(&["10.0.0.5"]));
    let pending = harness.next_request().await;
    assert!(pending.respond(&[]));
    let _pending = harness.next_request().await;

    let stats = harness.cluster.stats();
    assert_eq!(stats.update_success(), 3);
    assert_eq!(stats.update_address_changed(), 1);
    assert_eq!(harness.cluster.current_resolved_address(), Some(addr("10.0.0.5:443")));
    assert_eq!(harness.host().health_check_address(), Some(addr("10.0.0.5:443")));

    for result in harness.connect_on_all_workers().await {
        assert_eq!(result, Ok(addr("10.0.0.5:443")));
    }
}

#[tokio::test]
async fn test_alternating_addresses_broadcast_once_per_change() {
    let mut harness = Harness::start(ClusterConfigBuilder::new("backend.internal", 443).refresh_ms(10));
    let host_before = {
        let pending = harness.complete_cycle(&["10.0.0.5"]).await;
        harness.wait_initialized().await;
        assert!(pending.respond(&["10.0.0.6"]));
        harness.host()
    };

    for cycle in 0..6 {
        let pending = harness.next_request().await;
        let seen = harness.connect_on_all_workers().await;
        for result in &seen {
            let address = result.clone().unwrap();
            assert!(address == addr("10.0.0.5:443") || address == addr("10.0.0.6:443"));
        }

        let next = if cycle % 2 == 0 { "10.0.0.5" } else { "10.0.0.6" };
        assert!(pending.respond(&[next]));
    }
    let _pending = harness.next_request().await;

    let stats = harness.cluster.stats();
    assert_eq!(stats.update_address_changed(), 8);
    assert!(Arc::ptr_eq(&host_before, &harness.host()));
    assert_eq!(harness.registry.host_count(), 1);
    assert_eq!(harness.initialized.load(Ordering::SeqCst), 1);

    let latest = addr("10.0.0.6:443");
    for result in harness.connect_on_all_workers().await {
        assert_eq!(result, Ok(latest));
    }
    assert_eq!(harness.host().health_check_address(), Some(latest));
}

#[tokio::test]
async fn test_only_first_result_is_used() {
    let mut harness = Harness::start(ClusterConfigBuilder::new("backend.internal", 8080));

    let request = harness.next_request().await;
    assert!(request.respond(&["10.0.0.9", "10.0.0.5", "10.0.0.6"]));
    harness.wait_initialized().await;

    assert_eq!(harness.cluster.current_resolved_address(), Some(addr("10.0.0.9:8080")));
}

#[tokio::test]
async fn test_ipv6_result_uses_ipv6_placeholder() {
    let mut harness = Harness::start(
        ClusterConfigBuilder::new("backend.internal", 443).family(DnsLookupFamily::V6Only),
    );

    let request = harness.next_request().await;
    assert!(request.respond(&["2001:db8::10"]));
    harness.wait_initialized().await;

    let host = harness.host();
    assert_eq!(host.address(), addr("[::]:0"));
    assert_eq!(host.health_check_address(), Some(addr("[2001:db8::10]:443")));
    for result in harness.connect_on_all_workers().await {
        assert_eq!(result, Ok(addr("[2001:db8::10]:443")));
    }
}

#[tokio::test]
async fn test_empty_first_cycle_still_completes_initialization() {
    let mut harness = Harness::start(ClusterConfigBuilder::new("backend.internal", 443).refresh_ms(10));

    let pending = harness.complete_cycle(&[]).await;
    harness.wait_initialized().await;

    assert_eq!(harness.initialized.load(Ordering::SeqCst), 1);
    assert_eq!(harness.cluster.phase(), ClusterPhase::Active);
    assert!(harness.cluster.logical_host().is_none());
    assert!(harness.cluster.current_resolved_address().is_none());
    assert_eq!(harness.registry.host_count(), 0);

    assert!(pending.respond(&["10.0.0.7"]));
    let _pending = harness.next_request().await;

    assert_eq!(harness.initialized.load(Ordering::SeqCst), 1);
    assert_eq!(harness.registry.host_count(), 1);
    for result in harness.connect_on_all_workers().await {
        assert_eq!(result, Ok(addr("10.0.0.7:443")));
    }
}

#[tokio::test]
async fn test_host_is_registered_only_after_every_worker_has_the_address() {
    let workers = WorkerPool::start(&WorkerConfig {
        threads: 1,
        name_prefix: "busy-worker".to_string(),
    })
    .unwrap();
    let registry = Arc::new(PrioritySet::new());
    let (resolver, mut requests) = ManualResolver::new();
    let mut cluster = LogicalDnsCluster::new(
        &ClusterConfigBuilder::new("backend.internal", 443).refresh_ms(10).build(),
        resolver,
        registry.clone(),
        &workers,
        Arc::new(FakeConnector::default()),
    )
    .unwrap();
    cluster.initialize(|| {}).unwrap();

    let request = ManualResolver::next(&mut requests).await;
    assert!(request.respond(&[]));
    timeout(Duration::from_secs(5), cluster.wait_initialized())
        .await
        .expect("cluster did not initialize");

    // Keep the only worker busy so the broadcast queues up behind this job.
    let (release, gate) = std::sync::mpsc::channel::<()>();
    workers
        .post(0, move || {
            let _ = gate.recv();
        })
        .unwrap();

    let request = ManualResolver::next(&mut requests).await;
    assert!(request.respond(&["10.0.0.5"]));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(cluster.current_resolved_address(), Some(addr("10.0.0.5:443")));
    assert!(cluster.logical_host().is_none());
    assert_eq!(registry.host_count(), 0);

    release.send(()).unwrap();
    let _pending = ManualResolver::next(&mut requests).await;

    assert_eq!(registry.host_count(), 1);
    let host = cluster.logical_host().unwrap();
    let result = workers
        .run_on(0, move || {
            let dispatcher = Dispatcher::current().unwrap();
            host.create_connection(&dispatcher, &ConnectionOptions::default())
                .map(|data| data.connection.address)
                .map_err(|e| e.to_string())
        })
        .await
        .unwrap();
    assert_eq!(result, Ok(addr("10.0.0.5:443")));
}

#[tokio::test]
async fn test_unchanged_address_posts_no_jobs_to_workers() {
    let mut harness = Harness::start(ClusterConfigBuilder::new("backend.internal", 443).refresh_ms(10));

    let pending = harness.complete_cycle(&["10.0.0.5"]).await;
    harness.wait_initialized().await;
    let before = harness.settled_job_count().await;

    assert!(pending.respond(&["10.0.0.5"]));
    let pending = harness.next_request().await;
    let after_unchanged = harness.settled_job_count().await;

    // Only the settling jobs themselves ran.
    assert_eq!(after_unchanged - before, WORKERS as u64);

    assert!(pending.respond(&["10.0.0.6"]));
    let _pending = harness.next_request().await;
    let after_changed = harness.settled_job_count().await;

    // One broadcast job per worker, plus the settling jobs.
    assert_eq!(after_changed - after_unchanged, 2 * WORKERS as u64);
}

#[tokio::test]
async fn test_host_description_is_a_snapshot() {
    let mut harness = Harness::start(ClusterConfigBuilder::new("backend.internal", 443).refresh_ms(10));

    let pending = harness.complete_cycle(&["10.0.0.5"]).await;
    harness.wait_initialized().await;

    let host = harness.host();
    let data = harness
        .workers
        .run_on(0, move || {
            let dispatcher = Dispatcher::current().unwrap();
            host.create_connection(&dispatcher, &ConnectionOptions::default())
                .map(|data| (data.connection, data.host_description))
        })
        .await
        .unwrap()
        .unwrap();
    let (connection, description): (FakeConnection, _) = data;

    assert!(pending.respond(&["10.0.0.6"]));
    let _pending = harness.next_request().await;

    assert_eq!(connection.worker, "test-worker-0");
    assert_eq!(description.address, addr("10.0.0.5:443"));
    assert_eq!(&*description.hostname, "backend.internal");
    assert_eq!(&*description.cluster_name, "backend");
    assert_eq!(description.priority, 0);
    assert_eq!(harness.cluster.current_resolved_address(), Some(addr("10.0.0.6:443")));
}

#[tokio::test]
async fn test_connection_without_broadcast_fails_loudly() {
    let mut harness = Harness::start(ClusterConfigBuilder::new("backend.internal", 443));

    let request = harness.next_request().await;
    assert!(request.respond(&["10.0.0.5"]));
    harness.wait_initialized().await;

    // The test thread is not a worker, so nothing was ever broadcast to it.
    let dispatcher = Dispatcher::new("not-a-worker", usize::MAX, tokio::runtime::Handle::current());
    let result = harness
        .host()
        .create_connection(&dispatcher, &ConnectionOptions::default());

    assert!(matches!(result, Err(DomainError::NoResolvedAddress(_))));
}

#[tokio::test]
async fn test_drop_cancels_outstanding_query() {
    let mut harness = Harness::start(ClusterConfigBuilder::new("backend.internal", 443));
    let mut request = harness.next_request().await;
    let view = harness.cluster.introspection();

    drop(harness.cluster);

    timeout(Duration::from_secs(5), request.cancelled())
        .await
        .expect("outstanding query was not cancelled");
    assert!(!request.respond(&["10.0.0.5"]));

    let status = view.status();
    assert_eq!(status.stats.update_attempt, 1);
    assert_eq!(status.stats.update_success, 0);
    assert_eq!(status.phase, ClusterPhase::TearingDown);
    assert!(status.resolved_address.is_none());
    assert_eq!(harness.initialized.load(Ordering::SeqCst), 0);
    assert_eq!(harness.registry.host_count(), 0);
}

#[tokio::test]
async fn test_shutdown_stops_the_loop() {
    let mut harness = Harness::start(ClusterConfigBuilder::new("backend.internal", 443).refresh_ms(10));
    let pending = harness.complete_cycle(&["10.0.0.5"]).await;
    harness.wait_initialized().await;

    timeout(Duration::from_secs(5), harness.cluster.shutdown())
        .await
        .expect("shutdown hung");

    // Every resolver reference is gone once the request channel closes.
    let closed = timeout(Duration::from_secs(5), harness.requests.recv())
        .await
        .expect("resolver still referenced");
    assert!(closed.is_none());
    assert!(!pending.respond(&["10.0.0.6"]));
}

#[tokio::test]
async fn test_invalid_configuration_never_starts_resolving() {
    let workers = WorkerPool::start(&WorkerConfig {
        threads: 1,
        name_prefix: "test-worker".to_string(),
    })
    .unwrap();
    let (resolver, mut requests) = ManualResolver::new();

    let two_hosts = ClusterConfigBuilder::new("a.internal", 80)
        .extra_host("b.internal", 80)
        .build();
    let result = LogicalDnsCluster::new(
        &two_hosts,
        resolver.clone(),
        Arc::new(PrioritySet::new()),
        &workers,
        Arc::new(FakeConnector::default()),
    );
    assert!(matches!(result, Err(ConfigError::HostsCardinality)));

    let custom_resolver = ClusterConfigBuilder::new("a.internal", 80)
        .resolver_name("custom")
        .build();
    let result = LogicalDnsCluster::new(
        &custom_resolver,
        resolver,
        Arc::new(PrioritySet::new()),
        &workers,
        Arc::new(FakeConnector::default()),
    );
    assert!(matches!(result, Err(ConfigError::CustomResolverName)));

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(requests.try_recv().is_err());
}

#[tokio::test]
async fn test_status_reports_introspection_fields() {
    let mut harness = Harness::start(ClusterConfigBuilder::new("backend.internal", 443).name("payments"));

    let request = harness.next_request().await;
    assert!(request.respond(&["10.0.0.5"]));
    harness.wait_initialized().await;

    let status = harness.cluster.status();
    assert_eq!(status.name, "payments");
    assert_eq!(status.hostname, "backend.internal");
    assert_eq!(status.port, 443);
    assert_eq!(status.phase, ClusterPhase::Active);
    assert_eq!(status.resolved_address, Some(addr("10.0.0.5:443")));
    assert_eq!(status.health_check_address, Some(addr("10.0.0.5:443")));
    assert_eq!(status.stats.update_attempt, 1);
}
