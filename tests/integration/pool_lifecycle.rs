//! Integration test: connection pool lifecycle against a live cluster.

use std::time::Duration;

use orbit_integration_tests::{TestCluster, test_client, test_key};
use orbit_net::{NetError, PoolLifecycle};

/// 40 concurrent callers over 4 nodes share one connection per node.
#[tokio::test]
async fn test_one_connection_per_host_under_concurrency() {
    let c = TestCluster::new(4).await;
    let client = test_client();

    let mut handles = Vec::new();
    for i in 0..40 {
        let client = client.clone();
        let addr = c.addr(i % 4).to_string();
        handles.push(tokio::spawn(async move {
            client.lookup_replicated(&addr, &test_key(i), 3).await
        }));
    }
    for handle in handles {
        let set = handle.await.unwrap().unwrap();
        assert_eq!(set.len(), 3);
    }

    let mut expected: Vec<String> = c.addrs().to_vec();
    expected.sort();
    assert_eq!(client.pooled_hosts().await, expected);

    client.shutdown().await;
    c.shutdown().await;
}

/// Idle connections are reaped and the next call dials again.
#[tokio::test]
async fn test_reaper_then_redial() {
    let c = TestCluster::new(3).await;
    let client = test_client();

    for i in 0..3 {
        client.lookup(c.addr(i), 2, &test_key(i)).await.unwrap();
    }
    assert_eq!(client.pool_len().await, 3);

    // max_idle is 100ms and the reaper runs every 50ms.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(client.pool_len().await, 0);

    client.lookup(c.addr(1), 2, &test_key(1)).await.unwrap();
    assert_eq!(client.pooled_hosts().await, vec![c.addr(1).to_string()]);

    client.shutdown().await;
    c.shutdown().await;
}

/// A pooled connection to a node that goes away is evicted on first use.
#[tokio::test]
async fn test_dead_node_connection_evicted() {
    let mut c = TestCluster::new(3).await;
    let client = test_client();

    for i in 0..3 {
        client.lookup(c.addr(i), 2, &test_key(i)).await.unwrap();
    }
    assert_eq!(client.pool_len().await, 3);

    c.kill_node(1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(client.lookup(c.addr(1), 2, &test_key(1)).await.is_err());
    let hosts = client.pooled_hosts().await;
    assert_eq!(hosts.len(), 2);
    assert!(!hosts.contains(&c.addr(1).to_string()));

    // Connections to live nodes are untouched.
    client.lookup(c.addr(0), 2, &test_key(0)).await.unwrap();
    client.lookup(c.addr(2), 2, &test_key(2)).await.unwrap();
    assert_eq!(client.pool_len().await, 2);

    client.shutdown().await;
    c.shutdown().await;
}

/// Shutdown closes every pooled connection and rejects later calls without
/// dialing.
#[tokio::test]
async fn test_shutdown_closes_pool() {
    let c = TestCluster::new(2).await;
    let client = test_client();

    client.lookup(c.addr(0), 1, b"k").await.unwrap();
    client.lookup(c.addr(1), 1, b"k").await.unwrap();
    assert_eq!(client.lifecycle().await, PoolLifecycle::Active);

    client.shutdown().await;
    assert_eq!(client.lifecycle().await, PoolLifecycle::Closed);
    assert_eq!(client.pool_len().await, 0);

    let err = client.lookup(c.addr(0), 1, b"k").await.unwrap_err();
    assert!(matches!(err, NetError::Shutdown), "got {err:?}");
    assert_eq!(client.pool_len().await, 0);

    // A second shutdown is a no-op.
    client.shutdown().await;
    assert_eq!(client.lifecycle().await, PoolLifecycle::Closed);

    // The servers are unaffected.
    assert!(c.is_live(0) && c.is_live(1));
    c.shutdown().await;
}
