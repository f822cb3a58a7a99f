//! Integration test: node failure.
//!
//! Lookups are answered from each node's own ring, so a dead node only
//! affects callers that talk to it, until it is forgotten.

use std::collections::HashSet;
use std::time::Duration;

use orbit_cluster::ScourError;
use orbit_integration_tests::{TestCluster, test_client, test_key};
use orbit_net::NetError;

/// Kill one of 5 nodes: it refuses connections, the rest still answer and
/// still place replicas on it.
#[tokio::test]
async fn test_kill_one_node_others_answer() {
    let mut c = TestCluster::new(5).await;
    let client = test_client();
    let expected = c.local_coordinator(0).lookup_replicated(&test_key(1), 5).await.unwrap();

    c.kill_node(2).await;
    assert!(!c.is_live(2));

    let err = client
        .lookup_replicated(c.addr(2), &test_key(1), 5)
        .await
        .unwrap_err();
    assert!(matches!(err, NetError::Connect(_)), "got {err:?}");
    assert!(client.pooled_hosts().await.is_empty(), "failed dial is not pooled");

    for i in [0, 1, 3, 4] {
        let got = client
            .lookup_replicated(c.addr(i), &test_key(1), 5)
            .await
            .unwrap();
        assert_eq!(got, expected);
        assert!(got.contains_host(c.addr(2)), "static membership keeps node 2");
    }

    client.shutdown().await;
    c.shutdown().await;
}

/// A coordinator whose ring lives on a dead node fails the whole lookup and
/// any scour built on it.
#[tokio::test]
async fn test_remote_ring_on_dead_node() {
    let mut c = TestCluster::new(3).await;
    let client = test_client();
    let remote = c.remote_coordinator(&client, 0);

    assert!(remote.lookup_replicated(&test_key(3), 2).await.is_ok());

    c.kill_node(0).await;
    // Let the server's connection task notice the shutdown.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let err = remote.lookup_replicated(&test_key(3), 2).await.unwrap_err();
    assert!(err.is_lookup_failure(), "got {err:?}");
    assert!(err.partial().is_none(), "vertex failures carry no partial");

    let mut seen = 0;
    let err = remote
        .scour_replicated_key(&test_key(3), 2, |_| {
            seen += 1;
            Ok::<(), ()>(())
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ScourError::Lookup { visited: 0, .. }), "got {err:?}");
    assert_eq!(seen, 0);

    client.shutdown().await;
    c.shutdown().await;
}

/// Once a dead node is forgotten it is never placed again, and the ring can
/// no longer hold as many replicas.
#[tokio::test]
async fn test_forgotten_node_never_placed() {
    let mut c = TestCluster::new(5).await;
    let client = test_client();

    c.kill_node(2).await;
    c.forget_node(2).await;

    for i in 0..20 {
        let set = client
            .lookup_replicated(c.addr(i % 2), &test_key(i), 4)
            .await
            .unwrap();
        assert!(!set.contains_host(c.addr(2)), "key {i} placed on forgotten node");
        let hosts: HashSet<&str> = set.iter().map(|loc| loc.host()).collect();
        assert_eq!(hosts.len(), 4);
    }

    let err = c
        .local_coordinator(4)
        .lookup_replicated(&test_key(0), 5)
        .await
        .unwrap_err();
    assert_eq!(err.partial().map(|p| p.len()), Some(4));

    client.shutdown().await;
    c.shutdown().await;
}

/// A caller that walks the member list in order gets its answer from the
/// first live node.
#[tokio::test]
async fn test_failover_to_next_node() {
    let mut c = TestCluster::new(3).await;
    let client = test_client();
    let key = test_key(9);
    let expected = c.local_coordinator(2).lookup_replicated(&key, 3).await.unwrap();

    c.kill_node(0).await;

    let mut answer = None;
    let mut failures = 0;
    for addr in c.addrs() {
        match client.lookup_replicated(addr, &key, 3).await {
            Ok(set) => {
                answer = Some(set);
                break;
            }
            Err(_) => failures += 1,
        }
    }

    assert_eq!(failures, 1);
    assert_eq!(answer, Some(expected));

    client.shutdown().await;
    c.shutdown().await;
}
