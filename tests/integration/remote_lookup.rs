//! Integration test: replicated lookups over the network.
//!
//! Every node holds the same static membership, so every node must answer
//! every lookup identically, and a coordinator driving a remote ring must
//! agree with one driving a local ring.

use std::collections::HashSet;

use orbit_integration_tests::{TestCluster, test_client, test_key};
use orbit_net::NetError;

/// 5 nodes, 20 keys, replica counts 1..=3: all nodes agree with the
/// in-process answer.
#[tokio::test]
async fn test_every_node_answers_identically() {
    let c = TestCluster::new(5).await;
    let client = test_client();
    let local = c.local_coordinator(0);

    for i in 0..20 {
        let key = test_key(i);
        for n in 1..=3 {
            let expected = local.lookup_replicated(&key, n).await.unwrap();
            assert_eq!(expected.len(), n);

            for addr in c.addrs() {
                let got = client.lookup_replicated(addr, &key, n).await.unwrap();
                assert_eq!(got, expected, "node {addr} disagrees on key {i} n={n}");
            }
        }
    }

    client.shutdown().await;
    c.shutdown().await;
}

/// Replicas land on distinct hosts and come back in rank order.
#[tokio::test]
async fn test_replicas_on_distinct_hosts() {
    let c = TestCluster::new(5).await;
    let client = test_client();

    for i in 0..30 {
        let set = client
            .lookup_replicated(c.addr(i % 5), &test_key(i), 5)
            .await
            .unwrap();

        let hosts: HashSet<&str> = set.iter().map(|loc| loc.host()).collect();
        assert_eq!(hosts.len(), 5, "key {i} placed two replicas on one host");

        let priorities: Vec<u32> = set.iter().map(|loc| loc.priority).collect();
        assert_eq!(priorities, vec![0, 1, 2, 3, 4]);
    }

    client.shutdown().await;
    c.shutdown().await;
}

/// A coordinator over a remote ring resolves the same locations as one over
/// the local ring, with both the concurrent and the serial strategy.
#[tokio::test]
async fn test_remote_coordinator_matches_local() {
    let c = TestCluster::new(4).await;
    let client = test_client();
    let local = c.local_coordinator(3);
    let remote = c.remote_coordinator(&client, 1);

    for i in 0..15 {
        let key = test_key(i);
        let hash = remote.hash_func().digest(&key);

        let expected = local.lookup_replicated_hash(&hash, 3).await.unwrap();
        let concurrent = remote.lookup_replicated_hash(&hash, 3).await.unwrap();
        let serial = remote.lookup_replicated_hash_serial(&hash, 3).await.unwrap();

        assert_eq!(concurrent, expected);
        assert_eq!(serial, expected);
    }

    // One pooled connection carried every vertex lookup.
    assert_eq!(client.pooled_hosts().await, vec![c.addr(1).to_string()]);

    client.shutdown().await;
    c.shutdown().await;
}

/// Plain successor lookups, by key and by hash, match the local ring.
#[tokio::test]
async fn test_successor_lookup_over_network() {
    let c = TestCluster::new(3).await;
    let client = test_client();
    let local = c.local_coordinator(0);

    for i in 0..10 {
        let key = test_key(i);
        let hash = local.hash_func().digest(&key);

        let expected = local.lookup(4, &key).await.unwrap();
        assert_eq!(expected.len(), 4);
        assert_eq!(client.lookup(c.addr(2), 4, &key).await.unwrap(), expected);
        assert_eq!(
            client.lookup_hash(c.addr(1), 4, &hash).await.unwrap(),
            expected
        );
    }

    client.shutdown().await;
    c.shutdown().await;
}

/// Asking for more replicas than hosts fails locally with the placed prefix
/// and remotely as a server-reported failure.
#[tokio::test]
async fn test_more_replicas_than_hosts() {
    let c = TestCluster::new(3).await;
    let client = test_client();
    let key = test_key(7);

    let err = c
        .local_coordinator(0)
        .lookup_replicated(&key, 4)
        .await
        .unwrap_err();
    assert!(err.is_lookup_failure());
    assert_eq!(err.partial().map(|p| p.len()), Some(3));

    let err = client.lookup_replicated(c.addr(0), &key, 4).await.unwrap_err();
    assert!(matches!(err, NetError::Remote(_)), "got {err:?}");

    // A failure reply does not cost the connection.
    assert_eq!(client.pool_len().await, 1);
    assert_eq!(
        client.lookup_replicated(c.addr(0), &key, 3).await.unwrap().len(),
        3
    );

    client.shutdown().await;
    c.shutdown().await;
}

/// A zero replica count is rejected by the serving node.
#[tokio::test]
async fn test_zero_replicas_rejected() {
    let c = TestCluster::new(2).await;
    let client = test_client();

    let err = client
        .lookup_replicated(c.addr(1), b"anything", 0)
        .await
        .unwrap_err();
    assert!(matches!(err, NetError::Remote(_)), "got {err:?}");

    client.shutdown().await;
    c.shutdown().await;
}
