//! Integration test: ring traversals against a remote ring.

use orbit_cluster::ScourError;
use orbit_integration_tests::{TestCluster, test_client, test_key};
use orbit_types::Identifier;

fn sorted(mut hosts: Vec<String>) -> Vec<String> {
    hosts.sort();
    hosts
}

/// Scouring a key's replicas visits every host once, replica hosts first.
#[tokio::test]
async fn test_scour_replicated_key_over_network() {
    let c = TestCluster::new(5).await;
    let client = test_client();
    let remote = c.remote_coordinator(&client, 4);
    let key = test_key(11);

    let expected: Vec<String> = remote
        .lookup_replicated(&key, 3)
        .await
        .unwrap()
        .iter()
        .map(|loc| loc.host().to_string())
        .collect();

    let mut seen = Vec::new();
    let visited = remote
        .scour_replicated_key(&key, 3, |node| {
            seen.push(node.host.clone());
            Ok::<(), ()>(())
        })
        .await
        .unwrap();

    // Replica hosts first, then the rest of their successor lists.
    assert_eq!(visited, 5);
    assert_eq!(seen[..3], expected[..]);
    assert_eq!(sorted(seen), sorted(c.addrs().to_vec()));

    client.shutdown().await;
    c.shutdown().await;
}

/// A successor-list scour sees the same hosts, in the same order, whether
/// the ring is local or remote.
#[tokio::test]
async fn test_scour_replica_remote_matches_local() {
    let c = TestCluster::new(4).await;
    let client = test_client();
    let local = c.local_coordinator(0);
    let remote = c.remote_coordinator(&client, 2);

    for i in 0..5 {
        let id = local.hash_func().digest(&test_key(i));

        let mut from_local = Vec::new();
        let n_local = local
            .scour_replica(&id, |node| {
                from_local.push(node.host.clone());
                Ok::<(), ()>(())
            })
            .await
            .unwrap();

        let mut from_remote = Vec::new();
        let n_remote = remote
            .scour_replica(&id, |node| {
                from_remote.push(node.host.clone());
                Ok::<(), ()>(())
            })
            .await
            .unwrap();

        assert_eq!(n_local, 4, "successor lists span the whole ring");
        assert_eq!(n_remote, n_local);
        assert_eq!(from_remote, from_local);
    }

    client.shutdown().await;
    c.shutdown().await;
}

/// A sector covering the whole ring reaches every host.
#[tokio::test]
async fn test_scour_whole_ring_sector() {
    let c = TestCluster::new(4).await;
    let client = test_client();
    let remote = c.remote_coordinator(&client, 0);
    let width = remote.hash_func().width();

    let mut seen = Vec::new();
    let visited = remote
        .scour_sector(&Identifier::zero(width), &Identifier::max(width), |node| {
            seen.push(node.host.clone());
            Ok::<(), ()>(())
        })
        .await
        .unwrap();

    assert_eq!(visited, 4);
    assert_eq!(sorted(seen), sorted(c.addrs().to_vec()));

    client.shutdown().await;
    c.shutdown().await;
}

/// A callback error stops the traversal and comes back to the caller.
#[tokio::test]
async fn test_scour_abort_over_network() {
    let c = TestCluster::new(4).await;
    let client = test_client();
    let remote = c.remote_coordinator(&client, 1);

    let mut calls = 0;
    let err = remote
        .scour_replicated_key(&test_key(5), 4, |node| {
            calls += 1;
            if calls == 2 {
                return Err(format!("stop at {}", node.host));
            }
            Ok(())
        })
        .await
        .unwrap_err();

    assert_eq!(calls, 2);
    assert_eq!(err.visited(), 2);
    match err {
        ScourError::Aborted { error, .. } => assert!(error.starts_with("stop at ")),
        other => panic!("expected Aborted, got {other:?}"),
    }

    client.shutdown().await;
    c.shutdown().await;
}
