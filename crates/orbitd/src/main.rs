//! `orbitd`: the Orbit lookup daemon.
//!
//! Serves replicated lookups for a statically configured ring and offers
//! client commands against a running node.
//!
//! # Usage
//!
//! ```text
//! orbitd start                                   # serve with defaults
//! orbitd start -c orbit.toml                     # serve with a config file
//! orbitd start -l 127.0.0.1:4901 -m 127.0.0.1:4900
//! orbitd lookup --host 127.0.0.1:4900 -n 3 my-key
//! orbitd scour --host 127.0.0.1:4900 -n 3 my-key
//! orbitd peers list
//! ```

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use orbit_cluster::{Coordinator, InMemPeerStore, JsonPeerStore, LocalRing, PeerStore};
use orbit_net::{LookupServer, NetClient, RemoteRing};
use orbit_types::Identifier;
use tracing::{info, warn};

use config::CliConfig;

// -----------------------------------------------------------------------
// CLI definition
// -----------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "orbitd", version, about = "Orbit replicated lookup daemon")]
struct Cli {
    /// Path to TOML config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start serving lookups.
    Start {
        /// Override the listen address (e.g. "127.0.0.1:4901").
        #[arg(short, long)]
        listen_addr: Option<String>,

        /// Address other nodes use to reach this one.
        #[arg(long, env = "ORBIT_HOSTNAME")]
        hostname: Option<String>,

        /// Other ring member(s). Can be specified multiple times.
        #[arg(short, long)]
        member: Vec<String>,
    },

    /// Resolve a key against a running node.
    Lookup {
        /// Node to ask.
        #[arg(long)]
        host: String,

        /// Number of replicas (or successors with `--successors`).
        #[arg(short = 'n', long, default_value = "3")]
        replicas: usize,

        /// Treat the key as a hex ring identifier instead of raw bytes.
        #[arg(long)]
        hash: bool,

        /// Return plain successors instead of replica locations.
        #[arg(long)]
        successors: bool,

        /// The key to resolve.
        key: String,
    },

    /// Visit the replicas of a key and their successors.
    Scour {
        /// Node whose ring is traversed.
        #[arg(long)]
        host: String,

        /// Number of replicas.
        #[arg(short = 'n', long, default_value = "3")]
        replicas: usize,

        /// The key to scour.
        key: String,
    },

    /// Manage the peer store.
    Peers {
        #[command(subcommand)]
        action: PeerCommands,
    },
}

#[derive(Subcommand)]
enum PeerCommands {
    /// List known peers.
    List,
    /// Remember a peer.
    Add {
        /// Peer address (`host:port`).
        address: String,
    },
    /// Forget a peer.
    Remove {
        /// Peer address (`host:port`).
        address: String,
    },
}

// -----------------------------------------------------------------------
// Entrypoint
// -----------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = CliConfig::load(cli.config.as_deref()).context("failed to load config")?;

    setup_tracing(&config.log.level);

    match cli.command {
        Commands::Start {
            listen_addr,
            hostname,
            member,
        } => {
            // CLI args override config file values.
            if let Some(addr) = listen_addr {
                config.node.listen_addr = addr;
            }
            if hostname.is_some() {
                config.node.hostname = hostname;
            }
            if !member.is_empty() {
                config.ring.members = member;
            }
            cmd_start(config).await
        }
        Commands::Lookup {
            host,
            replicas,
            hash,
            successors,
            key,
        } => cmd_lookup(&config, &host, replicas, hash, successors, &key).await,
        Commands::Scour {
            host,
            replicas,
            key,
        } => cmd_scour(&config, &host, replicas, &key).await,
        Commands::Peers { action } => cmd_peers(&config, action),
    }
}

/// Initialize the `tracing` subscriber with the given level filter.
///
/// Respects `RUST_LOG` env var if set, otherwise uses the config value.
fn setup_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Open the configured peer store, or an in-memory one.
fn open_peer_store(config: &CliConfig) -> Result<Box<dyn PeerStore>> {
    match &config.peers.file {
        Some(path) => {
            let store = JsonPeerStore::open(path)
                .with_context(|| format!("failed to open peer store {}", path.display()))?;
            Ok(Box::new(store))
        }
        None => Ok(Box::new(InMemPeerStore::new())),
    }
}

// -----------------------------------------------------------------------
// orbitd start
// -----------------------------------------------------------------------

async fn cmd_start(config: CliConfig) -> Result<()> {
    let ring_config = config.ring_config();
    info!(
        listen_addr = %config.node.listen_addr,
        hostname = %ring_config.hostname,
        hash = %ring_config.hash_func,
        num_successors = ring_config.num_successors,
        vnodes_per_host = ring_config.vnodes_per_host,
        "starting orbitd"
    );

    let peers = open_peer_store(&config)?;
    for member in &config.ring.members {
        peers
            .add_peer(member)
            .with_context(|| format!("failed to record peer {member}"))?;
    }

    // Static membership: this node, configured members and remembered peers.
    let mut members = vec![ring_config.hostname.clone()];
    for peer in peers.peers() {
        if !members.contains(&peer) {
            members.push(peer);
        }
    }
    let ring = LocalRing::with_hosts(ring_config, &members[..]);
    info!(members = members.len(), "ring ready");

    let server = LookupServer::bind(config.node.listen_addr.as_str(), Coordinator::new(ring))
        .await
        .context("failed to start lookup server")?;
    info!(addr = %server.local_addr(), "lookup server ready");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("shutting down lookup server");
    server.shutdown().await;
    Ok(())
}

// -----------------------------------------------------------------------
// orbitd lookup / scour
// -----------------------------------------------------------------------

async fn cmd_lookup(
    config: &CliConfig,
    host: &str,
    n: usize,
    as_hash: bool,
    successors: bool,
    key: &str,
) -> Result<()> {
    if n == 0 {
        bail!("replica count must be at least 1");
    }
    let client = NetClient::new(config.client_config()?);

    let result = if successors {
        let nodes = if as_hash {
            let hash: Identifier = key.parse().context("invalid hex identifier")?;
            client.lookup_hash(host, n, &hash).await
        } else {
            client.lookup(host, n, key.as_bytes()).await
        };
        nodes.map(|nodes| {
            for (i, node) in nodes.iter().enumerate() {
                println!("{i}  {}  {}", node.host, node.id);
            }
        })
    } else {
        let locations = if as_hash {
            let hash: Identifier = key.parse().context("invalid hex identifier")?;
            client.lookup_replicated_hash(host, &hash, n).await
        } else {
            client.lookup_replicated(host, key.as_bytes(), n).await
        };
        locations.map(|set| {
            for loc in &set {
                println!(
                    "{}  {}  vertex={} index={}",
                    loc.priority,
                    loc.host(),
                    loc.id,
                    loc.index
                );
            }
        })
    };

    client.shutdown().await;
    result.with_context(|| format!("lookup against {host} failed"))
}

async fn cmd_scour(config: &CliConfig, host: &str, n: usize, key: &str) -> Result<()> {
    let client = Arc::new(NetClient::new(config.client_config()?));
    let ring = RemoteRing::new(
        client.clone(),
        host,
        config.ring.num_successors,
        config.ring.hash,
    );
    let coordinator = Coordinator::new(Arc::new(ring));

    let result = coordinator
        .scour_replicated_key(key.as_bytes(), n, |node| {
            println!("{}  {}", node.host, node.id);
            Ok::<(), std::convert::Infallible>(())
        })
        .await;
    client.shutdown().await;

    match result {
        Ok(visited) => {
            println!("visited {visited} hosts");
            Ok(())
        }
        Err(e) => {
            warn!(visited = e.visited(), "scour incomplete");
            Err(e).with_context(|| format!("scour against {host} failed"))
        }
    }
}

// -----------------------------------------------------------------------
// orbitd peers
// -----------------------------------------------------------------------

fn cmd_peers(config: &CliConfig, action: PeerCommands) -> Result<()> {
    if config.peers.file.is_none() {
        bail!("no peer store configured; set [peers] file in the config");
    }
    let store = open_peer_store(config)?;

    match action {
        PeerCommands::List => {
            let peers = store.peers();
            println!("Known peers: {}", peers.len());
            for peer in peers {
                println!("  {peer}");
            }
        }
        PeerCommands::Add { address } => {
            if store.add_peer(&address)? {
                println!("added {address}");
            } else {
                println!("refreshed {address}");
            }
        }
        PeerCommands::Remove { address } => {
            store.remove_peer(&address)?;
            println!("removed {address}");
        }
    }
    Ok(())
}
