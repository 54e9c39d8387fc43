use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use network_scheduler::{
    config::Config,
    constants::{DEFAULT_PROBER_PORT, DEFAULT_PROBE_MODULE, DEFAULT_PROBE_TIMEOUT_MS},
    definition::Definition,
    memory_cluster::InMemoryCluster,
    prober_client::ProberClient,
    simple_scheduler::SimpleScheduler,
    strategy::latency_score,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Schedule the pending pods of a cluster snapshot.
    Run {
        /// Path to the scheduler config file.
        #[arg(short)]
        config: String,
        /// Path to the file containing the cluster snapshot.
        #[arg(short)]
        file: String,
        /// Keep watching for pod events until interrupted.
        #[arg(long)]
        watch: bool,
    },
    /// Send a single probe to a prober agent.
    Probe {
        /// Address of the prober.
        #[arg(long)]
        address: String,
        #[arg(long, default_value_t = DEFAULT_PROBER_PORT)]
        port: u16,
        #[arg(long, default_value = DEFAULT_PROBE_MODULE)]
        module: String,
        /// Target the prober should measure.
        #[arg(long)]
        target: String,
        #[arg(long, default_value_t = DEFAULT_PROBE_TIMEOUT_MS)]
        timeout_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            file,
            watch,
        } => {
            let config = Config::from_file(config).await?;
            let (nodes, pods) = Definition::from_file(&file).await?.into_snapshot();

            info!(nodes = nodes.len(), pods = pods.len(), "loaded cluster snapshot");

            let cluster = Arc::new(InMemoryCluster::with_snapshot(nodes, pods));
            let scheduler = Arc::new(SimpleScheduler::from_config(
                &config,
                cluster.clone(),
                cluster.clone(),
            ));

            if watch {
                let events = cluster.subscribe();
                tokio::spawn(scheduler.watch_cluster_state_changes(events));
                tokio::signal::ctrl_c().await?;
            } else {
                let pending = cluster.pending_pods(&config.scheduler_name);
                for (pod, result) in scheduler.schedule_all(pending).await {
                    if let Err(error) = result {
                        error!(pod = %pod.key(), %error, "unable to schedule pod");
                    }
                }
            }

            for binding in cluster.bindings() {
                println!(
                    "{}/{} -> {}",
                    binding.namespace, binding.pod_name, binding.node_name
                );
            }
        }
        Commands::Probe {
            address,
            port,
            module,
            target,
            timeout_ms,
        } => {
            let client = ProberClient::new(port, Duration::from_millis(timeout_ms));
            let duration = client.probe(&address, &module, &target).await?;

            println!(
                "probe_duration_seconds {} score {}",
                duration.as_secs_f64(),
                latency_score(duration)
            );
        }
    }

    Ok(())
}
