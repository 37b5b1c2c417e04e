//! slurmd-agent binary.
//!
//! Delivers lifecycle and relation events to the agent, one invocation per
//! event, the way a machine agent drives hooks. Durable state lives under
//! the data directory, so consecutive invocations continue where the
//! previous one stopped.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use slurmd_agent::{Agent, AgentConfig, AgentState, FileNodeOps, NodeOperations, TracingStatus};
use slurmd_exchange::FileExchange;
use slurmd_protocol::{NodeReadiness, Trigger};
use slurmd_types::{RelationId, UnitName};

/// Compute-node agent for the Slurm workload manager.
#[derive(Parser)]
#[command(name = "slurmd-agent")]
#[command(about = "Compute-node agent for the Slurm workload manager", long_about = None)]
struct Cli {
    /// Unit identity of this agent (e.g. slurmd/0).
    #[arg(short, long, default_value = "slurmd/0")]
    unit: String,

    /// Data directory for durable agent state.
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// Controller application name.
    #[arg(long, default_value = "slurmctld")]
    controller: String,

    /// Partition this node serves.
    #[arg(long, default_value = "slurmd")]
    partition: String,

    /// Advertise the partition as the cluster default.
    #[arg(long)]
    default_partition: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deliver one event to the agent.
    Dispatch {
        /// Event name (install, start, relation-created, relation-joined,
        /// relation-changed, relation-departed, relation-broken).
        event: String,

        /// Relation id, required for relation events.
        #[arg(short, long)]
        relation: Option<u64>,

        /// Remote unit, required for relation-joined and relation-departed.
        #[arg(long)]
        remote_unit: Option<String>,
    },

    /// Show the agent's durable state.
    Status,

    /// Write a value into the controller's databag (development helper).
    Seed {
        /// Relation id.
        #[arg(short, long)]
        relation: u64,

        /// Databag key.
        key: String,

        /// Databag value.
        value: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = AgentConfig::new(cli.unit.as_str(), &cli.data_dir)
        .with_controller(cli.controller.as_str())
        .with_partition(cli.partition.as_str());
    if cli.default_partition {
        config = config.with_default_partition();
    }

    match cli.command {
        Commands::Dispatch {
            event,
            relation,
            remote_unit,
        } => {
            let trigger = parse_event(&event, relation, remote_unit)?;
            let exchange = FileExchange::new(config.exchange_dir());
            let ops = FileNodeOps::new(&config.data_dir);
            let mut agent = Agent::open(config, exchange, ops, TracingStatus::new())
                .context("Failed to open agent state")?;

            agent
                .dispatch(trigger)
                .with_context(|| format!("Failed to dispatch {event}"))?;
        }

        Commands::Status => {
            let state =
                AgentState::load(&config.state_path()).context("Failed to load agent state")?;
            let ops = FileNodeOps::new(&config.data_dir);
            let readiness =
                NodeReadiness::derive(ops.installed(), state.protocol.config_available());

            println!("readiness: {readiness}");
            match &state.last_status {
                Some(status) => println!("status: {status}"),
                None => println!("status: (none reported)"),
            }
            println!("relations: {}", state.protocol.relation_count());
            println!("deferred: {}", state.deferred.len());
        }

        Commands::Seed {
            relation,
            key,
            value,
        } => {
            let exchange = FileExchange::new(config.exchange_dir());
            exchange
                .seed_remote_app(RelationId::new(relation), &config.controller, &key, &value)
                .context("Failed to seed databag")?;
            println!("seeded {key} on relation {relation}");
        }
    }

    Ok(())
}

/// Maps a hook-style event name onto a trigger.
fn parse_event(event: &str, relation: Option<u64>, remote_unit: Option<String>) -> Result<Trigger> {
    let relation_id = || -> Result<RelationId> {
        relation
            .map(RelationId::new)
            .context("--relation is required for relation events")
    };
    let unit = || -> Result<UnitName> {
        remote_unit
            .clone()
            .map(UnitName::new)
            .context("--remote-unit is required for this event")
    };

    Ok(match event {
        "install" => Trigger::Install,
        "start" => Trigger::Start,
        "relation-created" => Trigger::RelationCreated {
            relation: relation_id()?,
        },
        "relation-joined" => Trigger::RelationJoined {
            relation: relation_id()?,
            unit: unit()?,
        },
        "relation-changed" => Trigger::RelationChanged {
            relation: relation_id()?,
        },
        "relation-departed" => Trigger::RelationDeparted {
            relation: relation_id()?,
            unit: unit()?,
        },
        "relation-broken" => Trigger::RelationBroken {
            relation: relation_id()?,
        },
        other => bail!("unknown event: {other}"),
    })
}
