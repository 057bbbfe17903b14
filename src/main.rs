// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod cli;

use clap::Parser;
use gossip_config::NodeConfig;
use gossip_core::Simulation;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use cli::{print_completions, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = gossip_config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Completions { shell } => {
            print_completions(shell);
        }
        Commands::Run {
            agents,
            duration_ms,
            min,
            max,
            delay_ms,
            decay,
            max_round,
            save,
            list_agents,
        } => {
            let node_config = NodeConfig {
                min: min.unwrap_or(config.default_node.min),
                max: max.unwrap_or(config.default_node.max),
                delay_ms: delay_ms.unwrap_or(config.default_node.delay_ms),
                decay: decay.unwrap_or(config.default_node.decay),
                max_round: max_round.unwrap_or(config.default_node.max_round),
            };

            let sim = Simulation::new(config);
            sim.add_agents(agents, Some(node_config))?;

            tracing::info!(agents, duration_ms, "starting simulation");
            sim.start().await;
            tokio::time::sleep(std::time::Duration::from_millis(duration_ms)).await;

            let stats = sim.statistics();
            println!("{}", serde_json::to_string_pretty(&stats)?);

            if list_agents {
                for summary in sim.list_agents() {
                    println!("{}", serde_json::to_string(&summary)?);
                }
            }

            if save {
                let correct = (node_config.min + node_config.max) / 2.0;
                let name = sim.save(correct);
                tracing::info!(name = %name, "saved experiment record");
                println!("{}", sim.export_csv());
            }

            sim.clear();
        }
    }

    Ok(())
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}
