// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};

#[derive(Parser, Debug)]
#[command(
    name = "gossip-sim",
    about = "Gossip-based average-consensus simulator",
    version,
    long_about = None,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a config file (overrides the usual search paths).
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a single simulation end to end: build a population, open the
    /// gate, let gossip run for a fixed window, then report where the
    /// population converged.
    Run {
        /// Number of agents to simulate.
        #[arg(long, default_value_t = 10)]
        agents: usize,
        /// How long to let the simulation run before reporting, in
        /// milliseconds.
        #[arg(long, default_value_t = 2000)]
        duration_ms: u64,
        /// Lower bound of the initial value draw.
        #[arg(long)]
        min: Option<f64>,
        /// Upper bound of the initial value draw.
        #[arg(long)]
        max: Option<f64>,
        /// Delay between emission rounds, in milliseconds.
        #[arg(long)]
        delay_ms: Option<u64>,
        /// Multiplier applied to `hp` on a rejected exchange.
        #[arg(long)]
        decay: Option<f64>,
        /// Cap on records an activation may accumulate before expiring.
        #[arg(long)]
        max_round: Option<u32>,
        /// Append the run's outcome to the experiment log and print it as
        /// CSV once finished.
        #[arg(long)]
        save: bool,
        /// Print agent-level state/value alongside the summary.
        #[arg(long)]
        list_agents: bool,
    },

    /// Print the effective configuration (after merging config files and
    /// defaults) and exit.
    ShowConfig,

    /// Generate a shell completion script and print it to stdout.
    Completions {
        shell: Shell,
    },
}

pub fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
