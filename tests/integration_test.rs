// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
/// Integration tests for the gossip-sim facade, driving it the same way
/// the CLI binary does.
use gossip_config::NodeConfig;
use gossip_core::Simulation;

fn config() -> gossip_config::SimulatorConfig {
    gossip_config::SimulatorConfig {
        default_node: NodeConfig { min: 0.0, max: 10.0, delay_ms: 2, decay: 0.9, max_round: 100 },
        medium_capacity: 50,
        event_bus_capacity: 50,
        subscriber_write_deadline_ms: 200,
        broadcaster_interval_ms: 1,
    }
}

#[tokio::test]
async fn run_then_save_then_export_round_trips_to_csv() {
    let sim = Simulation::new(config());
    sim.add_agents(5, None).unwrap();
    sim.start().await;
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let name = sim.save(5.0);
    let csv = sim.export_csv();
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines[0], "name,max_value,min_value,node_count,decay,mse,mean_lost,mean_round");
    assert!(lines[1].starts_with(&name));
}

#[tokio::test]
async fn clear_then_reuse_simulation_for_a_fresh_population() {
    let sim = Simulation::new(config());
    sim.add_agents(3, None).unwrap();
    sim.start().await;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    sim.clear();
    assert_eq!(sim.agent_count(), 0);

    sim.add_agents(2, None).unwrap();
    assert_eq!(sim.agent_count(), 2);
}

#[test]
fn default_config_round_trips_through_loader() {
    let dir = tempfile::tempdir().unwrap();
    let cwd = std::env::current_dir().unwrap();
    std::env::set_current_dir(dir.path()).unwrap();
    let config = gossip_config::load(None);
    std::env::set_current_dir(cwd).unwrap();

    let config = config.unwrap();
    let sim = Simulation::new(config);
    assert_eq!(sim.agent_count(), 0);
}
