// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::SimulatorConfig;

/// Ordered list of config file locations searched from lowest to highest
/// priority. Later files override earlier ones.
fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".config/gossip-sim/config.yaml"));
        paths.push(home.join(".config/gossip-sim/config.yml"));
    }
    if let Some(cfg) = dirs::config_dir() {
        paths.push(cfg.join("gossip-sim/config.yaml"));
        paths.push(cfg.join("gossip-sim/config.yml"));
    }

    paths.push(PathBuf::from(".gossip-sim.yaml"));
    paths.push(PathBuf::from(".gossip-sim.yml"));
    paths.push(PathBuf::from("gossip-sim.yaml"));
    paths.push(PathBuf::from("gossip-sim.yml"));

    paths
}

/// Load configuration by merging all discovered YAML files.
///
/// `extra` may supply an explicit path (e.g. the CLI's `--config` flag). An
/// explicit path that fails to read or parse is an error; a discovered
/// search-path file that's missing is silently skipped.
pub fn load(extra: Option<&Path>) -> anyhow::Result<SimulatorConfig> {
    let mut merged = serde_yaml::Value::Mapping(serde_yaml::Mapping::new());

    for path in config_search_paths() {
        if path.is_file() {
            debug!(path = %path.display(), "loading config layer");
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let layer: serde_yaml::Value = serde_yaml::from_str(&text)
                .with_context(|| format!("parsing {}", path.display()))?;
            merge_yaml(&mut merged, layer);
        }
    }

    if let Some(p) = extra {
        debug!(path = %p.display(), "loading explicit config");
        let text =
            std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?;
        let layer: serde_yaml::Value =
            serde_yaml::from_str(&text).with_context(|| format!("parsing {}", p.display()))?;
        merge_yaml(&mut merged, layer);
    }

    let config: SimulatorConfig = if matches!(merged, serde_yaml::Value::Mapping(ref m) if m.is_empty())
    {
        SimulatorConfig::default()
    } else {
        serde_yaml::from_value(merged).with_context(|| "deserializing merged config")?
    };

    config
        .default_node
        .validate()
        .map_err(|e| anyhow::anyhow!("default_node: {e}"))?;

    Ok(config)
}

/// Deep-merge `src` into `dst`; `src` wins on scalar conflicts.
fn merge_yaml(dst: &mut serde_yaml::Value, src: serde_yaml::Value) {
    match (dst, src) {
        (serde_yaml::Value::Mapping(d), serde_yaml::Value::Mapping(s)) => {
            for (k, v) in s {
                let entry = d
                    .entry(k)
                    .or_insert(serde_yaml::Value::Mapping(serde_yaml::Mapping::new()));
                merge_yaml(entry, v);
            }
        }
        (dst, src) => *dst = src,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_with_no_files_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let cfg = load(None);
        std::env::set_current_dir(cwd).unwrap();
        assert!(cfg.unwrap().default_node.max_round > 0);
    }

    #[test]
    fn load_explicit_file_overrides_defaults() {
        use std::io::Write;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "default_node:\n  max: 10.0\n  min: 0.0\n  delay_ms: 1\n  decay: 0.5\n  max_round: 5").unwrap();
        let cfg = load(Some(f.path())).unwrap();
        assert_eq!(cfg.default_node.max, 10.0);
        assert_eq!(cfg.default_node.max_round, 5);
    }

    #[test]
    fn load_rejects_invalid_default_node() {
        use std::io::Write;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "default_node:\n  max: 10.0\n  min: 0.0\n  delay_ms: 1\n  decay: 1.5\n  max_round: 5").unwrap();
        assert!(load(Some(f.path())).is_err());
    }
}
