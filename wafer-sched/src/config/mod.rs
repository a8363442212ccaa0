//! Problem instance loading from YAML.
//!
//! The expected YAML structure is:
//! ```yaml
//! wafers:
//!   - { name: W1, priority: red, recipe: A }
//!   - { name: W2, priority: yellow, recipe: B }
//! machines:
//!   - name: M1
//!     processing_minutes: { A: 30, B: 45 }
//!   - name: M2
//!     processing_minutes: { A: 20 }
//! solver:              # optional
//!   mip_gap: 0.1
//!   time_limit_secs: 3600
//!   cycle_time_weight: 1.0
//! ```
//!
//! Machine order in the file is the machine-list order the strategies use
//! for tie-breaking.  Name uniqueness is checked by the strategies, not here.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::scheduler::ExactSettings;
use crate::wafer::{Machine, Wafer};

// ── Solver section ────────────────────────────────────────────────────────────

/// Optional `solver:` section.  Every field falls back to
/// [`ExactSettings::default`].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub mip_gap: f64,
    pub time_limit_secs: u64,
    pub cycle_time_weight: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        let d = ExactSettings::default();
        Self {
            mip_gap: d.mip_gap,
            time_limit_secs: d.time_limit.as_secs(),
            cycle_time_weight: d.cycle_time_weight,
        }
    }
}

impl SolverConfig {
    /// Convert to the settings the exact strategy takes.  Range checks happen
    /// there.
    pub fn exact_settings(&self) -> ExactSettings {
        ExactSettings {
            mip_gap: self.mip_gap,
            time_limit: Duration::from_secs(self.time_limit_secs),
            cycle_time_weight: self.cycle_time_weight,
        }
    }
}

// ── InstanceConfig ────────────────────────────────────────────────────────────

/// One scheduling problem as read from disk.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InstanceConfig {
    #[serde(default)]
    pub wafers: Vec<Wafer>,
    #[serde(default)]
    pub machines: Vec<Machine>,
    #[serde(default)]
    pub solver: SolverConfig,
}

impl InstanceConfig {
    /// Parses `path` into an instance.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or if the YAML is
    /// structurally invalid (including unknown priority names).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading instance from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open instance file: {}", path.display()))?;

        let config = Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;

        if config.wafers.is_empty() {
            warn!("No wafers in {}", path.display());
        }
        if config.machines.is_empty() {
            warn!("No machines in {}", path.display());
        }
        info!(
            wafers = config.wafers.len(),
            machines = config.machines.len(),
            "Instance loaded"
        );
        Ok(config)
    }

    /// Parses an in-memory YAML document.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: InstanceConfig = serde_yaml::from_str(content)?;
        for m in &config.machines {
            debug!(
                machine = %m.name,
                recipes = ?m.processing_minutes,
                "  machine"
            );
        }
        Ok(config)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wafer::Priority;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper: write a YAML string to a temp file and return it.
    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    const SAMPLE: &str = r#"
wafers:
  - { name: W1, priority: red, recipe: A }
  - { name: W2, priority: yellow, recipe: B }
machines:
  - name: M2
    processing_minutes: { A: 20 }
  - name: M1
    processing_minutes:
      A: 30
      B: 45
solver:
  mip_gap: 0.05
  time_limit_secs: 60
  cycle_time_weight: 0.5
"#;

    #[test]
    fn load_sample_yaml() {
        let f = yaml_tempfile(SAMPLE);
        let cfg = InstanceConfig::load_from_file(f.path()).unwrap();

        assert_eq!(cfg.wafers.len(), 2);
        assert_eq!(cfg.wafers[0], Wafer::new("W1", Priority::Red, "A"));
        assert_eq!(cfg.wafers[1].priority, Priority::Yellow);

        // file order is kept
        let names: Vec<&str> = cfg.machines.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["M2", "M1"]);
        assert_eq!(cfg.machines[1].duration("B"), Some(45));
        assert_eq!(cfg.machines[0].duration("B"), None);

        let s = cfg.solver.exact_settings();
        assert_eq!(s.mip_gap, 0.05);
        assert_eq!(s.time_limit, Duration::from_secs(60));
        assert_eq!(s.cycle_time_weight, 0.5);
    }

    #[test]
    fn missing_solver_section_uses_defaults() {
        let cfg = InstanceConfig::from_yaml_str(
            "wafers: []\nmachines:\n  - { name: M1, processing_minutes: { A: 5 } }\n",
        )
        .unwrap();
        assert_eq!(cfg.solver.exact_settings(), ExactSettings::default());
    }

    #[test]
    fn partial_solver_section_fills_the_rest() {
        let cfg = InstanceConfig::from_yaml_str("solver:\n  cycle_time_weight: 0.25\n").unwrap();
        assert_eq!(cfg.solver.cycle_time_weight, 0.25);
        assert_eq!(cfg.solver.mip_gap, 0.1);
        assert_eq!(cfg.solver.time_limit_secs, 3600);
        assert!(cfg.wafers.is_empty());
    }

    #[test]
    fn unknown_priority_is_rejected() {
        let err = InstanceConfig::from_yaml_str(
            "wafers:\n  - { name: W1, priority: purple, recipe: A }\n",
        );
        assert!(err.is_err());
    }

    #[test]
    fn missing_file_returns_error() {
        let err = InstanceConfig::load_from_file(Path::new("/nonexistent/instance.yaml"));
        let msg = format!("{:#}", err.unwrap_err());
        assert!(msg.contains("Cannot open instance file"), "{msg}");
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("wafers: [this is: not: valid");
        let err = InstanceConfig::load_from_file(f.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse YAML file"));
    }
}
