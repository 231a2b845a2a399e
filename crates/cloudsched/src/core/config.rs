//! Scenario configuration.

use serde::{Deserialize, Serialize};

use crate::core::error::SimulationError;

fn default_count() -> u32 {
    1
}

/// Physical host(s) configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Host name. When `count > 1` it is used as a prefix.
    pub name: Option<String>,
    /// Number of PEs per host.
    pub pes: u32,
    /// Capacity of one PE in MIPS.
    pub pe_mips: f64,
    pub memory: u64,
    pub bandwidth: u64,
    pub storage: u64,
    /// Number of such hosts.
    #[serde(default = "default_count")]
    pub count: u32,
}

/// VM request(s) configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VmConfig {
    /// Requested MIPS per core.
    pub mips: f64,
    pub cores: u32,
    pub memory: u64,
    pub bandwidth: u64,
    pub storage: u64,
    /// Number of such VMs.
    #[serde(default = "default_count")]
    pub count: u32,
}

/// Cloudlet batch configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CloudletConfig {
    /// Instruction length in MI.
    pub length: f64,
    pub cores: u32,
    #[serde(default)]
    pub input_size: u64,
    #[serde(default)]
    pub output_size: u64,
    /// Number of such cloudlets.
    #[serde(default = "default_count")]
    pub count: u32,
}

fn default_cpu_cost() -> f64 {
    3.0
}

fn default_memory_cost() -> f64 {
    0.05
}

fn default_storage_cost() -> f64 {
    0.1
}

fn default_bandwidth_cost() -> f64 {
    0.1
}

/// Flat linear pricing of datacenter resources.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostConfig {
    #[serde(default = "default_cpu_cost")]
    pub cpu_second: f64,
    #[serde(default = "default_memory_cost")]
    pub memory_mb: f64,
    #[serde(default = "default_storage_cost")]
    pub storage_mb: f64,
    #[serde(default = "default_bandwidth_cost")]
    pub bandwidth_mb: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            cpu_second: default_cpu_cost(),
            memory_mb: default_memory_cost(),
            storage_mb: default_storage_cost(),
            bandwidth_mb: default_bandwidth_cost(),
        }
    }
}

/// Scenario configuration: datacenter topology plus workload.
///
/// The scheduling policy is not part of the scenario, it is selected per run
/// so that the same scenario can be replayed under both policies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub hosts: Vec<HostConfig>,
    #[serde(default)]
    pub vms: Vec<VmConfig>,
    #[serde(default)]
    pub cloudlets: Vec<CloudletConfig>,
    #[serde(default)]
    pub costs: CostConfig,
}

impl SimulationConfig {
    /// Reads and validates configuration from a YAML file.
    pub fn from_file(file_name: &str) -> Result<Self, SimulationError> {
        let content = std::fs::read_to_string(file_name)
            .map_err(|e| SimulationError::InvalidConfig(format!("can't read file {}: {}", file_name, e)))?;
        Self::from_yaml(&content)
    }

    /// Parses and validates configuration from a YAML string.
    pub fn from_yaml(content: &str) -> Result<Self, SimulationError> {
        let config: SimulationConfig = serde_yaml::from_str(content)
            .map_err(|e| SimulationError::InvalidConfig(format!("can't parse YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects malformed resource values before any simulation state is built.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.hosts.is_empty() {
            return Err(SimulationError::InvalidConfig("at least one host is required".to_string()));
        }
        for host in &self.hosts {
            if host.pes == 0 {
                return Err(SimulationError::InvalidConfig("host must have at least one PE".to_string()));
            }
            if !host.pe_mips.is_finite() || host.pe_mips <= 0. {
                return Err(SimulationError::InvalidConfig(format!(
                    "host PE capacity must be positive, got {}",
                    host.pe_mips
                )));
            }
        }
        for vm in &self.vms {
            if vm.cores == 0 {
                return Err(SimulationError::InvalidConfig("vm must request at least one core".to_string()));
            }
            if !vm.mips.is_finite() || vm.mips <= 0. {
                return Err(SimulationError::InvalidConfig(format!(
                    "vm MIPS request must be positive, got {}",
                    vm.mips
                )));
            }
        }
        for cloudlet in &self.cloudlets {
            if cloudlet.cores == 0 {
                return Err(SimulationError::InvalidConfig(
                    "cloudlet must request at least one core".to_string(),
                ));
            }
            if !cloudlet.length.is_finite() || cloudlet.length < 0. {
                return Err(SimulationError::InvalidConfig(format!(
                    "cloudlet length must be non-negative, got {}",
                    cloudlet.length
                )));
            }
        }
        for cost in [
            self.costs.cpu_second,
            self.costs.memory_mb,
            self.costs.storage_mb,
            self.costs.bandwidth_mb,
        ] {
            if !cost.is_finite() || cost < 0. {
                return Err(SimulationError::InvalidConfig(format!(
                    "resource cost must be non-negative, got {}",
                    cost
                )));
            }
        }
        Ok(())
    }
}
