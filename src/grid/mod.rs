//! The grid: a wallet/chain session plus the capacity pool.
//!
//! Everything behind [`Grid`] is an external collaborator. The rest of the
//! crate only depends on this interface.

pub mod proxy;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::descriptor::DeploymentDescriptor;
use crate::error::GridCliError;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("no twin exists for this account")]
    TwinNotFound,

    #[error("{operation} is not supported by this grid backend")]
    Unsupported { operation: String },

    #[error("request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected response from {url}: {message}")]
    Response { url: String, message: String },
}

impl From<GridError> for GridCliError {
    fn from(e: GridError) -> Self {
        let message = match &e {
            GridError::Request { source, .. } => format!("{e}: {source}"),
            _ => e.to_string(),
        };
        GridCliError::ExternalSession { message }
    }
}

// ── capacity model ───────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum NodeStatus {
    Up,
    Standby,
    Down,
}

impl NodeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeStatus::Up => "up",
            NodeStatus::Standby => "standby",
            NodeStatus::Down => "down",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(NodeStatus::Up),
            "standby" => Ok(NodeStatus::Standby),
            "down" => Ok(NodeStatus::Down),
            other => Err(format!("unknown node status '{other}'")),
        }
    }
}

/// Resource counters as reported by the grid: CPU in cores, the rest in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Resources {
    pub cpu: u64,
    pub memory: u64,
    pub hdd: u64,
    pub ssd: u64,
}

impl Resources {
    /// Per-dimension `self - used`, clamped at zero.
    pub fn minus(&self, used: &Resources) -> Resources {
        Resources {
            cpu: self.cpu.saturating_sub(used.cpu),
            memory: self.memory.saturating_sub(used.memory),
            hdd: self.hdd.saturating_sub(used.hdd),
            ssd: self.ssd.saturating_sub(used.ssd),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapacityNode {
    pub node_id: u32,
    pub farm_id: u32,
    pub total: Resources,
    pub used: Resources,
    pub healthy: bool,
    pub rentable: bool,
    pub has_public_ipv4: bool,
    pub has_public_ipv6: bool,
    pub status: NodeStatus,
    pub country: String,
}

impl CapacityNode {
    pub fn available(&self) -> Resources {
        self.total.minus(&self.used)
    }
}

/// Server-side narrowing of a node query. `None` means "don't care".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeFilter {
    pub status: Option<NodeStatus>,
    pub healthy: Option<bool>,
    pub rentable: Option<bool>,
}

/// What the grid reports about a deployed machine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MachineRecord {
    pub name: String,
    pub node_id: u32,
    pub contract_id: u64,
    pub public_ip: Option<String>,
    pub mycelium_ip: Option<String>,
    pub planetary_ip: Option<String>,
}

// ── session interface ────────────────────────────────────

#[allow(async_fn_in_trait)] // trait is internal-only
pub trait Grid {
    async fn connect(&mut self) -> Result<(), GridError>;
    async fn disconnect(&mut self) -> Result<(), GridError>;

    async fn twin_id(&self) -> Result<u32, GridError>;
    async fn create_twin(&mut self, relay: &str) -> Result<u32, GridError>;
    /// Free balance, already formatted with its currency.
    async fn balance(&self) -> Result<String, GridError>;
    /// SSH key recorded in the account's chain metadata, if any.
    async fn ssh_key(&self) -> Result<Option<String>, GridError>;

    async fn nodes(&self, filter: &NodeFilter) -> Result<Vec<CapacityNode>, GridError>;

    async fn deploy(&mut self, deployment: &DeploymentDescriptor) -> Result<(), GridError>;
    async fn machines(&self, deployment: &str) -> Result<Vec<MachineRecord>, GridError>;
}

#[cfg(test)]
pub mod testing {
    //! In-memory grid for exercising the command flows.

    use super::*;

    pub const GIB: u64 = 1024 * 1024 * 1024;

    /// A healthy, rentable node with `cpu`/`memory_gib`/`hdd_gib` free.
    pub fn node(node_id: u32, cpu: u64, memory_gib: u64, hdd_gib: u64) -> CapacityNode {
        CapacityNode {
            node_id,
            farm_id: 1,
            total: Resources {
                cpu,
                memory: memory_gib * GIB,
                hdd: hdd_gib * GIB,
                ssd: 100 * GIB,
            },
            used: Resources::default(),
            healthy: true,
            rentable: true,
            has_public_ipv4: false,
            has_public_ipv6: false,
            status: NodeStatus::Up,
            country: "Belgium".into(),
        }
    }

    #[derive(Default)]
    pub struct FakeGrid {
        pub nodes: Vec<CapacityNode>,
        pub twin: Option<u32>,
        pub balance: Option<String>,
        pub ssh_key: Option<String>,
        pub fail_deploy: bool,
        pub fail_create_twin: bool,
        pub connected: bool,
        pub connects: usize,
        pub disconnects: usize,
        pub created_twin_relay: Option<String>,
        pub deployed: Vec<DeploymentDescriptor>,
        pub node_queries: std::cell::Cell<usize>,
    }

    impl Grid for FakeGrid {
        async fn connect(&mut self) -> Result<(), GridError> {
            self.connects += 1;
            if self.twin.is_none() {
                return Err(GridError::TwinNotFound);
            }
            self.connected = true;
            Ok(())
        }

        async fn disconnect(&mut self) -> Result<(), GridError> {
            self.disconnects += 1;
            self.connected = false;
            Ok(())
        }

        async fn twin_id(&self) -> Result<u32, GridError> {
            self.twin.ok_or(GridError::TwinNotFound)
        }

        async fn create_twin(&mut self, relay: &str) -> Result<u32, GridError> {
            self.created_twin_relay = Some(relay.to_string());
            if self.fail_create_twin {
                return Err(GridError::Response {
                    url: "fake://twins".into(),
                    message: "twin creation failed".into(),
                });
            }
            self.twin = Some(99);
            Ok(99)
        }

        async fn balance(&self) -> Result<String, GridError> {
            self.balance.clone().ok_or_else(|| GridError::Unsupported {
                operation: "balance lookup".into(),
            })
        }

        async fn ssh_key(&self) -> Result<Option<String>, GridError> {
            Ok(self.ssh_key.clone())
        }

        async fn nodes(&self, filter: &NodeFilter) -> Result<Vec<CapacityNode>, GridError> {
            self.node_queries.set(self.node_queries.get() + 1);
            Ok(self
                .nodes
                .iter()
                .filter(|n| filter.status.is_none_or(|s| s == n.status))
                .filter(|n| filter.healthy.is_none_or(|h| h == n.healthy))
                .filter(|n| filter.rentable.is_none_or(|r| r == n.rentable))
                .cloned()
                .collect())
        }

        async fn deploy(&mut self, deployment: &DeploymentDescriptor) -> Result<(), GridError> {
            if self.fail_deploy {
                return Err(GridError::Response {
                    url: "fake://deploy".into(),
                    message: "contract creation failed".into(),
                });
            }
            self.deployed.push(deployment.clone());
            Ok(())
        }

        async fn machines(&self, deployment: &str) -> Result<Vec<MachineRecord>, GridError> {
            let Some(found) = self.deployed.iter().find(|d| d.name == deployment) else {
                return Ok(Vec::new());
            };
            Ok(found
                .machines
                .iter()
                .enumerate()
                .map(|(i, m)| MachineRecord {
                    name: m.name.clone(),
                    node_id: m.node_id,
                    contract_id: 1000 + i as u64,
                    public_ip: m.public_ip.then(|| "185.69.166.10/24".to_string()),
                    mycelium_ip: m.mycelium.then(|| "4b5:1::2".to_string()),
                    planetary_ip: None,
                })
                .collect())
        }
    }

    #[test]
    fn available_is_clamped() {
        let mut n = node(1, 4, 8, 20);
        n.used.cpu = 6;
        n.used.memory = 2 * GIB;
        let free = n.available();
        assert_eq!(free.cpu, 0);
        assert_eq!(free.memory, 6 * GIB);
        assert_eq!(free.hdd, 20 * GIB);
    }

    #[test]
    fn node_status_round_trips_through_str() {
        for s in [NodeStatus::Up, NodeStatus::Standby, NodeStatus::Down] {
            assert_eq!(s.as_str().parse::<NodeStatus>().unwrap(), s);
        }
        assert!("sideways".parse::<NodeStatus>().is_err());
    }
}
