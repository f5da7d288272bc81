use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::grid::NodeStatus;
use crate::profile::Network;
use crate::resolve::{DeployFlags, NetworkAccess};

#[derive(Parser, Debug)]
#[command(
    name = "grid-cli",
    version,
    about = "Provision virtual machines on the ThreeFold grid"
)]
pub struct Cli {
    /// Path to the profile file [default: <config dir>/grid-cli/config.json]
    #[arg(long, global = true, env = "GRID_CLI_PROFILE")]
    pub profile: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress log output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Link a wallet and network to the local profile
    Connect(ConnectArgs),

    /// Print the account behind the local profile
    Whoami,

    /// Capacity nodes on the grid
    Nodes {
        #[command(subcommand)]
        action: NodesCommand,
    },

    /// Virtual machine deployments
    Vms {
        #[command(subcommand)]
        action: VmsCommand,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct ConnectArgs {
    /// The mnemonic phrase of your wallet
    #[arg(long)]
    pub mnemonic: Option<String>,

    /// The public SSH key for accessing deployments
    #[arg(long = "ssh-key", visible_alias = "SSH_KEY")]
    pub ssh_key: Option<String>,

    /// The network environment
    #[arg(long, value_enum)]
    pub network: Option<Network>,

    /// Prompt for anything not given on the command line
    #[arg(short, long)]
    pub interactive: bool,

    /// Set a profile value (mnemonic, network, ssh_key, twin_id); repeatable
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum NodesCommand {
    /// List nodes
    List {
        /// Only nodes with this status
        #[arg(long, value_enum)]
        status: Option<NodeStatus>,
    },
}

#[derive(Subcommand, Debug)]
pub enum VmsCommand {
    /// Deploy a virtual machine
    Deploy(DeployArgs),
}

#[derive(Args, Debug, Default, Clone)]
pub struct DeployArgs {
    /// Deploy a YAML deployment file as-is
    #[arg(short = 'f', long, conflicts_with_all = [
        "network_name", "network_ip_range", "machine_name", "disk_space", "disk_name",
        "disk_mountpoint", "cpu", "memory", "node_id", "network_access",
    ])]
    pub deployment_file: Option<PathBuf>,

    #[arg(long)]
    pub network_name: Option<String>,

    /// Private IPv4 range in CIDR notation
    #[arg(long)]
    pub network_ip_range: Option<String>,

    #[arg(long)]
    pub machine_name: Option<String>,

    /// Disk size, e.g. 15GB (5-50)
    #[arg(long)]
    pub disk_space: Option<String>,

    #[arg(long)]
    pub disk_name: Option<String>,

    #[arg(long)]
    pub disk_mountpoint: Option<String>,

    /// CPU cores, e.g. "2 cores" (1-5)
    #[arg(long)]
    pub cpu: Option<String>,

    /// Memory, e.g. 2GB (1-16)
    #[arg(long)]
    pub memory: Option<String>,

    /// Deploy on this node instead of picking one
    #[arg(long)]
    pub node_id: Option<String>,

    /// Networks to attach
    #[arg(long, value_enum, value_delimiter = ',')]
    pub network_access: Option<Vec<NetworkAccess>>,

    /// Never prompt; fill anything missing with defaults
    #[arg(short, long)]
    pub yes: bool,
}

impl DeployArgs {
    pub fn flags(&self) -> DeployFlags {
        DeployFlags {
            network_name: self.network_name.clone(),
            network_ip_range: self.network_ip_range.clone(),
            machine_name: self.machine_name.clone(),
            disk_space: self.disk_space.clone(),
            disk_name: self.disk_name.clone(),
            disk_mountpoint: self.disk_mountpoint.clone(),
            cpu: self.cpu.clone(),
            memory: self.memory.clone(),
            node_id: self.node_id.clone(),
            network_access: self.network_access.clone(),
        }
    }
}
