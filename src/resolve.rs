//! Turns flags, prompt answers and generated defaults into one [`ResourceSpec`].
//!
//! Precedence, highest first: explicit flags, prompt answers, defaults. A
//! deployment file bypasses all of this (see `commands::vms`).

use std::fmt;

use rand::Rng;

use crate::error::GridCliError;
use crate::prompt::Prompter;
use crate::units;
use crate::validators::{self, Verdict};

// ── connectivity ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum NetworkAccess {
    Mycelium,
    #[value(name = "public-ip4")]
    PublicIpv4,
    #[value(name = "public-ip6")]
    PublicIpv6,
    Planetary,
}

impl NetworkAccess {
    pub const ALL: [NetworkAccess; 4] = [
        NetworkAccess::Mycelium,
        NetworkAccess::PublicIpv4,
        NetworkAccess::PublicIpv6,
        NetworkAccess::Planetary,
    ];

    pub fn label(self) -> &'static str {
        match self {
            NetworkAccess::Mycelium => "Mycelium network",
            NetworkAccess::PublicIpv4 => "Public IP v4",
            NetworkAccess::PublicIpv6 => "Public IP v6",
            NetworkAccess::Planetary => "Planetary network",
        }
    }
}

impl fmt::Display for NetworkAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The set of network options requested for a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Connectivity {
    pub mycelium: bool,
    pub public_ipv4: bool,
    pub public_ipv6: bool,
    pub planetary: bool,
}

impl Connectivity {
    pub fn mycelium_only() -> Self {
        Self {
            mycelium: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.selected().is_empty()
    }

    pub fn contains(&self, access: NetworkAccess) -> bool {
        match access {
            NetworkAccess::Mycelium => self.mycelium,
            NetworkAccess::PublicIpv4 => self.public_ipv4,
            NetworkAccess::PublicIpv6 => self.public_ipv6,
            NetworkAccess::Planetary => self.planetary,
        }
    }

    pub fn selected(&self) -> Vec<NetworkAccess> {
        NetworkAccess::ALL
            .into_iter()
            .filter(|a| self.contains(*a))
            .collect()
    }
}

impl FromIterator<NetworkAccess> for Connectivity {
    fn from_iter<I: IntoIterator<Item = NetworkAccess>>(iter: I) -> Self {
        let mut c = Connectivity::default();
        for access in iter {
            match access {
                NetworkAccess::Mycelium => c.mycelium = true,
                NetworkAccess::PublicIpv4 => c.public_ipv4 = true,
                NetworkAccess::PublicIpv6 => c.public_ipv6 = true,
                NetworkAccess::Planetary => c.planetary = true,
            }
        }
        c
    }
}

// ── fields ───────────────────────────────────────────────

/// A free-text field that can come from a flag, a prompt or a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    NetworkName,
    NetworkIpRange,
    MachineName,
    DiskSpace,
    DiskName,
    DiskMountpoint,
    Cpu,
    Memory,
    Mnemonic,
    SshKey,
}

impl Field {
    /// Deployment fields, in prompt order.
    pub const DEPLOYMENT: [Field; 8] = [
        Field::NetworkName,
        Field::NetworkIpRange,
        Field::MachineName,
        Field::DiskSpace,
        Field::DiskName,
        Field::DiskMountpoint,
        Field::Cpu,
        Field::Memory,
    ];

    pub fn flag(self) -> &'static str {
        match self {
            Field::NetworkName => "--network-name",
            Field::NetworkIpRange => "--network-ip-range",
            Field::MachineName => "--machine-name",
            Field::DiskSpace => "--disk-space",
            Field::DiskName => "--disk-name",
            Field::DiskMountpoint => "--disk-mountpoint",
            Field::Cpu => "--cpu",
            Field::Memory => "--memory",
            Field::Mnemonic => "--mnemonic",
            Field::SshKey => "--ssh-key",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Field::NetworkName => "Enter your deployment network name",
            Field::NetworkIpRange => "Enter your deployment network IP range",
            Field::MachineName => "Enter your deployment name",
            Field::DiskSpace => "Enter the required disk space",
            Field::DiskName => "Enter the required disk name",
            Field::DiskMountpoint => "Enter the required disk mountpoint",
            Field::Cpu => "Enter the required CPU cores",
            Field::Memory => "Enter the required memory space",
            Field::Mnemonic => "Enter your wallet mnemonic phrase",
            Field::SshKey => "Enter your public SSH key",
        }
    }

    pub fn validate(self, value: &str) -> Verdict {
        match self {
            Field::NetworkName | Field::MachineName | Field::DiskName => {
                validators::alphanumeric(value)
            }
            Field::NetworkIpRange => validators::private_ip(value),
            Field::DiskSpace => validators::disk_space(value),
            Field::DiskMountpoint => validators::mountpoint(value),
            Field::Cpu => validators::cpu_cores(value),
            Field::Memory => validators::memory_space(value),
            Field::Mnemonic => validators::mnemonic(value),
            Field::SshKey => validators::ssh_public_key(value),
        }
    }
}

// ── defaults ─────────────────────────────────────────────

pub const DEFAULT_NETWORK_IP_RANGE: &str = "10.10.0.0/16";
pub const DEFAULT_DISK_SPACE: &str = "15GB";
pub const DEFAULT_DISK_MOUNTPOINT: &str = "/mnt/data";
pub const DEFAULT_CPU: &str = "1 Core";
pub const DEFAULT_MEMORY: &str = "2GB";

const NAME_ALPHABET: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// `prefix` followed by `len` characters drawn uniformly from `[a-z0-9]`.
///
/// No collision check against names that already exist on the grid.
pub fn generate_name(prefix: &str, len: usize) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..len)
        .map(|_| NAME_ALPHABET[rng.gen_range(0..NAME_ALPHABET.len())] as char)
        .collect();
    format!("{prefix}{suffix}")
}

/// Fallback values for every deployment field, generated once per invocation.
#[derive(Debug, Clone)]
pub struct Defaults {
    pub network_name: String,
    pub machine_name: String,
    pub disk_name: String,
}

impl Defaults {
    pub fn generate() -> Self {
        Self {
            network_name: generate_name("net", 5),
            machine_name: generate_name("vm", 7),
            disk_name: generate_name("dsk", 4),
        }
    }

    pub fn value(&self, field: Field) -> Option<&str> {
        match field {
            Field::NetworkName => Some(&self.network_name),
            Field::NetworkIpRange => Some(DEFAULT_NETWORK_IP_RANGE),
            Field::MachineName => Some(&self.machine_name),
            Field::DiskSpace => Some(DEFAULT_DISK_SPACE),
            Field::DiskName => Some(&self.disk_name),
            Field::DiskMountpoint => Some(DEFAULT_DISK_MOUNTPOINT),
            Field::Cpu => Some(DEFAULT_CPU),
            Field::Memory => Some(DEFAULT_MEMORY),
            Field::Mnemonic | Field::SshKey => None,
        }
    }
}

// ── inputs and output ────────────────────────────────────

/// Raw deployment flags, exactly as typed on the command line.
#[derive(Debug, Clone, Default)]
pub struct DeployFlags {
    pub network_name: Option<String>,
    pub network_ip_range: Option<String>,
    pub machine_name: Option<String>,
    pub disk_space: Option<String>,
    pub disk_name: Option<String>,
    pub disk_mountpoint: Option<String>,
    pub cpu: Option<String>,
    pub memory: Option<String>,
    pub node_id: Option<String>,
    pub network_access: Option<Vec<NetworkAccess>>,
}

impl DeployFlags {
    pub fn value(&self, field: Field) -> Option<&str> {
        match field {
            Field::NetworkName => self.network_name.as_deref(),
            Field::NetworkIpRange => self.network_ip_range.as_deref(),
            Field::MachineName => self.machine_name.as_deref(),
            Field::DiskSpace => self.disk_space.as_deref(),
            Field::DiskName => self.disk_name.as_deref(),
            Field::DiskMountpoint => self.disk_mountpoint.as_deref(),
            Field::Cpu => self.cpu.as_deref(),
            Field::Memory => self.memory.as_deref(),
            Field::Mnemonic | Field::SshKey => None,
        }
    }
}

/// A fully resolved, validated resource request for a single machine.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSpec {
    pub machine_name: String,
    pub network_name: String,
    pub network_ip_range: String,
    pub disk_name: String,
    pub disk_mountpoint: String,
    pub disk_gib: f64,
    pub cpu_cores: u32,
    pub memory_gib: f64,
    pub connectivity: Connectivity,
    /// When set, node matching is skipped.
    pub node_id: Option<u32>,
}

impl ResourceSpec {
    /// One-line description of what is being asked of the grid.
    pub fn summary(&self) -> String {
        let mut parts = vec![
            format!("cpu: {} cores", self.cpu_cores),
            format!("memory: {} GiB", self.memory_gib),
            format!("disk: {} GiB", self.disk_gib),
        ];
        if self.connectivity.public_ipv4 {
            parts.push("public ipv4".into());
        }
        if self.connectivity.public_ipv6 {
            parts.push("public ipv6".into());
        }
        parts.join(", ")
    }
}

// ── resolution ───────────────────────────────────────────

/// Reject any explicitly supplied flag that fails its validator.
///
/// Runs before anything touches the network; a bad flag is never replaced
/// by a default.
pub fn validate_flags(flags: &DeployFlags) -> Result<(), GridCliError> {
    for field in Field::DEPLOYMENT {
        if let Some(value) = flags.value(field) {
            field.validate(value).map_err(|v| flag_error(field.flag(), value, &v))?;
        }
    }
    if let Some(ref node) = flags.node_id {
        validators::node_id(node).map_err(|v| flag_error("--node-id", node, &v))?;
    }
    if let Some(ref access) = flags.network_access {
        let selection: Connectivity = access.iter().copied().collect();
        validators::network_access(&selection)
            .map_err(|v| flag_error("--network-access", "", &v))?;
    }
    Ok(())
}

fn flag_error(flag: &str, value: &str, violation: &validators::Violation) -> GridCliError {
    GridCliError::Validation {
        message: format!("invalid {flag} '{value}': {violation}"),
    }
}

/// Value for `field`: the flag if present, otherwise the prompter's answer,
/// asked again until it validates.
fn answer<P: Prompter + ?Sized>(
    field: Field,
    flags: &DeployFlags,
    defaults: &Defaults,
    prompter: &mut P,
) -> Result<String, GridCliError> {
    if let Some(value) = flags.value(field) {
        return Ok(value.to_string());
    }
    ask(field, defaults.value(field), prompter)
}

/// Ask for `field` until the answer passes its validator.
pub fn ask<P: Prompter + ?Sized>(
    field: Field,
    default: Option<&str>,
    prompter: &mut P,
) -> Result<String, GridCliError> {
    loop {
        let value = prompter.text(field, default)?;
        match field.validate(&value) {
            Ok(()) => return Ok(value),
            Err(v) => tracing::warn!("{}: {v}", field.message()),
        }
    }
}

fn parsed<T>(
    field: Field,
    value: &str,
    parse: impl Fn(&str) -> Result<T, units::NotANumber>,
) -> Result<T, GridCliError> {
    parse(value).map_err(|e| GridCliError::Validation {
        message: format!("{}: {e}", field.flag()),
    })
}

pub fn resolve<P: Prompter + ?Sized>(
    flags: &DeployFlags,
    defaults: &Defaults,
    prompter: &mut P,
) -> Result<ResourceSpec, GridCliError> {
    validate_flags(flags)?;

    let network_name = answer(Field::NetworkName, flags, defaults, prompter)?;
    let network_ip_range = answer(Field::NetworkIpRange, flags, defaults, prompter)?;
    let machine_name = answer(Field::MachineName, flags, defaults, prompter)?;
    let disk_space = answer(Field::DiskSpace, flags, defaults, prompter)?;
    let disk_name = answer(Field::DiskName, flags, defaults, prompter)?;
    let disk_mountpoint = answer(Field::DiskMountpoint, flags, defaults, prompter)?;
    let cpu = answer(Field::Cpu, flags, defaults, prompter)?;
    let memory = answer(Field::Memory, flags, defaults, prompter)?;

    let connectivity = match flags.network_access {
        Some(ref access) => access.iter().copied().collect(),
        None => loop {
            let selection = prompter.network_access(Connectivity::mycelium_only())?;
            match validators::network_access(&selection) {
                Ok(()) => break selection,
                Err(v) => tracing::warn!("{v}"),
            }
        },
    };

    let node_id = match flags.node_id {
        Some(ref raw) => Some(raw.trim().parse::<u32>().map_err(|_| {
            GridCliError::Validation {
                message: format!("invalid --node-id '{raw}': Node ID must be a valid number."),
            }
        })?),
        None => prompter.node_id()?,
    };

    let cpu_cores = parsed(Field::Cpu, &cpu, units::parse_cpu_cores)? as u32;

    Ok(ResourceSpec {
        disk_gib: parsed(Field::DiskSpace, &disk_space, units::parse_disk_gib)?,
        memory_gib: parsed(Field::Memory, &memory, units::parse_memory_gib)?,
        cpu_cores,
        machine_name,
        network_name,
        network_ip_range,
        disk_name,
        disk_mountpoint,
        connectivity,
        node_id,
    })
}
