//! Pure field validators.
//!
//! Each validator returns `Ok(())` or a human-readable [`Violation`]. They never
//! panic on malformed input; anything that doesn't parse is simply a violation.

use std::fmt;

use crate::resolve::Connectivity;
use crate::units;

pub const DISK_GIB_MIN: f64 = 5.0;
pub const DISK_GIB_MAX: f64 = 50.0;
pub const MEMORY_GIB_MIN: f64 = 1.0;
pub const MEMORY_GIB_MAX: f64 = 16.0;
pub const CPU_CORES_MIN: f64 = 1.0;
pub const CPU_CORES_MAX: f64 = 5.0;
pub const MOUNTPOINT_MAX_CHARS: usize = 100;

const MNEMONIC_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation(String);

impl Violation {
    fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }

    pub fn reason(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub type Verdict = Result<(), Violation>;

/// Machine, disk and network names: `[A-Za-z0-9]+`.
pub fn alphanumeric(value: &str) -> Verdict {
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(Violation::new("Name can only be alphanumeric."))
    }
}

pub fn disk_space(value: &str) -> Verdict {
    let Ok(gib) = units::parse_disk_gib(value) else {
        return Err(Violation::new("The disk space should be only in numbers."));
    };
    if gib > DISK_GIB_MAX {
        return Err(Violation::new("The disk space should be lower than 50GB."));
    }
    if gib < DISK_GIB_MIN {
        return Err(Violation::new("The disk space should be bigger than 5GB."));
    }
    Ok(())
}

pub fn memory_space(value: &str) -> Verdict {
    let Ok(gib) = units::parse_memory_gib(value) else {
        return Err(Violation::new("The memory space should be only in numbers."));
    };
    if gib > MEMORY_GIB_MAX {
        return Err(Violation::new("The memory should be lower than 16GB."));
    }
    if gib < MEMORY_GIB_MIN {
        return Err(Violation::new("The memory should be bigger than 1GB."));
    }
    Ok(())
}

pub fn cpu_cores(value: &str) -> Verdict {
    let Ok(cores) = units::parse_cpu_cores(value) else {
        return Err(Violation::new("The CPU should be only in numbers."));
    };
    if cores.fract() != 0.0 {
        return Err(Violation::new("The CPU should be a whole number of cores."));
    }
    if cores > CPU_CORES_MAX {
        return Err(Violation::new("The CPU should be lower than 5 cores."));
    }
    if cores < CPU_CORES_MIN {
        return Err(Violation::new("The CPU should be at least 1 core."));
    }
    Ok(())
}

pub fn mountpoint(value: &str) -> Verdict {
    if value.chars().count() > MOUNTPOINT_MAX_CHARS {
        return Err(Violation::new(
            "The disk mount point should be lower than 100 chars.",
        ));
    }
    Ok(())
}

pub fn network_access(selection: &Connectivity) -> Verdict {
    if selection.is_empty() {
        return Err(Violation::new("You must choose at least one network."));
    }
    Ok(())
}

/// Node ids are only checked for shape; the grid decides whether they exist.
pub fn node_id(value: &str) -> Verdict {
    match value.trim().parse::<u32>() {
        Ok(_) => Ok(()),
        Err(_) => Err(Violation::new("Node ID must be a valid number.")),
    }
}

/// Checks the leading octets of an address or CIDR against the private
/// ranges 10.0.0.0/8, 172.16.0.0/12 and 192.168.0.0/16.
///
/// Malformed input is not rejected separately: an octet that doesn't parse
/// fails every range check and ends up as "not a private ip".
pub fn private_ip(value: &str) -> Verdict {
    let octets: Vec<Option<u32>> = value
        .split('.')
        .map(|part| part.trim().parse::<u32>().ok())
        .collect();
    let first = octets.first().copied().flatten();
    let second = octets.get(1).copied().flatten();

    let private = match (first, second) {
        (Some(10), _) => true,
        (Some(172), Some(b)) => (16..=31).contains(&b),
        (Some(192), Some(168)) => true,
        _ => false,
    };

    if private {
        Ok(())
    } else {
        Err(Violation::new("This is not a private ip."))
    }
}

/// Shape check only: 12/15/18/21/24 lowercase words.
pub fn mnemonic(value: &str) -> Verdict {
    let words: Vec<&str> = value.split_whitespace().collect();
    let well_formed = MNEMONIC_WORD_COUNTS.contains(&words.len())
        && words
            .iter()
            .all(|w| w.chars().all(|c| c.is_ascii_lowercase()));
    if well_formed {
        Ok(())
    } else {
        Err(Violation::new(
            "The mnemonic isn't valid, try to use a valid mnemonic.",
        ))
    }
}

pub fn ssh_public_key(value: &str) -> Verdict {
    match ssh_key::PublicKey::from_openssh(value.trim()) {
        Ok(_) => Ok(()),
        Err(e) => Err(Violation::new(format!(
            "The public SSH key isn't valid ({e})."
        ))),
    }
}
