//! The persisted wallet profile and the store that reads and writes it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use facet::Facet;

use crate::error::GridCliError;
use crate::validators;

/// Value stored for fields that are not known yet.
pub const PLACEHOLDER: &str = "-";

// ── network environment ──────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Network {
    #[default]
    Dev,
    Qa,
    Test,
    Main,
}

impl Network {
    pub const ALL: [Network; 4] = [Network::Dev, Network::Qa, Network::Test, Network::Main];

    pub fn as_str(self) -> &'static str {
        match self {
            Network::Dev => "dev",
            Network::Qa => "qa",
            Network::Test => "test",
            Network::Main => "main",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = GridCliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Network::ALL
            .into_iter()
            .find(|n| n.as_str() == s.trim())
            .ok_or_else(|| GridCliError::Validation {
                message: format!(
                    "network '{s}' is not valid, only dev, qa, test and main are supported"
                ),
            })
    }
}

// ── profile record ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Facet)]
#[facet(default)]
pub struct Profile {
    #[facet(default)]
    pub mnemonic: String,
    #[facet(default = "dev")]
    pub network: String,
    #[facet(default = "-")]
    pub ssh_key: String,
    #[facet(default = "-")]
    pub balance: String,
    #[facet(default = "-")]
    pub twin_id: String,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            mnemonic: String::new(),
            network: Network::Dev.to_string(),
            ssh_key: PLACEHOLDER.into(),
            balance: PLACEHOLDER.into(),
            twin_id: PLACEHOLDER.into(),
        }
    }
}

impl Profile {
    pub fn is_connected(&self) -> bool {
        !self.mnemonic.is_empty()
    }

    pub fn network(&self) -> Result<Network, GridCliError> {
        self.network.parse()
    }

    /// The twin id, if one has been recorded.
    pub fn twin(&self) -> Option<u32> {
        self.twin_id.parse().ok()
    }

    /// The stored SSH key, if it is more than a placeholder.
    pub fn ssh_key(&self) -> Option<&str> {
        is_known(&self.ssh_key).then_some(self.ssh_key.as_str())
    }

    /// Mnemonic with everything but the first word hidden.
    pub fn masked_mnemonic(&self) -> String {
        match self.mnemonic.split_whitespace().next() {
            Some(first) => format!("{first} ****"),
            None => PLACEHOLDER.into(),
        }
    }

    /// Apply a `key=value` assignment through the typed setter for `key`.
    pub fn set(&mut self, key: ProfileKey, value: &str) -> Result<(), GridCliError> {
        match key {
            ProfileKey::Mnemonic => {
                validators::mnemonic(value).map_err(|v| GridCliError::Validation {
                    message: v.to_string(),
                })?;
                self.mnemonic = value.trim().to_string();
            }
            ProfileKey::Network => {
                self.network = value.parse::<Network>()?.to_string();
            }
            ProfileKey::SshKey => {
                validators::ssh_public_key(value).map_err(|v| GridCliError::Validation {
                    message: v.to_string(),
                })?;
                self.ssh_key = value.trim().to_string();
            }
            ProfileKey::TwinId => {
                let id: u32 = value.trim().parse().map_err(|_| GridCliError::Validation {
                    message: format!("twin id must be a number (got '{value}')"),
                })?;
                self.twin_id = id.to_string();
            }
        }
        Ok(())
    }
}

/// True unless `value` is empty or the placeholder.
pub fn is_known(value: &str) -> bool {
    !value.is_empty() && value != PLACEHOLDER
}

// ── settable keys ────────────────────────────────────────

/// Keys accepted by `connect --set key=value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKey {
    Mnemonic,
    Network,
    SshKey,
    TwinId,
}

impl FromStr for ProfileKey {
    type Err = GridCliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "mnemonic" => Ok(ProfileKey::Mnemonic),
            "network" => Ok(ProfileKey::Network),
            "ssh_key" | "SSH_KEY" => Ok(ProfileKey::SshKey),
            "twin_id" | "twinID" => Ok(ProfileKey::TwinId),
            other => Err(GridCliError::NotValidOption {
                key: other.to_string(),
            }),
        }
    }
}

/// Split a raw `key=value` argument.
pub fn parse_assignment(raw: &str) -> Result<(ProfileKey, String), GridCliError> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err(GridCliError::Validation {
            message: format!("expected key=value (got '{raw}')"),
        });
    };
    Ok((key.parse()?, value.to_string()))
}

// ── storage ──────────────────────────────────────────────

pub trait ProfileStore {
    fn load(&self) -> Result<Profile, GridCliError>;
    fn save(&self, profile: &Profile) -> Result<(), GridCliError>;
}

/// JSON file on disk. Read-then-overwrite, no locking: concurrent writers
/// race and the last one wins.
#[derive(Debug, Clone)]
pub struct FileProfileStore {
    path: PathBuf,
}

impl FileProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProfileStore for FileProfileStore {
    fn load(&self) -> Result<Profile, GridCliError> {
        tracing::debug!("searching for the config file at {}", self.path.display());
        if !self.path.exists() {
            return Ok(Profile::default());
        }

        let contents =
            std::fs::read_to_string(&self.path).map_err(|source| GridCliError::ProfileLoad {
                path: self.path.display().to_string(),
                source,
            })?;

        facet_json::from_str(&contents).map_err(|e| GridCliError::ProfileParse {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn save(&self, profile: &Profile) -> Result<(), GridCliError> {
        let write_err = |source| GridCliError::ProfileWrite {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let json = facet_json::to_string(profile).map_err(|e| GridCliError::ProfileParse {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;
        std::fs::write(&self.path, json).map_err(write_err)
    }
}
