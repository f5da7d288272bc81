use std::path::PathBuf;

/// Per-user config directory: `~/.config/grid-cli/`
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("grid-cli")
}

/// Default location of the persisted profile.
pub fn profile_path() -> PathBuf {
    config_dir().join("config.json")
}
