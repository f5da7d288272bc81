use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum GridCliError {
    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("{message}")]
    OptionMissing { message: String },

    #[error("the option '{key}' is not valid")]
    #[diagnostic(help("valid keys are: mnemonic, network, ssh_key, twin_id"))]
    NotValidOption { key: String },

    #[error("no node satisfies the requested resources ({request})")]
    #[diagnostic(help("lower the requested resources or pin a node with --node-id"))]
    NoMatchingNode { request: String },

    #[error("grid session failed: {message}")]
    ExternalSession { message: String },

    #[error("before accessing this command, please use the 'connect' command to link your account")]
    NotConnected,

    #[error("couldn't find a twin for the provided mnemonic on the {network} network")]
    TwinNotExist { network: String },

    #[error("failed to load profile from {path}")]
    ProfileLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse profile from {path}: {message}")]
    ProfileParse { path: String, message: String },

    #[error("failed to write profile to {path}")]
    ProfileWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("error reading deployment file {path}")]
    DeploymentFileLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse deployment file {path}: {message}")]
    DeploymentFileParse { path: String, message: String },

    #[error("aborted")]
    PromptCancelled,
}
