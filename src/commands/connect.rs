use crate::cli::ConnectArgs;
use crate::error::GridCliError;
use crate::grid::proxy::relay_url;
use crate::grid::{Grid, GridError};
use crate::profile::{self, Network, PLACEHOLDER, Profile, ProfileKey, ProfileStore};
use crate::prompt::Prompter;
use crate::resolve::{Field, ask};

use super::{best_effort, disconnect_quietly};

/// Which values this invocation supplied, through a flag or `--set`.
#[derive(Debug, Default)]
struct Supplied {
    mnemonic: bool,
    network: bool,
    ssh_key: bool,
    twin_id: bool,
}

impl Supplied {
    fn mark(&mut self, key: ProfileKey) {
        match key {
            ProfileKey::Mnemonic => self.mnemonic = true,
            ProfileKey::Network => self.network = true,
            ProfileKey::SshKey => self.ssh_key = true,
            ProfileKey::TwinId => self.twin_id = true,
        }
    }
}

/// Merge `--set` assignments, flags and (in interactive mode) prompt answers
/// into the stored profile. Nothing here touches the network.
pub fn prepare<P: Prompter + ?Sized>(
    args: &ConnectArgs,
    stored: Profile,
    prompter: &mut P,
) -> Result<Profile, GridCliError> {
    let previous_mnemonic = stored.mnemonic.clone();
    let mut profile = stored;
    let mut supplied = Supplied::default();

    for raw in &args.set {
        let (key, value) = profile::parse_assignment(raw)?;
        profile.set(key, &value)?;
        supplied.mark(key);
    }

    // Flags win over `--set` for the same key.
    if let Some(ref mnemonic) = args.mnemonic {
        profile.set(ProfileKey::Mnemonic, mnemonic)?;
        supplied.mark(ProfileKey::Mnemonic);
    }
    if let Some(ref key) = args.ssh_key {
        profile.set(ProfileKey::SshKey, key)?;
        supplied.mark(ProfileKey::SshKey);
    }
    if let Some(network) = args.network {
        profile.network = network.to_string();
        supplied.mark(ProfileKey::Network);
    }

    if !supplied.mnemonic {
        if !args.interactive {
            return Err(GridCliError::OptionMissing {
                message: "the `--mnemonic` option is required when not running in interactive \
                          mode, use `-i` to run in interactive mode"
                    .into(),
            });
        }
        profile.mnemonic = ask(Field::Mnemonic, None, prompter)?.trim().to_string();
    }

    if !supplied.ssh_key {
        if args.interactive {
            let answer = ask(Field::SshKey, profile.ssh_key(), prompter)?;
            profile.ssh_key = answer.trim().to_string();
        } else {
            tracing::warn!("the `--ssh-key` option was not provided, keeping the stored key");
        }
    }

    if !supplied.network {
        let network = if args.interactive {
            prompter.network(Network::default())?
        } else {
            tracing::warn!(
                "the `--network` option is required when not running in interactive mode, \
                 defaulting to `dev`"
            );
            Network::default()
        };
        profile.network = network.to_string();
    }

    // Cached chain data belongs to the previous wallet.
    if profile.mnemonic != previous_mnemonic {
        profile.balance = PLACEHOLDER.into();
        if !supplied.twin_id {
            profile.twin_id = PLACEHOLDER.into();
        }
    }

    Ok(profile)
}

/// Open a session for `profile`, offer to create a missing twin, fetch the
/// balance and twin id best-effort and persist the result.
pub async fn establish<G, P, S>(
    grid: &mut G,
    mut profile: Profile,
    interactive: bool,
    prompter: &mut P,
    store: &S,
) -> Result<Profile, GridCliError>
where
    G: Grid,
    P: Prompter + ?Sized,
    S: ProfileStore,
{
    let network = profile.network()?;

    tracing::info!("connecting your wallet");
    match grid.connect().await {
        Ok(()) => {}
        Err(GridError::TwinNotFound) => {
            tracing::error!(
                "couldn't find a user for the provided mnemonic on the {network} network"
            );
            let create =
                interactive && prompter.confirm("Would you like to create a new one?", false)?;
            if !create {
                return Err(GridCliError::TwinNotExist {
                    network: network.to_string(),
                });
            }

            if let Err(e) = create_and_reconnect(grid, &mut profile, network).await {
                disconnect_quietly(grid).await;
                return Err(e);
            }
        }
        Err(e) => return Err(e.into()),
    }
    tracing::info!("grid client connected successfully");

    let session = &*grid;
    let (balance, twin) = tokio::join!(session.balance(), session.twin_id());
    profile.balance = best_effort("balance", balance).unwrap_or_else(|| PLACEHOLDER.into());
    if let Some(twin) = best_effort("twin ID", twin) {
        profile.twin_id = twin.to_string();
    }

    let saved = store.save(&profile);
    disconnect_quietly(grid).await;
    saved?;
    tracing::info!("profile saved");
    Ok(profile)
}

async fn create_and_reconnect<G: Grid>(
    grid: &mut G,
    profile: &mut Profile,
    network: Network,
) -> Result<(), GridCliError> {
    let twin = grid.create_twin(relay_url(network)).await?;
    tracing::info!("twin {twin} created");
    profile.twin_id = twin.to_string();
    grid.connect().await?;
    Ok(())
}
