//! Command flows. Each one is generic over the grid session, the profile
//! store and the prompter so it can run against in-memory fakes.

pub mod connect;
pub mod nodes;
pub mod vms;
pub mod whoami;

use crate::error::GridCliError;
use crate::grid::{Grid, GridError};
use crate::profile::{Network, Profile};
use crate::validators;

/// The network of a linked profile, or why the profile can't be used.
pub fn ensure_connected(profile: &Profile) -> Result<Network, GridCliError> {
    if !profile.is_connected() {
        return Err(GridCliError::NotConnected);
    }
    validators::mnemonic(&profile.mnemonic).map_err(|_| GridCliError::Validation {
        message: "the mnemonic isn't valid, try to use a valid mnemonic".into(),
    })?;
    profile.network()
}

/// Keep `result` if it succeeded; otherwise log `what` and move on.
fn best_effort<T>(what: &str, result: Result<T, GridError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("error fetching {what}: {e}");
            None
        }
    }
}

/// Close `grid`, logging instead of failing. Used once the command's outcome
/// is already decided.
async fn disconnect_quietly<G: Grid>(grid: &mut G) {
    match grid.disconnect().await {
        Ok(()) => tracing::info!("grid client disconnected"),
        Err(e) => tracing::warn!("failed to disconnect from the grid: {e}"),
    }
}
